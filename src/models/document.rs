//! Canonical markdown rendering of an event record.
//!
//! The rendered text is the basis of change detection against the archive, so
//! it must be a pure function of the record: same record, same bytes.

use serde::{Deserialize, Serialize};

use super::EventRecord;

/// Front-matter timestamp format (UTC).
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const FRONT_MATTER_FENCE: &str = "---\n";

/// Front-matter block of a stored event document.
///
/// Field order is the on-disk key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontMatter {
    pub title: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    pub locations: Vec<String>,
    pub forms: Vec<String>,
    pub topics: Vec<String>,
    pub organizer: String,
    #[serde(rename = "addressName")]
    pub address_name: String,
    #[serde(rename = "streetAddress")]
    pub street_address: String,
    #[serde(rename = "postalCode")]
    pub postal_code: String,
    #[serde(rename = "addressRegion")]
    pub address_region: String,
    #[serde(rename = "addressCountry")]
    pub address_country: String,
    pub source: String,
}

impl FrontMatter {
    /// Build the front matter for `record`, or `None` when it has no title or
    /// no representable start time.
    pub fn from_record(record: &EventRecord) -> Option<Self> {
        let title = record.usable_title()?;
        let start = record.start()?;

        Some(Self {
            title: title.to_string(),
            date: start.format(DATE_FORMAT).to_string(),
            end_date: record.end().map(|end| end.format(DATE_FORMAT).to_string()),
            locations: Vec::new(),
            forms: Vec::new(),
            topics: Vec::new(),
            organizer: record.organiser.clone().unwrap_or_default(),
            address_name: String::new(),
            street_address: record.street_address.clone().unwrap_or_default(),
            postal_code: record.post_address.clone().unwrap_or_default(),
            address_region: String::new(),
            address_country: record.country.clone().unwrap_or_default(),
            source: record.source_url.clone(),
        })
    }
}

/// Render `record` as `---\n{front matter}---\n{description}`.
///
/// Returns `Ok(None)` when the record is not storable.
pub fn render_document(record: &EventRecord) -> Result<Option<String>, serde_yaml::Error> {
    let Some(front) = FrontMatter::from_record(record) else {
        return Ok(None);
    };

    let yaml = serde_yaml::to_string(&front)?;
    let description = record.description.as_deref().unwrap_or_default();

    let mut document =
        String::with_capacity(yaml.len() + description.len() + 2 * FRONT_MATTER_FENCE.len());
    document.push_str(FRONT_MATTER_FENCE);
    document.push_str(&yaml);
    document.push_str(FRONT_MATTER_FENCE);
    document.push_str(description);
    Ok(Some(document))
}
