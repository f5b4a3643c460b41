//! Event page extraction.

use serde_json::Value;
use tracing::{debug, info};

use super::{marked_payloads, ExtractionConfig};
use crate::error::Result;
use crate::models::EventRecord;
use crate::render::{RenderedPage, Renderer};

/// Render one event page and read whatever fields it offers.
///
/// Missing fields stay `None`; only a render failure is an error.
pub async fn extract_event(
    renderer: &mut dyn Renderer,
    url: &str,
    cfg: &ExtractionConfig,
) -> Result<EventRecord> {
    let page = renderer.render(url).await?;
    let result = read_event(page.as_ref(), cfg).await;
    page.close().await;
    result
}

async fn read_event(page: &dyn RenderedPage, cfg: &ExtractionConfig) -> Result<EventRecord> {
    let mut record = EventRecord::new(page.url());
    record.title = page.meta_attribute(&cfg.title_property).await?;

    let descriptions = marked_payloads(page, &cfg.description_marker).await?;
    match descriptions.iter().find_map(|payload| find_event(payload, cfg)) {
        Some(event) => apply_event_fields(&mut record, event, cfg),
        None => debug!("No event object on {}", page.url()),
    }

    let timestamps = marked_payloads(page, &cfg.timestamp_marker).await?;
    let data: Vec<&Value> = timestamps
        .iter()
        .filter_map(|payload| cfg.timestamps_path.resolve(payload))
        .collect();
    record.start_timestamp = data.iter().find_map(|d| cfg.start_path.resolve_i64(d));
    record.end_timestamp = data.iter().find_map(|d| cfg.end_path.resolve_i64(d));

    info!("Read event \"{}\" from {}", record.label(), page.url());
    Ok(record)
}

/// First candidate in `payload` that carries an event object.
fn find_event<'v>(payload: &'v Value, cfg: &ExtractionConfig) -> Option<&'v Value> {
    cfg.candidates_path
        .resolve_array(payload)?
        .iter()
        .find_map(|candidate| cfg.candidate_event_path.resolve(candidate))
}

fn apply_event_fields(record: &mut EventRecord, event: &Value, cfg: &ExtractionConfig) {
    record.description = cfg.description_path.resolve_str(event).map(str::to_string);
    record.organiser = cfg.organiser_path.resolve_str(event).map(str::to_string);

    let line = cfg.address_path.resolve_str(event).unwrap_or_default();
    let [street, postal, country] = split_address(line);
    record.street_address = Some(street);
    record.post_address = Some(postal);
    record.country = Some(country);
}

/// Split a one-line address on commas into street, postal and country.
///
/// Parts beyond the third are dropped; missing parts are empty.
pub fn split_address(line: &str) -> [String; 3] {
    let mut parts = line.split(',').map(str::trim);
    std::array::from_fn(|_| parts.next().unwrap_or_default().to_string())
}
