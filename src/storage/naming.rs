//! Stable, filesystem-safe document names.
//!
//! The derived name is the primary key of the file store: two events with the
//! same title and start date share a file, and the later write wins.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::EventRecord;

/// Explicit transliteration table, applied after lower-casing.
const TRANSLITERATIONS: &[(char, char)] = &[('ä', 'a'), ('å', 'a'), ('ö', 'o')];

/// Characters that become word separators.
const SEPARATORS: &[char] = &[' ', '"', '\'', '&', '/', '\\', '?', ':', '!', '-', '#'];

const EN_DASH: char = '\u{2013}';

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static HYPHEN_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{2,}").expect("valid regex"));

/// Character repertoire the final name is re-encoded into.
///
/// Characters outside the repertoire are dropped rather than failing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilenameEncoding {
    Utf8,
    /// ISO-8859-1: code points up to U+00FF.
    #[default]
    Latin1,
    Ascii,
}

impl FilenameEncoding {
    fn can_encode(self, c: char) -> bool {
        match self {
            FilenameEncoding::Utf8 => true,
            FilenameEncoding::Latin1 => (c as u32) <= 0xFF,
            FilenameEncoding::Ascii => c.is_ascii(),
        }
    }

    /// Drop every character this encoding cannot represent.
    pub fn encode_lossy(self, s: &str) -> String {
        s.chars().filter(|c| self.can_encode(*c)).collect()
    }
}

/// Turn an event title into a hyphenated slug.
pub fn sanitize_title(title: &str) -> String {
    let lowered: String = title
        .to_lowercase()
        .chars()
        .map(|c| {
            TRANSLITERATIONS
                .iter()
                .find(|(from, _)| *from == c)
                .map_or(c, |(_, to)| *to)
        })
        .map(|c| {
            if SEPARATORS.contains(&c) || c.is_control() {
                ' '
            } else {
                c
            }
        })
        .collect();

    let collapsed = WHITESPACE_RUN.replace_all(&lowered, " ");
    let hyphenated: String = collapsed
        .replace(' ', "-")
        .chars()
        .filter(|c| *c != '(' && *c != ')')
        .map(|c| if c == EN_DASH { '-' } else { c })
        .collect();

    HYPHEN_RUN
        .replace_all(&hyphenated, "-")
        .trim_matches('-')
        .to_string()
}

/// Derive the stored document name for `record`.
///
/// Returns `None` when the record has no usable title or start time.
pub fn derive_filename(
    record: &EventRecord,
    extension: &str,
    encoding: FilenameEncoding,
) -> Option<String> {
    let title = record.usable_title()?;
    let date = record.start()?.format("%Y-%m-%d").to_string();

    let slug = encoding.encode_lossy(&sanitize_title(title));
    let slug = HYPHEN_RUN.replace_all(&slug, "-");
    let slug = slug.trim_matches('-');

    let name = if slug.is_empty() {
        format!("{}.{}", date, extension)
    } else {
        format!("{}-{}.{}", date, slug, extension)
    };
    Some(name)
}
