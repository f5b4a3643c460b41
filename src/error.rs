//! Error types for the harvest pipeline.
//!
//! A missing JSON field is never an error here: extractors model it as
//! `Option::None`. Everything below is either caught at the smallest unit
//! (one source, one event, one record) or, for `InputMissing` and `Store`,
//! aborts before any page is rendered.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for harvest operations.
pub type Result<T> = std::result::Result<T, HarvestError>;

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Timed out after {timeout_secs}s waiting for \"{marker}\" on {url}")]
    RenderTimeout {
        url: String,
        marker: String,
        timeout_secs: u64,
    },

    #[error("Failed to render {url}: {message}")]
    RenderFailure { url: String, message: String },

    #[error("Invalid payload in {context}: {source}")]
    ParseFailure {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render document for {url}: {source}")]
    Document {
        url: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("File {} can't be found", .0.display())]
    InputMissing(PathBuf),

    #[error("Invalid source \"{source_line}\": {message}")]
    InvalidSource {
        source_line: String,
        message: String,
    },

    #[error("Event store error at {}: {source}", .path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl HarvestError {
    /// Shorthand for a render failure on `url`.
    pub fn render(url: impl Into<String>, message: impl std::fmt::Display) -> Self {
        HarvestError::RenderFailure {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error stops the run instead of skipping one item.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HarvestError::InputMissing(_) | HarvestError::Store { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_kinds() {
        assert!(HarvestError::InputMissing(PathBuf::from("sources.txt")).is_fatal());
        assert!(!HarvestError::render("https://example.com", "boom").is_fatal());
        assert!(!HarvestError::RenderTimeout {
            url: "https://example.com".into(),
            marker: "actions_renderer".into(),
            timeout_secs: 5,
        }
        .is_fatal());
    }

    #[test]
    fn test_input_missing_message() {
        let err = HarvestError::InputMissing(PathBuf::from("pages.txt"));
        assert_eq!(err.to_string(), "File pages.txt can't be found");
    }
}
