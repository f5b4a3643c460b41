//! Reporting capability: log lines, progress and counters.
//!
//! The orchestrator pushes snapshots into a [`Reporter`]; it never reads
//! anything back, so a terminal display, a test recorder or nothing at all
//! can sit behind it.

use serde::Serialize;

/// Severity / colour hint for a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// White.
    Info,
    /// Green.
    Success,
    /// Yellow.
    Warning,
    /// Red.
    Error,
}

/// One append-only log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    pub severity: Severity,
    pub message: String,
}

impl LogLine {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

/// Per-run classification counts. Skipped items are never counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HarvestCounters {
    pub new: usize,
    pub updated: usize,
    pub duplicated: usize,
}

impl HarvestCounters {
    pub fn total(&self) -> usize {
        self.new + self.updated + self.duplicated
    }
}

/// Sink for run progress.
pub trait Reporter {
    /// Append a log line.
    fn log(&mut self, line: &LogLine);

    /// `index` of `total` items done in the current phase.
    fn progress(&mut self, index: usize, total: usize, label: &str);

    /// Latest counters snapshot.
    fn counters(&mut self, _counters: &HarvestCounters) {}

    /// Called once when the run is over.
    fn finish(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_total() {
        let counters = HarvestCounters {
            new: 2,
            updated: 1,
            duplicated: 3,
        };
        assert_eq!(counters.total(), 6);
        assert_eq!(HarvestCounters::default().total(), 0);
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        let line = LogLine::new(Severity::Warning, "Archiving file a.md");
        assert_eq!(
            serde_json::to_string(&line).unwrap(),
            r#"{"severity":"warning","message":"Archiving file a.md"}"#
        );
    }
}
