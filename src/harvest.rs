//! Harvest orchestration.
//!
//! One run is: rollover, then every source's listing, then every event's
//! details and synchronisation. Only a fatal error stops the run; a failing
//! source or event is logged and skipped.

use std::collections::HashSet;
use std::path::Path;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::NamingConfig;
use crate::error::{HarvestError, Result};
use crate::extract::{extract_event, extract_event_urls, listing_url, ExtractionConfig};
use crate::models::{render_document, EventRecord, EventRef};
use crate::render::Renderer;
use crate::report::{HarvestCounters, LogLine, Reporter, Severity};
use crate::storage::{derive_filename, EventStore, SyncOutcome};

pub const LABEL_ARCHIVING: &str = "Archiving old files";
pub const LABEL_SOURCES: &str = "Loading sources";
pub const LABEL_EVENTS: &str = "Loading events";
pub const LABEL_DONE: &str = "Done";

/// Outcome of one harvest run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestSummary {
    pub counters: HarvestCounters,
    pub log: Vec<LogLine>,
    /// Files moved into the archive by the rollover.
    pub archived: usize,
    pub failed_sources: usize,
    pub failed_events: usize,
    /// Records without a title or start time.
    pub skipped: usize,
    pub write_failures: usize,
}

/// Read the source list: one URL per line, trimmed, blank lines ignored.
pub fn read_sources(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|_| HarvestError::InputMissing(path.to_path_buf()))?;

    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Drives one harvest over a renderer and a store.
pub struct Harvester<R: Renderer> {
    renderer: R,
    store: EventStore,
    extraction: ExtractionConfig,
    naming: NamingConfig,
    now: Option<i64>,
}

impl<R: Renderer> Harvester<R> {
    pub fn new(renderer: R, store: EventStore) -> Self {
        Self {
            renderer,
            store,
            extraction: ExtractionConfig::default(),
            naming: NamingConfig::default(),
            now: None,
        }
    }

    pub fn with_extraction(mut self, extraction: ExtractionConfig) -> Self {
        self.extraction = extraction;
        self
    }

    pub fn with_naming(mut self, naming: NamingConfig) -> Self {
        self.naming = naming;
        self
    }

    /// Pin "now" (epoch seconds) for the upcoming-event filter.
    pub fn with_now(mut self, now: i64) -> Self {
        self.now = Some(now);
        self
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    /// Run a full harvest over `sources`.
    ///
    /// Returns `Err` only for a fatal store error. The renderer is shut down
    /// either way.
    pub async fn run(
        &mut self,
        sources: &[String],
        reporter: &mut dyn Reporter,
    ) -> Result<HarvestSummary> {
        let mut run = Run {
            summary: HarvestSummary::default(),
            reporter,
        };
        let result = self.run_phases(sources, &mut run).await;
        self.renderer.shutdown().await;
        result.map(|()| run.summary)
    }

    async fn run_phases(&mut self, sources: &[String], run: &mut Run<'_>) -> Result<()> {
        run.summary.archived = self.store.rollover(|name, index, total| {
            run.log(Severity::Warning, format!("Archiving file {}", name));
            run.progress(index + 1, total, LABEL_ARCHIVING);
        })?;

        let events = self.collect_events(sources, run).await;
        info!("{} unique upcoming events", events.len());

        let total = events.len();
        for (index, event) in events.iter().enumerate() {
            match extract_event(&mut self.renderer, &event.url, &self.extraction).await {
                Ok(record) => self.store_record(&record, run)?,
                Err(e) => {
                    run.summary.failed_events += 1;
                    run.fail(format!("Error loading event {}", event.url), &e);
                }
            }
            run.progress(index + 1, total, LABEL_EVENTS);
            run.counters();
        }

        run.log(Severity::Success, "Done fetching events, press ESC to exit.");
        run.progress(1, 1, LABEL_DONE);
        run.counters();
        Ok(())
    }

    /// Listing phase. Duplicate URLs across sources keep their first position.
    async fn collect_events(&mut self, sources: &[String], run: &mut Run<'_>) -> Vec<EventRef> {
        let now = self.now.unwrap_or_else(|| Utc::now().timestamp());
        let mut seen = HashSet::new();
        let mut events = Vec::new();

        let total = sources.len();
        for (index, source) in sources.iter().enumerate() {
            match self.fetch_source(source, now).await {
                Ok(found) => {
                    run.log(Severity::Info, format!("Loading source {}", source));
                    events.extend(found.into_iter().filter(|e| seen.insert(e.url.clone())));
                }
                Err(e) => {
                    run.summary.failed_sources += 1;
                    run.fail(format!("Error loading source {}", source), &e);
                }
            }
            run.progress(index + 1, total, LABEL_SOURCES);
        }

        events
    }

    async fn fetch_source(&mut self, source: &str, now: i64) -> Result<Vec<EventRef>> {
        let url = listing_url(source)?;
        extract_event_urls(&mut self.renderer, &url, &self.extraction, now).await
    }

    /// Synchronise one record. Only a fatal store error escapes.
    fn store_record(&self, record: &EventRecord, run: &mut Run<'_>) -> Result<()> {
        let Some(file_name) = derive_filename(record, &self.naming.extension, self.naming.encoding)
        else {
            run.summary.skipped += 1;
            run.log(
                Severity::Warning,
                format!("Skipping event {}", record.source_url),
            );
            return Ok(());
        };

        let document = match render_document(record) {
            Ok(Some(document)) => document,
            Ok(None) => {
                run.summary.skipped += 1;
                run.log(
                    Severity::Warning,
                    format!("Skipping event {}", record.source_url),
                );
                return Ok(());
            }
            Err(source) => {
                run.summary.write_failures += 1;
                let err = HarvestError::Document {
                    url: record.source_url.clone(),
                    source,
                };
                run.fail(format!("Error writing file {}", file_name), &err);
                return Ok(());
            }
        };

        let title = record.label();
        match self.store.sync(&file_name, &document) {
            Ok(SyncOutcome::New) => {
                run.summary.counters.new += 1;
                run.log(Severity::Success, format!("Saved new event {}", title));
            }
            Ok(SyncOutcome::Updated) => {
                run.summary.counters.updated += 1;
                run.log(Severity::Warning, format!("Updating event {}", title));
            }
            Ok(SyncOutcome::Duplicate) => {
                run.summary.counters.duplicated += 1;
                run.log(Severity::Error, format!("Duplicate event {}", title));
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                run.summary.write_failures += 1;
                run.fail(format!("Error writing file {}", file_name), &e);
            }
        }
        Ok(())
    }
}

/// Run-scoped state: the summary under construction and the reporter it is
/// pushed to.
struct Run<'r> {
    summary: HarvestSummary,
    reporter: &'r mut dyn Reporter,
}

impl Run<'_> {
    fn log(&mut self, severity: Severity, message: impl Into<String>) {
        let line = LogLine::new(severity, message);
        info!("{}", line.message);
        self.push(line);
    }

    /// Log a skipped item along with the error that caused it.
    fn fail(&mut self, message: String, error: &HarvestError) {
        warn!("{}: {}", message, error);
        self.push(LogLine::new(Severity::Error, message));
    }

    fn push(&mut self, line: LogLine) {
        self.reporter.log(&line);
        self.summary.log.push(line);
    }

    fn progress(&mut self, index: usize, total: usize, label: &str) {
        self.reporter.progress(index, total, label);
    }

    fn counters(&mut self) {
        self.reporter.counters(&self.summary.counters);
    }
}
