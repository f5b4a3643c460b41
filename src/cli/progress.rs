//! Terminal reporter: one progress bar with the log scrolling above it.

use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};

use evharvest::report::{HarvestCounters, LogLine, Reporter, Severity};

pub struct TerminalReporter {
    bar: ProgressBar,
    interactive: bool,
}

impl TerminalReporter {
    pub fn new() -> Self {
        let interactive = Term::stdout().is_term();
        let bar = if interactive {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {msg:20} [{bar:30.cyan/blue}] {pos}/{len} {prefix}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );

        Self { bar, interactive }
    }
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn styled(line: &LogLine) -> String {
    let text = style(&line.message);
    match line.severity {
        Severity::Info => text.white(),
        Severity::Success => text.green(),
        Severity::Warning => text.yellow(),
        Severity::Error => text.red(),
    }
    .to_string()
}

fn counters_label(counters: &HarvestCounters) -> String {
    format!(
        "new {} · updated {} · duplicate {}",
        counters.new, counters.updated, counters.duplicated
    )
}

impl Reporter for TerminalReporter {
    fn log(&mut self, line: &LogLine) {
        if self.interactive {
            self.bar.println(styled(line));
        } else {
            println!("{}", line.message);
        }
    }

    fn progress(&mut self, index: usize, total: usize, label: &str) {
        self.bar.set_length(total as u64);
        self.bar.set_position(index as u64);
        self.bar.set_message(label.to_string());
    }

    fn counters(&mut self, counters: &HarvestCounters) {
        self.bar.set_prefix(counters_label(counters));
    }

    /// Clear the bar so the summary prints on a clean line.
    fn finish(&mut self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_label() {
        let counters = HarvestCounters {
            new: 2,
            updated: 1,
            duplicated: 0,
        };
        assert_eq!(counters_label(&counters), "new 2 · updated 1 · duplicate 0");
    }

    #[test]
    fn test_styled_keeps_message() {
        let line = LogLine::new(Severity::Warning, "Archiving file a.md");
        assert!(styled(&line).contains("Archiving file a.md"));
    }
}
