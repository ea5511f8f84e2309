//! Console summary of a finished run

use crate::executor::RunOutcome;
use colored::Colorize;

/// Renders a short human-readable report of a run
pub struct RunSummaryFormatter {
    use_color: bool,
}

impl RunSummaryFormatter {
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    pub fn format(&self, outcome: &RunOutcome) -> String {
        let mut lines = Vec::new();

        lines.push(self.heading("Load Test Results"));
        lines.push(format!(
            "  Workers: {} harvested of {}, {} iterations each",
            outcome.workers_harvested, outcome.worker_count, outcome.iterations_per_worker
        ));
        lines.push(format!(
            "  Measurements: {} (failed calls: {})",
            outcome.measurements, outcome.failed_requests
        ));

        if let Some((first, last)) = outcome.series.span() {
            lines.push(format!(
                "  Seconds observed: {} ({} to {})",
                outcome.series.len(),
                first,
                last
            ));
        }

        let stats = &outcome.statistics;
        lines.push(format!(
            "  Duration: min={:.3}ms max={:.3}ms avg={:.3}ms std={:.3}ms",
            stats.min * 1000.0,
            stats.max * 1000.0,
            stats.mean_ms(),
            stats.stddev_ms()
        ));

        if outcome.failed_requests > 0 {
            lines.push(self.warning(&format!(
                "  Note: {} failed calls are included in the duration statistics",
                outcome.failed_requests
            )));
        }

        if outcome.interrupted {
            lines.push(self.warning("  Run was interrupted; results are partial"));
        }

        lines.push(format!("  CSV:  {}", outcome.files.csv.display()));
        lines.push(format!("  Stat: {}", outcome.files.stat.display()));

        lines.join("\n")
    }

    fn heading(&self, text: &str) -> String {
        if self.use_color {
            text.bold().green().to_string()
        } else {
            text.to_string()
        }
    }

    fn warning(&self, text: &str) -> String {
        if self.use_color {
            text.yellow().to_string()
        } else {
            text.to_string()
        }
    }
}
