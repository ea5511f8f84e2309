//! Persistence of run results
//!
//! Two files per run, named from the run parameters so that plotting tools can
//! find them: `test_<workers>_<iterations>.csv` holds one `second,count` line
//! per observed second, `test_<workers>_<iterations>.stat` holds the four
//! duration statistics.

mod summary;

pub use summary::RunSummaryFormatter;

use crate::{
    error::{ErrorContext, Result},
    models::metrics::{AggregatedSeries, DurationStatistics},
};
use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

/// Paths of the files written for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFiles {
    pub csv: PathBuf,
    pub stat: PathBuf,
}

/// Writes the series CSV and the statistics report
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputWriter;

impl OutputWriter {
    pub fn new() -> Self {
        Self
    }

    /// File stem shared by both outputs
    pub fn file_stem(worker_count: u32, iterations_per_worker: u32) -> String {
        format!("test_{}_{}", worker_count, iterations_per_worker)
    }

    /// Deterministic output paths under `output_dir`
    pub fn output_files(output_dir: &Path, worker_count: u32, iterations_per_worker: u32) -> OutputFiles {
        let stem = Self::file_stem(worker_count, iterations_per_worker);
        OutputFiles {
            csv: output_dir.join(format!("{}.csv", stem)),
            stat: output_dir.join(format!("{}.stat", stem)),
        }
    }

    /// Write both files
    pub fn write(
        &self,
        output_dir: &Path,
        series: &AggregatedSeries,
        stats: &DurationStatistics,
        worker_count: u32,
        iterations_per_worker: u32,
    ) -> Result<OutputFiles> {
        let files = Self::output_files(output_dir, worker_count, iterations_per_worker);
        self.write_series_to(&files.csv, series)?;
        self.write_statistics_to(&files.stat, stats)?;
        Ok(files)
    }

    /// Write only the CSV, for runs whose statistics are undefined
    pub fn write_series(
        &self,
        output_dir: &Path,
        series: &AggregatedSeries,
        worker_count: u32,
        iterations_per_worker: u32,
    ) -> Result<PathBuf> {
        let files = Self::output_files(output_dir, worker_count, iterations_per_worker);
        self.write_series_to(&files.csv, series)?;
        Ok(files.csv)
    }

    fn write_series_to(&self, path: &Path, series: &AggregatedSeries) -> Result<()> {
        let mut out = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;

        for (second, count) in series.iter() {
            writeln!(out, "{},{}", second, count)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            out.flush()?;
        }

        out.sync_all()
            .with_context(|| format!("Failed to sync {}", path.display()))?;
        Ok(())
    }

    fn write_statistics_to(&self, path: &Path, stats: &DurationStatistics) -> Result<()> {
        let mut out = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;

        for line in stats.to_report_lines() {
            writeln!(out, "{}", line)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }

        out.flush()?;
        out.sync_all()
            .with_context(|| format!("Failed to sync {}", path.display()))?;
        Ok(())
    }
}
