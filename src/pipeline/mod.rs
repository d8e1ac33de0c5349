//! Decoding pipeline: chunked ingestion, per-row processing, failure isolation.

mod row;
mod source;

pub use row::{process_row, RowFailure, RowOutcome};
pub use source::{Chunk, SourceEntry, SourceReader};

use crate::config::Config;
use crate::constants::{DIAGNOSTIC_LOG_FILE, MAX_REPORTED_ERRORS};
use crate::diagnostics::DiagnosticLog;
use crate::error::{Result, WaveformError};
use crate::metrics::PipelineMetrics;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};

/// Summary of a complete run
#[derive(Debug, Default, Serialize)]
pub struct PipelineResult {
    pub total_rows: usize,
    pub written_rows: usize,
    pub skipped_rows: usize,
    pub failed_rows: usize,
    pub chunks: usize,
    /// First failure descriptions of the run; the full list is in the
    /// diagnostic log.
    pub errors: Vec<String>,
    /// Failures not kept in `errors`.
    pub errors_truncated: usize,
}

pub struct Pipeline {
    config: Config,
    diagnostics: DiagnosticLog,
}

impl Pipeline {
    /// Pipeline logging failures to `bug.txt` in the working directory.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_diagnostic_log(config, DIAGNOSTIC_LOG_FILE)
    }

    pub fn with_diagnostic_log<P: AsRef<Path>>(config: Config, log_path: P) -> Result<Self> {
        config.validate()?;
        let log_path = log_path.as_ref();
        let diagnostics = DiagnosticLog::open(log_path).map_err(|e| {
            WaveformError::Config(format!(
                "Failed to open diagnostic log '{}': {}",
                log_path.display(),
                e
            ))
        })?;
        Ok(Self {
            config,
            diagnostics,
        })
    }

    /// Decode every row of the source into per-record CSV files.
    ///
    /// Only an unreadable source aborts the run. Row failures are appended to
    /// the diagnostic log and counted in the result.
    #[instrument(skip(self), fields(source = %self.config.source_path.display()))]
    pub fn run(&mut self) -> Result<PipelineResult> {
        info!(
            "Starting decode of {} into {} (chunk size {})",
            self.config.source_path.display(),
            self.config.save_dir.display(),
            self.config.chunk_size
        );

        let mut source = SourceReader::open(&self.config.source_path, self.config.chunk_size)
            .map_err(|e| {
                error!("Error reading source: {}", e);
                e
            })?;

        let mut result = PipelineResult::default();
        while let Some(chunk) = source.next_chunk()? {
            let rows_in_chunk = chunk.rows.len();
            for entry in chunk.rows {
                result.total_rows += 1;
                let outcome = process_row(entry.position, entry.row, &self.config.save_dir);
                self.handle_outcome(outcome, &mut result);
            }

            result.chunks += 1;
            PipelineMetrics::record_chunk(rows_in_chunk);
            info!(
                "Chunk {} processed ({} rows, {} total)",
                chunk.index, rows_in_chunk, result.total_rows
            );
        }

        info!(
            "Decoded {} rows: {} written, {} skipped, {} failed",
            result.total_rows, result.written_rows, result.skipped_rows, result.failed_rows
        );
        if let Some(path) = self.diagnostics.path() {
            info!(
                "{} diagnostic entries appended to {}",
                self.diagnostics.entries(),
                path.display()
            );
        }
        Ok(result)
    }

    fn handle_outcome(&mut self, outcome: RowOutcome, result: &mut PipelineResult) {
        match outcome {
            RowOutcome::Written {
                path,
                leads,
                samples,
            } => {
                debug!(
                    "Wrote {} ({} leads x {} samples)",
                    path.display(),
                    leads,
                    samples
                );
                PipelineMetrics::record_row_written();
                result.written_rows += 1;
            }
            RowOutcome::Skipped { file_name } => {
                debug!("Skipped {}: no lead data", file_name);
                PipelineMetrics::record_row_skipped();
                result.skipped_rows += 1;
            }
            RowOutcome::Failed(failure) => {
                warn!("{} raised error : {}", failure.position, failure.error);
                PipelineMetrics::record_row_failed(failure.error.kind());
                self.diagnostics.record(&failure);
                result.failed_rows += 1;
                if result.errors.len() < MAX_REPORTED_ERRORS {
                    result.errors.push(failure.to_string());
                } else {
                    result.errors_truncated += 1;
                }
            }
        }
    }
}
