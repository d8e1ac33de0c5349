//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade. Nothing is exported unless the
//! embedding application installs a recorder.

use metrics::{counter, histogram};

/// Row, chunk and lead level metrics for a decoding run
pub struct PipelineMetrics;

impl PipelineMetrics {
    pub fn record_row_written() {
        counter!("waveform_rows_total", "outcome" => "written").increment(1);
    }

    pub fn record_row_skipped() {
        counter!("waveform_rows_total", "outcome" => "skipped").increment(1);
    }

    pub fn record_row_failed(kind: &'static str) {
        counter!("waveform_rows_total", "outcome" => "failed").increment(1);
        counter!("waveform_row_errors_total", "kind" => kind).increment(1);
    }

    pub fn record_chunk(rows: usize) {
        counter!("waveform_chunks_total").increment(1);
        histogram!("waveform_chunk_rows").record(rows as f64);
    }

    pub fn record_lead_samples(samples: usize) {
        histogram!("waveform_lead_samples").record(samples as f64);
    }
}

/// Diagnostic log health
pub struct DiagnosticLogMetrics;

impl DiagnosticLogMetrics {
    pub fn record_write_success(bytes: usize) {
        counter!("waveform_diagnostic_writes_total", "result" => "ok").increment(1);
        histogram!("waveform_diagnostic_write_bytes").record(bytes as f64);
    }

    pub fn record_write_error() {
        counter!("waveform_diagnostic_writes_total", "result" => "error").increment(1);
    }
}
