use crate::constants::OUTPUT_EXTENSION;
use serde::{Deserialize, Serialize};

/// One row of the tabular export.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceRow {
    pub subject_id: String,
    pub measured_datetime: String,
    pub waveform_raw: String,
}

impl SourceRow {
    /// `{subject_id}_{normalized_datetime}.csv`
    pub fn output_file_name(&self) -> String {
        format!(
            "{}_{}.{}",
            self.subject_id,
            normalize_datetime(&self.measured_datetime),
            OUTPUT_EXTENSION
        )
    }
}

/// Strips `-` and `:`, drops everything from the first `.` on, and replaces
/// spaces with `_`.
///
/// `"2024-01-02 03:04:05.678"` becomes `"20240102_030405"`.
pub fn normalize_datetime(raw: &str) -> String {
    let stripped: String = raw.chars().filter(|c| *c != '-' && *c != ':').collect();
    let whole_seconds = stripped.split('.').next().unwrap_or_default();
    whole_seconds.replace(' ', "_")
}

/// A single lead channel as found in `LeadData`, not yet decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadPayload {
    pub lead_id: String,
    /// Base64 text of little-endian i16 samples.
    pub waveform_data: String,
    /// Scale factor as written in the source; parsed by the decoder.
    pub units_per_bit: String,
}

/// Parsed form of a source row.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformRecord {
    pub subject_id: String,
    pub measured_datetime: String,
    pub leads: Vec<LeadPayload>,
}

impl WaveformRecord {
    pub fn has_leads(&self) -> bool {
        !self.leads.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedLead {
    pub lead_id: String,
    pub samples: Vec<i64>,
}
