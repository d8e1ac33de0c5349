//! The per-row pipeline: parse, decode every lead, assemble, write.

use crate::decoder::decode_lead;
use crate::error::RowError;
use crate::parser::parse_record;
use crate::signal::{output_path, SignalTable};
use crate::types::{DecodedLead, SourceRow};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

/// What happened to one source row.
#[derive(Debug)]
pub enum RowOutcome {
    Written { path: PathBuf, leads: usize, samples: usize },
    /// The record carried no lead data.
    Skipped { file_name: String },
    Failed(RowFailure),
}

#[derive(Debug)]
pub struct RowFailure {
    pub position: usize,
    /// Known once the row's identity fields were read.
    pub file_name: Option<String>,
    pub error: RowError,
}

impl fmt::Display for RowFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file_name {
            Some(file_name) => write!(f, "{} / {} : {}", self.position, file_name, self.error),
            None => write!(f, "{} : {}", self.position, self.error),
        }
    }
}

/// Run one row through the pipeline. Every failure is returned as
/// [`RowOutcome::Failed`]; nothing here aborts the batch.
pub fn process_row(
    position: usize,
    row: Result<SourceRow, RowError>,
    save_dir: &Path,
) -> RowOutcome {
    let row = match row {
        Ok(row) => row,
        Err(error) => {
            return RowOutcome::Failed(RowFailure {
                position,
                file_name: None,
                error,
            })
        }
    };

    let file_name = row.output_file_name();
    info!("Processing {}", file_name);

    match decode_and_write(&row, save_dir) {
        Ok(Some(written)) => written,
        Ok(None) => RowOutcome::Skipped { file_name },
        Err(error) => RowOutcome::Failed(RowFailure {
            position,
            file_name: Some(file_name),
            error,
        }),
    }
}

fn decode_and_write(row: &SourceRow, save_dir: &Path) -> Result<Option<RowOutcome>, RowError> {
    let record = parse_record(row)?;
    if !record.has_leads() {
        return Ok(None);
    }
    let path = output_path(save_dir, row)?;

    // All or nothing: one bad lead fails the row
    let leads = record
        .leads
        .iter()
        .map(decode_lead)
        .collect::<Result<Vec<DecodedLead>, _>>()?;

    let table = SignalTable::from_leads(leads)?;
    table.write_csv(&path)?;

    Ok(Some(RowOutcome::Written {
        path,
        leads: table.columns().len(),
        samples: table.row_count(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use std::fs;
    use tempfile::tempdir;

    fn row(waveform_raw: String) -> SourceRow {
        SourceRow {
            subject_id: "42".to_string(),
            measured_datetime: "2024-01-02 03:04:05.678".to_string(),
            waveform_raw,
        }
    }

    fn payload(samples: &[i16]) -> String {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn writes_decoded_record() {
        let dir = tempdir().unwrap();
        let raw = format!(
            "{{'LeadData': [{{'LeadID': 'I', 'WaveFormData': '{}', 'LeadAmplitudeUnitsPerBit': 0.5}}]}}",
            payload(&[2, -5, 100])
        );

        let outcome = process_row(0, Ok(row(raw)), dir.path());

        match outcome {
            RowOutcome::Written {
                path,
                leads,
                samples,
            } => {
                assert_eq!(path, dir.path().join("42_20240102_030405.csv"));
                assert_eq!((leads, samples), (1, 3));
                assert_eq!(fs::read_to_string(path).unwrap(), "I\n1\n-2\n50\n");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn empty_lead_data_is_skipped() {
        let dir = tempdir().unwrap();
        let outcome = process_row(3, Ok(row("{'LeadData': []}".to_string())), dir.path());
        assert!(matches!(outcome, RowOutcome::Skipped { .. }));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn one_bad_lead_fails_the_whole_row() {
        let dir = tempdir().unwrap();
        let raw = format!(
            "{{'LeadData': [\
               {{'LeadID': 'I', 'WaveFormData': '{}', 'LeadAmplitudeUnitsPerBit': 1}},\
               {{'LeadID': 'II', 'WaveFormData': 'AQID', 'LeadAmplitudeUnitsPerBit': 1}}\
             ]}}",
            payload(&[1, 2])
        );

        let outcome = process_row(5, Ok(row(raw)), dir.path());

        match outcome {
            RowOutcome::Failed(failure) => {
                assert_eq!(failure.position, 5);
                assert_eq!(failure.file_name.as_deref(), Some("42_20240102_030405.csv"));
                assert!(matches!(failure.error, RowError::LeadDecode { .. }));
                assert!(failure.to_string().starts_with("5 / 42_20240102_030405.csv : "));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn unreadable_row_fails_without_file_name() {
        let dir = tempdir().unwrap();
        let outcome = process_row(
            9,
            Err(RowError::RecordParse("malformed source row".to_string())),
            dir.path(),
        );
        match outcome {
            RowOutcome::Failed(failure) => {
                assert!(failure.file_name.is_none());
                assert_eq!(failure.to_string(), "9 : record parse failed: malformed source row");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn identity_with_path_separator_fails_the_row() {
        let dir = tempdir().unwrap();
        let raw = format!(
            "{{'LeadData': [{{'LeadID': 'I', 'WaveFormData': '{}', 'LeadAmplitudeUnitsPerBit': 1}}]}}",
            payload(&[1])
        );
        let mut source = row(raw);
        source.subject_id = "../escape".to_string();

        match process_row(1, Ok(source), dir.path()) {
            RowOutcome::Failed(failure) => {
                assert!(matches!(failure.error, RowError::RecordParse(_)));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(!dir.path().parent().unwrap().join("escape_20240102_030405.csv").exists());
    }
}
