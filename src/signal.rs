use crate::error::RowError;
use crate::types::{DecodedLead, SourceRow};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Decoded leads of one record laid out as columns.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalTable {
    columns: Vec<String>,
    samples: Vec<Vec<i64>>,
}

impl SignalTable {
    /// Build a table with one column per lead, in lead order.
    ///
    /// A repeated lead id replaces the earlier column's samples but keeps its
    /// position. All columns must have the same length.
    pub fn from_leads(leads: Vec<DecodedLead>) -> Result<Self, RowError> {
        let mut columns: Vec<String> = Vec::with_capacity(leads.len());
        let mut samples: Vec<Vec<i64>> = Vec::with_capacity(leads.len());

        for lead in leads {
            match columns.iter().position(|c| *c == lead.lead_id) {
                Some(index) => samples[index] = lead.samples,
                None => {
                    columns.push(lead.lead_id);
                    samples.push(lead.samples);
                }
            }
        }

        if columns.is_empty() {
            return Err(RowError::TableAssembly("record has no leads".to_string()));
        }

        let expected = samples[0].len();
        if let Some(index) = samples.iter().position(|column| column.len() != expected) {
            return Err(RowError::TableAssembly(format!(
                "lead '{}' has {} samples but lead '{}' has {}",
                columns[index],
                samples[index].len(),
                columns[0],
                expected
            )));
        }

        Ok(Self { columns, samples })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of sample rows.
    pub fn row_count(&self) -> usize {
        self.samples.first().map_or(0, Vec::len)
    }

    /// Write the table as CSV: a header of lead ids, then one line per
    /// sample index. An existing file is overwritten.
    pub fn write_csv(&self, path: &Path) -> Result<(), RowError> {
        let write_error = |err: csv::Error| RowError::OutputWrite {
            path: path.display().to_string(),
            message: err.to_string(),
        };

        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_path(path)
            .map_err(write_error)?;

        writer.write_record(&self.columns).map_err(write_error)?;
        for row in 0..self.row_count() {
            writer
                .write_record(self.samples.iter().map(|column| column[row].to_string()))
                .map_err(write_error)?;
        }
        writer.flush().map_err(|err| RowError::OutputWrite {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;

        debug!(
            "Wrote {} rows x {} leads to {}",
            self.row_count(),
            self.columns.len(),
            path.display()
        );
        Ok(())
    }
}

/// `save_dir/{subject_id}_{normalized_datetime}.csv`
///
/// The file name must stay inside `save_dir`, so identities containing path
/// separators are rejected.
pub fn output_path(save_dir: &Path, row: &SourceRow) -> Result<PathBuf, RowError> {
    let file_name = row.output_file_name();
    if file_name.contains(['/', '\\', '\0']) {
        return Err(RowError::RecordParse(format!(
            "output file name '{file_name}' contains a path separator"
        )));
    }
    Ok(save_dir.join(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn lead(id: &str, samples: &[i64]) -> DecodedLead {
        DecodedLead {
            lead_id: id.to_string(),
            samples: samples.to_vec(),
        }
    }

    #[test]
    fn writes_header_and_aligned_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("42_20240102_030405.csv");
        let table =
            SignalTable::from_leads(vec![lead("I", &[1, -2, 50]), lead("II", &[3, 4, -5])])
                .unwrap();

        table.write_csv(&path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "I,II\n1,3\n-2,4\n50,-5\n");
    }

    #[test]
    fn overwrites_existing_output() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "stale content that is longer than the new table\n").unwrap();

        SignalTable::from_leads(vec![lead("I", &[7])])
            .unwrap()
            .write_csv(&path)
            .unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "I\n7\n");
    }

    #[test]
    fn unequal_columns_fail_assembly() {
        let err = SignalTable::from_leads(vec![lead("I", &[1, 2]), lead("II", &[1])]).unwrap_err();
        assert!(matches!(err, RowError::TableAssembly(_)));
        assert!(err.to_string().contains("'II'"));
    }

    #[test]
    fn repeated_lead_keeps_first_position_and_last_samples() {
        let table = SignalTable::from_leads(vec![
            lead("I", &[1]),
            lead("II", &[2]),
            lead("I", &[3]),
        ])
        .unwrap();
        assert_eq!(table.columns(), ["I".to_string(), "II".to_string()]);

        let dir = tempdir().unwrap();
        let path = dir.path().join("dup.csv");
        table.write_csv(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "I,II\n3,2\n");
    }

    #[test]
    fn empty_leads_write_header_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        let table = SignalTable::from_leads(vec![lead("I", &[]), lead("II", &[])]).unwrap();
        assert_eq!(table.row_count(), 0);

        table.write_csv(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "I,II\n");
    }

    #[test]
    fn missing_directory_is_an_output_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");
        let err = SignalTable::from_leads(vec![lead("I", &[1])])
            .unwrap()
            .write_csv(&path)
            .unwrap_err();
        assert!(matches!(err, RowError::OutputWrite { .. }));
    }

    #[test]
    fn output_path_uses_normalized_identity() {
        let row = SourceRow {
            subject_id: "42".to_string(),
            measured_datetime: "2024-01-02 03:04:05.678".to_string(),
            waveform_raw: String::new(),
        };
        assert_eq!(
            output_path(Path::new("out"), &row).unwrap(),
            Path::new("out").join("42_20240102_030405.csv")
        );
    }

    #[test]
    fn output_path_rejects_separators() {
        for subject_id in ["../42", "/tmp/42", "a\\b"] {
            let row = SourceRow {
                subject_id: subject_id.to_string(),
                measured_datetime: "2024-01-02 03:04:05".to_string(),
                waveform_raw: String::new(),
            };
            let err = output_path(Path::new("out"), &row).unwrap_err();
            assert!(matches!(err, RowError::RecordParse(_)), "{subject_id}");
        }
    }
}
