//! Chunked reading of the tabular export.

use crate::constants::required_columns;
use crate::error::{Result, RowError, WaveformError};
use crate::types::SourceRow;
use csv::{StringRecord, Trim};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A row as read from the source. `row` is an error when the row itself is
/// unreadable (bad UTF-8, missing fields); the framing of the file is intact.
#[derive(Debug)]
pub struct SourceEntry {
    /// 0-based data row index across the whole file
    pub position: usize,
    pub row: std::result::Result<SourceRow, RowError>,
}

#[derive(Debug)]
pub struct Chunk {
    /// 1-based
    pub index: usize,
    pub rows: Vec<SourceEntry>,
}

/// Streams the source in chunks of at most `chunk_size` rows. Only the
/// current chunk is held in memory.
pub struct SourceReader {
    path: PathBuf,
    reader: csv::Reader<File>,
    headers: StringRecord,
    chunk_size: usize,
    next_position: usize,
    chunks_read: usize,
    finished: bool,
}

impl SourceReader {
    /// Open the source and validate its header.
    ///
    /// Failing to open the file, read the header, or find a required column
    /// is fatal for the run.
    pub fn open(path: &Path, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(WaveformError::Config(
                "chunk_size must be a positive integer".to_string(),
            ));
        }

        let source_error = |message: String| WaveformError::SourceRead {
            path: path.to_path_buf(),
            message,
        };

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(Trim::All)
            .from_path(path)
            .map_err(|e| source_error(e.to_string()))?;

        let headers = reader
            .headers()
            .map_err(|e| source_error(format!("unreadable header: {e}")))?
            .clone();

        for column in required_columns() {
            if !headers.iter().any(|h| h == column) {
                return Err(source_error(format!("missing required column '{column}'")));
            }
        }
        debug!("Opened source {} with {} columns", path.display(), headers.len());

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            headers,
            chunk_size,
            next_position: 0,
            chunks_read: 0,
            finished: false,
        })
    }

    /// Read the next chunk, or `None` at end of input.
    pub fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        if self.finished {
            return Ok(None);
        }

        let mut rows = Vec::with_capacity(self.chunk_size);
        while rows.len() < self.chunk_size {
            let mut record = StringRecord::new();
            let row = match self.reader.read_record(&mut record) {
                Ok(false) => {
                    self.finished = true;
                    break;
                }
                Ok(true) => record
                    .deserialize::<SourceRow>(Some(&self.headers))
                    .map_err(|e| RowError::RecordParse(format!("malformed source row: {e}"))),
                Err(err) if is_fatal(&err) => {
                    self.finished = true;
                    return Err(WaveformError::SourceRead {
                        path: self.path.clone(),
                        message: err.to_string(),
                    });
                }
                Err(err) => Err(RowError::RecordParse(format!("unreadable source row: {err}"))),
            };
            rows.push(SourceEntry {
                position: self.next_position,
                row,
            });
            self.next_position += 1;
        }

        if rows.is_empty() {
            return Ok(None);
        }
        self.chunks_read += 1;
        Ok(Some(Chunk {
            index: self.chunks_read,
            rows,
        }))
    }
}

impl Iterator for SourceReader {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk().transpose()
    }
}

/// I/O failures mean the stream itself is broken; anything else is confined
/// to the record it was found in.
fn is_fatal(err: &csv::Error) -> bool {
    matches!(err.kind(), csv::ErrorKind::Io(_))
}
