//! Append-only diagnostic log of failed rows.
//!
//! One line per failed row: `{position} / {file_name} : {description}`, or
//! `{position} : {description}` when the row never got far enough to have a
//! file name. The file is opened once per run in append mode and is never
//! truncated.

use crate::metrics::DiagnosticLogMetrics;
use crate::pipeline::RowFailure;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{error, warn};

pub struct DiagnosticLog<W: Write = File> {
    writer: W,
    path: Option<PathBuf>,
    entries: usize,
}

impl DiagnosticLog<File> {
    /// Open `path` for appending, creating it if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: file,
            path: Some(path.to_path_buf()),
            entries: 0,
        })
    }
}

impl<W: Write> DiagnosticLog<W> {
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer,
            path: None,
            entries: 0,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Lines written during this run.
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Append one line for `failure`. Never fails: if the full line cannot be
    /// written a minimal line is tried, and if that fails too the failure is
    /// only reported through tracing.
    pub fn record(&mut self, failure: &RowFailure) {
        let line = format!("{}\n", single_line(&failure.to_string()));
        let err = match self.write_line(&line) {
            Ok(()) => return,
            Err(err) => err,
        };
        warn!(
            "Diagnostic log write failed for row {}: {}; retrying minimal entry",
            failure.position, err
        );

        let minimal = format!(
            "{} : {}\n",
            failure.position,
            single_line(&failure.error.to_string())
        );
        if let Err(err) = self.write_line(&minimal) {
            error!(
                "Diagnostic log unavailable, row {} failed with: {} (log error: {})",
                failure.position, failure.error, err
            );
        }
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let result = self
            .writer
            .write_all(line.as_bytes())
            .and_then(|()| self.writer.flush());
        match result {
            Ok(()) => {
                self.entries += 1;
                DiagnosticLogMetrics::record_write_success(line.len());
                Ok(())
            }
            Err(err) => {
                DiagnosticLogMetrics::record_write_error();
                Err(err)
            }
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}
