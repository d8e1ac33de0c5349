use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a whole run.
#[derive(Error, Debug)]
pub enum WaveformError {
    #[error("Failed to read source {}: {message}", path.display())]
    SourceRead { path: PathBuf, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors scoped to a single source row. These never escape the pipeline;
/// they are written to the diagnostic log and the row is skipped.
#[derive(Error, Debug)]
pub enum RowError {
    #[error("record parse failed: {0}")]
    RecordParse(String),

    #[error("lead '{lead_id}' decode failed: {reason}")]
    LeadDecode {
        lead_id: String,
        #[source]
        reason: DecodeFailure,
    },

    #[error("table assembly failed: {0}")]
    TableAssembly(String),

    #[error("failed to write '{path}': {message}")]
    OutputWrite { path: String, message: String },
}

impl RowError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RowError::RecordParse(_) => "record_parse",
            RowError::LeadDecode { .. } => "lead_decode",
            RowError::TableAssembly(_) => "table_assembly",
            RowError::OutputWrite { .. } => "output_write",
        }
    }
}

impl From<LiteralError> for RowError {
    fn from(err: LiteralError) -> Self {
        RowError::RecordParse(format!("waveform_raw: {err}"))
    }
}

#[derive(Error, Debug)]
pub enum DecodeFailure {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload length {0} is not a multiple of 2 bytes")]
    PartialSample(usize),

    #[error("amplitude factor '{0}' is not numeric")]
    NonNumericScale(String),

    #[error("amplitude factor {0} must be finite and non-negative")]
    InvalidScale(f64),
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} at offset {offset}")]
pub struct LiteralError {
    pub offset: usize,
    pub message: String,
}

impl LiteralError {
    pub fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WaveformError>;
