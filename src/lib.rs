pub mod config;
pub mod constants;
pub mod decoder;
pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod parser;
pub mod pipeline;
pub mod signal;
pub mod types;

pub use config::Config;
pub use error::{Result, RowError, WaveformError};
pub use pipeline::{Pipeline, PipelineResult};
