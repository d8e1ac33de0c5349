/// Column and field names shared by the source reader and record parser.

// Source table columns
pub const SUBJECT_ID_COLUMN: &str = "subject_id";
pub const MEASURED_DATETIME_COLUMN: &str = "measured_datetime";
pub const WAVEFORM_RAW_COLUMN: &str = "waveform_raw";

// Keys inside the waveform_raw structure
pub const LEAD_DATA_KEY: &str = "LeadData";
pub const LEAD_ID_KEY: &str = "LeadID";
pub const WAVEFORM_DATA_KEY: &str = "WaveFormData";
pub const AMPLITUDE_UNITS_PER_BIT_KEY: &str = "LeadAmplitudeUnitsPerBit";

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_SAVE_DIR: &str = "output_directory";

/// Diagnostic log, relative to the working directory.
pub const DIAGNOSTIC_LOG_FILE: &str = "bug.txt";

pub const OUTPUT_EXTENSION: &str = "csv";

/// Failure descriptions kept in a run summary.
pub const MAX_REPORTED_ERRORS: usize = 100;

/// Columns every source file must provide.
pub fn required_columns() -> [&'static str; 3] {
    [
        SUBJECT_ID_COLUMN,
        MEASURED_DATETIME_COLUMN,
        WAVEFORM_RAW_COLUMN,
    ]
}
