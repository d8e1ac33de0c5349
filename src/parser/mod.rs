//! Record parsing: a [`SourceRow`] becomes a [`WaveformRecord`].

mod literal;

pub use literal::{parse_literal, scalar_text};

use crate::constants::{
    AMPLITUDE_UNITS_PER_BIT_KEY, LEAD_DATA_KEY, LEAD_ID_KEY, WAVEFORM_DATA_KEY,
};
use crate::error::RowError;
use crate::types::{LeadPayload, SourceRow, WaveformRecord};
use serde_json::Value;
use tracing::debug;

/// Parse the `waveform_raw` structure of one row.
///
/// A record without lead data is valid and comes back with no leads; the
/// caller decides to skip it. Every lead must carry all three fields, a
/// single incomplete lead fails the whole row.
pub fn parse_record(row: &SourceRow) -> Result<WaveformRecord, RowError> {
    let value = parse_literal(&row.waveform_raw)?;
    let root = value
        .as_object()
        .ok_or_else(|| RowError::RecordParse("waveform_raw is not a mapping".to_string()))?;

    let leads = match root.get(LEAD_DATA_KEY) {
        None => Vec::new(),
        Some(value) if is_falsy(value) => Vec::new(),
        Some(Value::Array(entries)) => entries
            .iter()
            .enumerate()
            .map(|(index, entry)| parse_lead(index, entry))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => {
            return Err(RowError::RecordParse(format!(
                "{LEAD_DATA_KEY} is not a sequence"
            )))
        }
    };

    debug!(
        "Parsed record subject_id={} leads={}",
        row.subject_id,
        leads.len()
    );

    Ok(WaveformRecord {
        subject_id: row.subject_id.clone(),
        measured_datetime: row.measured_datetime.clone(),
        leads,
    })
}

fn parse_lead(index: usize, entry: &Value) -> Result<LeadPayload, RowError> {
    let fields = entry
        .as_object()
        .ok_or_else(|| RowError::RecordParse(format!("lead {index} is not a mapping")))?;
    let field = |key: &str| {
        fields
            .get(key)
            .ok_or_else(|| RowError::RecordParse(format!("lead {index} is missing '{key}'")))
    };

    let lead_id = scalar_text(field(LEAD_ID_KEY)?).ok_or_else(|| {
        RowError::RecordParse(format!("lead {index} has a non-scalar '{LEAD_ID_KEY}'"))
    })?;

    let waveform_data = field(WAVEFORM_DATA_KEY)?
        .as_str()
        .ok_or_else(|| {
            RowError::RecordParse(format!("lead {index} '{WAVEFORM_DATA_KEY}' is not text"))
        })?
        .to_string();

    // Validated by the decoder so a bad factor is reported as a decode failure
    let units_per_bit = match field(AMPLITUDE_UNITS_PER_BIT_KEY)? {
        Value::Bool(flag) => u8::from(*flag).to_string(),
        scale => scalar_text(scale).unwrap_or_else(|| scale.to_string()),
    };

    Ok(LeadPayload {
        lead_id,
        waveform_data,
        units_per_bit,
    })
}

/// Empty containers, empty text, zero, `False` and `None` carry no leads.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}
