//! Binary lead decoding.
//!
//! `WaveFormData` is standard padded base64 over little-endian `i16`
//! samples. Each sample is multiplied by the lead's amplitude factor and
//! truncated toward zero.

use crate::error::{DecodeFailure, RowError};
use crate::metrics::PipelineMetrics;
use crate::types::{DecodedLead, LeadPayload};
use base64::Engine as _;

pub fn decode_lead(lead: &LeadPayload) -> Result<DecodedLead, RowError> {
    let failure = |reason: DecodeFailure| RowError::LeadDecode {
        lead_id: lead.lead_id.clone(),
        reason,
    };

    let factor = parse_units_per_bit(&lead.units_per_bit).map_err(failure)?;
    let bytes = decode_base64(&lead.waveform_data).map_err(failure)?;
    let samples = decode_samples(&bytes, factor).map_err(failure)?;

    PipelineMetrics::record_lead_samples(samples.len());
    Ok(DecodedLead {
        lead_id: lead.lead_id.clone(),
        samples,
    })
}

/// Interpret `bytes` as little-endian `i16` samples and scale them.
///
/// A trailing odd byte is an error rather than a dropped half sample.
pub fn decode_samples(bytes: &[u8], factor: f64) -> Result<Vec<i64>, DecodeFailure> {
    if bytes.len() % 2 != 0 {
        return Err(DecodeFailure::PartialSample(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| scale(i16::from_le_bytes([pair[0], pair[1]]), factor))
        .collect())
}

/// `raw * factor`, truncated toward zero.
fn scale(raw: i16, factor: f64) -> i64 {
    (f64::from(raw) * factor) as i64
}

fn parse_units_per_bit(text: &str) -> Result<f64, DecodeFailure> {
    let factor: f64 = text
        .trim()
        .parse()
        .map_err(|_| DecodeFailure::NonNumericScale(text.to_string()))?;
    if !factor.is_finite() || factor < 0.0 {
        return Err(DecodeFailure::InvalidScale(factor));
    }
    Ok(factor)
}

fn decode_base64(text: &str) -> Result<Vec<u8>, DecodeFailure> {
    // Exports may wrap long payloads
    if text.bytes().any(|b| b.is_ascii_whitespace()) {
        let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        return Ok(base64::engine::general_purpose::STANDARD.decode(compact)?);
    }
    Ok(base64::engine::general_purpose::STANDARD.decode(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(samples: &[i16]) -> String {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    fn lead(waveform_data: &str, units_per_bit: &str) -> LeadPayload {
        LeadPayload {
            lead_id: "V1".to_string(),
            waveform_data: waveform_data.to_string(),
            units_per_bit: units_per_bit.to_string(),
        }
    }

    #[test]
    fn unit_factor_reproduces_samples() {
        let samples = [0, 1, -1, 12345, i16::MIN, i16::MAX];
        let decoded = decode_lead(&lead(&encode(&samples), "1.0")).unwrap();
        let expected: Vec<i64> = samples.iter().map(|s| i64::from(*s)).collect();
        assert_eq!(decoded.lead_id, "V1");
        assert_eq!(decoded.samples, expected);
    }

    #[test]
    fn scaling_truncates_toward_zero() {
        assert_eq!(decode_samples(&3i16.to_le_bytes(), 0.4).unwrap(), vec![1]);
        assert_eq!(decode_samples(&(-3i16).to_le_bytes(), 0.4).unwrap(), vec![-1]);

        let decoded = decode_lead(&lead(&encode(&[2, -5, 100]), "0.5")).unwrap();
        assert_eq!(decoded.samples, vec![1, -2, 50]);
    }

    #[test]
    fn decoding_is_deterministic() {
        let payload = lead(&encode(&[7, -8, 9]), "4.88");
        assert_eq!(decode_lead(&payload).unwrap(), decode_lead(&payload).unwrap());
    }

    #[test]
    fn zero_factor_and_empty_payload_are_valid() {
        assert_eq!(decode_lead(&lead(&encode(&[5, -5]), "0")).unwrap().samples, vec![0, 0]);
        assert!(decode_lead(&lead("", "1")).unwrap().samples.is_empty());
    }

    #[test]
    fn odd_length_payload_is_rejected() {
        let text = base64::engine::general_purpose::STANDARD.encode([1u8, 0, 2]);
        let err = decode_lead(&lead(&text, "1")).unwrap_err();
        match err {
            RowError::LeadDecode { lead_id, reason } => {
                assert_eq!(lead_id, "V1");
                assert!(matches!(reason, DecodeFailure::PartialSample(3)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn invalid_base64_is_rejected() {
        for text in ["AgD7/2Q", "not base64!", "AgD7/2QA===="] {
            let err = decode_lead(&lead(text, "1")).unwrap_err();
            assert!(
                matches!(
                    err,
                    RowError::LeadDecode {
                        reason: DecodeFailure::Base64(_),
                        ..
                    }
                ),
                "{text}: {err}"
            );
        }
    }

    #[test]
    fn embedded_line_breaks_are_ignored() {
        let decoded = decode_lead(&lead("AgD7\n/2QA", "1")).unwrap();
        assert_eq!(decoded.samples, vec![2, -5, 100]);
    }

    #[test]
    fn bad_factors_are_rejected() {
        let payload = encode(&[1]);
        for factor in ["abc", "", "None"] {
            let err = decode_lead(&lead(&payload, factor)).unwrap_err();
            assert!(matches!(
                err,
                RowError::LeadDecode {
                    reason: DecodeFailure::NonNumericScale(_),
                    ..
                }
            ));
        }
        for factor in ["-0.5", "inf", "NaN"] {
            let err = decode_lead(&lead(&payload, factor)).unwrap_err();
            assert!(matches!(
                err,
                RowError::LeadDecode {
                    reason: DecodeFailure::InvalidScale(_),
                    ..
                }
            ));
        }
    }
}
