//! Text encoding for stored embedding vectors.
//!
//! Vectors are persisted as JSON arrays of numbers. Absence is always encoded as
//! `null`; older rows may also carry an empty string or `[]`, which decode to
//! absent as well. `f32` values are written in their shortest round-trip form,
//! so decoding an encoded vector yields the same values.

use thiserror::Error;

/// Why a stored vector could not be decoded.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed embedding text: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("embedding element {index} is not finite")]
    NonFinite { index: usize },
}

const ABSENT: &str = "null";

/// Encode a vector for storage. `None` and zero-length vectors both encode to `null`.
pub fn encode(vector: Option<&[f32]>) -> String {
    match vector {
        // Non-finite values have no JSON form; such a vector is stored as absent.
        Some(v) if !v.is_empty() && v.iter().all(|x| x.is_finite()) => {
            serde_json::to_string(v).unwrap_or_else(|_| ABSENT.to_string())
        }
        _ => ABSENT.to_string(),
    }
}

/// Decode stored text, distinguishing absence (`Ok(None)`) from corruption (`Err`).
pub fn try_decode(text: &str) -> Result<Option<Vec<f32>>, CodecError> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == ABSENT {
        return Ok(None);
    }

    let values: Vec<f32> = serde_json::from_str(trimmed)?;
    if values.is_empty() {
        return Ok(None);
    }
    if let Some(index) = values.iter().position(|x| !x.is_finite()) {
        return Err(CodecError::NonFinite { index });
    }
    Ok(Some(values))
}

/// Decode stored text, treating anything unreadable as absent.
pub fn decode(text: &str) -> Option<Vec<f32>> {
    try_decode(text).ok().flatten()
}

/// Decode a nullable column value.
pub fn decode_column(value: Option<&str>) -> Result<Option<Vec<f32>>, CodecError> {
    match value {
        Some(text) => try_decode(text),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_values() {
        let v: Vec<f32> = (0..1536)
            .map(|i| ((i as f32) * 0.731).sin() * 0.05 - 1e-7 * i as f32)
            .collect();
        let decoded = decode(&encode(Some(&v))).unwrap();
        assert_eq!(decoded.len(), v.len());
        for (a, b) in v.iter().zip(decoded.iter()) {
            assert!((a - b).abs() <= 1e-6, "{a} != {b}");
        }
    }

    #[test]
    fn round_trip_extreme_magnitudes() {
        let v = vec![f32::MIN_POSITIVE, f32::MAX, -f32::MAX, 1e-30, -0.0, 123456.78];
        let decoded = decode(&encode(Some(&v))).unwrap();
        for (a, b) in v.iter().zip(decoded.iter()) {
            assert!((a - b).abs() <= a.abs() * f32::EPSILON, "{a} != {b}");
        }
    }

    #[test]
    fn absent_encodes_to_null() {
        assert_eq!(encode(None), "null");
        assert_eq!(encode(Some(&[])), "null");
        assert_eq!(decode(&encode(None)), None);
    }

    #[test]
    fn non_finite_vector_encodes_to_null() {
        assert_eq!(encode(Some(&[1.0, f32::NAN])), "null");
        assert_eq!(encode(Some(&[f32::INFINITY])), "null");
    }

    #[test]
    fn legacy_absent_forms_decode_to_none() {
        for text in ["", "   ", "null", " null ", "[]"] {
            assert!(try_decode(text).unwrap().is_none(), "{text:?}");
        }
    }

    #[test]
    fn malformed_text_is_an_error_but_decodes_to_none() {
        for text in ["[1.0, 2.0", "not json", "{\"a\": 1}", "[\"x\"]", "[1, null]"] {
            assert!(try_decode(text).is_err(), "{text:?}");
            assert!(decode(text).is_none(), "{text:?}");
        }
    }

    #[test]
    fn nullable_column() {
        assert!(decode_column(None).unwrap().is_none());
        assert_eq!(decode_column(Some("[0.5,1]")).unwrap(), Some(vec![0.5, 1.0]));
    }
}
