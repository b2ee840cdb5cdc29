//! Pairwise vector similarity.

use thiserror::Error;

/// Faults raised for inputs that cannot be compared at all.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimilarityError {
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("vector element {index} is not finite")]
    NonFinite { index: usize },
}

/// Cosine similarity of `a` and `b`.
///
/// Returns `Ok(None)` when the similarity is undefined: either vector has zero
/// L2 norm, or the arithmetic produced NaN. Callers treat that as "no signal",
/// not as minimal similarity. Values may overshoot `[-1, 1]` by rounding error.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<Option<f32>, SimilarityError> {
    if a.len() != b.len() {
        return Err(SimilarityError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    check_finite(a)?;
    check_finite(b)?;

    // Accumulate in f64 so 1536-dim sums don't lose precision.
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(None);
    }

    let sim = dot / (norm_a.sqrt() * norm_b.sqrt());
    if sim.is_nan() {
        return Ok(None);
    }
    Ok(Some(sim as f32))
}

/// Reject vectors carrying NaN or infinite elements.
pub fn check_finite(v: &[f32]) -> Result<(), SimilarityError> {
    match v.iter().position(|x| !x.is_finite()) {
        Some(index) => Err(SimilarityError::NonFinite { index }),
        None => Ok(()),
    }
}
