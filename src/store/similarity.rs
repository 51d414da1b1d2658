//! Similarity scoring for ranked retrieval.

/// Cosine similarity between two vectors: `(a·b) / (‖a‖·‖b‖)`.
///
/// Inputs are not assumed to be pre-normalized, even though the shipped
/// embedding providers emit unit vectors. If either vector has zero norm
/// the score is `f32::NEG_INFINITY` — the entry ranks last instead of
/// poisoning the sort with `NaN`.
///
/// Both slices must have the same length; callers get that for free from
/// the fixed provider dimensionality.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "dimension mismatch");

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom > 0.0 {
        dot / denom
    } else {
        f32::NEG_INFINITY
    }
}
