//! Combining a dense and a sparse similarity into one ranking score.
//!
//! The two signals live on different scales: cosine similarity is bounded,
//! while a BM25 dot product grows with query length and corpus statistics.
//! Scores are made comparable by rescaling cosine into [0, 1] and min-max
//! normalizing sparse dot products against the query-local maximum before
//! the linear blend `alpha * dense + (1 - alpha) * sparse`.

use crate::error::EngineError;

/// Rejects alpha outside the valid fusion range.
pub fn validate_alpha(alpha: f32) -> Result<(), EngineError> {
    if !(0.0..=1.0).contains(&alpha) || alpha.is_nan() {
        return Err(EngineError::InvalidAlpha(alpha));
    }
    Ok(())
}

/// Cosine similarity of two equal-length dense vectors; zero if either is
/// a zero vector.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Rescale cosine similarity from [-1, 1] into [0, 1].
pub fn rescale_cosine(cos: f32) -> f32 {
    (cos + 1.0) / 2.0
}

/// Min-max normalize raw sparse dot products in place against the maximum
/// observed among the current query's candidates. Recomputed every query;
/// with all-zero scores (empty corpus, fully OOV query) they stay zero.
pub fn normalize_sparse_scores(scores: &mut [f32]) {
    let max = scores.iter().copied().fold(0.0f32, f32::max);
    if max > 0.0 {
        for s in scores.iter_mut() {
            *s /= max;
        }
    }
}

/// Linear fusion: `alpha = 1` is pure dense ranking, `alpha = 0` pure sparse.
pub fn combine(dense_similarity: f32, sparse_similarity: f32, alpha: f32) -> f32 {
    alpha * dense_similarity + (1.0 - alpha) * sparse_similarity
}
