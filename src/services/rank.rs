//! Cosine-similarity ranking with a deterministic tie-break.

use crate::utils::math::cosine_similarity;

/// Two scores within this tolerance are considered tied and fall back to
/// corpus insertion order, so identical inputs always produce identical
/// output.
pub const SCORE_EPSILON: f32 = 1e-9;

/// A song vector presented to the ranker, in corpus insertion order.
#[derive(Debug, Clone)]
pub struct SongVector {
    pub id: String,
    pub vector: Vec<f32>,
}

/// One ranked candidate: song id plus its similarity score in [-1, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    pub id: String,
    pub score: f32,
}

/// Rank candidates against a query vector.
///
/// Scores are cosine similarities; a zero-norm vector on either side scores
/// -1.0 and ranks last. Output is descending by score, ties (within
/// [`SCORE_EPSILON`]) broken by the candidates' slice order — which callers
/// supply in corpus insertion order.
pub fn rank(query: &[f32], candidates: &[SongVector]) -> Vec<RankedCandidate> {
    let mut scored: Vec<RankedCandidate> = candidates
        .iter()
        .map(|candidate| RankedCandidate {
            id: candidate.id.clone(),
            score: cosine_similarity(query, &candidate.vector),
        })
        .collect();

    // Quantizing to epsilon buckets gives a consistent total order; the
    // stable sort then keeps insertion order within a bucket.
    scored.sort_by(|a, b| score_bucket(b.score).total_cmp(&score_bucket(a.score)));
    scored
}

fn score_bucket(score: f32) -> f64 {
    (f64::from(score) / f64::from(SCORE_EPSILON)).round()
}
