//! Shared mathematical utilities for vector operations.

/// Compute cosine similarity between two vectors.
///
/// Returns dot(a,b) / (norm(a) * norm(b)). If either vector has zero norm the
/// score is defined as -1.0 so that degenerate vectors rank last instead of
/// dividing by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        -1.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Euclidean (L2) norm of a vector.
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Normalize a vector to unit length. Returns zero vector if input has zero norm.
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let norm = l2_norm(v);
    if norm == 0.0 {
        vec![0.0; v.len()]
    } else {
        v.iter().map(|x| x / norm).collect()
    }
}
