//! Vector similarity and rank fusion utilities.
//!
//! Pure-Rust implementations of:
//! - Cosine similarity
//! - Reciprocal Rank Fusion (RRF) for merging ranked result lists

use std::collections::HashMap;

use crate::index::ScoredPoint;

/// Standard RRF constant.
pub const RRF_K: u32 = 60;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length or empty.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Reciprocal Rank Fusion over any number of ranked lists.
///
/// Each point's fused score is the sum of `1/(k + rank)` over the lists it
/// appears in. Points are deduplicated by id; ties keep first-seen order.
pub fn reciprocal_rank_fusion(lists: &[Vec<ScoredPoint>], k: u32, limit: usize) -> Vec<ScoredPoint> {
    let k = k as f32;

    // id key → (position of first sighting, fused score, point)
    let mut scores: HashMap<String, (usize, f32, ScoredPoint)> = HashMap::new();

    for list in lists {
        for (rank, point) in list.iter().enumerate() {
            let rrf_score = 1.0 / (k + rank as f32 + 1.0);
            let next_seen = scores.len();
            scores
                .entry(point.id.to_string())
                .and_modify(|(_, score, _)| *score += rrf_score)
                .or_insert_with(|| (next_seen, rrf_score, point.clone()));
        }
    }

    let mut results: Vec<(usize, f32, ScoredPoint)> = scores.into_values().collect();
    results.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    results.truncate(limit);
    results
        .into_iter()
        .map(|(_, score, mut point)| {
            point.score = score;
            point
        })
        .collect()
}
