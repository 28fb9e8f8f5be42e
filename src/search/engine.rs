//! Fuzzy ranking over search indexes.
//!
//! Scores are Jaro-Winkler normalized similarities in `[0.0, 1.0]`. The same
//! metric drives candidate pre-selection and final scoring: a candidate's
//! final score is the mean over query tokens of the best similarity against
//! the candidate's token set, so if the final score clears the threshold, at
//! least one of its tokens did too and pre-selection cannot drop it.

use ahash::AHashMap;
use rapidfuzz::distance::jaro_winkler;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::index::SearchIndex;

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Fully-qualified item path.
    pub path: String,
    /// Similarity score in `[0.0, 1.0]`.
    pub score: f64,
}

/// Normalized similarity between two terms.
pub(crate) fn similarity(a: &str, b: &str) -> f64 {
    jaro_winkler::similarity(a.chars(), b.chars())
}

/// Rank items across the given indexes against a tokenized query.
///
/// Candidates scoring below `threshold` are discarded. Ordering is total and
/// deterministic: score descending, then shorter path, then lexicographic
/// path. Output is truncated to `limit`.
pub fn search_indexes(
    indexes: &[Arc<SearchIndex>],
    query_tokens: &[String],
    threshold: f64,
    limit: usize,
) -> Vec<SearchHit> {
    if query_tokens.is_empty() || limit == 0 {
        return vec![];
    }

    // Candidate pre-selection: any indexed token close enough to any query
    // token contributes its items.
    let mut candidates: AHashMap<&str, &SearchIndex> = AHashMap::new();
    for index in indexes {
        for (token, paths) in index.tokens() {
            let best = query_tokens
                .iter()
                .map(|q| similarity(q, token))
                .fold(0.0_f64, f64::max);
            if best >= threshold {
                for path in paths {
                    candidates.insert(path.as_str(), index);
                }
            }
        }
    }

    let mut hits: Vec<SearchHit> = candidates
        .into_iter()
        .filter_map(|(path, index)| {
            let item_tokens = index.item_tokens().get(path)?;
            let score = score_item(query_tokens, item_tokens);
            (score >= threshold).then(|| SearchHit {
                path: path.to_string(),
                score,
            })
        })
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.path.len().cmp(&b.path.len()))
            .then_with(|| a.path.cmp(&b.path))
    });
    hits.truncate(limit);
    hits
}

/// Mean over query tokens of the best similarity against the item's tokens.
fn score_item(query_tokens: &[String], item_tokens: &[String]) -> f64 {
    let total: f64 = query_tokens
        .iter()
        .map(|q| {
            item_tokens
                .iter()
                .map(|t| similarity(q, t))
                .fold(0.0_f64, f64::max)
        })
        .sum();
    total / query_tokens.len() as f64
}
