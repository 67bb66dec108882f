use std::cmp::Ordering;

use halalbot_core::{AnnotatedResult, Category};
use tracing::debug;

use crate::filter::accepts;

fn by_authority_then_score(a: &AnnotatedResult, b: &AnnotatedResult) -> Ordering {
    a.category
        .priority()
        .cmp(&b.category.priority())
        .then_with(|| b.adjusted_score.total_cmp(&a.adjusted_score))
}

/// Threshold, filter, order and truncate annotated candidates.
///
/// The relevance floor is checked against `base_score`, so feedback can only
/// demote a passage that already cleared it. Ordering is category priority
/// first, then `adjusted_score` descending; the sort is stable, so ties keep
/// the gateway's order.
pub fn rank(
    results: Vec<AnnotatedResult>,
    min_score: f32,
    top_k: usize,
    filter: Option<Category>,
) -> Vec<AnnotatedResult> {
    let fetched = results.len();
    let mut kept: Vec<AnnotatedResult> = results
        .into_iter()
        .filter(|r| r.base_score >= min_score)
        .filter(|r| accepts(r.category, filter))
        .collect();
    let eligible = kept.len();
    kept.sort_by(by_authority_then_score);
    kept.truncate(top_k);
    debug!(fetched, eligible, returned = kept.len(), "ranked candidates");
    kept
}
