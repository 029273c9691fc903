use std::cmp::Ordering;
use std::collections::HashSet;

use super::scorer::ScoredCandidate;
use crate::config::SearchConfig;

/// Whether a scored candidate is relevant enough to show.
///
/// Strong single-field matches need `min_score`; matches that hit both title
/// and artist get in from `multi_field_min_score`. Anything at or above the
/// contains-name score is always kept.
pub fn passes_threshold(candidate: &ScoredCandidate, config: &SearchConfig) -> bool {
    candidate.score >= config.min_score
        || (candidate.details.multi_field_match && candidate.score >= config.multi_field_min_score)
        || candidate.score >= super::scorer::CONTAINS_NAME_SCORE
}

/// Descending score, then multi-field matches first, then name.
fn rank_order(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| {
            b.details
                .multi_field_match
                .cmp(&a.details.multi_field_match)
        })
        .then_with(|| a.song.name.cmp(&b.song.name))
}

/// Filter, order and bound a scored candidate set.
///
/// `limit` of None keeps every relevant result; the artist search uses that
/// to aggregate over the whole match set.
pub fn rank(
    scored: Vec<ScoredCandidate>,
    config: &SearchConfig,
    limit: Option<usize>,
) -> Vec<ScoredCandidate> {
    let mut kept: Vec<ScoredCandidate> = scored
        .into_iter()
        .filter(|c| passes_threshold(c, config))
        .collect();

    kept.sort_by(rank_order);

    let mut seen = HashSet::new();
    kept.retain(|c| seen.insert(c.song.id));

    if let Some(limit) = limit {
        kept.truncate(limit);
    }
    kept
}
