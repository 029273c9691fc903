use serde::Serialize;

use super::retriever::{Candidate, Strategy};
use super::split::SplitGuess;
use crate::storage::song_data::Song;

pub const EXACT_NAME_SCORE: u32 = 10_000;
pub const TITLE_COMPLETE_SCORE: u32 = 9_800;
pub const EXACT_ARTIST_SCORE: u32 = 9_500;
pub const TITLE_PREFIX_SCORE: u32 = 8_500;
pub const PREFIX_NAME_SCORE: u32 = 8_000;
pub const PREFIX_ARTIST_SCORE: u32 = 7_500;
pub const SPLIT_BASE_SCORE: u32 = 7_000;
pub const CONTAINS_NAME_SCORE: u32 = 6_000;
pub const CONTAINS_ARTIST_SCORE: u32 = 5_500;

const SPLIT_CONFIDENCE_WEIGHT: f32 = 500.0;
const SPLIT_QUALITY_WEIGHT: f32 = 300.0;

/// Which kinds of match a scored candidate made. `multi_field_match` is used
/// by the ranker both to admit weaker results and to break score ties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchDetails {
    pub exact_match: bool,
    pub perfect_match: bool,
    pub title_match: bool,
    pub artist_match: bool,
    pub multi_field_match: bool,
}

/// A candidate with its relevance score. Lives for one search only.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCandidate {
    pub song: Song,
    pub strategy: Strategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split: Option<SplitGuess>,
    pub score: u32,
    pub details: MatchDetails,
}

/// How well `needle` matches `haystack`, both already lower-cased.
///
///   equal            → 1.0
///   prefix           → 0.8
///   substring        → 0.6
///   word overlap     → 0.4 + 0.2 × (fraction of needle words found inside
///                      some haystack word)
///   nothing          → 0.0
pub fn match_quality(needle: &str, haystack: &str) -> f32 {
    if needle.is_empty() {
        return 0.0;
    }
    if haystack == needle {
        return 1.0;
    }
    if haystack.starts_with(needle) {
        return 0.8;
    }
    if haystack.contains(needle) {
        return 0.6;
    }

    let needle_words: Vec<&str> = needle.split_whitespace().collect();
    if needle_words.is_empty() {
        return 0.0;
    }
    let found = needle_words
        .iter()
        .filter(|word| haystack.split_whitespace().any(|h| h.contains(*word)))
        .count();

    if found == 0 {
        0.0
    } else {
        0.4 + 0.2 * found as f32 / needle_words.len() as f32
    }
}

/// Score one candidate against the lower-cased, trimmed query.
/// Returns None when no rule for its strategy applies.
fn score_one(candidate: &Candidate, query: &str) -> Option<(u32, MatchDetails)> {
    let name = candidate.song.name.to_lowercase();
    let artist = candidate.song.artist.to_lowercase();

    let title = MatchDetails {
        title_match: true,
        ..MatchDetails::default()
    };
    let by_artist = MatchDetails {
        artist_match: true,
        ..MatchDetails::default()
    };

    match candidate.strategy {
        Strategy::Exact if name == query => Some((
            EXACT_NAME_SCORE,
            MatchDetails {
                exact_match: true,
                perfect_match: true,
                ..title
            },
        )),
        Strategy::Exact if artist == query => Some((
            EXACT_ARTIST_SCORE,
            MatchDetails {
                exact_match: true,
                ..by_artist
            },
        )),
        Strategy::TitleComplete if name == query => Some((
            TITLE_COMPLETE_SCORE,
            MatchDetails {
                exact_match: true,
                perfect_match: true,
                ..title
            },
        )),
        Strategy::TitlePrefix if name.starts_with(query) => Some((TITLE_PREFIX_SCORE, title)),
        Strategy::Prefix if name.starts_with(query) => Some((PREFIX_NAME_SCORE, title)),
        Strategy::Prefix if artist.starts_with(query) => Some((PREFIX_ARTIST_SCORE, by_artist)),
        Strategy::Contains if name.contains(query) => Some((CONTAINS_NAME_SCORE, title)),
        Strategy::Contains if artist.contains(query) => Some((CONTAINS_ARTIST_SCORE, by_artist)),
        Strategy::Split => {
            let split = candidate.split.as_ref()?;
            let title_quality = match_quality(&split.title, &name);
            let artist_quality = match_quality(&split.artist, &artist);
            if title_quality == 0.0 || artist_quality == 0.0 {
                return None;
            }

            let bonus = split.confidence * SPLIT_CONFIDENCE_WEIGHT
                + title_quality * SPLIT_QUALITY_WEIGHT
                + artist_quality * SPLIT_QUALITY_WEIGHT;

            Some((
                SPLIT_BASE_SCORE + bonus.round() as u32,
                MatchDetails {
                    exact_match: title_quality == 1.0 && artist_quality == 1.0,
                    perfect_match: false,
                    title_match: true,
                    artist_match: true,
                    multi_field_match: true,
                },
            ))
        }
        _ => None,
    }
}

/// Score every candidate and drop the ones no rule matched.
pub fn score_candidates(
    candidates: Vec<Candidate>,
    tokens: &[String],
    original_query: &str,
) -> Vec<ScoredCandidate> {
    if tokens.is_empty() {
        return Vec::new();
    }
    let query = original_query.trim().to_lowercase();

    candidates
        .into_iter()
        .filter_map(|candidate| {
            let (score, details) = score_one(&candidate, &query)?;
            Some(ScoredCandidate {
                song: candidate.song,
                strategy: candidate.strategy,
                split: candidate.split,
                score,
                details,
            })
        })
        .collect()
}
