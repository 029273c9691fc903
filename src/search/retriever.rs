use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;

use super::split::{split_guesses, SplitGuess};
use crate::storage::song_data::Song;
use crate::storage::store::{Clause, Field, Predicate, SongStore};

/// How a candidate was found. When several lookups return the same song,
/// the one with the highest `priority()` decides how it is scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Exact,
    TitleComplete,
    Prefix,
    TitlePrefix,
    Split,
    Contains,
    /// Reserved for per-token lookups; no lookup produces it yet.
    Token,
}

impl Strategy {
    pub fn priority(&self) -> u32 {
        match self {
            Strategy::Exact => 100,
            Strategy::TitleComplete => 95,
            Strategy::Prefix => 90,
            Strategy::TitlePrefix => 85,
            Strategy::Split => 80,
            Strategy::Contains => 70,
            Strategy::Token => 60,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Exact => "exact",
            Strategy::TitleComplete => "title_complete",
            Strategy::Prefix => "prefix",
            Strategy::TitlePrefix => "title_prefix",
            Strategy::Split => "split",
            Strategy::Contains => "contains",
            Strategy::Token => "token",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A store record tagged with the lookup that found it.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub song: Song,
    pub strategy: Strategy,
    pub split: Option<SplitGuess>,
}

/// One store query the retriever will issue.
#[derive(Debug, Clone)]
pub struct Lookup {
    pub strategy: Strategy,
    pub predicate: Predicate,
    pub split: Option<SplitGuess>,
}

impl Lookup {
    fn new(strategy: Strategy, predicate: Predicate) -> Self {
        Self {
            strategy,
            predicate,
            split: None,
        }
    }
}

/// What came back from a retrieval round.
#[derive(Debug, Default)]
pub struct Retrieval {
    pub candidates: Vec<Candidate>,
    /// Lookups issued.
    pub issued: usize,
    /// Lookups that errored and contributed nothing.
    pub failed: usize,
}

impl Retrieval {
    /// True when lookups were issued and every one of them failed.
    pub fn store_unavailable(&self) -> bool {
        self.issued > 0 && self.failed == self.issued
    }
}

/// Decide which lookups a query needs.
///
/// A trailing space means the user finished a word: the text is then also
/// tried as a complete title and as a title prefix, and the exact and split
/// lookups are skipped since the query is still being typed.
pub fn plan_lookups(raw_query: &str, tokens: &[String], max_split_guesses: usize) -> Vec<Lookup> {
    let trimmed = raw_query.trim();
    if tokens.is_empty() || trimmed.is_empty() {
        return Vec::new();
    }

    let trailing_space = raw_query.ends_with(' ');
    let mut lookups = Vec::new();

    if !trailing_space {
        lookups.push(Lookup::new(
            Strategy::Exact,
            Predicate::either_field(Clause::Equals, trimmed),
        ));
    }

    lookups.push(Lookup::new(
        Strategy::Prefix,
        Predicate::either_field(Clause::StartsWith, trimmed),
    ));
    lookups.push(Lookup::new(
        Strategy::Contains,
        Predicate::either_field(Clause::Contains, trimmed),
    ));

    if trailing_space && trimmed.chars().count() >= 2 {
        lookups.push(Lookup::new(
            Strategy::TitleComplete,
            Predicate::All(vec![Clause::Equals(Field::Name, trimmed.to_string())]),
        ));
        lookups.push(Lookup::new(
            Strategy::TitlePrefix,
            Predicate::Any(vec![Clause::StartsWith(Field::Name, trimmed.to_string())]),
        ));
    }

    if !trailing_space {
        for guess in split_guesses(tokens, max_split_guesses) {
            lookups.push(Lookup {
                strategy: Strategy::Split,
                predicate: Predicate::All(vec![
                    Clause::Contains(Field::Name, guess.title.clone()),
                    Clause::Contains(Field::Artist, guess.artist.clone()),
                ]),
                split: Some(guess),
            });
        }
    }

    lookups
}

/// Run every planned lookup concurrently and merge the results.
///
/// Each lookup runs on its own blocking task. A lookup that errors (or whose
/// task dies) is logged and counted in `failed`; the others still
/// contribute. Merging happens only after all lookups have settled.
pub async fn retrieve(
    store: Arc<dyn SongStore>,
    raw_query: &str,
    tokens: &[String],
    max_split_guesses: usize,
) -> Retrieval {
    let lookups = plan_lookups(raw_query, tokens, max_split_guesses);
    let issued = lookups.len();
    if issued == 0 {
        return Retrieval::default();
    }

    let mut tasks = JoinSet::new();
    for (index, lookup) in lookups.into_iter().enumerate() {
        let store = Arc::clone(&store);
        tasks.spawn_blocking(move || {
            let result = store.find_where(&lookup.predicate);
            (index, lookup, result)
        });
    }

    let mut settled = Vec::with_capacity(issued);
    let mut failed = 0;

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => settled.push(outcome),
            Err(err) => {
                tracing::warn!(%err, "search lookup task did not complete");
                failed += 1;
            }
        }
    }

    // Completion order is arbitrary; merge in plan order.
    settled.sort_by_key(|(index, _, _)| *index);

    let mut found = Vec::new();
    for (_, lookup, result) in settled {
        match result {
            Ok(songs) => {
                tracing::debug!(strategy = %lookup.strategy, hits = songs.len(), "lookup finished");
                found.extend(songs.into_iter().map(|song| Candidate {
                    song,
                    strategy: lookup.strategy,
                    split: lookup.split.clone(),
                }));
            }
            Err(err) => {
                tracing::warn!(strategy = %lookup.strategy, "lookup failed: {err:#}");
                failed += 1;
            }
        }
    }

    Retrieval {
        candidates: dedupe_by_priority(found),
        issued,
        failed,
    }
}

/// Keep one candidate per song id: the one with the highest-priority
/// strategy. Between two split matches the more confident split wins.
/// First-seen order is preserved.
pub fn dedupe_by_priority(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut merged: Vec<Candidate> = Vec::with_capacity(candidates.len());
    let mut position: HashMap<i64, usize> = HashMap::new();

    for candidate in candidates {
        match position.get(&candidate.song.id) {
            None => {
                position.insert(candidate.song.id, merged.len());
                merged.push(candidate);
            }
            Some(&i) => {
                if outranks(&candidate, &merged[i]) {
                    merged[i] = candidate;
                }
            }
        }
    }

    merged
}

fn outranks(new: &Candidate, current: &Candidate) -> bool {
    let (new_priority, current_priority) = (new.strategy.priority(), current.strategy.priority());
    if new_priority != current_priority {
        return new_priority > current_priority;
    }
    match (&new.split, &current.split) {
        (Some(a), Some(b)) => a.confidence > b.confidence,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::normalize::normalize;
    use crate::storage::db::tests::test_store;

    fn strategies(lookups: &[Lookup]) -> Vec<Strategy> {
        lookups.iter().map(|l| l.strategy).collect()
    }

    fn song(id: i64, name: &str) -> Song {
        Song {
            id,
            name: name.into(),
            artist: "Someone".into(),
            vocal_range: "C3 - C5".into(),
        }
    }

    fn candidate(id: i64, strategy: Strategy) -> Candidate {
        Candidate {
            song: song(id, "Song"),
            strategy,
            split: None,
        }
    }

    #[test]
    fn single_word_plan() {
        let lookups = plan_lookups("queen", &normalize("queen"), 6);
        assert_eq!(
            strategies(&lookups),
            vec![Strategy::Exact, Strategy::Prefix, Strategy::Contains]
        );
    }

    #[test]
    fn two_word_plan_adds_splits() {
        let lookups = plan_lookups("rhapsody queen", &normalize("rhapsody queen"), 6);
        let splits = lookups.iter().filter(|l| l.strategy == Strategy::Split).count();
        assert_eq!(splits, 2);
        assert_eq!(lookups[0].strategy, Strategy::Exact);
    }

    #[test]
    fn trailing_space_plan() {
        let q = "bohemian rhapsody ";
        let lookups = plan_lookups(q, &normalize(q), 6);
        assert_eq!(
            strategies(&lookups),
            vec![
                Strategy::Prefix,
                Strategy::Contains,
                Strategy::TitleComplete,
                Strategy::TitlePrefix,
            ]
        );
        // Lookups use the trimmed text
        assert_eq!(
            lookups[2].predicate,
            Predicate::All(vec![Clause::Equals(Field::Name, "bohemian rhapsody".into())])
        );
    }

    #[test]
    fn trailing_space_single_char_skips_title_variants() {
        let lookups = plan_lookups("a ", &normalize("a "), 6);
        assert_eq!(strategies(&lookups), vec![Strategy::Prefix, Strategy::Contains]);
    }

    #[test]
    fn blank_query_plans_nothing() {
        assert!(plan_lookups("   ", &normalize("   "), 6).is_empty());
        assert!(plan_lookups("!!", &normalize("!!"), 6).is_empty());
    }

    #[test]
    fn dedupe_keeps_highest_priority() {
        let merged = dedupe_by_priority(vec![
            candidate(1, Strategy::Contains),
            candidate(2, Strategy::Contains),
            candidate(1, Strategy::Exact),
            candidate(1, Strategy::Prefix),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].song.id, 1);
        assert_eq!(merged[0].strategy, Strategy::Exact);
        assert_eq!(merged[1].strategy, Strategy::Contains);
    }

    #[test]
    fn priority_table_order() {
        let ordered = [
            Strategy::Exact,
            Strategy::TitleComplete,
            Strategy::Prefix,
            Strategy::TitlePrefix,
            Strategy::Split,
            Strategy::Contains,
            Strategy::Token,
        ];
        for pair in ordered.windows(2) {
            assert!(pair[0].priority() > pair[1].priority(), "{} vs {}", pair[0], pair[1]);
        }
    }

    #[tokio::test]
    async fn retrieves_and_dedupes_from_store() {
        let store: Arc<dyn SongStore> = Arc::new(test_store(&[
            ("Queen of Hearts", "Juice Newton", "A3 - D5"),
            ("Bohemian Rhapsody", "Queen", "A2 - A4"),
            ("Killer Queen", "Queen", "C3 - B4"),
        ]));

        let retrieval = retrieve(store, "queen", &normalize("queen"), 6).await;
        assert_eq!(retrieval.issued, 3);
        assert_eq!(retrieval.failed, 0);
        assert_eq!(retrieval.candidates.len(), 3);

        let by_id: HashMap<i64, Strategy> = retrieval
            .candidates
            .iter()
            .map(|c| (c.song.id, c.strategy))
            .collect();
        // Artist "Queen" matches exactly, which outranks the prefix and contains hits
        assert_eq!(by_id[&1], Strategy::Prefix);
        assert_eq!(by_id[&2], Strategy::Exact);
        assert_eq!(by_id[&3], Strategy::Exact);
    }

    struct FlakyStore {
        inner: crate::storage::db::SqliteSongStore,
    }

    impl SongStore for FlakyStore {
        fn find_where(&self, predicate: &Predicate) -> anyhow::Result<Vec<Song>> {
            if let Predicate::Any(clauses) = predicate {
                if matches!(clauses.first(), Some(Clause::Equals(..))) {
                    anyhow::bail!("exact lookups are down");
                }
            }
            self.inner.find_where(predicate)
        }
    }

    #[tokio::test]
    async fn failed_lookup_degrades_instead_of_aborting() {
        let store: Arc<dyn SongStore> = Arc::new(FlakyStore {
            inner: test_store(&[("Killer Queen", "Queen", "C3 - B4")]),
        });

        let retrieval = retrieve(store, "queen", &normalize("queen"), 6).await;
        assert_eq!(retrieval.failed, 1);
        assert!(!retrieval.store_unavailable());
        assert_eq!(retrieval.candidates.len(), 1);
        assert_eq!(retrieval.candidates[0].strategy, Strategy::Prefix);
    }

    struct DownStore;

    impl SongStore for DownStore {
        fn find_where(&self, _: &Predicate) -> anyhow::Result<Vec<Song>> {
            anyhow::bail!("connection refused")
        }
    }

    #[tokio::test]
    async fn every_lookup_failing_marks_store_unavailable() {
        let retrieval = retrieve(Arc::new(DownStore), "queen", &normalize("queen"), 6).await;
        assert!(retrieval.store_unavailable());
        assert!(retrieval.candidates.is_empty());
    }
}
