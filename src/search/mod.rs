//! Fuzzy song and artist search.
//!
//! A query flows through four stages:
//!   normalize → retrieve (concurrent store lookups) → score → rank
//!
//! The artist search runs the same pipeline and then groups the ranked songs
//! by artist.

pub mod artists;
pub mod cache;
pub mod normalize;
pub mod ranker;
pub mod retriever;
pub mod scorer;
pub mod simple;
pub mod split;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::config::SearchConfig;
use crate::storage::store::SongStore;
use artists::ArtistSummary;
use cache::SearchCache;
use scorer::ScoredCandidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchFilter {
    Songs,
    Artists,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "results", rename_all = "snake_case")]
pub enum SearchResults {
    Songs(Vec<ScoredCandidate>),
    Artists(Vec<ArtistSummary>),
}

impl SearchResults {
    fn empty(filter: SearchFilter) -> Self {
        match filter {
            SearchFilter::Songs => SearchResults::Songs(Vec::new()),
            SearchFilter::Artists => SearchResults::Artists(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SearchResults::Songs(songs) => songs.len(),
            SearchResults::Artists(artists) => artists.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of a search call. A search overtaken by a newer one on the same
/// engine resolves to `Stale` and its results are discarded.
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    Fresh(SearchResults),
    Stale,
}

#[derive(Debug, Error)]
pub enum SearchError {
    /// Every lookup against the store failed. Distinct from "no results".
    #[error("song store unavailable: all {0} lookups failed")]
    Unavailable(usize),
}

/// Entry point for UI callers.
pub struct SearchEngine {
    store: Arc<dyn SongStore>,
    config: SearchConfig,
    cache: Option<Arc<SearchCache>>,
    latest: AtomicU64,
}

impl SearchEngine {
    pub fn new(store: Arc<dyn SongStore>, config: SearchConfig) -> Self {
        Self {
            store,
            config,
            cache: None,
            latest: AtomicU64::new(0),
        }
    }

    /// Use a caller-owned result cache.
    pub fn with_cache(mut self, cache: Arc<SearchCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Search songs or artists.
    ///
    /// Only the most recently started search on this engine may return
    /// `Fresh`: each call takes a sequence number before its first await and
    /// checks it again once its lookups have settled.
    pub async fn search(
        &self,
        query: &str,
        filter: SearchFilter,
    ) -> Result<SearchOutcome, SearchError> {
        let ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;

        let tokens = normalize::normalize(query);
        if tokens.is_empty() {
            return Ok(SearchOutcome::Fresh(SearchResults::empty(filter)));
        }

        if let Some(hit) = self.cache.as_ref().and_then(|c| c.get(filter, query)) {
            tracing::debug!(query, "search cache hit");
            return Ok(SearchOutcome::Fresh(hit));
        }

        let retrieval = retriever::retrieve(
            Arc::clone(&self.store),
            query,
            &tokens,
            self.config.max_split_guesses,
        )
        .await;

        if retrieval.store_unavailable() {
            return Err(SearchError::Unavailable(retrieval.issued));
        }

        let scored = scorer::score_candidates(retrieval.candidates, &tokens, query);

        let results = match filter {
            SearchFilter::Songs => {
                SearchResults::Songs(ranker::rank(scored, &self.config, Some(self.config.max_results)))
            }
            SearchFilter::Artists => {
                let ranked = ranker::rank(scored, &self.config, None);
                let songs: Vec<_> = ranked.into_iter().map(|c| c.song).collect();
                SearchResults::Artists(
                    artists::derive_artists(
                        Arc::clone(&self.store),
                        &songs,
                        self.config.max_results,
                        Some(query),
                    )
                    .await,
                )
            }
        };

        if self.latest.load(Ordering::SeqCst) != ticket {
            tracing::debug!(query, "discarding superseded search");
            return Ok(SearchOutcome::Stale);
        }

        if let Some(cache) = &self.cache {
            cache.put(filter, query, results.clone());
        }

        Ok(SearchOutcome::Fresh(results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::db::tests::test_store;
    use crate::storage::song_data::Song;
    use crate::storage::store::Predicate;
    use retriever::Strategy;

    fn catalogue() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("Bohemian Rhapsody", "Queen", "A2 - A4"),
            ("Killer Queen", "Queen", "C3 - B4"),
            ("Rhapsody in Blue", "George Gershwin", "C3 - C5"),
            ("Dancing Queen", "ABBA", "E3 - A4"),
            ("Queen of Hearts", "Juice Newton", "A3 - D5"),
            ("Hallelujah", "Jeff Buckley", "C3 - A4"),
        ]
    }

    fn engine() -> SearchEngine {
        SearchEngine::new(Arc::new(test_store(&catalogue())), SearchConfig::default())
    }

    fn songs(outcome: SearchOutcome) -> Vec<ScoredCandidate> {
        match outcome {
            SearchOutcome::Fresh(SearchResults::Songs(songs)) => songs,
            other => panic!("expected fresh song results, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn full_title_found_by_prefix() {
        let results = songs(engine().search("bohemian rhapsody", SearchFilter::Songs).await.unwrap());
        let top = &results[0];
        assert_eq!(top.song.name, "Bohemian Rhapsody");
        assert!(top.score >= 6_000, "score {}", top.score);
    }

    #[tokio::test]
    async fn title_then_artist_found_by_split() {
        let results = songs(engine().search("rhapsody queen", SearchFilter::Songs).await.unwrap());
        let hit = results
            .iter()
            .find(|c| c.song.name == "Bohemian Rhapsody")
            .expect("split should find the song");
        assert_eq!(hit.strategy, Strategy::Split);
        assert!(hit.score >= 7_000, "score {}", hit.score);
        assert!(hit.details.multi_field_match);
    }

    #[tokio::test]
    async fn exact_match_sorts_above_partial_matches() {
        let results = songs(engine().search("hallelujah", SearchFilter::Songs).await.unwrap());
        assert_eq!(results[0].song.name, "Hallelujah");
        assert_eq!(results[0].score, scorer::EXACT_NAME_SCORE);

        let results = songs(engine().search("QUEEN", SearchFilter::Songs).await.unwrap());
        let exact: Vec<&str> = results
            .iter()
            .take_while(|c| c.score == scorer::EXACT_ARTIST_SCORE)
            .map(|c| c.song.name.as_str())
            .collect();
        assert_eq!(exact, vec!["Bohemian Rhapsody", "Killer Queen"]);
        assert!(results[2..].iter().all(|c| c.score < scorer::EXACT_ARTIST_SCORE));
    }

    #[tokio::test]
    async fn trailing_space_prefers_complete_title() {
        let results = songs(engine().search("killer queen ", SearchFilter::Songs).await.unwrap());
        assert_eq!(results[0].song.name, "Killer Queen");
        assert_eq!(results[0].strategy, Strategy::TitleComplete);
        assert_eq!(results[0].score, scorer::TITLE_COMPLETE_SCORE);
    }

    #[tokio::test]
    async fn accented_artist_found_in_any_case() {
        let store = test_store(&[
            ("Non, je ne regrette rien", "Édith Piaf", "G3 - C5"),
            ("La Vie en rose", "Édith Piaf", "A3 - C5"),
            ("Hallelujah", "Jeff Buckley", "C3 - A4"),
        ]);
        let engine = SearchEngine::new(Arc::new(store), SearchConfig::default());

        let results = songs(engine.search("ÉDITH PIAF", SearchFilter::Songs).await.unwrap());
        let found: Vec<(&str, u32)> = results
            .iter()
            .map(|c| (c.song.name.as_str(), c.score))
            .collect();
        assert_eq!(
            found,
            vec![
                ("La Vie en rose", scorer::EXACT_ARTIST_SCORE),
                ("Non, je ne regrette rien", scorer::EXACT_ARTIST_SCORE),
            ]
        );

        let results = songs(engine.search("édith", SearchFilter::Songs).await.unwrap());
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|c| c.score == scorer::PREFIX_ARTIST_SCORE));
    }

    #[tokio::test]
    async fn results_are_bounded_and_ordered() {
        let rows: Vec<(String, String)> = (0..30)
            .map(|i| (format!("Love Song {i:02}"), format!("Band {i}")))
            .collect();
        let refs: Vec<(&str, &str, &str)> = rows
            .iter()
            .map(|(n, a)| (n.as_str(), a.as_str(), "C3 - C5"))
            .collect();
        let engine = SearchEngine::new(Arc::new(test_store(&refs)), SearchConfig::default());

        let results = songs(engine.search("love", SearchFilter::Songs).await.unwrap());
        assert_eq!(results.len(), 15);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert!(results.iter().all(|c| c.score >= 5_000));
    }

    #[tokio::test]
    async fn blank_query_issues_no_lookups() {
        struct PanicStore;
        impl SongStore for PanicStore {
            fn find_where(&self, _: &Predicate) -> anyhow::Result<Vec<Song>> {
                panic!("blank queries must not reach the store")
            }
        }
        let engine = SearchEngine::new(Arc::new(PanicStore), SearchConfig::default());
        let results = songs(engine.search("  ?! ", SearchFilter::Songs).await.unwrap());
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn unreachable_store_is_an_error() {
        struct DownStore;
        impl SongStore for DownStore {
            fn find_where(&self, _: &Predicate) -> anyhow::Result<Vec<Song>> {
                anyhow::bail!("network down")
            }
        }
        let engine = SearchEngine::new(Arc::new(DownStore), SearchConfig::default());
        let err = engine.search("queen", SearchFilter::Songs).await.unwrap_err();
        assert!(matches!(err, SearchError::Unavailable(3)));
    }

    struct SlowStore(crate::storage::db::SqliteSongStore);

    impl SongStore for SlowStore {
        fn find_where(&self, predicate: &Predicate) -> anyhow::Result<Vec<Song>> {
            std::thread::sleep(std::time::Duration::from_millis(20));
            self.0.find_where(predicate)
        }
    }

    #[tokio::test]
    async fn superseded_search_is_stale() {
        let engine = SearchEngine::new(
            Arc::new(SlowStore(test_store(&catalogue()))),
            SearchConfig::default(),
        );
        // join! polls the first future before the second, so both take their
        // sequence numbers before either finishes.
        let (first, second) = tokio::join!(
            engine.search("queen", SearchFilter::Songs),
            engine.search("rhapsody", SearchFilter::Songs),
        );
        assert!(matches!(first.unwrap(), SearchOutcome::Stale));
        assert!(!songs(second.unwrap()).is_empty());
    }

    #[tokio::test]
    async fn artist_search_groups_matches() {
        let outcome = engine().search("queen", SearchFilter::Artists).await.unwrap();
        let SearchOutcome::Fresh(SearchResults::Artists(artists)) = outcome else {
            panic!("expected artist results");
        };
        assert_eq!(artists[0].name, "Queen");
        assert_eq!(artists[0].song_count, 2);
        assert!(artists.iter().any(|a| a.name == "ABBA"));
    }

    #[tokio::test]
    async fn cache_serves_repeat_queries_until_invalidated() {
        let cache = Arc::new(SearchCache::new(8));
        let store = Arc::new(test_store(&catalogue()));
        let engine = SearchEngine::new(store, SearchConfig::default()).with_cache(Arc::clone(&cache));

        engine.search("queen", SearchFilter::Songs).await.unwrap();
        assert_eq!(cache.len(), 1);

        let again = songs(engine.search("Queen", SearchFilter::Songs).await.unwrap());
        assert!(!again.is_empty());
        assert_eq!(cache.len(), 1);

        cache.invalidate();
        assert!(cache.is_empty());
    }
}
