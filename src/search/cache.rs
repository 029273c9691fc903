use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use super::{SearchFilter, SearchResults};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    filter: SearchFilter,
    query: String,
}

impl CacheKey {
    /// Store matching ignores case, so queries that differ only in case (or
    /// leading whitespace) share an entry. Trailing space changes the lookup
    /// plan and is kept.
    fn new(filter: SearchFilter, raw_query: &str) -> Self {
        Self {
            filter,
            query: raw_query.trim_start().to_lowercase(),
        }
    }
}

/// Bounded LRU cache of ranked search results.
///
/// Owned by the caller and handed to the engine; call `invalidate` after
/// any write to the song store.
pub struct SearchCache {
    entries: Mutex<LruCache<CacheKey, SearchResults>>,
}

impl SearchCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, filter: SearchFilter, raw_query: &str) -> Option<SearchResults> {
        let mut entries = self.entries.lock().ok()?;
        entries.get(&CacheKey::new(filter, raw_query)).cloned()
    }

    pub fn put(&self, filter: SearchFilter, raw_query: &str, results: SearchResults) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.put(CacheKey::new(filter, raw_query), results);
        }
    }

    pub fn invalidate(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_ignore_case_but_not_trailing_space() {
        let cache = SearchCache::new(4);
        cache.put(SearchFilter::Songs, "Queen", SearchResults::Songs(vec![]));

        assert!(cache.get(SearchFilter::Songs, "queen").is_some());
        assert!(cache.get(SearchFilter::Songs, "  QUEEN").is_some());
        assert!(cache.get(SearchFilter::Songs, "queen ").is_none());
        assert!(cache.get(SearchFilter::Artists, "queen").is_none());
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = SearchCache::new(2);
        cache.put(SearchFilter::Songs, "a", SearchResults::Songs(vec![]));
        cache.put(SearchFilter::Songs, "b", SearchResults::Songs(vec![]));
        // Touch "a" so "b" becomes the eviction candidate
        assert!(cache.get(SearchFilter::Songs, "a").is_some());
        cache.put(SearchFilter::Songs, "c", SearchResults::Songs(vec![]));

        assert!(cache.get(SearchFilter::Songs, "a").is_some());
        assert!(cache.get(SearchFilter::Songs, "b").is_none());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn invalidate_clears_everything() {
        let cache = SearchCache::new(4);
        cache.put(SearchFilter::Songs, "a", SearchResults::Songs(vec![]));
        cache.invalidate();
        assert!(cache.is_empty());
    }

    #[test]
    fn zero_capacity_still_holds_one() {
        let cache = SearchCache::new(0);
        cache.put(SearchFilter::Songs, "a", SearchResults::Songs(vec![]));
        assert_eq!(cache.len(), 1);
    }
}
