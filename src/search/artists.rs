use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;

use crate::storage::song_data::Song;
use crate::storage::store::{fold_case, Clause, Field, Predicate, SongStore};

/// An artist with the catalogued songs that carry a usable vocal range.
#[derive(Debug, Clone, Serialize)]
pub struct ArtistSummary {
    pub name: String,
    pub songs: Vec<Song>,
    pub song_count: usize,
}

/// Group `songs` by artist and attach each artist's full, range-bearing
/// catalogue from the store.
///
/// Artists left with no qualifying songs are dropped. With a query, artists
/// whose name contains it come first; then more songs first, then name.
/// Per-artist lookups run concurrently; one failing only drops that artist.
pub async fn derive_artists(
    store: Arc<dyn SongStore>,
    songs: &[Song],
    limit: usize,
    query: Option<&str>,
) -> Vec<ArtistSummary> {
    // Lookups ignore case, so spellings that differ only in case are one
    // artist; the first spelling seen names the summary.
    let mut names: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for song in songs {
        if seen.insert(fold_case(&song.artist)) {
            names.push(song.artist.clone());
        }
    }

    let mut tasks = JoinSet::new();
    for name in names {
        let store = Arc::clone(&store);
        tasks.spawn_blocking(move || {
            let predicate = Predicate::All(vec![Clause::Equals(Field::Artist, name.clone())]);
            let result = store.find_where(&predicate);
            (name, result)
        });
    }

    let mut catalogue: HashMap<String, Vec<Song>> = HashMap::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((name, Ok(found))) => {
                let with_range: Vec<Song> = found.into_iter().filter(|s| s.range().is_ok()).collect();
                catalogue.insert(name, with_range);
            }
            Ok((name, Err(err))) => {
                tracing::warn!(artist = %name, "artist lookup failed: {err:#}");
            }
            Err(err) => tracing::warn!(%err, "artist lookup task did not complete"),
        }
    }

    let mut artists: Vec<ArtistSummary> = catalogue
        .into_iter()
        .filter(|(_, songs)| !songs.is_empty())
        .map(|(name, songs)| ArtistSummary {
            song_count: songs.len(),
            name,
            songs,
        })
        .collect();

    let query = query
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());

    artists.sort_by(|a, b| {
        let by_query = match &query {
            Some(q) => {
                let a_hit = a.name.to_lowercase().contains(q.as_str());
                let b_hit = b.name.to_lowercase().contains(q.as_str());
                b_hit.cmp(&a_hit)
            }
            None => std::cmp::Ordering::Equal,
        };
        by_query
            .then_with(|| b.song_count.cmp(&a.song_count))
            .then_with(|| a.name.cmp(&b.name))
    });

    artists.truncate(limit);
    artists
}
