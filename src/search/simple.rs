use anyhow::Result;
use serde::Serialize;

use crate::storage::song_data::Song;
use crate::storage::store::{Clause, Predicate, SongStore};

/// A song from the plain substring search, with its 0–100 score.
#[derive(Debug, Clone, Serialize)]
pub struct SimpleMatch {
    pub song: Song,
    pub score: u32,
}

/// 100 for an exact name/artist match, 75 for a prefix, 50 for a
/// substring, 0 otherwise. `query` must already be lower-cased and trimmed.
pub fn simple_score(song: &Song, query: &str) -> u32 {
    let name = song.name.to_lowercase();
    let artist = song.artist.to_lowercase();

    if name == query || artist == query {
        100
    } else if name.starts_with(query) || artist.starts_with(query) {
        75
    } else if name.contains(query) || artist.contains(query) {
        50
    } else {
        0
    }
}

/// Plain substring search over name and artist, best score first.
///
/// No fuzzy matching, no relevance cutoff and no result limit: this backs
/// the list screens that need every song containing the text.
pub fn search_songs_by_query(store: &dyn SongStore, query: &str) -> Result<Vec<SimpleMatch>> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let songs = store.find_where(&Predicate::either_field(Clause::Contains, &query))?;

    let mut matches: Vec<SimpleMatch> = songs
        .into_iter()
        .map(|song| {
            let score = simple_score(&song, &query);
            SimpleMatch { song, score }
        })
        .collect();

    matches.sort_by(|a, b| b.score.cmp(&a.score));
    Ok(matches)
}
