use serde::{Deserialize, Serialize};

use crate::music::note::{NoteError, VocalRange};

/// A catalogued song.
///
/// The store owns these records; the search and range code only reads them.
/// `vocal_range` is kept as the raw `"<LowNote> - <HighNote>"` string because
/// that is how it is stored and imported. Use `Song::range()` to parse it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: i64,
    pub name: String,
    pub artist: String,
    #[serde(rename = "vocalRange")]
    pub vocal_range: String,
}

impl Song {
    pub fn range(&self) -> Result<VocalRange, NoteError> {
        VocalRange::parse(&self.vocal_range)
    }
}

/// Shape of one entry in an import file. Ids are assigned by the database
/// when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SongImport {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    pub artist: String,
    #[serde(rename = "vocalRange")]
    pub vocal_range: String,
}

/// Songs whose whole vocal range fits inside a singer's range.
/// Songs with an unparseable range are skipped.
pub fn songs_in_range<'a>(songs: &'a [Song], singer: &VocalRange) -> Vec<&'a Song> {
    songs
        .iter()
        .filter(|song| match song.range() {
            Ok(range) => range.fits_within(singer),
            Err(err) => {
                tracing::debug!(song_id = song.id, %err, "skipping song with bad range");
                false
            }
        })
        .collect()
}
