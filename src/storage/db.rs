use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use rusqlite::Connection;

use super::song_data::{Song, SongImport};
use super::store::{escape_like, fold_case, Clause, Predicate, SongStore};

/// Open (or create) the SQLite song catalogue at `path`.
pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database: {}", path.display()))?;

    conn.execute_batch("PRAGMA journal_mode=WAL;")
        .context("Failed to set database pragmas")?;

    init_schema(&conn)?;
    Ok(conn)
}

/// Create tables if they don't exist. Idempotent.
///
/// `name_folded` and `artist_folded` hold the Unicode-lowercased text that
/// lookups match against; SQLite's own NOCASE and LIKE only fold ASCII.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS songs (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            artist TEXT NOT NULL,
            vocal_range TEXT NOT NULL,
            name_folded TEXT NOT NULL DEFAULT '',
            artist_folded TEXT NOT NULL DEFAULT ''
        );",
    )
    .context("Failed to initialize database schema")?;

    add_folded_columns(conn)?;

    conn.execute_batch(
        "DROP INDEX IF EXISTS songs_name;
        DROP INDEX IF EXISTS songs_artist;
        CREATE INDEX IF NOT EXISTS songs_name_folded ON songs(name_folded);
        CREATE INDEX IF NOT EXISTS songs_artist_folded ON songs(artist_folded);",
    )
    .context("Failed to create song indexes")?;

    Ok(())
}

/// Add and backfill the case-folded columns on a catalogue created without
/// them. Returns the number of rows backfilled.
fn add_folded_columns(conn: &Connection) -> Result<usize> {
    let present = conn
        .prepare("SELECT 1 FROM pragma_table_info('songs') WHERE name = 'name_folded'")
        .and_then(|mut stmt| stmt.exists([]))
        .context("Failed to inspect songs table")?;
    if present {
        return Ok(0);
    }

    let tx = conn
        .unchecked_transaction()
        .context("Failed to begin case-folding migration")?;
    tx.execute_batch(
        "ALTER TABLE songs ADD COLUMN name_folded TEXT NOT NULL DEFAULT '';
        ALTER TABLE songs ADD COLUMN artist_folded TEXT NOT NULL DEFAULT '';",
    )
    .context("Failed to add case-folded columns")?;

    let rows: Vec<(i64, String, String)> = {
        let mut stmt = tx
            .prepare("SELECT id, name, artist FROM songs")
            .context("Failed to prepare backfill query")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .context("Failed to read songs for backfill")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read song row")?;
        rows
    };

    {
        let mut update = tx
            .prepare("UPDATE songs SET name_folded = ?2, artist_folded = ?3 WHERE id = ?1")
            .context("Failed to prepare backfill update")?;
        for (id, name, artist) in &rows {
            update
                .execute(rusqlite::params![id, fold_case(name), fold_case(artist)])
                .with_context(|| format!("Failed to backfill song {id}"))?;
        }
    }

    tx.commit().context("Failed to commit case-folding migration")?;
    tracing::info!(rows = rows.len(), "added case-folded song columns");
    Ok(rows.len())
}

/// Insert or replace one song. Returns its id.
pub fn upsert_song(conn: &Connection, song: &SongImport) -> Result<i64> {
    conn.execute(
        "INSERT INTO songs (id, name, artist, vocal_range, name_folded, artist_folded)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
            name = ?2,
            artist = ?3,
            vocal_range = ?4,
            name_folded = ?5,
            artist_folded = ?6",
        rusqlite::params![
            song.id,
            song.name,
            song.artist,
            song.vocal_range,
            fold_case(&song.name),
            fold_case(&song.artist)
        ],
    )
    .with_context(|| format!("Failed to upsert song: {}", song.name))?;

    Ok(song.id.unwrap_or_else(|| conn.last_insert_rowid()))
}

/// List every song, ordered by id.
pub fn list_songs(conn: &Connection) -> Result<Vec<Song>> {
    let mut stmt = conn
        .prepare("SELECT id, name, artist, vocal_range FROM songs ORDER BY id")
        .context("Failed to prepare list query")?;

    let songs = stmt
        .query_map([], row_to_song)
        .context("Failed to list songs")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to read song row")?;

    Ok(songs)
}

fn row_to_song(row: &rusqlite::Row<'_>) -> rusqlite::Result<Song> {
    Ok(Song {
        id: row.get(0)?,
        name: row.get(1)?,
        artist: row.get(2)?,
        vocal_range: row.get(3)?,
    })
}

/// Translate a predicate into a WHERE clause plus its bound parameters.
/// User text only ever travels as a parameter.
fn predicate_sql(predicate: &Predicate) -> (String, Vec<String>) {
    let (clauses, joiner) = match predicate {
        Predicate::Any(clauses) => (clauses, " OR "),
        Predicate::All(clauses) => (clauses, " AND "),
    };

    if clauses.is_empty() {
        // An empty OR matches nothing, an empty AND matches everything.
        let sql = if joiner == " OR " { "0" } else { "1" };
        return (sql.to_string(), Vec::new());
    }

    let mut params = Vec::with_capacity(clauses.len());
    let parts: Vec<String> = clauses
        .iter()
        .map(|clause| {
            let n = params.len() + 1;
            match clause {
                Clause::Equals(field, text) => {
                    params.push(fold_case(text));
                    format!("{} = ?{n}", field.folded_column())
                }
                Clause::StartsWith(field, text) => {
                    params.push(format!("{}%", escape_like(&fold_case(text))));
                    format!("{} LIKE ?{n} ESCAPE '\\'", field.folded_column())
                }
                Clause::Contains(field, text) => {
                    params.push(format!("%{}%", escape_like(&fold_case(text))));
                    format!("{} LIKE ?{n} ESCAPE '\\'", field.folded_column())
                }
            }
        })
        .collect();

    (parts.join(joiner), params)
}

/// `SongStore` backed by a single SQLite connection.
///
/// rusqlite connections are `Send` but not `Sync`, so concurrent lookups
/// take turns on the mutex.
pub struct SqliteSongStore {
    conn: Mutex<Connection>,
}

impl SqliteSongStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(open_db(path)?))
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("song database lock poisoned"))?;
        f(&conn)
    }

    /// Import a batch of songs in one transaction. Returns how many were written.
    pub fn import(&self, songs: &[SongImport], on_progress: impl Fn(usize)) -> Result<usize> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("song database lock poisoned"))?;

        let tx = conn.transaction().context("Failed to begin import")?;
        for (i, song) in songs.iter().enumerate() {
            upsert_song(&tx, song)?;
            on_progress(i + 1);
        }
        tx.commit().context("Failed to commit import")?;

        tracing::info!(count = songs.len(), "imported songs");
        Ok(songs.len())
    }

    pub fn list(&self) -> Result<Vec<Song>> {
        self.with_conn(list_songs)
    }
}

impl SongStore for SqliteSongStore {
    fn find_where(&self, predicate: &Predicate) -> Result<Vec<Song>> {
        let (where_sql, params) = predicate_sql(predicate);
        let sql = format!(
            "SELECT id, name, artist, vocal_range FROM songs WHERE {where_sql} ORDER BY id"
        );

        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&sql)
                .with_context(|| format!("Failed to prepare query: {sql}"))?;

            let songs = stmt
                .query_map(rusqlite::params_from_iter(params.iter()), row_to_song)
                .context("Failed to run song query")?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("Failed to read song row")?;

            Ok(songs)
        })
    }
}
