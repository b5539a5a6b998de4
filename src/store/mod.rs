//! The relational catalog store: `artist` and `track` tables in SQLite.

pub mod schema;

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::debug;

use crate::pipeline::{upsert, SinkError, Table, UpsertReport, UpsertSpec};

pub const ARTIST_UPSERT: UpsertSpec = UpsertSpec {
    table: "artist",
    primary_key: "id",
    mutable_columns: &["popularity", "followers", "update"],
};

pub const TRACK_UPSERT: UpsertSpec = UpsertSpec {
    table: "track",
    primary_key: "id",
    mutable_columns: &["popularity", "update"],
};

pub struct CatalogDb {
    path: PathBuf,
}

impl CatalogDb {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a connection with foreign keys enforced and the tables in place.
    pub fn connect(&self) -> Result<Connection, SinkError> {
        let conn = Connection::open(&self.path).map_err(|source| SinkError::Connection {
            path: self.path.clone(),
            source,
        })?;
        conn.pragma_update(None, "foreign_keys", true)?;
        for table in schema::TABLES {
            table.create_if_missing(&conn)?;
        }
        debug!("Opened catalog database {:?}", self.path);
        Ok(conn)
    }

    pub fn upsert_artists(&self, table: &Table) -> Result<UpsertReport, SinkError> {
        let mut conn = self.connect()?;
        upsert(table, &ARTIST_UPSERT, &mut conn)
    }

    /// Tracks reference their artist, so upsert artists first.
    pub fn upsert_tracks(&self, table: &Table) -> Result<UpsertReport, SinkError> {
        let mut conn = self.connect()?;
        upsert(table, &TRACK_UPSERT, &mut conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::schemas::{with_audio_features, ARTIST_COLUMNS, TRACK_COLUMNS};
    use crate::pipeline::{Record, Schema, TableBuilder};
    use tempfile::TempDir;

    fn artists(rows: Vec<Record>) -> Table {
        TableBuilder::new("artist", Schema::new(ARTIST_COLUMNS.iter().copied())).build(rows)
    }

    fn tracks(rows: Vec<Record>) -> Table {
        TableBuilder::new("track", Schema::new(with_audio_features(TRACK_COLUMNS))).build(rows)
    }

    fn artist(id: &str, popularity: i64, followers: i64, update: &str) -> Record {
        Record::new()
            .with("id", id)
            .with("name", format!("Artist {}", id))
            .with("popularity", popularity)
            .with("genre", "pop")
            .with("followers", followers)
            .with("update", update)
    }

    fn track(id: &str, artist_id: &str, popularity: i64, update: &str) -> Record {
        Record::new()
            .with("id", id)
            .with("name", format!("Track {}", id))
            .with("artist_id", artist_id)
            .with("popularity", popularity)
            .with("release_date", "2024-01-01")
            .with("update", update)
            .with("danceability", 0.5)
            .with("mode", true)
    }

    #[test]
    fn test_connection_failure_is_explicit() {
        let dir = TempDir::new().unwrap();
        let db = CatalogDb::new(dir.path().join("missing").join("catalog.db"));

        let err = db.upsert_artists(&artists(vec![])).unwrap_err();

        assert!(matches!(err, SinkError::Connection { .. }));
    }

    #[test]
    fn test_upsert_updates_mutable_columns_only() {
        let dir = TempDir::new().unwrap();
        let db = CatalogDb::new(dir.path().join("catalog.db"));

        db.upsert_artists(&artists(vec![artist("a1", 10, 100, "2024-01-01")]))
            .unwrap();
        let mut renamed = artist("a1", 20, 150, "2024-02-01");
        renamed.set("name", "Renamed");
        renamed.set("genre", "rock");
        let report = db.upsert_artists(&artists(vec![renamed])).unwrap();
        assert!(report.is_complete());

        let conn = db.connect().unwrap();
        let row: (String, String, i64, i64, String) = conn
            .query_row(
                r#"SELECT name, genre, popularity, followers, "update" FROM artist WHERE id = 'a1'"#,
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )
            .unwrap();
        assert_eq!(
            row,
            (
                "Artist a1".to_string(),
                "pop".to_string(),
                20,
                150,
                "2024-02-01".to_string()
            )
        );
    }

    #[test]
    fn test_track_with_unknown_artist_is_reported_not_fatal() {
        let dir = TempDir::new().unwrap();
        let db = CatalogDb::new(dir.path().join("catalog.db"));
        db.upsert_artists(&artists(vec![artist("a1", 10, 100, "2024-01-01")]))
            .unwrap();

        let report = db
            .upsert_tracks(&tracks(vec![
                track("t1", "a1", 50, "2024-01-01"),
                track("t2", "ghost", 40, "2024-01-01"),
                Record::new().with("id", "t3").with("update", "2024-01-01"),
                track("t4", "a1", 30, "2024-01-01"),
            ]))
            .unwrap();

        assert_eq!(report.written, 2);
        let failed: Vec<&str> = report.failures.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(failed, vec!["t2", "t3"]);

        let conn = db.connect().unwrap();
        let (count, mode): (i64, bool) = conn
            .query_row(
                "SELECT COUNT(*), MIN(mode) FROM track",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(count, 2);
        assert!(mode);
    }

    #[test]
    fn test_track_update_keeps_release_date() {
        let dir = TempDir::new().unwrap();
        let db = CatalogDb::new(dir.path().join("catalog.db"));
        db.upsert_artists(&artists(vec![artist("a1", 10, 100, "2024-01-01")]))
            .unwrap();
        db.upsert_tracks(&tracks(vec![track("t1", "a1", 50, "2024-01-01")]))
            .unwrap();

        let mut later = track("t1", "a1", 77, "2024-03-01");
        later.set("release_date", "1999-12-31");
        db.upsert_tracks(&tracks(vec![later])).unwrap();

        let conn = db.connect().unwrap();
        let (popularity, release_date): (i64, String) = conn
            .query_row(
                "SELECT popularity, release_date FROM track WHERE id = 't1'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(popularity, 77);
        assert_eq!(release_date, "2024-01-01");
    }
}
