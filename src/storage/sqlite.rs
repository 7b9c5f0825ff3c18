//! Relational store: ferments in a `SQLite` table.
//!
//! The store generates `id` and `created_at` itself. Tables created before
//! the detail columns existed are left as they are: inserts that the table
//! rejects are retried with the details folded into `notes` through the
//! fallback envelope, and every read is passed back through the decoder.

use std::path::Path;

use jiff::Timestamp;
use rusqlite::{Connection, OptionalExtension, Row, types::FromSql};

use crate::model::{Details, Ferment, FermentId, FermentPatch, NewFerment};

use super::{FermentStore, Result, StorageError, envelope};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS ferments (
    id           TEXT PRIMARY KEY NOT NULL DEFAULT (lower(hex(randomblob(16)))),
    user_id      TEXT NOT NULL,
    type         TEXT NOT NULL,
    start_time   TEXT NOT NULL,
    target_hours REAL NOT NULL,
    end_time     TEXT,
    status       TEXT NOT NULL DEFAULT 'fermenting',
    notes        TEXT,
    created_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    milk_type    TEXT,
    milk_volume  REAL,
    sugar_type   TEXT,
    sugar_amount REAL,
    water_volume REAL
);
CREATE INDEX IF NOT EXISTS ferments_owner_start ON ferments (user_id, start_time DESC);
";

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`.
    ///
    /// The full table is created only when no `ferments` table exists yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Insert with every column, detail columns included.
    fn insert_direct(&self, record: &NewFerment) -> rusqlite::Result<RawRow> {
        let d = &record.details;
        self.conn.query_row(
            "INSERT INTO ferments (user_id, type, start_time, target_hours, status, notes,
                                   milk_type, milk_volume, sugar_type, sugar_amount, water_volume)
             VALUES (?1, ?2, ?3, ?4, 'fermenting', ?5, ?6, ?7, ?8, ?9, ?10)
             RETURNING *",
            rusqlite::params![
                &record.owner,
                record.kind.as_str(),
                format_timestamp(record.start_time),
                record.target_hours,
                &record.notes,
                &d.milk_type,
                d.milk_volume_ml,
                &d.sugar_type,
                d.sugar_amount_g,
                d.water_volume_ml,
            ],
            RawRow::from_row,
        )
    }

    /// Insert without detail columns; details ride inside `notes`.
    fn insert_enveloped(&self, record: &NewFerment) -> Result<RawRow> {
        let notes = envelope::encode(record.notes.as_deref(), &record.details)?;
        let row = self.conn.query_row(
            "INSERT INTO ferments (user_id, type, start_time, target_hours, status, notes)
             VALUES (?1, ?2, ?3, ?4, 'fermenting', ?5)
             RETURNING *",
            rusqlite::params![
                &record.owner,
                record.kind.as_str(),
                format_timestamp(record.start_time),
                record.target_hours,
                notes,
            ],
            RawRow::from_row,
        )?;
        Ok(row)
    }
}

impl FermentStore for SqliteStore {
    fn list(&self, owner: &str) -> Result<Vec<Ferment>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM ferments WHERE user_id = ?1 ORDER BY start_time DESC")?;
        let rows = stmt.query_map([owner], RawRow::from_row)?;
        let mut ferments = Vec::new();
        // Rows that fail to parse are skipped so the rest stay visible.
        for row in rows {
            let row = row?;
            let id = row.id.clone();
            match row.into_ferment() {
                Ok(ferment) => ferments.push(ferment),
                Err(e) => tracing::warn!(%id, error = %e, "skipping unreadable ferment row"),
            }
        }
        Ok(ferments)
    }

    fn get(&self, id: &FermentId) -> Result<Option<Ferment>> {
        self.conn
            .query_row(
                "SELECT * FROM ferments WHERE id = ?1",
                [id.as_str()],
                RawRow::from_row,
            )
            .optional()?
            .map(RawRow::into_ferment)
            .transpose()
    }

    fn insert(&self, record: &NewFerment) -> Result<Ferment> {
        // Only a rejected statement falls back. Once a row is written, a
        // read-back failure is reported as is.
        let row = match self.insert_direct(record) {
            Ok(row) => row,
            Err(e) => {
                tracing::info!(
                    error = %e,
                    "direct insert rejected; retrying with details folded into notes"
                );
                self.insert_enveloped(record)?
            }
        };
        row.into_ferment()
    }

    fn update(&self, id: &FermentId, patch: &FermentPatch) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE ferments
             SET status = COALESCE(?1, status),
                 end_time = COALESCE(?2, end_time),
                 target_hours = COALESCE(?3, target_hours)
             WHERE id = ?4",
            rusqlite::params![
                patch.status.map(|s| s.as_str()),
                patch.end_time.map(format_timestamp),
                patch.target_hours,
                id.as_str(),
            ],
        )?;
        if rows == 0 {
            return Err(StorageError::NotFound(id.clone()));
        }
        Ok(())
    }
}

/// Fixed nanosecond precision so text ordering matches time ordering.
fn format_timestamp(ts: Timestamp) -> String {
    format!("{ts:.9}")
}

/// Column values of one row, before parsing.
struct RawRow {
    id: String,
    user_id: String,
    kind: String,
    start_time: String,
    target_hours: f64,
    end_time: Option<String>,
    status: String,
    notes: Option<String>,
    created_at: String,
    details: Details,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            kind: row.get("type")?,
            start_time: row.get("start_time")?,
            target_hours: row.get("target_hours")?,
            end_time: row.get("end_time")?,
            status: row.get("status")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            details: Details {
                milk_type: optional_column(row, "milk_type")?,
                milk_volume_ml: optional_column(row, "milk_volume")?,
                sugar_type: optional_column(row, "sugar_type")?,
                sugar_amount_g: optional_column(row, "sugar_amount")?,
                water_volume_ml: optional_column(row, "water_volume")?,
            },
        })
    }

    /// Parses the row and decodes any fallback envelope in `notes`.
    fn into_ferment(self) -> Result<Ferment> {
        let ferment = Ferment {
            id: FermentId::new(self.id),
            owner: self.user_id,
            kind: self.kind.parse().map_err(StorageError::Corrupt)?,
            start_time: parse_timestamp("start_time", &self.start_time)?,
            target_hours: self.target_hours,
            end_time: self
                .end_time
                .as_deref()
                .map(|s| parse_timestamp("end_time", s))
                .transpose()?,
            status: self.status.parse().map_err(StorageError::Corrupt)?,
            notes: self.notes,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            details: self.details,
        };
        let ferment = envelope::restore(ferment);
        if let Err(e) = ferment.validate() {
            tracing::warn!(id = %ferment.id, error = %e, "stored ferment breaks record invariants");
        }
        Ok(ferment)
    }
}

/// Reads a column that older tables may not have. A missing column reads
/// as `None`.
fn optional_column<T: FromSql>(row: &Row<'_>, name: &str) -> rusqlite::Result<Option<T>> {
    let stmt: &rusqlite::Statement<'_> = row.as_ref();
    match stmt.column_index(name) {
        Ok(idx) => row.get(idx),
        Err(rusqlite::Error::InvalidColumnName(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

fn parse_timestamp(column: &str, value: &str) -> Result<Timestamp> {
    value
        .parse::<Timestamp>()
        .map_err(|e| StorageError::Corrupt(format!("invalid {column}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    use crate::model::{FermentStatus, KefirKind};

    /// A table from before the detail columns were added.
    const LEGACY_SCHEMA: &str = "
        CREATE TABLE ferments (
            id           TEXT PRIMARY KEY NOT NULL DEFAULT (lower(hex(randomblob(16)))),
            user_id      TEXT NOT NULL,
            type         TEXT NOT NULL,
            start_time   TEXT NOT NULL,
            target_hours REAL NOT NULL,
            end_time     TEXT,
            status       TEXT NOT NULL DEFAULT 'fermenting',
            notes        TEXT,
            created_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );
    ";

    fn test_store() -> (TempDir, SqliteStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(dir.path().join("ferments.sqlite")).unwrap();
        (dir, store)
    }

    fn legacy_store() -> (TempDir, SqliteStore) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("legacy.sqlite");
        Connection::open(&path)
            .unwrap()
            .execute_batch(LEGACY_SCHEMA)
            .unwrap();
        let store = SqliteStore::open(&path).unwrap();
        (dir, store)
    }

    fn raw_notes(store: &SqliteStore, id: &FermentId) -> Option<String> {
        store
            .conn
            .query_row(
                "SELECT notes FROM ferments WHERE id = ?1",
                [id.as_str()],
                |row| row.get(0),
            )
            .unwrap()
    }

    fn water_ferment(start_secs: i64) -> NewFerment {
        NewFerment {
            owner: "u".into(),
            kind: KefirKind::Water,
            start_time: Timestamp::new(start_secs, 0).unwrap(),
            target_hours: 96.0,
            notes: Some("lemon and fig".into()),
            details: Details {
                sugar_type: Some("panela".into()),
                sugar_amount_g: Some(60.0),
                water_volume_ml: Some(1000.0),
                ..Details::default()
            },
        }
    }

    #[test]
    fn insert_direct_keeps_details_in_columns() {
        let (_dir, store) = test_store();
        let inserted = store.insert(&water_ferment(1_000)).unwrap();

        assert_eq!(inserted.details, water_ferment(1_000).details);
        assert_eq!(inserted.notes.as_deref(), Some("lemon and fig"));
        assert_eq!(inserted.status, FermentStatus::Fermenting);
        assert!(inserted.end_time.is_none());

        // No envelope on the happy path.
        assert_eq!(
            raw_notes(&store, &inserted.id).as_deref(),
            Some("lemon and fig")
        );
    }

    #[test]
    fn insert_assigns_id_and_created_at() {
        let (_dir, store) = test_store();
        let a = store.insert(&water_ferment(1_000)).unwrap();
        let b = store.insert(&water_ferment(1_000)).unwrap();

        assert_ne!(a.id, b.id);
        assert!(!a.id.as_str().is_empty());
        assert!(a.created_at.as_second() > 0);
    }

    #[test]
    fn insert_falls_back_on_legacy_table() {
        let (_dir, store) = legacy_store();
        let inserted = store.insert(&water_ferment(1_000)).unwrap();

        assert_eq!(inserted.details, water_ferment(1_000).details);
        assert_eq!(inserted.notes.as_deref(), Some("lemon and fig"));

        let raw = raw_notes(&store, &inserted.id).unwrap();
        assert!(raw.starts_with(envelope::PREFIX));
    }

    #[test]
    fn legacy_reads_decode_envelope() {
        let (_dir, store) = legacy_store();
        let inserted = store.insert(&water_ferment(1_000)).unwrap();

        let loaded = store.get(&inserted.id).unwrap().unwrap();
        assert_eq!(loaded.details, water_ferment(1_000).details);
        assert_eq!(loaded.notes.as_deref(), Some("lemon and fig"));

        let listed = store.list("u").unwrap();
        assert_eq!(listed, vec![loaded]);
    }

    #[test]
    fn insert_fails_when_both_attempts_fail() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.sqlite");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE ferments (id TEXT PRIMARY KEY, user_id TEXT, start_time TEXT);")
            .unwrap();
        let store = SqliteStore::open(&path).unwrap();

        let err = store.insert(&water_ferment(1_000)).unwrap_err();
        assert!(matches!(err, StorageError::Sqlite(_)));
    }

    #[test]
    fn list_filters_by_owner_sorted_newest_first() {
        let (_dir, store) = test_store();
        store.insert(&water_ferment(1_000)).unwrap();
        store.insert(&water_ferment(3_000)).unwrap();
        let mut other = water_ferment(9_000);
        other.owner = "someone-else".into();
        store.insert(&other).unwrap();
        store.insert(&water_ferment(2_000)).unwrap();

        let starts: Vec<i64> = store
            .list("u")
            .unwrap()
            .iter()
            .map(|f| f.start_time.as_second())
            .collect();
        assert_eq!(starts, vec![3_000, 2_000, 1_000]);
    }

    #[test]
    fn unreadable_created_at_is_not_inserted_twice() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain-default.sqlite");
        Connection::open(&path)
            .unwrap()
            .execute_batch(
                "CREATE TABLE ferments (
                    id           TEXT PRIMARY KEY NOT NULL DEFAULT (lower(hex(randomblob(16)))),
                    user_id      TEXT NOT NULL,
                    type         TEXT NOT NULL,
                    start_time   TEXT NOT NULL,
                    target_hours REAL NOT NULL,
                    end_time     TEXT,
                    status       TEXT NOT NULL DEFAULT 'fermenting',
                    notes        TEXT,
                    created_at   TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                    milk_type    TEXT,
                    milk_volume  REAL,
                    sugar_type   TEXT,
                    sugar_amount REAL,
                    water_volume REAL
                );",
            )
            .unwrap();
        let store = SqliteStore::open(&path).unwrap();

        let err = store.insert(&water_ferment(1_000)).unwrap_err();
        assert!(matches!(err, StorageError::Corrupt(_)));

        let rows: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM ferments", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn list_skips_unreadable_rows() {
        let (_dir, store) = test_store();
        let good = store.insert(&water_ferment(1_000)).unwrap();
        let bad = store.insert(&water_ferment(2_000)).unwrap();
        store
            .conn
            .execute(
                "UPDATE ferments SET status = 'bubbling' WHERE id = ?1",
                [bad.id.as_str()],
            )
            .unwrap();

        assert_eq!(store.list("u").unwrap(), vec![good]);
    }

    #[test]
    fn list_orders_sub_second_starts() {
        let (_dir, store) = test_store();
        store.insert(&water_ferment(1_000)).unwrap();
        let mut later = water_ferment(1_000);
        later.start_time = Timestamp::new(1_000, 500_000_000).unwrap();
        store.insert(&later).unwrap();

        let listed = store.list("u").unwrap();
        assert_eq!(listed[0].start_time, later.start_time);
    }

    #[test]
    fn get_missing_is_none() {
        let (_dir, store) = test_store();
        assert!(store.get(&FermentId::new("nope")).unwrap().is_none());
    }

    #[test]
    fn update_end_and_extend() {
        let (_dir, store) = test_store();
        let inserted = store.insert(&water_ferment(1_000)).unwrap();

        store
            .update(&inserted.id, &FermentPatch::target_hours(100.0))
            .unwrap();
        let end = Timestamp::new(400_000, 0).unwrap();
        store
            .update(&inserted.id, &FermentPatch::end(FermentStatus::Archived, end))
            .unwrap();

        let loaded = store.get(&inserted.id).unwrap().unwrap();
        assert_eq!(loaded.target_hours, 100.0);
        assert_eq!(loaded.status, FermentStatus::Archived);
        assert_eq!(loaded.end_time, Some(end));
        assert_eq!(loaded.details, inserted.details);
    }

    #[test]
    fn update_legacy_row_keeps_envelope() {
        let (_dir, store) = legacy_store();
        let inserted = store.insert(&water_ferment(1_000)).unwrap();
        store
            .update(&inserted.id, &FermentPatch::target_hours(120.0))
            .unwrap();

        let loaded = store.get(&inserted.id).unwrap().unwrap();
        assert_eq!(loaded.target_hours, 120.0);
        assert_eq!(loaded.details, water_ferment(1_000).details);
    }

    #[test]
    fn update_missing_fails() {
        let (_dir, store) = test_store();
        let err = store
            .update(&FermentId::new("nope"), &FermentPatch::target_hours(1.0))
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[test]
    fn corrupt_status_is_reported() {
        let (_dir, store) = test_store();
        let inserted = store.insert(&water_ferment(1_000)).unwrap();
        store
            .conn
            .execute(
                "UPDATE ferments SET status = 'bubbling' WHERE id = ?1",
                [inserted.id.as_str()],
            )
            .unwrap();

        let err = store.get(&inserted.id).unwrap_err();
        assert!(matches!(err, StorageError::Corrupt(_)));
    }
}
