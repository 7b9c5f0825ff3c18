//! Persistence for ferment records.
//!
//! Two interchangeable backends sit behind [`FermentStore`]:
//!
//! - [`MockStore`]: demo mode. Every record lives in one JSON document in a
//!   fixed slot on disk.
//! - [`SqliteStore`]: the relational store. Tolerates tables that predate
//!   the detail columns by stashing details inside `notes` (see [`envelope`]).
//!
//! The backend is picked once at startup by [`open`] and never re-checked.

pub mod envelope;
mod mock;
mod sqlite;

use std::{io, path::PathBuf};

use crate::config::DeploymentMode;
use crate::model::{Ferment, FermentId, FermentPatch, NewFerment};

pub use mock::MockStore;
use sqlite::SqliteStore;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("ferment not found: {0}")]
    NotFound(FermentId),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type Result<T> = core::result::Result<T, StorageError>;

/// Reads and writes ferment records.
pub trait FermentStore {
    /// All batches owned by `owner`, newest start first.
    fn list(&self, owner: &str) -> Result<Vec<Ferment>>;

    /// A single batch, or `None` if no record has this id.
    fn get(&self, id: &FermentId) -> Result<Option<Ferment>>;

    /// Stores a new batch and returns it with its assigned id and creation time.
    fn insert(&self, record: &NewFerment) -> Result<Ferment>;

    /// Applies a partial update to an existing batch.
    fn update(&self, id: &FermentId, patch: &FermentPatch) -> Result<()>;
}

/// Opens the backend selected by the deployment mode.
pub fn open(mode: &DeploymentMode) -> Result<Box<dyn FermentStore>> {
    match mode {
        DeploymentMode::Demo { root } => {
            tracing::debug!(root = %root.display(), "using mock store");
            Ok(Box::new(MockStore::new(root)?))
        }
        DeploymentMode::Relational { database } => {
            tracing::debug!(database = %database.display(), "using relational store");
            Ok(Box::new(SqliteStore::open(database)?))
        }
    }
}

/// Returns the default data root: `~/.kefir/`.
pub fn default_root() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".kefir"))
}

/// Newest start first, the order every listing uses.
fn sort_newest_first(ferments: &mut [Ferment]) {
    ferments.sort_by(|a, b| b.start_time.cmp(&a.start_time));
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    use crate::model::{Details, KefirKind};

    fn new_ferment(owner: &str) -> NewFerment {
        NewFerment {
            owner: owner.into(),
            kind: KefirKind::Water,
            start_time: jiff::Timestamp::new(1_700_000_000, 0).unwrap(),
            target_hours: 96.0,
            notes: None,
            details: Details::default(),
        }
    }

    #[test]
    fn open_demo_mode_uses_mock_slot() {
        let dir = TempDir::new().unwrap();
        let mode = DeploymentMode::Demo {
            root: dir.path().to_path_buf(),
        };
        let store = open(&mode).unwrap();
        store.insert(&new_ferment("u")).unwrap();

        assert!(dir.path().join(mock::SLOT).exists());
        assert_eq!(store.list("u").unwrap().len(), 1);
    }

    #[test]
    fn open_relational_mode_creates_database() {
        let dir = TempDir::new().unwrap();
        let database = dir.path().join("ferments.sqlite");
        let mode = DeploymentMode::Relational {
            database: database.clone(),
        };
        let store = open(&mode).unwrap();
        store.insert(&new_ferment("u")).unwrap();

        assert!(database.exists());
        assert_eq!(store.list("u").unwrap().len(), 1);
    }
}
