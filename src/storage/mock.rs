//! Mock store: every ferment for every user in one JSON document.
//!
//! The document lives in a fixed slot under the data root. A missing file is
//! a valid empty collection. Each write rewrites the whole document.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::model::{Ferment, FermentId, FermentPatch, NewFerment};

use super::{FermentStore, Result, StorageError, sort_newest_first};

/// File name of the storage slot.
pub(super) const SLOT: &str = "mock-ferments.json";

pub struct MockStore {
    path: PathBuf,
}

impl MockStore {
    /// Creates a mock store rooted at the given directory.
    ///
    /// The directory is created if it doesn't exist.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root)?;
        Ok(Self {
            path: root.join(SLOT),
        })
    }

    fn load_all(&self) -> Result<Vec<Ferment>> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if json.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&json)?)
    }

    fn save_all(&self, ferments: &[Ferment]) -> Result<()> {
        let json = serde_json::to_string_pretty(ferments)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl FermentStore for MockStore {
    fn list(&self, owner: &str) -> Result<Vec<Ferment>> {
        let mut ferments: Vec<Ferment> = self
            .load_all()?
            .into_iter()
            .filter(|f| f.owner == owner)
            .collect();
        sort_newest_first(&mut ferments);
        Ok(ferments)
    }

    fn get(&self, id: &FermentId) -> Result<Option<Ferment>> {
        Ok(self.load_all()?.into_iter().find(|f| &f.id == id))
    }

    fn insert(&self, record: &NewFerment) -> Result<Ferment> {
        let mut ferments = self.load_all()?;
        let ferment = record
            .clone()
            .into_ferment(FermentId::random(), record.start_time);
        ferments.insert(0, ferment.clone());
        self.save_all(&ferments)?;
        Ok(ferment)
    }

    fn update(&self, id: &FermentId, patch: &FermentPatch) -> Result<()> {
        let mut ferments = self.load_all()?;
        let ferment = ferments
            .iter_mut()
            .find(|f| &f.id == id)
            .ok_or_else(|| StorageError::NotFound(id.clone()))?;
        patch.apply(ferment);
        self.save_all(&ferments)
    }
}
