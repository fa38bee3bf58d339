// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capped, newest-first store of user-saved chart artifacts.
//!
//! Backed by a single JSON file. A corrupt or missing file reads as
//! empty; reads and writes serialise through one lock.

use crate::error::StorageError;
use cw_core::{DatasetId, SavedChart, SavedChartId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Maximum number of saved charts kept.
pub const SAVED_CAP: usize = 200;

#[derive(Debug, Default, Serialize, Deserialize)]
struct SavedFile {
    items: Vec<SavedChart>,
}

/// File-backed saved-chart store.
pub struct SavedChartStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SavedChartStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Insert at the head and trim to [`SAVED_CAP`].
    pub fn add(&self, item: SavedChart) -> Result<SavedChart, StorageError> {
        let _guard = self.lock.lock();
        let mut data = self.load();
        data.items.insert(0, item.clone());
        data.items.truncate(SAVED_CAP);
        self.save(&data)?;
        Ok(item)
    }

    /// Newest-first listing, optionally filtered by dataset.
    pub fn list(&self, dataset_id: Option<&DatasetId>) -> Vec<SavedChart> {
        let _guard = self.lock.lock();
        let items = self.load().items;
        match dataset_id {
            Some(id) => items
                .into_iter()
                .filter(|item| &item.dataset_id == id)
                .collect(),
            None => items,
        }
    }

    /// Remove by id. Returns whether an item was removed.
    pub fn delete(&self, id: &SavedChartId) -> Result<bool, StorageError> {
        let _guard = self.lock.lock();
        let mut data = self.load();
        let before = data.items.len();
        data.items.retain(|item| &item.id != id);
        if data.items.len() == before {
            return Ok(false);
        }
        self.save(&data)?;
        Ok(true)
    }

    fn load(&self) -> SavedFile {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %self.path.display(), error = %e, "corrupt saved-chart file, treating as empty");
                SavedFile::default()
            }),
            Err(_) => SavedFile::default(),
        }
    }

    fn save(&self, data: &SavedFile) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(data)?)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "saved_tests.rs"]
mod tests;
