//! FileDeferralStore - JSON ファイルに永続化する DeferralStore
//!
//! File shape is a flat object of remembered ids: `{ "8863": true, ... }`.
//! Every mutation rewrites the file through a temp file + rename while the
//! lock is held, so the file never lags behind a completed call. Memory is
//! only updated after the write lands; a failed call changes nothing.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::domain::ItemId;
use crate::error::{Result, SyncError};
use crate::ports::DeferralStore;

#[derive(Debug)]
pub struct FileDeferralStore {
    path: PathBuf,
    ids: Mutex<BTreeSet<ItemId>>,
}

impl FileDeferralStore {
    /// Open (or lazily create) the store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let ids = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeSet::new()
            } else {
                let entries: BTreeMap<String, bool> = serde_json::from_str(&content)?;
                entries.into_keys().map(ItemId::new).collect()
            }
        } else {
            BTreeSet::new()
        };
        debug!(path = %path.display(), count = ids.len(), "opened deferral store");
        Ok(Self {
            path,
            ids: Mutex::new(ids),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<ItemId>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, ids: &BTreeSet<ItemId>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let entries: BTreeMap<&str, bool> = ids.iter().map(|id| (id.as_str(), true)).collect();
        let content = serde_json::to_string_pretty(&entries)?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| SyncError::Store(format!("{}: {e}", self.path.display())))
    }
}

impl DeferralStore for FileDeferralStore {
    fn add(&self, id: &ItemId) -> Result<()> {
        let mut ids = self.lock();
        if ids.contains(id) {
            return Ok(());
        }
        let mut next = ids.clone();
        next.insert(id.clone());
        self.persist(&next)?;
        *ids = next;
        Ok(())
    }

    fn remove(&self, id: &ItemId) -> Result<()> {
        let mut ids = self.lock();
        if !ids.contains(id) {
            return Ok(());
        }
        let mut next = ids.clone();
        next.remove(id);
        self.persist(&next)?;
        *ids = next;
        Ok(())
    }

    fn remove_all(&self) -> Result<BTreeSet<ItemId>> {
        let mut ids = self.lock();
        if ids.is_empty() {
            return Ok(BTreeSet::new());
        }
        self.persist(&BTreeSet::new())?;
        Ok(std::mem::take(&mut *ids))
    }

    fn list(&self) -> Result<BTreeSet<ItemId>> {
        Ok(self.lock().clone())
    }
}
