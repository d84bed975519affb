//! InMemoryDeferralStore - 開発・テスト用の DeferralStore
//!
//! Mutex で排他制御。`remove_all` はロック内で集合ごと取り出すので、
//! 並行する `add` は取り出し前か後のどちらかに必ず入る。

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::ItemId;
use crate::error::Result;
use crate::ports::DeferralStore;

#[derive(Debug, Default)]
pub struct InMemoryDeferralStore {
    ids: Mutex<BTreeSet<ItemId>>,
}

impl InMemoryDeferralStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.lock().contains(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<ItemId>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DeferralStore for InMemoryDeferralStore {
    fn add(&self, id: &ItemId) -> Result<()> {
        self.lock().insert(id.clone());
        Ok(())
    }

    fn remove(&self, id: &ItemId) -> Result<()> {
        self.lock().remove(id);
        Ok(())
    }

    fn remove_all(&self) -> Result<BTreeSet<ItemId>> {
        Ok(std::mem::take(&mut *self.lock()))
    }

    fn list(&self) -> Result<BTreeSet<ItemId>> {
        Ok(self.lock().clone())
    }
}
