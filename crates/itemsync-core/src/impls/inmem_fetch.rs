//! InMemoryItemSource - 開発・テスト用の ItemFetcher
//!
//! Items live in two maps: the "cache" (answered by `get_cached`) and the
//! "remote" (answered by `get_remote`). Remote hits are copied into the cache,
//! the way a caching HTTP client would. Ids found in neither fail with
//! `FetchError::EmptyBody`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::{Item, ItemId};
use crate::error::Result;
use crate::ports::{FetchError, ItemFetcher};

/// Fixture file shape: `{ "cached": [items...], "remote": [items...] }`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ItemFixture {
    pub cached: Vec<Item>,
    pub remote: Vec<Item>,
}

#[derive(Debug, Default)]
struct Items {
    cached: HashMap<ItemId, Item>,
    remote: HashMap<ItemId, Item>,
}

#[derive(Debug, Default)]
pub struct InMemoryItemSource {
    items: Mutex<Items>,
    remote_calls: AtomicUsize,
}

impl InMemoryItemSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: ItemFixture) -> Self {
        let source = Self::new();
        for item in fixture.cached {
            source.insert_cached(item);
        }
        for item in fixture.remote {
            source.insert_remote(item);
        }
        source
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let fixture: ItemFixture = serde_json::from_str(&content)?;
        Ok(Self::from_fixture(fixture))
    }

    pub fn insert_cached(&self, item: Item) {
        self.lock().cached.insert(item.id.clone(), item);
    }

    pub fn insert_remote(&self, item: Item) {
        self.lock().remote.insert(item.id.clone(), item);
    }

    /// Number of `get_remote` calls so far.
    pub fn remote_calls(&self) -> usize {
        self.remote_calls.load(Ordering::SeqCst)
    }

    pub fn is_cached(&self, id: &ItemId) -> bool {
        self.lock().cached.contains_key(id)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Items> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ItemFetcher for InMemoryItemSource {
    fn get_cached(&self, id: &ItemId) -> Option<Item> {
        self.lock().cached.get(id).cloned()
    }

    async fn get_remote(&self, id: &ItemId) -> std::result::Result<Item, FetchError> {
        self.remote_calls.fetch_add(1, Ordering::SeqCst);
        let mut items = self.lock();
        let item = items
            .remote
            .get(id)
            .cloned()
            .ok_or_else(|| FetchError::EmptyBody(id.clone()))?;
        items.cached.insert(id.clone(), item.clone());
        Ok(item)
    }
}
