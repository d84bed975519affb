//! ItemFetcher port - cache-first item retrieval.
//!
//! # 契約
//! - `get_cached`: 同期・ネットワーク待ちなし。キャッシュに無ければ `None`
//! - `get_remote`: 非同期。失敗（本文なしを含む）は `FetchError`
//!
//! Retry is not this port's concern; a failed fetch finishes its node.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Item, ItemId};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("no body returned for item {0}")]
    EmptyBody(ItemId),

    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait ItemFetcher: Send + Sync {
    /// Cached lookup; must not block on the network.
    fn get_cached(&self, id: &ItemId) -> Option<Item>;

    /// Network fetch.
    async fn get_remote(&self, id: &ItemId) -> Result<Item, FetchError>;
}
