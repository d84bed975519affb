//! DeferralStore port - durable set of postponed item ids.
//!
//! # 設計原則
//! - ジョブ間で共有される唯一のリソース。並行 `add` と `remove_all` に耐えること
//! - `remove_all` の実行中に追加された id は失われてはならない
//!   （次の flush で拾えればよい）

use std::collections::BTreeSet;

use crate::domain::ItemId;
use crate::error::Result;

pub trait DeferralStore: Send + Sync {
    /// Remember `id` for a later flush. Idempotent.
    fn add(&self, id: &ItemId) -> Result<()>;

    /// Forget `id` once it has actually been processed.
    fn remove(&self, id: &ItemId) -> Result<()>;

    /// Drain every remembered id atomically.
    fn remove_all(&self) -> Result<BTreeSet<ItemId>>;

    /// Current contents, without draining.
    fn list(&self) -> Result<BTreeSet<ItemId>>;
}
