//! Events - per-run aggregator messages.
//!
//! Tree-walk tasks never touch the aggregator directly; they send these
//! over the run's channel and the aggregator loop applies them in order.

use super::ids::ItemId;
use super::item::Item;

#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A node missed the cache and a remote fetch was issued.
    FetchStarted { id: ItemId },

    /// A node resolved. `item` is `None` when the fetch failed.
    ///
    /// The flags carry what the walk decided to do next for this node, so
    /// the aggregate reserves exactly the work that will report back.
    ItemResolved {
        id: ItemId,
        item: Option<Item>,
        kids_enabled: bool,
        readability_enabled: bool,
    },

    /// A node id reached again in the same run (a repeated kid, a reply
    /// shared by two parents, or the root listed as its own kid).
    ///
    /// It is not resolved twice, but its parent reserved a slot for it.
    Revisited { id: ItemId },

    /// Readability extraction finished for the root story.
    ReadabilityDone { id: ItemId },

    /// Article render progress (`current` out of `max`).
    ArticleProgress { current: u32, max: u32 },
}

impl SyncEvent {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncEvent::FetchStarted { .. } => "fetch_started",
            SyncEvent::ItemResolved { .. } => "item_resolved",
            SyncEvent::Revisited { .. } => "revisited",
            SyncEvent::ReadabilityDone { .. } => "readability_done",
            SyncEvent::ArticleProgress { .. } => "article_progress",
        }
    }
}
