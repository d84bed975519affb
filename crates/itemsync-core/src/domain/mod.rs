//! Domain model (ids, items, jobs, progress, events).
//!
//! I/O を持たない型だけを置く。外部とのやり取りは `ports` 経由。

pub mod events;
pub mod ids;
pub mod item;
pub mod job;
pub mod progress;
pub mod state;

pub use events::SyncEvent;
pub use ids::{ItemId, RunId};
pub use item::Item;
pub use job::{ExtraValue, JobExtras, SyncJob};
pub use progress::{ARTICLE_PROGRESS_MAX, ProgressSnapshot, SyncProgress};
pub use state::{ReadabilityState, RunState, SelfState};
