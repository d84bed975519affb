//! SyncProgress - per-job progress aggregator.
//!
//! Pure state machine, no I/O. The coordinator's aggregator loop is the only
//! writer.
//!
//! ```text
//! max      = 1 (self) + total_kids + (1 if readability tracked) + max_web_progress
//! progress = (1 if self resolved) + finished_kids + (1 if readability done) + web_progress
//! ```
//!
//! `total_kids` starts provisional (1 when comments are enabled) and is
//! replaced exactly once, by the self transition. After that it only grows,
//! as resolved descendants reveal their own replies.

use serde::Serialize;

use super::ids::ItemId;
use super::item::Item;
use super::job::SyncJob;
use super::state::{ReadabilityState, SelfState};

/// Slots reserved for article rendering progress (percent).
pub const ARTICLE_PROGRESS_MAX: u32 = 100;

#[derive(Debug, Clone)]
pub struct SyncProgress {
    id: ItemId,
    self_state: SelfState,
    total_kids: u32,
    finished_kids: u32,
    readability: ReadabilityState,
    web_progress: u32,
    max_web_progress: u32,
    title: Option<String>,
}

/// Point-in-time copy of the aggregate, for notifications and status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub title: Option<String>,
    pub progress: u32,
    pub max: u32,
}

impl SyncProgress {
    pub fn new(job: &SyncJob) -> Self {
        Self {
            id: job.id.clone(),
            self_state: SelfState::Unknown,
            total_kids: u32::from(job.comments_enabled),
            finished_kids: 0,
            readability: if job.readability_enabled {
                ReadabilityState::Pending
            } else {
                ReadabilityState::Disabled
            },
            web_progress: 0,
            max_web_progress: if job.article_enabled {
                ARTICLE_PROGRESS_MAX
            } else {
                0
            },
            title: None,
        }
    }

    /// Record that node `id` resolved, with or without an item.
    ///
    /// The root id takes the self transition; any other id is a child.
    /// A failed fetch (`item == None`) still finishes its slot.
    pub fn finish_item(
        &mut self,
        id: &ItemId,
        item: Option<&Item>,
        kids_enabled: bool,
        readability_enabled: bool,
    ) {
        if *id == self.id {
            self.finish_self(item, kids_enabled, readability_enabled);
        } else {
            self.finish_kid(item, kids_enabled);
        }
    }

    /// Fill the slot a parent reserved for an id that was already resolved
    /// in this run. Reveals no new kids.
    pub fn finish_revisit(&mut self) {
        self.finished_kids += 1;
    }

    /// Mark readability extraction done. No-op unless it is being tracked.
    pub fn finish_readability(&mut self) {
        if self.readability == ReadabilityState::Pending {
            self.readability = ReadabilityState::Done;
        }
    }

    /// Update article render progress.
    ///
    /// A changed `max` replaces the slot size (used once, when the root
    /// resolves); otherwise progress never moves backwards.
    pub fn update_article(&mut self, current: u32, max: u32) {
        let current = current.min(max);
        if max != self.max_web_progress {
            self.max_web_progress = max;
            self.web_progress = current;
        } else {
            self.web_progress = self.web_progress.max(current);
        }
    }

    pub fn max(&self) -> u32 {
        1 + self.total_kids + u32::from(self.readability.is_tracked()) + self.max_web_progress
    }

    /// Current progress, never above [`max`](Self::max).
    pub fn progress(&self) -> u32 {
        let raw = u32::from(self.self_state.is_resolved())
            + self.finished_kids
            + u32::from(self.readability.is_done())
            + self.web_progress;
        raw.min(self.max())
    }

    pub fn is_done(&self) -> bool {
        self.progress() >= self.max()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn self_state(&self) -> SelfState {
        self.self_state
    }

    pub fn readability(&self) -> ReadabilityState {
        self.readability
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            title: self.title.clone(),
            progress: self.progress(),
            max: self.max(),
        }
    }

    fn finish_self(&mut self, item: Option<&Item>, kids_enabled: bool, readability_enabled: bool) {
        // the correction is applied once per job
        if self.self_state.is_resolved() {
            return;
        }
        self.self_state = if item.is_some() {
            SelfState::Found
        } else {
            SelfState::Missing
        };
        self.title = item.and_then(|i| i.title.clone());
        self.total_kids = if kids_enabled {
            item.map_or(0, kid_count)
        } else {
            0
        };
        self.readability = if readability_enabled {
            ReadabilityState::Pending
        } else {
            ReadabilityState::Disabled
        };
    }

    fn finish_kid(&mut self, item: Option<&Item>, kids_enabled: bool) {
        self.finished_kids += 1;
        // before the self transition this only fills the provisional slot
        if self.self_state.is_resolved() && kids_enabled {
            self.total_kids += item.map_or(0, kid_count);
        }
    }
}

fn kid_count(item: &Item) -> u32 {
    u32::try_from(item.kids.len()).unwrap_or(u32::MAX)
}
