//! ProgressListener port - job completion callback.

use crate::domain::ItemId;

/// Receives `on_done` at most once per job, after `progress == max`.
pub trait ProgressListener: Send + Sync {
    fn on_done(&self, id: &ItemId);
}

impl<F> ProgressListener for F
where
    F: Fn(&ItemId) + Send + Sync,
{
    fn on_done(&self, id: &ItemId) {
        self(id)
    }
}
