//! Notifier port - user-visible progress indicator.

use crate::domain::ItemId;

/// Shows and clears the progress indicator of a job.
///
/// Repeated `show` calls for the same id update one indicator in place.
pub trait Notifier: Send + Sync {
    fn show(&self, id: &ItemId, title: Option<&str>, progress: u32, max: u32);

    fn cancel(&self, id: &ItemId);
}
