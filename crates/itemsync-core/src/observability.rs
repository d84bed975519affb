use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{ItemId, ProgressSnapshot, RunId};

/// One active sync run, as seen from outside the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveJobView {
    pub id: ItemId,
    pub run: RunId,
    pub title: Option<String>,
    pub progress: u32,
    pub max: u32,
    pub started_at: DateTime<Utc>,
}

impl ActiveJobView {
    pub(crate) fn new(
        id: ItemId,
        run: RunId,
        started_at: DateTime<Utc>,
        snapshot: &ProgressSnapshot,
    ) -> Self {
        Self {
            id,
            run,
            title: snapshot.title.clone(),
            progress: snapshot.progress,
            max: snapshot.max,
            started_at,
        }
    }

    /// Completed fraction in `0.0..=1.0`.
    pub fn ratio(&self) -> f64 {
        if self.max == 0 {
            return 0.0;
        }
        f64::from(self.progress) / f64::from(self.max)
    }
}
