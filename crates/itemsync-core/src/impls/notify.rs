//! Notifier implementations.
//!
//! - **TracingNotifier**: writes progress as log lines
//! - **RecordingNotifier**: keeps every call, for tests and status tooling

use std::sync::{Mutex, PoisonError};

use tracing::info;

use crate::domain::ItemId;
use crate::ports::Notifier;

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn show(&self, id: &ItemId, title: Option<&str>, progress: u32, max: u32) {
        info!(
            job = %id,
            title = title.unwrap_or(""),
            progress,
            max,
            "download in progress"
        );
    }

    fn cancel(&self, id: &ItemId) {
        info!(job = %id, "progress indicator cleared");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Show {
        id: ItemId,
        title: Option<String>,
        progress: u32,
        max: u32,
    },
    Cancel {
        id: ItemId,
    },
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    calls: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Notification> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn cancel_count(&self, id: &ItemId) -> usize {
        self.calls()
            .iter()
            .filter(|n| matches!(n, Notification::Cancel { id: c } if c == id))
            .count()
    }

    /// `(progress, max)` of every `show` for `id`, in order.
    pub fn shown(&self, id: &ItemId) -> Vec<(u32, u32)> {
        self.calls()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Show {
                    id: s,
                    progress,
                    max,
                    ..
                } if s == *id => Some((progress, max)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, n: Notification) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(n);
    }
}

impl Notifier for RecordingNotifier {
    fn show(&self, id: &ItemId, title: Option<&str>, progress: u32, max: u32) {
        self.push(Notification::Show {
            id: id.clone(),
            title: title.map(str::to_string),
            progress,
            max,
        });
    }

    fn cancel(&self, id: &ItemId) {
        self.push(Notification::Cancel { id: id.clone() });
    }
}
