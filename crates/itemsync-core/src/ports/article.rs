//! Article caching ports.
//!
//! Two ways to cache a story's linked article:
//! - **ArticleRenderer**: in-process renderer; reports load progress (0..=100)
//!   while the page loads. Used when the coordinator runs on a UI-capable context.
//! - **WebCacheService**: out-of-process "cache this url" request. Fire-and-forget;
//!   the coordinator counts the article as fully loaded once it is handed off.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::{ARTICLE_PROGRESS_MAX, SyncEvent};

/// Progress callback handed to an [`ArticleRenderer`].
#[derive(Debug, Clone)]
pub struct ArticleProgressSink {
    events: mpsc::UnboundedSender<SyncEvent>,
}

impl ArticleProgressSink {
    pub(crate) fn new(events: mpsc::UnboundedSender<SyncEvent>) -> Self {
        Self { events }
    }

    /// Report load progress in percent. Values above 100 are clamped.
    pub fn report(&self, percent: u32) {
        // the run may already be finished; late progress is dropped
        let _ = self.events.send(SyncEvent::ArticleProgress {
            current: percent.min(ARTICLE_PROGRESS_MAX),
            max: ARTICLE_PROGRESS_MAX,
        });
    }
}

#[async_trait]
pub trait ArticleRenderer: Send + Sync {
    /// Load and cache `url`, reporting progress through `progress`.
    async fn load(&self, url: &str, progress: ArticleProgressSink);
}

pub trait WebCacheService: Send + Sync {
    /// Ask an external service to cache `url`. Must not block.
    fn cache(&self, url: &str);
}

/// Where article caching is performed.
#[derive(Clone)]
pub enum ArticleBackend {
    Renderer(Arc<dyn ArticleRenderer>),
    Service(Arc<dyn WebCacheService>),
}

impl std::fmt::Debug for ArticleBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArticleBackend::Renderer(_) => f.write_str("ArticleBackend::Renderer"),
            ArticleBackend::Service(_) => f.write_str("ArticleBackend::Service"),
        }
    }
}
