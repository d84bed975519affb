//! Stand-in content collaborators for hosts without a readability
//! extractor or web cache service.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::ItemId;
use crate::ports::{ReadabilityParser, WebCacheService};

/// Completes readability immediately without extracting anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateReadability;

#[async_trait]
impl ReadabilityParser for ImmediateReadability {
    async fn parse(&self, id: &ItemId, url: Option<&str>) {
        debug!(item = %id, url = url.unwrap_or(""), "readability skipped");
    }
}

/// Logs and remembers every url handed off for caching.
#[derive(Debug, Default)]
pub struct LoggingWebCache {
    urls: Mutex<Vec<String>>,
}

impl LoggingWebCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl WebCacheService for LoggingWebCache {
    fn cache(&self, url: &str) {
        info!(url, "article handed to web cache service");
        self.urls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
    }
}
