//! ReadabilityParser port.

use async_trait::async_trait;

use crate::domain::ItemId;

/// Extracts a simplified article body for a story and stores it wherever
/// the host keeps readable content.
///
/// Returning from `parse` is the "done" signal; success and failure are not
/// distinguished by the caller.
#[async_trait]
pub trait ReadabilityParser: Send + Sync {
    async fn parse(&self, id: &ItemId, url: Option<&str>);
}
