//! Remote item model (fetched, never owned).

use serde::{Deserialize, Serialize};

use super::ids::ItemId;

/// Item types that are treated as stories (have readable/article content).
const STORY_TYPES: [&str; 3] = ["story", "poll", "job"];

/// A discussion item or one of its replies.
///
/// The field names follow the remote JSON shape, so a payload from the item
/// API deserializes directly. Read-only once obtained.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,

    /// Direct replies, in remote order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kids: Vec<ItemId>,
}

impl Item {
    pub fn new(id: impl Into<ItemId>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn story(id: impl Into<ItemId>, title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            item_type: Some("story".to_string()),
            ..Self::new(id)
        }
    }

    pub fn comment(id: impl Into<ItemId>) -> Self {
        Self {
            item_type: Some("comment".to_string()),
            ..Self::new(id)
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_kids<I, K>(mut self, kids: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<ItemId>,
    {
        self.kids = kids.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_story_type(&self) -> bool {
        self.item_type
            .as_deref()
            .is_some_and(|t| STORY_TYPES.contains(&t))
    }

    /// The url as delivered by the remote, possibly absent.
    pub fn raw_url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// The url to render for article caching, if there is one.
    pub fn article_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.is_empty())
    }
}
