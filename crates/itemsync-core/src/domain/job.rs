//! Sync job descriptor and its persisted encoding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ids::ItemId;
use crate::ports::PreferenceSource;

pub const EXTRA_ID: &str = "extra:id";
pub const EXTRA_CONNECTION_ENABLED: &str = "extra:connectionEnabled";
pub const EXTRA_READABILITY_ENABLED: &str = "extra:readabilityEnabled";
pub const EXTRA_ARTICLE_ENABLED: &str = "extra:articleEnabled";
pub const EXTRA_COMMENTS_ENABLED: &str = "extra:commentsEnabled";
pub const EXTRA_NOTIFICATION_ENABLED: &str = "extra:notificationEnabled";

/// One sync request: a single item id (or the flush request) plus the
/// feature flags captured from preferences when the job was created.
///
/// `connection_enabled` is the only flag that changes after creation; at
/// run time it lives in the coordinator's per-run gate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncJob {
    pub id: ItemId,
    pub connection_enabled: bool,
    pub readability_enabled: bool,
    pub article_enabled: bool,
    pub comments_enabled: bool,
    pub notification_enabled: bool,
}

impl SyncJob {
    /// Capture a job for `id` from the current preference state.
    pub fn from_preferences(id: ItemId, prefs: &dyn PreferenceSource) -> Self {
        Self {
            id,
            connection_enabled: prefs.current_connection_enabled(),
            readability_enabled: prefs.readability_enabled(),
            article_enabled: prefs.article_enabled(),
            comments_enabled: prefs.comments_enabled(),
            notification_enabled: prefs.notification_enabled(),
        }
    }

    /// Job rebuilt for a previously deferred id during a flush.
    ///
    /// Deferred re-syncs run silently.
    pub fn for_deferred(id: ItemId, prefs: &dyn PreferenceSource) -> Self {
        Self {
            notification_enabled: false,
            ..Self::from_preferences(id, prefs)
        }
    }

    /// The flush request.
    pub fn flush(prefs: &dyn PreferenceSource) -> Self {
        Self::from_preferences(ItemId::flush(), prefs)
    }

    pub fn is_flush(&self) -> bool {
        self.id.is_flush()
    }

    /// Encode as a flat field bag. Every field has its own key.
    pub fn to_extras(&self) -> JobExtras {
        let mut extras = JobExtras::new();
        extras.put_string(EXTRA_ID, self.id.as_str());
        extras.put_flag(EXTRA_CONNECTION_ENABLED, self.connection_enabled);
        extras.put_flag(EXTRA_READABILITY_ENABLED, self.readability_enabled);
        extras.put_flag(EXTRA_ARTICLE_ENABLED, self.article_enabled);
        extras.put_flag(EXTRA_COMMENTS_ENABLED, self.comments_enabled);
        extras.put_flag(EXTRA_NOTIFICATION_ENABLED, self.notification_enabled);
        extras
    }

    /// Decode from a field bag. Missing or malformed fields fall back to
    /// `""` / `false`; decoding never fails.
    pub fn from_extras(extras: &JobExtras) -> Self {
        Self {
            id: ItemId::new(extras.string(EXTRA_ID).unwrap_or_default()),
            connection_enabled: extras.flag(EXTRA_CONNECTION_ENABLED),
            readability_enabled: extras.flag(EXTRA_READABILITY_ENABLED),
            article_enabled: extras.flag(EXTRA_ARTICLE_ENABLED),
            comments_enabled: extras.flag(EXTRA_COMMENTS_ENABLED),
            notification_enabled: extras.flag(EXTRA_NOTIFICATION_ENABLED),
        }
    }
}

/// A single value in a [`JobExtras`] bag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraValue {
    Int(i64),
    Str(String),
}

/// Flat key/value encoding used to hand a job across process or scheduler
/// boundaries. Order independent; serializes as a JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobExtras(BTreeMap<String, ExtraValue>);

impl JobExtras {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_string(&mut self, key: &str, value: &str) {
        self.0
            .insert(key.to_string(), ExtraValue::Str(value.to_string()));
    }

    pub fn put_flag(&mut self, key: &str, value: bool) {
        self.0
            .insert(key.to_string(), ExtraValue::Int(i64::from(value)));
    }

    pub fn string(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            ExtraValue::Str(s) => Some(s.clone()),
            ExtraValue::Int(_) => None,
        }
    }

    /// Flags are encoded as 0/1; anything other than `1` reads as false.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.0.get(key), Some(ExtraValue::Int(1)))
    }

    pub fn remove(&mut self, key: &str) -> Option<ExtraValue> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
