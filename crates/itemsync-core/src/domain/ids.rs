//! Domain identifiers.
//!
//! - `ItemId`: remote item identifier (string; the empty id means "flush deferred").
//! - `RunId`: ULID tagging one `perform_sync` run of a job.
//!
//! ## RunId が必要な理由
//! 同じ item id に対して `perform_sync` が再実行されると、古い run の timer や
//! 遅れて届くイベントが新しい run を止めてしまう可能性がある。
//! run ごとに ULID を振り、操作対象の run を照合できるようにする。

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Identifier of a remote item (root or descendant).
///
/// Remote payloads carry numeric ids, so deserialization accepts both JSON
/// numbers and strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(from = "RawItemId", into = "String")]
pub struct ItemId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawItemId {
    Num(u64),
    Str(String),
}

impl From<RawItemId> for ItemId {
    fn from(raw: RawItemId) -> Self {
        match raw {
            RawItemId::Num(n) => Self(n.to_string()),
            RawItemId::Str(s) => Self(s),
        }
    }
}

impl From<ItemId> for String {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

impl ItemId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The id used by flush requests.
    pub fn flush() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the special "flush all deferred items" id.
    pub fn is_flush(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<u64> for ItemId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one sync run.
///
/// ULID なので生成順にソートできる（ログ上で run の前後関係が追える）。
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(Ulid);

impl RunId {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl From<Ulid> for RunId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_id_accepts_numbers_and_strings() {
        let from_num: ItemId = serde_json::from_str("8863").unwrap();
        let from_str: ItemId = serde_json::from_str("\"8863\"").unwrap();
        assert_eq!(from_num, from_str);
        assert_eq!(from_num.as_str(), "8863");

        // always written back as a string
        assert_eq!(serde_json::to_string(&from_num).unwrap(), "\"8863\"");
    }

    #[test]
    fn empty_item_id_is_flush() {
        assert!(ItemId::flush().is_flush());
        assert!(ItemId::default().is_flush());
        assert!(!ItemId::from(1u64).is_flush());
    }

    #[test]
    fn run_ids_display_with_prefix_and_sort() {
        let id1 = RunId::from_ulid(Ulid::new());
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = RunId::from_ulid(Ulid::new());

        assert!(id1.to_string().starts_with("run-"));
        assert!(id1 < id2);
    }
}
