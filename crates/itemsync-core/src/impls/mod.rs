//! Impls - ports の実装（開発用・テスト用・CLI 用）
//!
//! # 含まれる実装
//! - **InMemoryItemSource**: キャッシュ + リモートの 2 層を持つ ItemFetcher
//! - **InMemoryDeferralStore / FileDeferralStore**: 延期 id の保存先
//! - **TracingNotifier / RecordingNotifier**: 進捗表示
//! - **InMemoryHostScheduler**: OS スケジューラの代わりのキュー
//! - **ImmediateReadability / LoggingWebCache**: 本文・記事キャッシュの代役
//!
//! 本番用の HTTP クライアントやブラウザはホスト側で実装する。

pub mod content;
pub mod file_deferral;
pub mod inmem_deferral;
pub mod inmem_fetch;
pub mod inmem_scheduler;
pub mod notify;

pub use self::content::{ImmediateReadability, LoggingWebCache};
pub use self::file_deferral::FileDeferralStore;
pub use self::inmem_deferral::InMemoryDeferralStore;
pub use self::inmem_fetch::{InMemoryItemSource, ItemFixture};
pub use self::inmem_scheduler::InMemoryHostScheduler;
pub use self::notify::{Notification, RecordingNotifier, TracingNotifier};
