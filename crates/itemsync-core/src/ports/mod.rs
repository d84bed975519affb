//! Ports - 外部コラボレータへの抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」。coordinator はここの trait だけに依存し、
//! HTTP クライアントやブラウザ、OS のスケジューラなどの実体は外から注入される。
//!
//! # 一覧
//! - ItemFetcher: キャッシュ優先の item 取得
//! - ReadabilityParser / ArticleRenderer / WebCacheService: 本文・記事のキャッシュ
//! - Notifier / ProgressListener: 進捗表示と完了通知
//! - DeferralStore: 延期された id の永続化
//! - HostScheduler / PreferenceSource: スケジューリングとユーザー設定
//! - Clock / IdGenerator: テスト容易性のための抽象化

pub mod article;
pub mod clock;
pub mod deferral_store;
pub mod fetch;
pub mod host_scheduler;
pub mod id_generator;
pub mod listener;
pub mod notifier;
pub mod preferences;
pub mod readability;

pub use self::article::{ArticleBackend, ArticleProgressSink, ArticleRenderer, WebCacheService};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::deferral_store::DeferralStore;
pub use self::fetch::{FetchError, ItemFetcher};
pub use self::host_scheduler::{HostScheduler, JobRequest, NetworkType, SyncRequest};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::listener::ProgressListener;
pub use self::notifier::Notifier;
pub use self::preferences::PreferenceSource;
pub use self::readability::ReadabilityParser;
