//! itemsync-core
//!
//! Offline sync of an item and its reply tree: one job per item, one
//! aggregated progress pair per job, one completion callback.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, item, job, progress, state, events）
//! - **ports**: 抽象化レイヤー（ItemFetcher, DeferralStore, Notifier, HostScheduler, など）
//! - **app**: アプリケーションロジック（coordinator, builder, gateway）
//! - **impls**: 実装（InMemoryItemSource, FileDeferralStore など開発用）
//! - **config**: TOML 設定と PreferenceSource 実装
//! - **observability**: 実行中ジョブの status view
//! - **error**: エラー型

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod observability;
pub mod ports;

pub use crate::app::{BuildError, CoordinatorBuilder, ScheduleOutcome, SyncCoordinator};
pub use crate::config::SyncConfig;
pub use crate::domain::{Item, ItemId, RunId, SyncJob};
pub use crate::error::{Result, SyncError};
pub use crate::observability::ActiveJobView;
