//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせて同期のロジックを実装します。
//!
//! # 主要コンポーネント
//! - **CoordinatorBuilder**: coordinator の構築とワイヤリング
//! - **SyncCoordinator**: perform_sync / stop_sync / flush、timer と run の管理
//! - **TreeWalk**: アイテムツリーの並行な走査（run ごと）
//! - **JobLoop**: SyncProgress を所有する集計ループ（run ごと）
//! - **SchedulingGateway**: host スケジューラへの受け渡し

pub mod builder;
pub mod coordinator;
pub mod gateway;
mod job_loop;
mod walk;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, CoordinatorBuilder};
pub use self::coordinator::{SyncCoordinator, DEFAULT_TIMEOUT};
pub use self::gateway::{ScheduleOutcome, SchedulingGateway};
