//! SchedulingGateway - SyncJob を host のスケジューラ要求に変換する薄いアダプタ
//!
//! # ポリシー
//! - オフライン同期が無効なら何もしない
//! - 単一 item: id をキーにした job 要求。wifi_only なら unmetered 必須
//! - 現在の接続が条件を満たすなら即時実行を要求
//! - flush（空 id）: キーなしの手動 sync 要求
//!
//! Network constraints are enforced by the host, not here.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::SyncJob;
use crate::error::Result;
use crate::ports::{HostScheduler, JobRequest, NetworkType, PreferenceSource, SyncRequest};

/// What the gateway did with a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// Offline sync is switched off; nothing was submitted.
    Disabled,
    /// A keyed job request was submitted.
    Queued { immediate: bool },
    /// A manual (flush) sync request was submitted.
    ManualSync,
}

#[derive(Clone)]
pub struct SchedulingGateway {
    host: Arc<dyn HostScheduler>,
    preferences: Arc<dyn PreferenceSource>,
}

impl SchedulingGateway {
    pub fn new(host: Arc<dyn HostScheduler>, preferences: Arc<dyn PreferenceSource>) -> Self {
        Self { host, preferences }
    }

    pub fn schedule_sync(&self, job: &SyncJob) -> Result<ScheduleOutcome> {
        if !self.preferences.offline_enabled() {
            debug!(job = %job.id, "offline sync disabled, not scheduling");
            return Ok(ScheduleOutcome::Disabled);
        }

        if job.is_flush() {
            self.host.request_sync(SyncRequest {
                manual: true,
                extras: job.to_extras(),
            })?;
            info!("flush sync requested");
            return Ok(ScheduleOutcome::ManualSync);
        }

        let network = if self.preferences.wifi_only() {
            NetworkType::Unmetered
        } else {
            NetworkType::Any
        };
        let immediate = self.preferences.current_connection_enabled();
        self.host.schedule_job(JobRequest {
            id: job.id.clone(),
            network,
            run_immediately: immediate,
            extras: job.to_extras(),
        })?;
        info!(job = %job.id, ?network, immediate, "sync scheduled");
        Ok(ScheduleOutcome::Queued { immediate })
    }
}
