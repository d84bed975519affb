//! SyncCoordinator - 同期ジョブのオーケストレーション
//!
//! # 設計原則
//! - job id → ActiveRun（run id, connection gate, timer, aggregator の停止信号）
//! - 1 id につき timer は常に 1 つ。再実行は前の run を supersede する
//! - stop は冪等。存在しない id は何もしない
//! - 完了 callback は run ごとに高々 1 回
//!
//! `perform_sync` と `stop_sync` は呼び出し側にエラーを返さない。
//! コラボレータの失敗はログに残して吸収する。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::{ItemId, ProgressSnapshot, RunId, RunState, SyncJob, SyncProgress};
use crate::error::Result;
use crate::observability::ActiveJobView;
use crate::ports::{Clock, IdGenerator, Notifier, PreferenceSource, ProgressListener};

use super::gateway::{ScheduleOutcome, SchedulingGateway};
use super::job_loop::JobLoop;
use super::walk::{ConnectionGate, TreeWalk, WalkPorts};

/// Default one-shot timeout per job.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Owned state of one running job.
pub(crate) struct ActiveRun {
    run: RunId,
    gate: Arc<ConnectionGate>,
    shutdown: watch::Sender<bool>,
    timer: JoinHandle<()>,
    started_at: DateTime<Utc>,
    snapshot: ProgressSnapshot,
}

pub(crate) struct CoordinatorInner {
    pub(crate) ports: WalkPorts,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) preferences: Arc<dyn PreferenceSource>,
    pub(crate) gateway: SchedulingGateway,
    pub(crate) ids: Box<dyn IdGenerator>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) timeout: Duration,
    pub(crate) handle: Handle,
    pub(crate) listener: Mutex<Option<Arc<dyn ProgressListener>>>,
    pub(crate) runs: Mutex<HashMap<ItemId, ActiveRun>>,
    /// How the latest finished run of each id ended.
    pub(crate) outcomes: Mutex<HashMap<ItemId, (RunId, RunState)>>,
}

impl CoordinatorInner {
    fn runs(&self) -> MutexGuard<'_, HashMap<ItemId, ActiveRun>> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove the record for `id`, if it belongs to `expected` (or any run when `None`).
    pub(crate) fn detach(&self, id: &ItemId, expected: Option<RunId>) -> Option<ActiveRun> {
        let mut runs = self.runs();
        match runs.get(id) {
            Some(record) if expected.map_or(true, |run| run == record.run) => runs.remove(id),
            _ => None,
        }
    }

    /// Shut a detached run down and remember how it ended.
    pub(crate) fn teardown(&self, id: &ItemId, record: ActiveRun, outcome: RunState) {
        record.gate.disable();
        if outcome.clears_indicator() {
            self.notifier.cancel(id);
        }
        record.timer.abort();
        // the aggregator may already be gone
        let _ = record.shutdown.send(true);
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), (record.run, outcome));
    }

    /// Record the latest snapshot and, when enabled, show it.
    ///
    /// Runs under the registry lock so a `show` can never land after the
    /// `cancel` issued by a concurrent stop.
    pub(crate) fn publish(&self, job: &SyncJob, run: RunId, snapshot: &ProgressSnapshot) {
        let mut runs = self.runs();
        let Some(record) = runs.get_mut(&job.id).filter(|r| r.run == run) else {
            return;
        };
        record.snapshot = snapshot.clone();
        debug!(
            job = %job.id,
            run = %run,
            progress = snapshot.progress,
            max = snapshot.max,
            "progress"
        );
        if job.notification_enabled {
            self.notifier
                .show(&job.id, snapshot.title.as_deref(), snapshot.progress, snapshot.max);
        }
    }

    fn spawn_timer(self: &Arc<Self>, id: ItemId, run: RunId) -> JoinHandle<()> {
        let inner = Arc::clone(self);
        let timeout = self.timeout;
        self.handle.spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(record) = inner.detach(&id, Some(run)) {
                warn!(job = %id, run = %run, timeout_secs = timeout.as_secs(), "sync timed out");
                inner.teardown(&id, record, RunState::TimedOut);
            }
        })
    }
}

/// Orchestrates sync jobs.
///
/// # 使用例
/// ```ignore
/// let coordinator = CoordinatorBuilder::new()
///     .fetcher(fetcher)
///     .deferral_store(store)
///     .notifier(notifier)
///     .preferences(prefs)
///     .host_scheduler(host)
///     .build()?;
/// coordinator.subscribe(Arc::new(|id: &ItemId| println!("{id} done")));
/// coordinator.perform_sync(job);
/// ```
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl SyncCoordinator {
    pub(crate) fn from_inner(inner: CoordinatorInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Start processing `job`.
    ///
    /// An empty id flushes the deferral store instead and returns `None`.
    /// A job for an id that is already running supersedes that run.
    pub fn perform_sync(&self, job: SyncJob) -> Option<RunId> {
        self.perform_sync_with(job, None)
    }

    /// Like [`perform_sync`](Self::perform_sync), with a completion listener
    /// for this run only. Without one, the subscribed listener is used.
    pub fn perform_sync_with(
        &self,
        job: SyncJob,
        listener: Option<Arc<dyn ProgressListener>>,
    ) -> Option<RunId> {
        if job.is_flush() {
            self.flush_deferred();
            return None;
        }

        let inner = &self.inner;
        let run = inner.ids.generate_run_id();
        let listener = listener.or_else(|| {
            inner
                .listener
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        });
        let gate = Arc::new(ConnectionGate::new(job.connection_enabled));
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let previous = {
            let mut runs = inner.runs();
            let record = ActiveRun {
                run,
                gate: Arc::clone(&gate),
                shutdown: shutdown_tx,
                timer: inner.spawn_timer(job.id.clone(), run),
                started_at: inner.clock.now(),
                snapshot: SyncProgress::new(&job).snapshot(),
            };
            runs.insert(job.id.clone(), record)
        };
        if let Some(previous) = previous {
            info!(job = %job.id, run = %previous.run, "superseded by a new run");
            inner.teardown(&job.id, previous, RunState::Superseded);
        }

        info!(
            job = %job.id,
            run = %run,
            connection = job.connection_enabled,
            readability = job.readability_enabled,
            article = job.article_enabled,
            comments = job.comments_enabled,
            "sync started"
        );

        let job_loop = JobLoop::new(
            Arc::clone(inner),
            job.clone(),
            run,
            listener,
            events_rx,
            shutdown_rx,
        );
        inner.handle.spawn(job_loop.run());

        TreeWalk::new(
            job,
            run,
            gate,
            events_tx,
            inner.ports.clone(),
            inner.handle.clone(),
        )
        .start();

        Some(run)
    }

    /// Stop the run for `id`. Returns whether a run was active.
    pub fn stop_sync(&self, id: &ItemId) -> bool {
        match self.inner.detach(id, None) {
            Some(record) => {
                info!(job = %id, run = %record.run, "sync stopped");
                self.inner.teardown(id, record, RunState::Stopped);
                true
            }
            None => {
                debug!(job = %id, "stop requested for inactive job");
                false
            }
        }
    }

    /// Register the listener used by runs started without their own.
    pub fn subscribe(&self, listener: Arc<dyn ProgressListener>) {
        *self
            .inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(listener);
    }

    /// Drain the deferral store and schedule one fresh job per id.
    ///
    /// Returns how many jobs were handed to the scheduling gateway.
    pub fn flush_deferred(&self) -> usize {
        let inner = &self.inner;
        let ids = match inner.ports.deferrals.remove_all() {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "failed to drain deferral store");
                return 0;
            }
        };
        info!(count = ids.len(), "flushing deferred items");

        let mut scheduled = 0;
        for id in ids {
            let job = SyncJob::for_deferred(id, inner.preferences.as_ref());
            match inner.gateway.schedule_sync(&job) {
                Ok(ScheduleOutcome::Disabled) => {
                    debug!(item = %job.id, "offline sync disabled, deferred item dropped");
                }
                Ok(_) => scheduled += 1,
                Err(e) => {
                    warn!(item = %job.id, error = %e, "failed to schedule deferred item");
                    // keep it for the next flush
                    if let Err(e) = inner.ports.deferrals.add(&job.id) {
                        warn!(item = %job.id, error = %e, "failed to re-defer");
                    }
                }
            }
        }
        scheduled
    }

    /// Build a job for `id` from current preferences and hand it to the host.
    pub fn request_sync(&self, id: ItemId) -> Result<ScheduleOutcome> {
        let job = SyncJob::from_preferences(id, self.inner.preferences.as_ref());
        self.inner.gateway.schedule_sync(&job)
    }

    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// How the latest finished run for `id` ended, with its run id.
    pub fn last_outcome(&self, id: &ItemId) -> Option<(RunId, RunState)> {
        self.inner
            .outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .copied()
    }

    /// The live run for `id` as `Running`, else how the latest one ended.
    pub fn run_state(&self, id: &ItemId) -> Option<(RunId, RunState)> {
        let live = self.inner.runs().get(id).map(|r| r.run);
        match live {
            Some(run) => Some((run, RunState::Running)),
            None => self.last_outcome(id),
        }
    }

    pub fn is_active(&self, id: &ItemId) -> bool {
        self.inner.runs().contains_key(id)
    }

    pub fn status(&self, id: &ItemId) -> Option<ActiveJobView> {
        self.inner
            .runs()
            .get(id)
            .map(|r| ActiveJobView::new(id.clone(), r.run, r.started_at, &r.snapshot))
    }

    /// Every active run, ordered by id.
    pub fn active_jobs(&self) -> Vec<ActiveJobView> {
        let mut jobs: Vec<_> = self
            .inner
            .runs()
            .iter()
            .map(|(id, r)| ActiveJobView::new(id.clone(), r.run, r.started_at, &r.snapshot))
            .collect();
        jobs.sort_by(|a, b| a.id.cmp(&b.id));
        jobs
    }
}
