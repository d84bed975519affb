//! JobLoop - run ごとの集計ループ
//!
//! SyncProgress を所有する唯一の task。TreeWalk から届く SyncEvent を順番に
//! 適用し、そのたびに進捗を更新する。
//!
//! # 終了条件
//! - progress >= max: 完了。listener を 1 回だけ呼び、run を停止
//! - shutdown: stop / supersede / timeout
//! - 全 sender が drop: walk が完了前に尽きた（timeout 待ち）

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::domain::{RunId, RunState, SyncEvent, SyncJob, SyncProgress};
use crate::ports::ProgressListener;

use super::coordinator::CoordinatorInner;

pub(crate) struct JobLoop {
    inner: Arc<CoordinatorInner>,
    job: SyncJob,
    run: RunId,
    listener: Option<Arc<dyn ProgressListener>>,
    events: mpsc::UnboundedReceiver<SyncEvent>,
    shutdown: watch::Receiver<bool>,
}

impl JobLoop {
    pub(crate) fn new(
        inner: Arc<CoordinatorInner>,
        job: SyncJob,
        run: RunId,
        listener: Option<Arc<dyn ProgressListener>>,
        events: mpsc::UnboundedReceiver<SyncEvent>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            inner,
            job,
            run,
            listener,
            events,
            shutdown,
        }
    }

    pub(crate) async fn run(mut self) {
        let mut progress = SyncProgress::new(&self.job);

        loop {
            if *self.shutdown.borrow() {
                debug!(job = %self.job.id, run = %self.run, "aggregator shut down");
                break;
            }

            let event = tokio::select! {
                changed = self.shutdown.changed() => {
                    // sender dropped without a signal: the run record is gone
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                event = self.events.recv() => event,
            };

            let Some(event) = event else {
                debug!(
                    job = %self.job.id,
                    run = %self.run,
                    progress = progress.progress(),
                    max = progress.max(),
                    "walk ended before completion"
                );
                break;
            };

            debug!(job = %self.job.id, run = %self.run, event = event.kind(), "event received");
            apply(&mut progress, event);

            if progress.is_done() {
                self.complete();
                break;
            }
            self.inner
                .publish(&self.job, self.run, &progress.snapshot());
        }
    }

    fn complete(&mut self) {
        let Some(record) = self.inner.detach(&self.job.id, Some(self.run)) else {
            // already stopped or timed out
            return;
        };
        info!(job = %self.job.id, run = %self.run, "sync complete");
        if let Some(listener) = self.listener.take() {
            listener.on_done(&self.job.id);
        }
        self.inner.teardown(&self.job.id, record, RunState::Completed);
    }
}

fn apply(progress: &mut SyncProgress, event: SyncEvent) {
    match event {
        SyncEvent::FetchStarted { .. } => {}
        SyncEvent::ItemResolved {
            id,
            item,
            kids_enabled,
            readability_enabled,
        } => progress.finish_item(&id, item.as_ref(), kids_enabled, readability_enabled),
        SyncEvent::Revisited { .. } => progress.finish_revisit(),
        SyncEvent::ReadabilityDone { .. } => progress.finish_readability(),
        SyncEvent::ArticleProgress { current, max } => progress.update_article(current, max),
    }
}
