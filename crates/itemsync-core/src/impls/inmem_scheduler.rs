//! InMemoryHostScheduler - 開発・テスト用の HostScheduler
//!
//! Queues requests instead of handing them to an OS facility. A keyed job
//! request replaces any pending request with the same id, like a host job
//! scheduler does. The owner drains the queue with `take_*` and runs the jobs.
//! `set_rejecting(true)` makes every request fail, as a host that is out of
//! job quota would.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{Result, SyncError};
use crate::ports::{HostScheduler, JobRequest, SyncRequest};

#[derive(Debug, Default)]
struct Pending {
    jobs: Vec<JobRequest>,
    syncs: Vec<SyncRequest>,
}

#[derive(Debug, Default)]
pub struct InMemoryHostScheduler {
    pending: Mutex<Pending>,
    rejecting: AtomicBool,
}

impl InMemoryHostScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_jobs(&self) -> Vec<JobRequest> {
        std::mem::take(&mut self.lock().jobs)
    }

    pub fn take_syncs(&self) -> Vec<SyncRequest> {
        std::mem::take(&mut self.lock().syncs)
    }

    pub fn set_rejecting(&self, rejecting: bool) {
        self.rejecting.store(rejecting, Ordering::Release);
    }

    pub fn pending_jobs(&self) -> usize {
        self.lock().jobs.len()
    }

    fn check(&self, id: impl ToString) -> Result<()> {
        if self.rejecting.load(Ordering::Acquire) {
            return Err(SyncError::Schedule {
                id: id.to_string(),
                reason: "scheduler is rejecting requests".to_string(),
            });
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HostScheduler for InMemoryHostScheduler {
    fn schedule_job(&self, request: JobRequest) -> Result<()> {
        self.check(&request.id)?;
        let mut pending = self.lock();
        pending.jobs.retain(|j| j.id != request.id);
        pending.jobs.push(request);
        Ok(())
    }

    fn request_sync(&self, request: SyncRequest) -> Result<()> {
        self.check("account sync")?;
        self.lock().syncs.push(request);
        Ok(())
    }
}
