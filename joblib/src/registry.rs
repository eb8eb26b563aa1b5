use crate::error::{JobError, Result};
use crate::launcher::CancelHandle;
use crate::types::JobId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;

/// Routes cancel requests to in-flight jobs.
///
/// An entry lives from launch until the job's terminal transition. Every operation runs inside
/// one critical section, so when a cancel and the watcher's own removal race on the same id,
/// exactly one of them takes the entry out.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    handles: Arc<Mutex<HashMap<JobId, CancelHandle>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, job_id: JobId, handle: CancelHandle) {
        if self.lock().insert(job_id, handle).is_some() {
            warn!(job_id, "replaced a stale cancel handle");
        }
    }

    /// Request termination of a running job and forget it.
    ///
    /// Fails with `JobError::NotFound` when the id was never registered or the job has already
    /// been released, either by an earlier cancel or by its own completion.
    pub fn cancel(&self, job_id: JobId) -> Result<()> {
        let mut handles = self.lock();
        let handle = handles.remove(&job_id).ok_or(JobError::NotFound)?;
        handle.cancel();
        Ok(())
    }

    /// Forget a job without cancelling it. Returns `false` if it was already gone.
    pub(crate) fn remove(&self, job_id: JobId) -> bool {
        self.lock().remove(&job_id).is_some()
    }

    pub fn contains(&self, job_id: JobId) -> bool {
        self.lock().contains_key(&job_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, CancelHandle>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
