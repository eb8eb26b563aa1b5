mod memory;
mod timed;

pub use memory::MemoryStore;
pub use timed::{Timed, DEFAULT_STORE_TIMEOUT};

use crate::status::Outcome;
use crate::types::{JobId, JobRecord, JobSummary, NewJob};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use std::{borrow::Cow, result};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("job {0} does not exist")]
    NotFound(JobId),
    #[error("job {0} already reached a terminal status")]
    AlreadyFinished(JobId),
    #[error("persistence call timed out after {0:?}")]
    Timeout(Duration),
    #[error("persistence backend failed: {0}")]
    Backend(String),
}

pub type Result<T> = result::Result<T, StoreError>;

/// The persistence surface the lifecycle engine depends on.
///
/// Implementations must tolerate concurrent calls for different jobs. Once a job has a terminal
/// status, further writes to it are rejected with `StoreError::AlreadyFinished`.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job with status `RUNNING`, exit code `-2` and empty outputs.
    async fn create_job(&self, job: &NewJob) -> Result<JobId>;

    /// Persist partial output of a job that is still running.
    async fn write_interim(&self, id: JobId, stdout: Bytes, stderr: Bytes) -> Result<()>;

    /// Persist the final output and terminal outcome of a job.
    async fn write_final(&self, id: JobId, stdout: Bytes, stderr: Bytes, outcome: Outcome)
        -> Result<()>;

    async fn read_summaries(&self) -> Result<Vec<JobSummary>>;

    async fn read_detail(&self, id: JobId) -> Result<JobRecord>;
}

#[async_trait]
impl<S: JobStore + ?Sized> JobStore for Arc<S> {
    async fn create_job(&self, job: &NewJob) -> Result<JobId> {
        (**self).create_job(job).await
    }

    async fn write_interim(&self, id: JobId, stdout: Bytes, stderr: Bytes) -> Result<()> {
        (**self).write_interim(id, stdout, stderr).await
    }

    async fn write_final(
        &self,
        id: JobId,
        stdout: Bytes,
        stderr: Bytes,
        outcome: Outcome,
    ) -> Result<()> {
        (**self).write_final(id, stdout, stderr, outcome).await
    }

    async fn read_summaries(&self) -> Result<Vec<JobSummary>> {
        (**self).read_summaries().await
    }

    async fn read_detail(&self, id: JobId) -> Result<JobRecord> {
        (**self).read_detail(id).await
    }
}

/// Process output is stored as text; invalid UTF-8 is replaced rather than rejected.
pub fn output_text(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}
