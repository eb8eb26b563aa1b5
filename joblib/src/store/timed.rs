use super::{JobStore, Result, StoreError};
use crate::status::Outcome;
use crate::types::{JobId, JobRecord, JobSummary, NewJob};
use async_trait::async_trait;
use bytes::Bytes;
use std::future::Future;
use std::time::Duration;
use tokio::time;

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(30);

/// Bounds every call to the wrapped store by a deadline.
///
/// An elapsed deadline surfaces as `StoreError::Timeout`, which callers treat like any other
/// recoverable persistence failure.
#[derive(Debug)]
pub struct Timed<S> {
    inner: S,
    limit: Duration,
}

impl<S> Timed<S> {
    pub fn new(inner: S, limit: Duration) -> Self {
        Self { inner, limit }
    }

    pub fn with_default_timeout(inner: S) -> Self {
        Self::new(inner, DEFAULT_STORE_TIMEOUT)
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        time::timeout(self.limit, call)
            .await
            .unwrap_or_else(|_| Err(StoreError::Timeout(self.limit)))
    }
}

#[async_trait]
impl<S: JobStore> JobStore for Timed<S> {
    async fn create_job(&self, job: &NewJob) -> Result<JobId> {
        self.bounded(self.inner.create_job(job)).await
    }

    async fn write_interim(&self, id: JobId, stdout: Bytes, stderr: Bytes) -> Result<()> {
        self.bounded(self.inner.write_interim(id, stdout, stderr))
            .await
    }

    async fn write_final(
        &self,
        id: JobId,
        stdout: Bytes,
        stderr: Bytes,
        outcome: Outcome,
    ) -> Result<()> {
        self.bounded(self.inner.write_final(id, stdout, stderr, outcome))
            .await
    }

    async fn read_summaries(&self) -> Result<Vec<JobSummary>> {
        self.bounded(self.inner.read_summaries()).await
    }

    async fn read_detail(&self, id: JobId) -> Result<JobRecord> {
        self.bounded(self.inner.read_detail(id)).await
    }
}
