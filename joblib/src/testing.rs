//! Store doubles shared by the unit tests.

use crate::status::Outcome;
use crate::store::{JobStore, MemoryStore, Result, StoreError};
use crate::types::{JobId, JobRecord, JobSummary, NewJob};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Write {
    Interim { exit_code: i32 },
    Final { outcome: Outcome },
}

/// A memory store that remembers every successful write, in order.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    writes: Mutex<Vec<(JobId, Write)>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes_for(&self, job_id: JobId) -> Vec<Write> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == job_id)
            .map(|(_, write)| write.clone())
            .collect()
    }

    pub fn final_writes(&self, job_id: JobId) -> usize {
        self.writes_for(job_id)
            .iter()
            .filter(|write| matches!(write, Write::Final { .. }))
            .count()
    }

    fn record(&self, job_id: JobId, write: Write) {
        self.writes.lock().unwrap().push((job_id, write));
    }
}

#[async_trait]
impl JobStore for RecordingStore {
    async fn create_job(&self, job: &NewJob) -> Result<JobId> {
        self.inner.create_job(job).await
    }

    async fn write_interim(&self, id: JobId, stdout: Bytes, stderr: Bytes) -> Result<()> {
        self.inner.write_interim(id, stdout, stderr).await?;
        let exit_code = self.inner.read_detail(id).await?.exit_code;
        self.record(id, Write::Interim { exit_code });
        Ok(())
    }

    async fn write_final(
        &self,
        id: JobId,
        stdout: Bytes,
        stderr: Bytes,
        outcome: Outcome,
    ) -> Result<()> {
        self.inner.write_final(id, stdout, stderr, outcome).await?;
        self.record(id, Write::Final { outcome });
        Ok(())
    }

    async fn read_summaries(&self) -> Result<Vec<JobSummary>> {
        self.inner.read_summaries().await
    }

    async fn read_detail(&self, id: JobId) -> Result<JobRecord> {
        self.inner.read_detail(id).await
    }
}

/// A recording store whose interim writes take `delay` to land.
pub struct SlowInterimStore {
    inner: RecordingStore,
    delay: Duration,
}

impl SlowInterimStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: RecordingStore::new(),
            delay,
        }
    }

    pub fn writes_for(&self, job_id: JobId) -> Vec<Write> {
        self.inner.writes_for(job_id)
    }
}

#[async_trait]
impl JobStore for SlowInterimStore {
    async fn create_job(&self, job: &NewJob) -> Result<JobId> {
        self.inner.create_job(job).await
    }

    async fn write_interim(&self, id: JobId, stdout: Bytes, stderr: Bytes) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.write_interim(id, stdout, stderr).await
    }

    async fn write_final(
        &self,
        id: JobId,
        stdout: Bytes,
        stderr: Bytes,
        outcome: Outcome,
    ) -> Result<()> {
        self.inner.write_final(id, stdout, stderr, outcome).await
    }

    async fn read_summaries(&self) -> Result<Vec<JobSummary>> {
        self.inner.read_summaries().await
    }

    async fn read_detail(&self, id: JobId) -> Result<JobRecord> {
        self.inner.read_detail(id).await
    }
}

/// Accepts new jobs but fails every write.
pub struct FailingStore {
    inner: MemoryStore,
    attempts: AtomicUsize,
}

impl FailingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn fail(&self) -> StoreError {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        StoreError::Backend("connection refused".into())
    }
}

#[async_trait]
impl JobStore for FailingStore {
    async fn create_job(&self, job: &NewJob) -> Result<JobId> {
        self.inner.create_job(job).await
    }

    async fn write_interim(&self, _id: JobId, _stdout: Bytes, _stderr: Bytes) -> Result<()> {
        Err(self.fail())
    }

    async fn write_final(
        &self,
        _id: JobId,
        _stdout: Bytes,
        _stderr: Bytes,
        _outcome: Outcome,
    ) -> Result<()> {
        Err(self.fail())
    }

    async fn read_summaries(&self) -> Result<Vec<JobSummary>> {
        self.inner.read_summaries().await
    }

    async fn read_detail(&self, id: JobId) -> Result<JobRecord> {
        self.inner.read_detail(id).await
    }
}
