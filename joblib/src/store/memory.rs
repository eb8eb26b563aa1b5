use super::{output_text, JobStore, Result, StoreError};
use crate::status::Outcome;
use crate::types::{JobId, JobRecord, JobSummary, NewJob};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Keeps job records in process memory. Records are lost on restart.
#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    last_id: JobId,
    records: BTreeMap<JobId, JobRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                last_id: 0,
                records: BTreeMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update_running(&self, id: JobId, update: impl FnOnce(&mut JobRecord)) -> Result<()> {
        let mut inner = self.lock();
        let record = inner.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if record.status.is_terminal() {
            return Err(StoreError::AlreadyFinished(id));
        }
        update(record);
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn create_job(&self, job: &NewJob) -> Result<JobId> {
        let mut inner = self.lock();
        inner.last_id += 1;
        let id = inner.last_id;
        let outcome = Outcome::running();
        inner.records.insert(
            id,
            JobRecord {
                id,
                command: job.command.clone(),
                workdir: job.workdir.clone(),
                env: job.env.clone(),
                input: job.input.clone(),
                stdout: String::new(),
                stderr: String::new(),
                status: outcome.status,
                exit_code: outcome.exit_code,
            },
        );
        Ok(id)
    }

    async fn write_interim(&self, id: JobId, stdout: Bytes, stderr: Bytes) -> Result<()> {
        self.update_running(id, |record| {
            record.stdout = output_text(&stdout).into_owned();
            record.stderr = output_text(&stderr).into_owned();
        })
    }

    async fn write_final(
        &self,
        id: JobId,
        stdout: Bytes,
        stderr: Bytes,
        outcome: Outcome,
    ) -> Result<()> {
        self.update_running(id, |record| {
            record.stdout = output_text(&stdout).into_owned();
            record.stderr = output_text(&stderr).into_owned();
            record.status = outcome.status;
            record.exit_code = outcome.exit_code;
        })
    }

    async fn read_summaries(&self) -> Result<Vec<JobSummary>> {
        Ok(self
            .lock()
            .records
            .values()
            .map(|record| JobSummary {
                id: record.id,
                command: record.command.clone(),
            })
            .collect())
    }

    async fn read_detail(&self, id: JobId) -> Result<JobRecord> {
        self.lock()
            .records
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }
}
