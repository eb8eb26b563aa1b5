use crate::buffer::OutputBuffer;
use crate::error::Result;
use crate::launcher::Launcher;
use crate::registry::Registry;
use crate::status::Outcome;
use crate::store::JobStore;
use crate::types::{JobId, JobRecord, JobSummary, NewJob};
use crate::watcher::{Watcher, WatcherConfig};
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tracing::info;

/// Entry point for submitting, cancelling and querying jobs.
///
/// Cheap to clone: every clone shares the same store and registry, so it can be handed to each
/// request handler of a multi-threaded server without extra synchronization.
#[derive(Clone)]
pub struct JobCoordinator {
    store: Arc<dyn JobStore>,
    registry: Registry,
    launcher: Launcher,
    watcher: WatcherConfig,
}

/// A submitted job. Dropping it detaches the watcher, which keeps running.
#[derive(Debug)]
pub struct JobHandle {
    pub job_id: JobId,
    watcher: JoinHandle<Outcome>,
}

impl JobHandle {
    /// Wait until the job's terminal state has been persisted.
    pub async fn wait(self) -> std::result::Result<Outcome, JoinError> {
        self.watcher.await
    }
}

impl JobCoordinator {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self {
            store,
            registry: Registry::new(),
            launcher: Launcher::new(),
            watcher: WatcherConfig::default(),
        }
    }

    pub fn with_launcher(mut self, launcher: Launcher) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn with_watcher_config(mut self, config: WatcherConfig) -> Self {
        self.watcher = config;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Persist a new job, start it and follow it in the background.
    ///
    /// Only the initial insert can fail; a process that cannot be started still yields a job,
    /// whose record ends up `FAILED_TO_LAUNCH`.
    pub async fn submit(&self, job: NewJob) -> Result<JobHandle> {
        let job_id = self.store.create_job(&job).await?;

        let stdout = OutputBuffer::new();
        let stderr = OutputBuffer::new();
        let process = self.launcher.launch(&job, stdout.clone(), stderr.clone());
        // registered before the watcher exists, so its removal can never precede this insert
        self.registry.register(job_id, process.cancel);
        info!(job_id, command = %job.command, "launched job");

        let watcher = Watcher::new(
            job_id,
            Arc::clone(&self.store),
            self.registry.clone(),
            stdout,
            stderr,
            self.watcher,
        )
        .spawn(process.completion);
        Ok(JobHandle { job_id, watcher })
    }

    pub fn cancel(&self, job_id: JobId) -> Result<()> {
        self.registry.cancel(job_id)?;
        info!(job_id, "cancel requested");
        Ok(())
    }

    pub fn is_running(&self, job_id: JobId) -> bool {
        self.registry.contains(job_id)
    }

    pub async fn list(&self) -> Result<Vec<JobSummary>> {
        Ok(self.store.read_summaries().await?)
    }

    pub async fn detail(&self, job_id: JobId) -> Result<JobRecord> {
        Ok(self.store.read_detail(job_id).await?)
    }
}
