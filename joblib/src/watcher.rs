use crate::buffer::OutputBuffer;
use crate::launcher::CompletionSignal;
use crate::registry::Registry;
use crate::status::{self, Completion, Outcome};
use crate::store::JobStore;
use crate::types::JobId;
use std::sync::Arc;
use std::time::Duration;
use tokio::{
    select,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

/// Interval between interim snapshots of a running job.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug)]
pub struct WatcherConfig {
    pub tick_interval: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

/// Follows one job from launch to its terminal transition.
///
/// While the process runs, the watcher periodically persists what it has written so far. When
/// the completion signal fires it persists the final snapshot and outcome exactly once, releases
/// the registry entry and stops. Nothing is written for the job after that.
pub struct Watcher {
    job_id: JobId,
    store: Arc<dyn JobStore>,
    registry: Registry,
    stdout: OutputBuffer,
    stderr: OutputBuffer,
    config: WatcherConfig,
}

impl Watcher {
    pub fn new(
        job_id: JobId,
        store: Arc<dyn JobStore>,
        registry: Registry,
        stdout: OutputBuffer,
        stderr: OutputBuffer,
        config: WatcherConfig,
    ) -> Self {
        Self {
            job_id,
            store,
            registry,
            stdout,
            stderr,
            config,
        }
    }

    /// Run the watcher on its own task. The returned handle resolves to the persisted outcome.
    pub fn spawn(self, completion: CompletionSignal) -> JoinHandle<Outcome> {
        tokio::spawn(self.run(completion))
    }

    pub async fn run(self, mut completion: CompletionSignal) -> Outcome {
        let period = self.config.tick_interval;
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let completion = loop {
            select! {
                // completion always wins over a tick that became ready at the same time
                biased;
                done = &mut completion => break done,
                _ = ticker.tick() => self.flush_interim().await,
            }
        };
        self.finish(completion).await
    }

    async fn flush_interim(&self) {
        let result = self
            .store
            .write_interim(self.job_id, self.stdout.snapshot(), self.stderr.snapshot())
            .await;
        match result {
            Ok(()) => debug!(job_id = self.job_id, "persisted interim output"),
            Err(err) => {
                warn!(job_id = self.job_id, error = %err, "failed to persist interim output")
            }
        }
    }

    async fn finish(self, completion: Completion) -> Outcome {
        let outcome = status::encode(&completion);
        match &completion {
            Completion::NotLaunched { reason } => {
                warn!(job_id = self.job_id, %reason, "job failed to launch")
            }
            _ => info!(
                job_id = self.job_id,
                status = %outcome.status,
                exit_code = outcome.exit_code,
                "job reached terminal status"
            ),
        }

        let result = self
            .store
            .write_final(
                self.job_id,
                self.stdout.snapshot(),
                self.stderr.snapshot(),
                outcome,
            )
            .await;
        if let Err(err) = result {
            // keep going: a stale record is better than a registry entry that is never released
            error!(job_id = self.job_id, error = %err, "failed to persist final job state");
        }

        if !self.registry.remove(self.job_id) {
            debug!(job_id = self.job_id, "registry entry already released by a cancel");
        }
        outcome
    }
}
