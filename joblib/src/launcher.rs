mod supervisor;

use crate::buffer::OutputBuffer;
use crate::status::Completion;
use crate::types::NewJob;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::{process, sync::oneshot};
use tracing::debug;

pub const DEFAULT_SHELL: &str = "/bin/sh";
/// How long output pipes may stay open after the shell itself has exited.
pub const DEFAULT_DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Spawns one shell process per job.
///
/// The command text is handed to `<shell> -c`, so pipes and redirections behave the way they
/// would in a terminal. Spawning is never retried and never queued.
#[derive(Clone, Debug)]
pub struct Launcher {
    shell: PathBuf,
    drain_grace: Duration,
}

impl Launcher {
    pub fn new() -> Self {
        Self {
            shell: PathBuf::from(DEFAULT_SHELL),
            drain_grace: DEFAULT_DRAIN_GRACE,
        }
    }

    pub fn with_shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn with_drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = grace;
        self
    }

    /// Start `job`, streaming its output into `stdout` and `stderr`.
    ///
    /// Must be called from within a tokio runtime. A process that cannot be started is not an
    /// error here: the returned completion resolves to `Completion::NotLaunched` instead.
    pub fn launch(
        &self,
        job: &NewJob,
        stdout: OutputBuffer,
        stderr: OutputBuffer,
    ) -> LaunchedProcess {
        let (kill_tx, kill_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();

        match self.command(job).spawn() {
            Ok(child) => {
                let input = job.input.clone();
                let drain_grace = self.drain_grace;
                tokio::spawn(async move {
                    let completion =
                        supervisor::run(child, input, stdout, stderr, kill_rx, drain_grace).await;
                    let _ = done_tx.send(completion);
                });
            }
            Err(err) => {
                debug!(shell = %self.shell.display(), error = %err, "failed to spawn shell");
                let _ = done_tx.send(Completion::NotLaunched {
                    reason: err.to_string(),
                });
            }
        }

        LaunchedProcess {
            cancel: CancelHandle::new(kill_tx),
            completion: CompletionSignal { rx: done_rx },
        }
    }

    fn command(&self, job: &NewJob) -> process::Command {
        let stdin = if job.input.is_empty() {
            Stdio::null()
        } else {
            Stdio::piped()
        };

        let mut command = process::Command::new(&self.shell);
        command
            .arg("-c")
            .arg(&job.command)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &job.workdir {
            command.current_dir(dir);
        }
        // a non-empty overlay replaces the environment, it is never merged with ours
        if !job.env.is_empty() {
            command.env_clear().envs(job.env.iter().cloned());
        }
        command
    }
}

impl Default for Launcher {
    fn default() -> Self {
        Self::new()
    }
}

/// A started (or failed-to-start) process.
#[derive(Debug)]
pub struct LaunchedProcess {
    pub cancel: CancelHandle,
    pub completion: CompletionSignal,
}

/// Requests termination of one process.
///
/// Clones share the same request; only the first `cancel` across all clones has any effect.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    kill_tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl CancelHandle {
    fn new(kill_tx: oneshot::Sender<()>) -> Self {
        Self {
            kill_tx: Arc::new(Mutex::new(Some(kill_tx))),
        }
    }

    /// Ask the process to terminate. Returns whether this call delivered the request, i.e.
    /// `false` when it was already cancelled or has already exited.
    pub fn cancel(&self) -> bool {
        let kill_tx = self
            .kill_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match kill_tx {
            Some(kill_tx) => kill_tx.send(()).is_ok(),
            None => false,
        }
    }
}

/// Resolves exactly once, when the process is done and its output has been drained.
#[derive(Debug)]
pub struct CompletionSignal {
    rx: oneshot::Receiver<Completion>,
}

impl Future for CompletionSignal {
    type Output = Completion;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Completion> {
        // the supervising task is gone without reporting; treat the process as lost
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or_else(|_| Completion::Killed { signal: None }))
    }
}
