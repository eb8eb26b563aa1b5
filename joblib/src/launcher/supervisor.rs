use crate::buffer::OutputBuffer;
use crate::status::Completion;
use bytes::{Bytes, BytesMut};
use futures::future;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::time::Duration;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    process::Child,
    select,
    sync::oneshot,
    task::JoinHandle,
    time,
};
use tracing::{debug, warn};

const READ_CHUNK: usize = 4096;
/// Statuses `sh` uses when the command itself could not be found or executed.
const EXIT_NOT_EXECUTABLE: i32 = 126;
const EXIT_NOT_FOUND: i32 = 127;
/// Tails of the diagnostics dash, bash and busybox print before exiting 126 or 127.
const LOOKUP_DIAGNOSTICS: [&str; 5] = [
    "not found",
    "No such file or directory",
    "Permission denied",
    "cannot execute",
    "can't execute",
];

/// Drive one child process to completion.
pub(super) async fn run(
    mut child: Child,
    input: Bytes,
    stdout: OutputBuffer,
    stderr: OutputBuffer,
    mut kill_rx: oneshot::Receiver<()>,
    drain_grace: Duration,
) -> Completion {
    if let Some(mut stdin) = child.stdin.take() {
        tokio::spawn(async move {
            // the child may exit without reading its input, a broken pipe is fine
            let _ = stdin.write_all(&input).await;
        });
    }

    let mut pumps: Vec<JoinHandle<()>> = Vec::with_capacity(2);
    if let Some(out) = child.stdout.take() {
        pumps.push(tokio::spawn(pump(out, stdout)));
    }
    if let Some(err) = child.stderr.take() {
        pumps.push(tokio::spawn(pump(err, stderr.clone())));
    }

    let mut kill_armed = true;
    let exit_status = loop {
        select! {
            request = &mut kill_rx, if kill_armed => {
                kill_armed = false;
                // Err means every cancel handle was dropped without cancelling
                if request.is_ok() {
                    if let Err(err) = child.start_kill() {
                        debug!(error = %err, "kill requested after the process exited");
                    }
                }
            }
            exit_status = child.wait() => break exit_status,
        }
    };

    drain(&mut pumps, drain_grace).await;

    match exit_status {
        Ok(exit_status) => classify(exit_status, &stderr.snapshot()),
        Err(err) => {
            warn!(error = %err, "lost track of child process");
            Completion::Killed { signal: None }
        }
    }
}

/// A 126 or 127 only means "never launched" when the shell also reported the failed lookup;
/// a script is free to `exit 127` on its own.
fn classify(exit_status: ExitStatus, stderr: &[u8]) -> Completion {
    match exit_status.code() {
        Some(code @ (EXIT_NOT_EXECUTABLE | EXIT_NOT_FOUND)) if is_lookup_failure(stderr) => {
            Completion::NotLaunched {
                reason: format!("shell could not execute the command (exit status {})", code),
            }
        }
        Some(code) => Completion::Exited { code },
        None => Completion::Killed {
            signal: exit_status.signal(),
        },
    }
}

fn is_lookup_failure(stderr: &[u8]) -> bool {
    let text = String::from_utf8_lossy(stderr);
    text.lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .map_or(false, |last| {
            LOOKUP_DIAGNOSTICS
                .iter()
                .any(|diagnostic| last.trim_end().ends_with(diagnostic))
        })
}

/// Copy everything a pipe produces into `sink` until EOF.
async fn pump<R: AsyncRead + Unpin>(mut reader: R, sink: OutputBuffer) {
    let mut buf = BytesMut::with_capacity(READ_CHUNK);
    loop {
        match reader.read_buf(&mut buf).await {
            Ok(n) if n > 0 => {
                sink.append(&buf);
                buf.clear();
            }
            _ => break,
        }
    }
}

/// Wait for the pumps to hit EOF. A background grandchild can keep the pipes open forever, so
/// after `grace` whatever is still pending is abandoned.
async fn drain(pumps: &mut [JoinHandle<()>], grace: Duration) {
    if time::timeout(grace, future::join_all(pumps.iter_mut()))
        .await
        .is_err()
    {
        debug!(?grace, "output pipes still open after exit, abandoning them");
        pumps.iter().for_each(JoinHandle::abort);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOT_FOUND: &[u8] = b"sh: 1: no-such-binary: not found\n";

    #[test]
    fn shell_lookup_failures_are_launch_failures() {
        let not_found = ExitStatus::from_raw(127 << 8);
        assert!(matches!(
            classify(not_found, NOT_FOUND),
            Completion::NotLaunched { .. }
        ));
        let not_executable = ExitStatus::from_raw(126 << 8);
        let denied = b"bash: line 1: ./script.sh: Permission denied\n";
        assert!(matches!(
            classify(not_executable, denied),
            Completion::NotLaunched { .. }
        ));
    }

    #[test]
    fn deliberate_126_and_127_are_ordinary_exits() {
        let quiet = ExitStatus::from_raw(127 << 8);
        assert_eq!(classify(quiet, b""), Completion::Exited { code: 127 });
        let chatty = ExitStatus::from_raw(126 << 8);
        assert_eq!(
            classify(chatty, b"giving up\n"),
            Completion::Exited { code: 126 }
        );
    }

    #[test]
    fn diagnostic_must_be_the_last_thing_on_stderr() {
        let status = ExitStatus::from_raw(127 << 8);
        let stderr = b"sh: 1: helper: not found\nfalling back and giving up\n";
        assert_eq!(classify(status, stderr), Completion::Exited { code: 127 });
    }

    #[test]
    fn signals_are_kills() {
        let killed = ExitStatus::from_raw(9);
        assert_eq!(classify(killed, b""), Completion::Killed { signal: Some(9) });
    }

    #[test]
    fn ordinary_codes_pass_through() {
        assert_eq!(
            classify(ExitStatus::from_raw(0), NOT_FOUND),
            Completion::Exited { code: 0 }
        );
        assert_eq!(
            classify(ExitStatus::from_raw(7 << 8), b""),
            Completion::Exited { code: 7 }
        );
    }
}
