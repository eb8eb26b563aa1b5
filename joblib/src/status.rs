//! Mapping from a raw process outcome to the persisted `(status, exit code)` pair.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Exit code persisted with every interim snapshot of a job that is still running.
pub const EXIT_CODE_RUNNING: i32 = -2;
/// Exit code persisted for jobs that were interrupted or never started.
pub const EXIT_CODE_ABNORMAL: i32 = -1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Running,
    Finished,
    Interrupted,
    FailedToLaunch,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Running => "RUNNING",
            JobStatus::Finished => "FINISHED",
            JobStatus::Interrupted => "INTERRUPTED",
            JobStatus::FailedToLaunch => "FAILED_TO_LAUNCH",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Running)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown job status {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RUNNING" => Ok(JobStatus::Running),
            "FINISHED" => Ok(JobStatus::Finished),
            "INTERRUPTED" => Ok(JobStatus::Interrupted),
            "FAILED_TO_LAUNCH" => Ok(JobStatus::FailedToLaunch),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// What the launcher reports once a process is done, delivered exactly once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Completion {
    /// The process ran and exited on its own. `0` is a clean exit.
    Exited { code: i32 },
    /// The process was terminated by a signal, including our own cancellation.
    Killed { signal: Option<i32> },
    /// The process could never be started.
    NotLaunched { reason: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub status: JobStatus,
    /// Only a real exit code when `status` is `Finished`; otherwise one of the sentinels.
    pub exit_code: i32,
}

impl Outcome {
    pub const fn running() -> Self {
        Self {
            status: JobStatus::Running,
            exit_code: EXIT_CODE_RUNNING,
        }
    }
}

pub fn encode(completion: &Completion) -> Outcome {
    match completion {
        Completion::Exited { code } if *code >= 0 => Outcome {
            status: JobStatus::Finished,
            exit_code: *code,
        },
        Completion::Exited { .. } | Completion::Killed { .. } => Outcome {
            status: JobStatus::Interrupted,
            exit_code: EXIT_CODE_ABNORMAL,
        },
        Completion::NotLaunched { .. } => Outcome {
            status: JobStatus::FailedToLaunch,
            exit_code: EXIT_CODE_ABNORMAL,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_exit_is_finished_zero() {
        let outcome = encode(&Completion::Exited { code: 0 });
        assert_eq!(outcome.status, JobStatus::Finished);
        assert_eq!(outcome.exit_code, 0);
    }

    #[test]
    fn nonzero_exit_keeps_its_code() {
        let outcome = encode(&Completion::Exited { code: 7 });
        assert_eq!(outcome.status, JobStatus::Finished);
        assert_eq!(outcome.exit_code, 7);
    }

    #[test]
    fn reserved_negative_code_means_interrupted() {
        let outcome = encode(&Completion::Exited { code: -1 });
        assert_eq!(outcome.status, JobStatus::Interrupted);
        assert_eq!(outcome.exit_code, EXIT_CODE_ABNORMAL);
    }

    #[test]
    fn killed_is_interrupted() {
        for signal in [Some(9), Some(15), None] {
            let outcome = encode(&Completion::Killed { signal });
            assert_eq!(outcome.status, JobStatus::Interrupted);
            assert_eq!(outcome.exit_code, -1);
        }
    }

    #[test]
    fn launch_failure_is_tagged_separately_from_interruption() {
        let outcome = encode(&Completion::NotLaunched {
            reason: "No such file or directory".into(),
        });
        assert_eq!(outcome.status, JobStatus::FailedToLaunch);
        assert_eq!(outcome.exit_code, -1);
    }

    #[test]
    fn running_uses_its_own_sentinel() {
        let outcome = Outcome::running();
        assert_eq!(outcome.status, JobStatus::Running);
        assert_eq!(outcome.exit_code, -2);
        assert!(!outcome.status.is_terminal());
    }

    #[test]
    fn status_names_parse_back() {
        for status in [
            JobStatus::Running,
            JobStatus::Finished,
            JobStatus::Interrupted,
            JobStatus::FailedToLaunch,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>(), Ok(status));
        }
        assert!("DONE".parse::<JobStatus>().is_err());
    }
}
