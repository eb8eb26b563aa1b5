use crate::status::JobStatus;
use bytes::Bytes;
use std::path::PathBuf;

pub type JobId = i64;
pub type Command = String;
pub type Dir = PathBuf;
pub type Envs = Vec<(String, String)>;
pub type Input = Bytes;

/// A job as submitted by a caller, before persistence has assigned it an id.
///
/// An empty `env` means the process inherits the service's environment; a non-empty
/// one replaces it entirely.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewJob {
    pub command: Command,
    pub workdir: Option<Dir>,
    pub env: Envs,
    pub input: Input,
}

impl NewJob {
    pub fn new(command: impl Into<Command>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn workdir(mut self, dir: impl Into<Dir>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn input(mut self, input: impl Into<Input>) -> Self {
        self.input = input.into();
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobSummary {
    pub id: JobId,
    pub command: Command,
}

/// Full persisted view of a job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobRecord {
    pub id: JobId,
    pub command: Command,
    pub workdir: Option<Dir>,
    pub env: Envs,
    pub input: Input,
    pub stdout: String,
    pub stderr: String,
    pub status: JobStatus,
    pub exit_code: i32,
}
