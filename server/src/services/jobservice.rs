use joblib::store::StoreError;
use joblib::types::{JobId, JobRecord, NewJob};
use joblib::{JobCoordinator, JobError};
use protobuf::remote_jobs_server::RemoteJobs;
use protobuf::{
    CancelRequest, CancelResponse, CommandRecord, CommandSummary, EnvEntry, GetRequest,
    LaunchRequest, LaunchResponse, ListRequest, ListResponse,
};
use std::path::PathBuf;
use tonic::{Request, Response, Status};
use tracing::error;

// tonic wraps this in Arc anyway internally, so we don't need Arc
pub struct RemoteJobsService {
    coordinator: JobCoordinator,
}

impl RemoteJobsService {
    pub fn new(coordinator: JobCoordinator) -> Self {
        Self { coordinator }
    }
}

/// Reject malformed ids before they reach the job engine.
fn parse_job_id(id: i64) -> Result<JobId, Status> {
    if id > 0 {
        Ok(id)
    } else {
        Err(Status::invalid_argument(format!("invalid job id {}", id)))
    }
}

fn job_error_status(err: JobError) -> Status {
    match err {
        JobError::NotFound => Status::not_found(err.to_string()),
        JobError::Store(StoreError::Timeout(_)) => Status::deadline_exceeded(err.to_string()),
        JobError::Store(_) => {
            error!(error = %err, "persistence failure");
            Status::internal(err.to_string())
        }
    }
}

fn into_new_job(req: LaunchRequest) -> NewJob {
    let LaunchRequest {
        command,
        workdir,
        env,
        input,
    } = req;
    NewJob {
        command,
        workdir: Some(workdir)
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from),
        env: env
            .into_iter()
            .map(|EnvEntry { key, value }| (key, value))
            .collect(),
        input: input.into(),
    }
}

fn into_command_record(record: JobRecord) -> CommandRecord {
    CommandRecord {
        id: record.id,
        command: record.command,
        workdir: record
            .workdir
            .map(|dir| dir.to_string_lossy().into_owned())
            .unwrap_or_default(),
        env: record
            .env
            .into_iter()
            .map(|(key, value)| EnvEntry { key, value })
            .collect(),
        input: record.input.to_vec(),
        stdout: record.stdout,
        stderr: record.stderr,
        exit_code: record.exit_code,
        status: record.status.to_string(),
    }
}

#[tonic::async_trait]
impl RemoteJobs for RemoteJobsService {
    async fn launch(
        &self,
        req: Request<LaunchRequest>,
    ) -> Result<Response<LaunchResponse>, Status> {
        let job = into_new_job(req.into_inner());
        if job.command.trim().is_empty() {
            return Err(Status::invalid_argument("command must not be empty"));
        }

        // the id is not echoed back; callers find their job through ListCommands
        self.coordinator
            .submit(job)
            .await
            .map_err(job_error_status)?;
        Ok(Response::new(LaunchResponse {
            message: "Launched".into(),
        }))
    }

    async fn cancel(
        &self,
        req: Request<CancelRequest>,
    ) -> Result<Response<CancelResponse>, Status> {
        let job_id = parse_job_id(req.into_inner().id)?;
        self.coordinator
            .cancel(job_id)
            .map_err(job_error_status)?;
        Ok(Response::new(CancelResponse {
            message: "Stopped".into(),
        }))
    }

    async fn list_commands(
        &self,
        _req: Request<ListRequest>,
    ) -> Result<Response<ListResponse>, Status> {
        let commands = self
            .coordinator
            .list()
            .await
            .map_err(job_error_status)?
            .into_iter()
            .map(|summary| CommandSummary {
                id: summary.id,
                command: summary.command,
            })
            .collect();
        Ok(Response::new(ListResponse { commands }))
    }

    async fn get_command(
        &self,
        req: Request<GetRequest>,
    ) -> Result<Response<CommandRecord>, Status> {
        let job_id = parse_job_id(req.into_inner().id)?;
        let record = self
            .coordinator
            .detail(job_id)
            .await
            .map_err(job_error_status)?;
        Ok(Response::new(into_command_record(record)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn non_positive_ids_are_invalid() {
        assert_eq!(parse_job_id(1).unwrap(), 1);
        for id in [0, -1, i64::MIN] {
            assert_eq!(
                parse_job_id(id).unwrap_err().code(),
                tonic::Code::InvalidArgument
            );
        }
    }

    #[test]
    fn errors_map_to_grpc_codes() {
        assert_eq!(
            job_error_status(JobError::NotFound).code(),
            tonic::Code::NotFound
        );
        assert_eq!(
            job_error_status(JobError::Store(StoreError::Timeout(Duration::from_secs(30)))).code(),
            tonic::Code::DeadlineExceeded
        );
        assert_eq!(
            job_error_status(JobError::Store(StoreError::Backend("down".into()))).code(),
            tonic::Code::Internal
        );
    }

    #[test]
    fn empty_workdir_means_inherit() {
        let job = into_new_job(LaunchRequest {
            command: "pwd".into(),
            workdir: String::new(),
            env: vec![EnvEntry {
                key: "K".into(),
                value: "V".into(),
            }],
            input: b"in".to_vec(),
        });
        assert_eq!(job.workdir, None);
        assert_eq!(job.env, vec![("K".to_string(), "V".to_string())]);
        assert_eq!(&job.input[..], b"in");

        let job = into_new_job(LaunchRequest {
            command: "pwd".into(),
            workdir: "/var".into(),
            ..Default::default()
        });
        assert_eq!(job.workdir, Some(PathBuf::from("/var")));
    }
}
