use protobuf::{
    remote_jobs_client::RemoteJobsClient, CancelRequest, EnvEntry, GetRequest, LaunchRequest,
    ListRequest,
};
use tonic::{transport::Channel, Status};

type JobId = i64;

pub struct ClientCli {
    inner: RemoteJobsClient<Channel>,
}

impl ClientCli {
    pub async fn connect(server_addr: &str) -> Result<Self, tonic::transport::Error> {
        let inner = RemoteJobsClient::connect(server_addr.to_string()).await?;
        Ok(Self { inner })
    }

    pub async fn launch(
        &mut self,
        command: &str,
        workdir: Option<&str>,
        env: &[(String, String)],
        input: &str,
    ) -> Result<(), Status> {
        let request = LaunchRequest {
            command: command.into(),
            workdir: workdir.unwrap_or_default().into(),
            env: env
                .iter()
                .map(|(key, value)| EnvEntry {
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect(),
            input: input.as_bytes().to_vec(),
        };
        let response = self.inner.launch(request).await?;
        println!("{}", response.into_inner().message);
        Ok(())
    }

    pub async fn cancel(&mut self, id: JobId) -> Result<(), Status> {
        let response = self.inner.cancel(CancelRequest { id }).await?;
        println!("{}", response.into_inner().message);
        Ok(())
    }

    pub async fn list(&mut self) -> Result<(), Status> {
        let response = self.inner.list_commands(ListRequest {}).await?;
        for summary in response.into_inner().commands {
            println!("{}\t{}", summary.id, summary.command);
        }
        Ok(())
    }

    pub async fn get(&mut self, id: JobId) -> Result<(), Status> {
        let record = self.inner.get_command(GetRequest { id }).await?.into_inner();
        println!("id:        {}", record.id);
        println!("command:   {}", record.command);
        if !record.workdir.is_empty() {
            println!("workdir:   {}", record.workdir);
        }
        for entry in &record.env {
            println!("env:       {}={}", entry.key, entry.value);
        }
        println!("status:    {}", record.status);
        println!("exit code: {}", record.exit_code);
        println!("--- stdout ---");
        print!("{}", record.stdout);
        println!("--- stderr ---");
        print!("{}", record.stderr);
        Ok(())
    }
}
