mod config;
mod services;
mod storage;

use clap::Parser;
use config::Config;
use joblib::{JobCoordinator, Launcher};
use protobuf::remote_jobs_server::RemoteJobsServer;
use services::jobservice::RemoteJobsService;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();
    init_tracing(&config.log_filter);

    let store = storage::open(&config).await?;
    let coordinator =
        JobCoordinator::new(store).with_launcher(Launcher::new().with_shell(&config.shell));

    let listener = TcpListener::bind(config.addr).await?;
    serve(listener, coordinator).await
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn serve(
    listener: TcpListener,
    coordinator: JobCoordinator,
) -> Result<(), Box<dyn std::error::Error>> {
    info!(addr = %listener.local_addr()?, "listening");
    let job_service = RemoteJobsService::new(coordinator);

    Server::builder()
        .add_service(RemoteJobsServer::new(job_service))
        .serve_with_incoming(TcpListenerStream::new(listener))
        .await?;

    Ok(())
}
