use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Serve remote shell jobs over gRPC
#[derive(Debug, Parser)]
#[clap(name = "jobserver", version)]
pub struct Config {
    /// Address to listen on
    #[clap(long, env = "JOBSERVER_ADDR", default_value = "[::1]:50051")]
    pub addr: SocketAddr,

    /// SQLite database URL, e.g. sqlite://jobs.db. Job records are kept in memory when unset
    #[clap(long, env = "JOBSERVER_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Deadline in seconds for every persistence call
    #[clap(long, env = "JOBSERVER_STORE_TIMEOUT", default_value = "30")]
    pub store_timeout_secs: u64,

    /// Shell used to interpret submitted commands
    #[clap(long, env = "JOBSERVER_SHELL", default_value = "/bin/sh")]
    pub shell: PathBuf,

    /// Log filter directives, e.g. "info" or "joblib=debug"
    #[clap(long, env = "RUST_LOG", default_value = "info")]
    pub log_filter: String,
}

impl Config {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }
}
