use clap::{Parser, Subcommand};

/// Connect to a gRPC job server
#[derive(Debug, Parser)]
#[clap(name = "jobctl", version)]
pub struct ArgParser {
    /// The address of the server
    #[clap(
        short = 's',
        long = "server",
        env = "JOBCTL_SERVER",
        default_value = "http://[::1]:50051"
    )]
    pub server: String,
    /// The sub-command to use
    #[clap(subcommand)]
    pub sub_command: SubCommand,
}

#[derive(Clone, Debug, PartialEq, Eq, Subcommand)]
pub enum SubCommand {
    /// launch a shell command
    Launch {
        #[clap(long)]
        /// command text, interpreted by the server's shell
        command: String,

        #[clap(long)]
        /// working directory for the command
        workdir: Option<String>,

        #[clap(long = "env", parse(try_from_str = var_eq_val))]
        /// environment variable, repeatable; any given replaces the server's environment
        env: Vec<(String, String)>,

        #[clap(long, default_value = "")]
        /// text fed to the command's standard input
        input: String,
    },
    /// cancel a running job
    Cancel {
        /// job id
        id: i64,
    },
    /// list submitted commands
    List,
    /// show a job's status and output
    Get {
        /// job id
        id: i64,
    },
}

/// try_from_str parse function for command env variables
fn var_eq_val(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((var, val)) if !var.is_empty() => Ok((var.to_string(), val.to_string())),
        _ => Err("Required format is VAR=VAL".to_string()),
    }
}
