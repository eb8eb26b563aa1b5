mod arg_parser;
mod client_cli;

use arg_parser::{ArgParser, SubCommand};
use client_cli::ClientCli;

use clap::Parser;
use std::error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn error::Error>> {
    let args = ArgParser::parse();
    let mut client = ClientCli::connect(&args.server).await?;

    match args.sub_command {
        SubCommand::Launch {
            command,
            workdir,
            env,
            input,
        } => {
            client
                .launch(&command, workdir.as_deref(), &env, &input)
                .await?;
        }
        SubCommand::Cancel { id } => {
            client.cancel(id).await?;
        }
        SubCommand::List => {
            client.list().await?;
        }
        SubCommand::Get { id } => {
            client.get(id).await?;
        }
    }

    Ok(())
}
