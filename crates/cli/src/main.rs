// SPDX-License-Identifier: MIT

//! `oa`: the operator CLI (spec §6). Talks to the supervisor's process
//! lifecycle and to agents' control sockets; never to the peer transport.

mod binary;
mod chat_session;
mod color;
mod commands;
mod exit_error;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use exit_error::ExitError;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "oa", version, about = "Operator CLI for the multi-agent orchestration runtime", styles = color::styles())]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output format for commands that support it.
    #[arg(long, short = 'f', global = true, default_value = "text")]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Command {
    /// Add descriptors and start their agent processes.
    Start {
        /// One or more TOML descriptor files.
        descriptors: Vec<PathBuf>,
    },
    /// Gracefully stop agents (all, if no names given).
    Stop { names: Vec<String> },
    /// Stop then start agents (all, if no names given).
    Restart { names: Vec<String> },
    /// Tabular listing of the registry.
    Status,
    /// Establish a directed (or bidirectional) peer link.
    Connect {
        from: String,
        to: String,
        /// Also connect `to` back to `from`.
        #[arg(short = 'b', long)]
        bidirectional: bool,
    },
    /// Remove a peer link.
    Disconnect { from: String, to: String },
    /// Query an agent's health.
    Health { name: String },
    /// Query an agent's metrics.
    Metrics {
        name: String,
        #[arg(short = 'f', long, value_parser = ["json", "prometheus"])]
        metrics_format: Option<String>,
    },
    /// Inject a message and print the model's reply.
    Chat {
        name: String,
        message: Option<String>,
        /// Print a colored transcript of intermediate events.
        #[arg(short = 'v', long)]
        verbose: bool,
        /// Keep reading messages from stdin after the first reply.
        #[arg(short = 'i', long)]
        interactive: bool,
    },
    /// Tail an agent's log file.
    Logs {
        name: String,
        #[arg(short = 'f', long)]
        follow: bool,
    },
}

#[tokio::main]
async fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("OA_LOG"))
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    let result = dispatch(cli).await;

    if let Err(err) = result {
        match err.downcast::<ExitError>() {
            Ok(exit_err) => {
                eprintln!("{}", exit_err.message);
                std::process::exit(exit_err.code);
            }
            Err(err) => {
                eprintln!("error: {err:#}");
                std::process::exit(1);
            }
        }
    }
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Start { descriptors } => commands::start(descriptors).await,
        Command::Stop { names } => commands::stop(names).await,
        Command::Restart { names } => commands::restart(names).await,
        Command::Status => commands::status(cli.format).await,
        Command::Connect { from, to, bidirectional } => commands::connect(from, to, bidirectional).await,
        Command::Disconnect { from, to } => commands::disconnect(from, to).await,
        Command::Health { name } => commands::health(name, cli.format).await,
        Command::Metrics { name, metrics_format } => commands::metrics(name, metrics_format).await,
        Command::Chat { name, message, verbose, interactive } => {
            commands::chat(name, message, verbose, interactive).await
        }
        Command::Logs { name, follow } => commands::logs(name, follow).await,
    }
}
