mod archive;
mod cli;
mod config;
mod error;
mod export;
mod minify;
mod orchestrator;
mod pipeline;
mod poller;
mod transform;
mod ui;
mod walker;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use config::ExportConfig;
use export::ExportClient;
use orchestrator::Pipeline;
use tracing_subscriber::EnvFilter;
use ui::{LogWriter, TerminalProgress};

fn init_tracing(verbose: bool, writer: LogWriter) {
    let default = if verbose { "docpress=debug" } else { "docpress=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(move || writer.clone())
        .init();
}

async fn execute(cli: Cli, progress: &TerminalProgress) -> Result<()> {
    let mut config = ExportConfig::load(&cli.config)?;
    if cli.max_poll_attempts.is_some() {
        config.max_poll_attempts = cli.max_poll_attempts;
    }

    if matches!(cli.command, Command::Run) {
        config.validate_remote()?;
    }
    let client = ExportClient::new(&config)?;

    progress.begin(match cli.command {
        Command::Run => "Starting export",
        Command::Process => "Processing staged files",
    });
    let pipeline = Pipeline::new(client, config);
    let result = match cli.command {
        Command::Run => pipeline.run(progress).await,
        Command::Process => pipeline.process_staged(progress).await,
    };

    match result {
        Ok(report) => {
            progress.finish(&report);
            Ok(())
        }
        Err(e) => {
            progress.abort(&e);
            Err(e.into())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let progress = TerminalProgress::new();
    init_tracing(cli.verbose, progress.log_writer());

    match execute(cli, &progress).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "docpress failed");
            ExitCode::FAILURE
        }
    }
}
