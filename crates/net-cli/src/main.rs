//! Netplan reconciliation CLI (netplanctl)

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use netplan_api::Engine;
use netplan_config::EngineSettings;
use netplanctl::cli::{Cli, Commands};
use netplanctl::commands::{
    Outcome, RequestCommand, ShowCommand, StatusCommand, ValidateCommand,
};

async fn run(cli: &Cli) -> Result<Outcome> {
    let settings =
        EngineSettings::load(cli.settings.as_deref()).context("Failed to load engine settings")?;
    let engine = Arc::new(Engine::bootstrap(settings));

    match &cli.command {
        Commands::Request { file } => RequestCommand::new(engine).execute(file.as_deref()).await,
        Commands::Show => ShowCommand::new(engine).execute().await,
        Commands::Validate { file } => ValidateCommand::new(engine).execute(file.as_deref()).await,
        Commands::Status => StatusCommand::new(engine).execute().await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .target(env_logger::Target::Stderr)
        .init();

    match run(&cli).await {
        Ok(outcome) => {
            println!("{}", outcome.output);
            std::process::exit(outcome.exit_code());
        }
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {}", e);

                if cli.verbose || cli.debug {
                    for cause in e.chain().skip(1) {
                        eprintln!("  Caused by: {}", cause);
                    }
                }
            }
            std::process::exit(1);
        }
    }
}
