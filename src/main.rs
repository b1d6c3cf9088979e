//! Collectify
//!
//! Web dashboard and CLI over a spreadsheet of tools, prompts and todos.

use anyhow::Result;
use clap::Parser;
use collectify::app::Collectify;
use collectify::cli::{self, Cli, Command, ServeArgs};
use collectify::config::Config;
use collectify::dashboard;
use collectify::logging::{self, LogTarget};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let mut config = Config::load_or_default(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.backend.db_path = database;
    }

    let command = cli.command.unwrap_or(Command::Serve(ServeArgs::default()));
    if let Command::Serve(ServeArgs { port: Some(port) }) = &command {
        config.server.port = *port;
    }

    let app = Collectify::open(&config).await?;

    match command {
        Command::Serve(_) => serve(app, config.server.port).await,
        Command::Todo(args) => cli::todo::run(&app, args).await,
        Command::Tools(args) => cli::tools::run(&app, args).await,
        Command::Prompts(args) => cli::prompts::run(&app, args).await,
        Command::Summary(args) => cli::run_summary(&app, args).await,
    }
}

async fn serve(app: Collectify, port: u16) -> Result<()> {
    info!(port, "Starting dashboard");
    dashboard::start_server(Arc::new(app), port, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
        }
    })
    .await
}
