//! CLI command definitions for collectify
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod prompts;
pub mod todo;
pub mod tools;

use crate::app::Collectify;
use crate::catalog::DashboardSummary;
use crate::format::{OutputFormat, format_summary_markdown, to_json};
use clap::{Args, Parser, Subcommand};
use prompts::PromptsArgs;
use std::path::PathBuf;
use todo::TodoArgs;
use tools::ToolsArgs;

/// Spreadsheet-backed dashboard for tools, prompts and todos
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the local workbook file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the web dashboard (default if no subcommand given)
    Serve(ServeArgs),

    /// Create, list, update and delete todos
    Todo(TodoArgs),

    /// Browse and add catalog tools
    Tools(ToolsArgs),

    /// Browse and add ChatGPT prompts
    Prompts(PromptsArgs),

    /// Show headline counts
    Summary(SummaryArgs),
}

/// Arguments for the serve subcommand
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Port for the web dashboard (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Arguments for the summary subcommand
#[derive(Args, Debug)]
pub struct SummaryArgs {
    /// Output format: markdown or json
    #[arg(short, long, default_value = "markdown")]
    pub format: OutputFormat,
}

pub async fn run_summary(app: &Collectify, args: SummaryArgs) -> anyhow::Result<()> {
    let summary = DashboardSummary::collect(&app.catalog, &app.prompts).await?;
    match args.format {
        OutputFormat::Json => println!("{}", to_json(&summary)),
        OutputFormat::Markdown => print!("{}", format_summary_markdown(&summary)),
    }
    Ok(())
}
