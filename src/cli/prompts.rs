//! Prompts subcommand for collectify CLI

use crate::app::Collectify;
use crate::format::{OutputFormat, format_prompts_markdown, to_json};
use anyhow::Result;
use clap::{Args, Subcommand};

/// Arguments for the prompts subcommand
#[derive(Args, Debug)]
pub struct PromptsArgs {
    #[command(subcommand)]
    pub command: PromptsCommand,
}

#[derive(Subcommand, Debug)]
pub enum PromptsCommand {
    /// List saved prompts
    List {
        /// Output format: markdown or json
        #[arg(short, long, default_value = "markdown")]
        format: OutputFormat,
    },

    /// Save a new prompt
    Add {
        /// Short description shown above the prompt
        description: String,

        /// Prompt text
        prompt: String,
    },
}

pub async fn run(app: &Collectify, args: PromptsArgs) -> Result<()> {
    match args.command {
        PromptsCommand::List { format } => {
            let prompts = app.prompts.prompts().await?;
            match format {
                OutputFormat::Json => println!("{}", to_json(&prompts)),
                OutputFormat::Markdown => print!("{}", format_prompts_markdown(&prompts)),
            }
        }
        PromptsCommand::Add {
            description,
            prompt,
        } => {
            app.prompts.add_prompt(&description, &prompt).await?;
            println!("Prompt added successfully.");
        }
    }
    Ok(())
}
