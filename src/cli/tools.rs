//! Tools subcommand for collectify CLI

use crate::app::Collectify;
use crate::catalog::{NewTool, Usage, search_by_name};
use crate::format::{OutputFormat, format_tools_markdown, to_json};
use anyhow::Result;
use clap::{Args, Subcommand};

/// Arguments for the tools subcommand
#[derive(Args, Debug)]
pub struct ToolsArgs {
    #[command(subcommand)]
    pub command: ToolsCommand,
}

#[derive(Subcommand, Debug)]
pub enum ToolsCommand {
    /// List tools, optionally restricted to one category
    List {
        /// Exact category name
        category: Option<String>,

        /// Output format: markdown or json
        #[arg(short, long, default_value = "markdown")]
        format: OutputFormat,
    },

    /// Search a category by tool name
    Search {
        /// Exact category name
        category: String,

        /// Case-insensitive name fragment
        query: String,

        /// Output format: markdown or json
        #[arg(short, long, default_value = "markdown")]
        format: OutputFormat,
    },

    /// List categories
    Categories,

    /// Add a tool to the catalog
    Add {
        #[arg(long)]
        category: String,

        #[arg(long)]
        name: String,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long, default_value = "")]
        logo_url: String,

        #[arg(long, default_value = "")]
        store_link: String,

        #[arg(long, default_value = "")]
        button_name: String,

        /// Mark the tool as used
        #[arg(long)]
        used: bool,
    },
}

pub async fn run(app: &Collectify, args: ToolsArgs) -> Result<()> {
    let catalog = &app.catalog;
    match args.command {
        ToolsCommand::List { category, format } => {
            let (title, tools) = match category {
                Some(category) => {
                    let tools = catalog.tools_in_category(&category).await?;
                    (format!("{} Tools", category), tools)
                }
                None => ("All Tools".to_string(), catalog.tools().await?),
            };
            let refs: Vec<_> = tools.iter().collect();
            match format {
                OutputFormat::Json => println!("{}", to_json(&refs)),
                OutputFormat::Markdown => print!("{}", format_tools_markdown(&title, &refs)),
            }
        }
        ToolsCommand::Search {
            category,
            query,
            format,
        } => {
            let tools = catalog.tools_in_category(&category).await?;
            let hits = search_by_name(&tools, &query);
            match format {
                OutputFormat::Json => println!("{}", to_json(&hits)),
                OutputFormat::Markdown => {
                    print!("{}", format_tools_markdown(&format!("{} Tools", category), &hits))
                }
            }
        }
        ToolsCommand::Categories => {
            for category in catalog.categories().await? {
                println!("{}", category);
            }
        }
        ToolsCommand::Add {
            category,
            name,
            description,
            logo_url,
            store_link,
            button_name,
            used,
        } => {
            catalog
                .add_tool(NewTool {
                    category,
                    name,
                    description,
                    logo_url,
                    store_link,
                    button_name,
                    used: if used { Usage::Yes } else { Usage::No },
                })
                .await?;
            println!("New item added successfully.");
        }
    }
    Ok(())
}
