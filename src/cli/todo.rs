//! Todo subcommand for collectify CLI
//!
//! Rows are addressed by the row numbers shown by `todo list`. Pass
//! `--expect "<todo> | <status>"` to refuse the change if the row has moved.

use crate::app::Collectify;
use crate::format::{OutputFormat, format_todos_markdown, to_json};
use crate::todo::{Priority, Status, TodoUpdate, parse_date};
use anyhow::{Result, anyhow};
use chrono::{Local, NaiveDate};
use clap::{Args, Subcommand};

/// Arguments for the todo subcommand
#[derive(Args, Debug)]
pub struct TodoArgs {
    #[command(subcommand)]
    pub command: TodoCommand,
}

#[derive(Subcommand, Debug)]
pub enum TodoCommand {
    /// Add a new todo
    Add {
        /// What needs doing
        description: String,

        /// Low, Medium or High
        #[arg(short, long, default_value = "Low")]
        priority: Priority,
    },

    /// List todos with their row numbers
    List {
        /// Output format: markdown or json
        #[arg(short, long, default_value = "markdown")]
        format: OutputFormat,
    },

    /// Rewrite a todo row; unspecified fields keep their current value
    Update {
        /// Row number from `todo list`
        row: usize,

        /// New description
        #[arg(long)]
        todo: Option<String>,

        /// Low, Medium or High
        #[arg(short, long)]
        priority: Option<Priority>,

        /// Completed, Incomplete or "In Progress"
        #[arg(short, long)]
        status: Option<Status>,

        /// Completion date as dd/mm/yyyy, "today", or "none" to clear
        #[arg(long, value_name = "DATE")]
        completed: Option<String>,

        /// Label the row must still show ("<todo> | <status>")
        #[arg(long, value_name = "LABEL")]
        expect: Option<String>,
    },

    /// Delete a todo row
    Delete {
        /// Row number from `todo list`
        row: usize,

        /// Label the row must still show ("<todo> | <status>")
        #[arg(long, value_name = "LABEL")]
        expect: Option<String>,
    },
}

/// Parse the `--completed` argument.
fn parse_completed(value: &str) -> Result<Option<NaiveDate>> {
    match value.trim().to_lowercase().as_str() {
        "none" | "" => Ok(None),
        "today" => Ok(Some(Local::now().date_naive())),
        other => parse_date(other)
            .map(Some)
            .ok_or_else(|| anyhow!("invalid completion date '{}': expected dd/mm/yyyy", value)),
    }
}

pub async fn run(app: &Collectify, args: TodoArgs) -> Result<()> {
    let todos = &app.todos;
    match args.command {
        TodoCommand::Add {
            description,
            priority,
        } => {
            let item = todos.create(&description, priority).await?;
            println!("Todo added at row {}.", item.row);
        }
        TodoCommand::List { format } => {
            let list = todos.list().await?;
            match format {
                OutputFormat::Json => println!("{}", to_json(&list)),
                OutputFormat::Markdown => print!("{}", format_todos_markdown(&list)),
            }
        }
        TodoCommand::Update {
            row,
            todo,
            priority,
            status,
            completed,
            expect,
        } => {
            let list = todos.list().await?;
            let current = list
                .get(row)
                .ok_or_else(|| anyhow!("no todo at row {}", row))?;
            let date_completed = match completed {
                Some(value) => parse_completed(&value)?,
                None => current.completed_on(),
            };
            let update = TodoUpdate {
                description: todo.unwrap_or_else(|| current.description.clone()),
                priority: priority.unwrap_or_else(|| current.priority()),
                date_completed,
                status: status.unwrap_or_else(|| current.status()),
            };
            todos.update(row, &update, expect.as_deref()).await?;
            println!("Todo updated.");
        }
        TodoCommand::Delete { row, expect } => {
            todos.delete(row, expect.as_deref()).await?;
            println!("Todo deleted.");
        }
    }
    Ok(())
}
