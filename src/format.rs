//! Output formatting utilities for markdown and JSON.

use crate::catalog::{DashboardSummary, Prompt, Tool};
use crate::todo::TodoList;
use serde::Serialize;
use std::str::FromStr;

/// Output format for CLI listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    Json,
    #[default]
    Markdown,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown format '{}': expected json or markdown", other)),
        }
    }
}

/// Pretty JSON for any serializable value.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
}

/// Escape a value for a markdown table cell.
fn cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

/// Format the todo list as a markdown table with row numbers.
pub fn format_todos_markdown(list: &TodoList) -> String {
    if list.is_empty() {
        return "No todos found.\n".to_string();
    }

    let mut md = String::new();
    md.push_str(&format!("# Todos ({})\n\n", list.len()));
    md.push_str("| row | todo | priority | added | completed | status |\n");
    md.push_str("|----:|------|----------|-------|-----------|--------|\n");
    for item in &list.items {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            item.row,
            cell(&item.description),
            cell(&item.priority),
            cell(&item.date_added),
            cell(&item.date_completed),
            cell(&item.status),
        ));
    }
    md
}

/// Format tools as a markdown list.
pub fn format_tools_markdown(title: &str, tools: &[&Tool]) -> String {
    let mut md = format!("# {} ({})\n\n", title, tools.len());
    if tools.is_empty() {
        md.push_str("No tools match your search.\n");
        return md;
    }
    for tool in tools {
        md.push_str(&format!("- **{}**", tool.name));
        if !tool.description.is_empty() {
            md.push_str(&format!(" - {}", tool.description));
        }
        if !tool.store_link.is_empty() {
            md.push_str(&format!(" <{}>", tool.store_link));
        }
        md.push('\n');
    }
    md
}

pub fn format_prompts_markdown(prompts: &[Prompt]) -> String {
    if prompts.is_empty() {
        return "No prompts found.\n".to_string();
    }
    let mut md = format!("# ChatGPT Prompts ({})\n", prompts.len());
    for prompt in prompts {
        md.push_str(&format!("\n## {}\n\n```\n{}\n```\n", prompt.description, prompt.prompt));
    }
    md
}

pub fn format_summary_markdown(summary: &DashboardSummary) -> String {
    format!(
        "| Total Tools | Categories | Used | Unused | ChatGPT Prompts |\n\
         |------------:|-----------:|-----:|-------:|----------------:|\n\
         | {} | {} | {} | {} | {} |\n",
        summary.total_tools, summary.categories, summary.used, summary.unused, summary.prompts
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::todo::TodoItem;

    #[test]
    fn parses_formats() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn todo_table_escapes_pipes() {
        let list = TodoList {
            headers: vec!["todo".into()],
            items: vec![TodoItem {
                row: 2,
                description: "a | b".into(),
                priority: "High".into(),
                date_added: "01/01/2025".into(),
                date_completed: String::new(),
                status: "Incomplete".into(),
            }],
        };
        let md = format_todos_markdown(&list);
        assert!(md.contains("| 2 | a \\| b | High | 01/01/2025 |  | Incomplete |"));
    }

    #[test]
    fn empty_listings_say_so() {
        assert_eq!(format_todos_markdown(&TodoList::default()), "No todos found.\n");
        assert_eq!(format_prompts_markdown(&[]), "No prompts found.\n");
    }
}
