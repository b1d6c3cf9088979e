//! Integration tests for the tool catalog, prompts and summary counts.

use collectify::app::Collectify;
use collectify::catalog::{DEFAULT_CATEGORY, DashboardSummary, NewTool, Usage};
use collectify::config::Config;
use collectify::error::ErrorCode;
use collectify::sheet::{SheetBackend, SqliteWorkbook};
use std::sync::Arc;

/// Helper to create an app over a fresh in-memory workbook.
async fn setup_app() -> (Collectify, Arc<SqliteWorkbook>) {
    let workbook = Arc::new(SqliteWorkbook::open_in_memory().expect("Failed to create workbook"));
    let app = Collectify::with_backend(workbook.clone(), &Config::default());
    app.ensure_worksheets().await.expect("Failed to create worksheets");
    (app, workbook)
}

fn new_tool(category: &str, name: &str, used: Usage) -> NewTool {
    NewTool {
        category: category.to_string(),
        name: name.to_string(),
        description: format!("{} description", name),
        logo_url: "https://example.com/logo.png".to_string(),
        store_link: "https://example.com".to_string(),
        button_name: "Visit".to_string(),
        used,
    }
}

#[tokio::test]
async fn empty_catalog_offers_default_category() {
    let (app, _) = setup_app().await;
    assert!(app.catalog.categories().await.unwrap().is_empty());
    assert_eq!(
        app.catalog.categories_or_default().await.unwrap(),
        vec![DEFAULT_CATEGORY.to_string()]
    );
}

#[tokio::test]
async fn added_tools_are_grouped_by_category() {
    let (app, _) = setup_app().await;
    app.catalog.add_tool(new_tool("Python", "Black", Usage::Yes)).await.unwrap();
    app.catalog.add_tool(new_tool("React", "Vite", Usage::No)).await.unwrap();
    app.catalog.add_tool(new_tool("Python", "Ruff", Usage::No)).await.unwrap();

    assert_eq!(app.catalog.categories().await.unwrap(), vec!["Python", "React"]);

    let python = app.catalog.tools_in_category("Python").await.unwrap();
    let names: Vec<_> = python.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Black", "Ruff"]);
    assert_eq!(python[0].button_name, "Visit");
    assert_eq!(python[0].used, Usage::Yes);

    assert!(app.catalog.tools_in_category("python").await.unwrap().is_empty());
}

#[tokio::test]
async fn records_follow_sheet_column_order() {
    let (_app, workbook) = setup_app().await;
    // A sheet whose columns are in a different order still gets matching cells.
    workbook
        .ensure_worksheet("custom", &["name", "used", "category"])
        .await
        .unwrap();
    let config = Config {
        worksheets: collectify::config::WorksheetsConfig {
            catalog: "custom".to_string(),
            ..Default::default()
        },
        ..Default::default()
    };
    let custom = Collectify::with_backend(workbook.clone(), &config);
    custom.catalog.add_tool(new_tool("Go", "gopls", Usage::Yes)).await.unwrap();

    let rows = workbook.read_all_values("custom").await.unwrap();
    assert_eq!(rows[1], vec!["gopls", "Yes", "Go"]);
}

#[tokio::test]
async fn add_tool_requires_category_and_name() {
    let (app, _) = setup_app().await;
    let err = app
        .catalog
        .add_tool(new_tool("  ", "Black", Usage::No))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::MissingRequiredField);
    assert_eq!(err.field.as_deref(), Some("category"));
    assert!(app.catalog.tools().await.unwrap().is_empty());
}

#[tokio::test]
async fn prompts_round_trip_through_sheet() {
    let (app, _) = setup_app().await;
    app.prompts
        .add_prompt("Summarize", "Summarize the following text:")
        .await
        .unwrap();

    let prompts = app.prompts.prompts().await.unwrap();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].description, "Summarize");

    let err = app.prompts.add_prompt("Empty", " ").await.unwrap_err();
    assert_eq!(err.field.as_deref(), Some("prompt"));
}

#[tokio::test]
async fn summary_counts_tools_and_prompts() {
    let (app, _) = setup_app().await;
    app.catalog.add_tool(new_tool("Python", "Black", Usage::Yes)).await.unwrap();
    app.catalog.add_tool(new_tool("React", "Vite", Usage::No)).await.unwrap();
    app.catalog.add_tool(new_tool("React", "Next", Usage::No)).await.unwrap();
    app.prompts.add_prompt("One", "Prompt one").await.unwrap();

    let summary = DashboardSummary::collect(&app.catalog, &app.prompts).await.unwrap();
    assert_eq!(
        summary,
        DashboardSummary {
            total_tools: 3,
            categories: 2,
            used: 1,
            unused: 2,
            prompts: 1,
        }
    );
}

#[tokio::test]
async fn missing_prompt_sheet_counts_as_zero() {
    let workbook = Arc::new(SqliteWorkbook::open_in_memory().unwrap());
    let app = Collectify::with_backend(workbook, &Config::default());
    app.catalog.ensure().await.unwrap();

    let summary = DashboardSummary::collect(&app.catalog, &app.prompts).await.unwrap();
    assert_eq!(summary.prompts, 0);
    assert_eq!(summary.total_tools, 0);
}
