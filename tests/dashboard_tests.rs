//! Integration tests for the dashboard's todo forms.
//!
//! The router is served on an ephemeral port and driven with a client that
//! does not follow redirects, so the redirect targets can be checked.

use collectify::app::Collectify;
use collectify::config::Config;
use collectify::dashboard::{DashboardServer, build_router};
use collectify::sheet::SqliteWorkbook;
use collectify::todo::Priority;
use reqwest::StatusCode;
use reqwest::header::LOCATION;
use std::sync::Arc;

/// Helper to serve a dashboard over a fresh in-memory workbook.
async fn setup_dashboard() -> (Arc<Collectify>, String) {
    let workbook = SqliteWorkbook::open_in_memory().expect("Failed to create workbook");
    let app = Arc::new(Collectify::with_backend(Arc::new(workbook), &Config::default()));
    app.ensure_worksheets().await.expect("Failed to create worksheets");

    let router = build_router(DashboardServer::new(Arc::clone(&app)));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (app, format!("http://{}", addr))
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn delete_resolves_label_to_row() {
    let (app, base) = setup_dashboard().await;
    app.todos.create("First", Priority::Low).await.unwrap();
    app.todos.create("Second", Priority::Low).await.unwrap();

    let response = client()
        .post(format!("{}/todos/delete", base))
        .form(&[("label", "Second | Incomplete")])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/todos?msg=Todo%20deleted%21");
    let list = app.todos.list().await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list.items[0].description, "First");
}

#[tokio::test]
async fn delete_of_vanished_label_reports_error() {
    let (app, base) = setup_dashboard().await;
    app.todos.create("Only", Priority::Low).await.unwrap();

    let response = client()
        .post(format!("{}/todos/delete", base))
        .form(&[("label", "Gone | Incomplete")])
        .send()
        .await
        .unwrap();

    assert_eq!(location(&response), "/todos?error=That%20todo%20no%20longer%20exists.");
    assert_eq!(app.todos.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn update_rewrites_selected_row() {
    let (app, base) = setup_dashboard().await;
    app.todos.create("First", Priority::Low).await.unwrap();

    let response = client()
        .post(format!("{}/todos/update", base))
        .form(&[
            ("row", "2"),
            ("label", "First | Incomplete"),
            ("todo", "First done"),
            ("priority", "High"),
            ("date_completed", "2025-03-01"),
            ("status", "Completed"),
        ])
        .send()
        .await
        .unwrap();

    assert_eq!(location(&response), "/todos?msg=Todo%20updated%21");
    let item = app.todos.list().await.unwrap().items[0].clone();
    assert_eq!(item.description, "First done");
    assert_eq!(item.priority, "High");
    assert_eq!(item.date_completed, "01/03/2025");
    assert_eq!(item.status, "Completed");
}

#[tokio::test]
async fn update_of_moved_row_is_refused() {
    let (app, base) = setup_dashboard().await;
    app.todos.create("First", Priority::Low).await.unwrap();
    app.todos.create("Second", Priority::Low).await.unwrap();
    // "Second" was selected at row 3; deleting row 2 moves it up.
    app.todos.delete(2, None).await.unwrap();
    app.todos.create("Third", Priority::Low).await.unwrap();

    let response = client()
        .post(format!("{}/todos/update", base))
        .form(&[
            ("row", "3"),
            ("label", "Second | Incomplete"),
            ("todo", "Second done"),
            ("priority", "Low"),
            ("date_completed", ""),
            ("status", "Completed"),
        ])
        .send()
        .await
        .unwrap();

    assert!(location(&response).starts_with("/todos?error=Failed%20to%20update%20todo"));
    let list = app.todos.list().await.unwrap();
    assert_eq!(list.items[1].description, "Third");
    assert_eq!(list.items[1].status, "Incomplete");
}
