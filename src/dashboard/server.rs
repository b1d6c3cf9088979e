//! HTTP server implementation for the web dashboard.
//!
//! This module provides the axum-based HTTP server that serves the dashboard
//! pages and exposes JSON API endpoints. Every backend failure is rendered
//! as a message on the page; nothing is retried.

use axum::{
    Router,
    extract::{Form, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
};
use chrono::{Local, NaiveDate};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::templates;
use crate::app::Collectify;
use crate::catalog::{DashboardSummary, NewTool, Tool, Usage, search_by_name};
use crate::error::{AppError, ErrorCode};
use crate::todo::{Priority, Status, TodoItem, TodoList, TodoUpdate, format_date};

/// Dashboard server state shared across handlers.
#[derive(Clone)]
pub struct DashboardServer {
    app: Arc<Collectify>,
}

impl DashboardServer {
    pub fn new(app: Arc<Collectify>) -> Self {
        Self { app }
    }

    pub fn app(&self) -> &Collectify {
        &self.app
    }

    /// Sidebar links: fixed pages, then one entry per catalog category.
    async fn nav(&self, active: &str) -> String {
        let categories = match self.app.catalog.categories().await {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load categories");
                Vec::new()
            }
        };

        let link = |href: &str, label: &str| {
            let class = if label == active { " class=\"active\"" } else { "" };
            format!(
                r#"<a href="{}"{}>{}</a>"#,
                html_escape(href),
                class,
                html_escape(label)
            )
        };

        let mut html = String::new();
        html.push_str(&link("/", "Home"));
        html.push_str(&link("/items/new", "Add New Item"));
        html.push_str(&link("/prompts/new", "Add New ChatGPT Prompt"));
        html.push_str(&link("/todos", "Todo App"));
        html.push_str("<hr>");
        html.push_str(&link("/prompts", "ChatGPT Prompts"));
        for category in &categories {
            html.push_str(&link(&format!("/tools/{}", path_escape(category)), category));
        }
        html
    }

    async fn page(&self, title: &str, content: &str) -> Html<String> {
        let nav = self.nav(title).await;
        Html(templates::render(&html_escape(title), &nav, content))
    }
}

/// Health check response.
#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Escape HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Percent-encode a path segment.
fn path_escape(s: &str) -> String {
    s.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect()
}

#[derive(Clone, Copy)]
enum MessageKind {
    Success,
    Error,
    Warning,
    Info,
}

fn message(kind: MessageKind, text: &str) -> String {
    let class = match kind {
        MessageKind::Success => "message-success",
        MessageKind::Error => "message-error",
        MessageKind::Warning => "message-warning",
        MessageKind::Info => "message-info",
    };
    format!(
        r#"<div class="message {}">{}</div>"#,
        class,
        html_escape(text)
    )
}

/// Validation problems are warnings; everything else is an error.
fn error_message(context: &str, err: &AppError) -> String {
    match err.code {
        ErrorCode::MissingRequiredField | ErrorCode::InvalidFieldValue => {
            message(MessageKind::Warning, &err.message)
        }
        _ => message(MessageKind::Error, &format!("{}: {}", context, err)),
    }
}

fn page_header(title: &str, intro: &str) -> String {
    format!(
        "<h1>{}</h1><p class=\"subtitle\">{}</p><hr>",
        html_escape(title),
        html_escape(intro)
    )
}

fn select_options<'a>(
    options: impl IntoIterator<Item = &'a str>,
    selected: Option<&str>,
) -> String {
    options
        .into_iter()
        .map(|opt| {
            let sel = if Some(opt) == selected { " selected" } else { "" };
            format!(
                r#"<option value="{0}"{1}>{0}</option>"#,
                html_escape(opt),
                sel
            )
        })
        .collect()
}

// =============================================================================
// Home
// =============================================================================

/// Root endpoint - header, KPI cards and category links.
async fn home_page(State(state): State<DashboardServer>) -> Html<String> {
    let mut content = format!(
        r#"<div class="dashboard-header">
            <h1>Useful Tools Dashboard</h1>
            <p class="subtitle">Curated tools, ChatGPT prompts and todos, all synced with the spreadsheet.</p>
            <div class="refreshed">Refreshed &middot; {}</div>
        </div>"#,
        Local::now().format("%b %d, %Y %H:%M")
    );

    match DashboardSummary::collect(&state.app().catalog, &state.app().prompts).await {
        Ok(summary) => content.push_str(&kpi_grid(&summary)),
        Err(e) => content.push_str(&error_message("Failed to load data from the sheet", &e)),
    }

    state.page("Home", &content).await
}

fn kpi_grid(summary: &DashboardSummary) -> String {
    let cards = [
        ("Total Tools", summary.total_tools),
        ("Categories", summary.categories),
        ("Used", summary.used),
        ("Unused", summary.unused),
        ("ChatGPT Prompts", summary.prompts),
    ];
    let mut html = String::from(r#"<div class="kpi-grid">"#);
    for (label, value) in cards {
        html.push_str(&format!(
            r#"<div class="kpi-card"><div class="label">{}</div><div class="value">{}</div></div>"#,
            label, value
        ));
    }
    html.push_str("</div>");
    html
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, serde::Deserialize)]
struct SearchParams {
    q: Option<String>,
}

fn tool_card(tool: &Tool) -> String {
    let or = |value: &str, fallback: &str| {
        if value.is_empty() {
            fallback.to_string()
        } else {
            value.to_string()
        }
    };
    format!(
        r##"<div class="card">
            <img src="{logo}" alt="{name} logo">
            <div class="card-title">{title}</div>
            <div class="card-description">{description}</div>
            <div class="card-footer">
                <a href="{link}" target="_blank"><button class="card-button">{button}</button></a>
            </div>
        </div>"##,
        logo = html_escape(&tool.logo_url),
        name = html_escape(&or(&tool.name, "Tool")),
        title = html_escape(&or(&tool.name, "Untitled Tool")),
        description = html_escape(&or(&tool.description, "No description available.")),
        link = html_escape(&or(&tool.store_link, "#")),
        button = html_escape(&or(&tool.button_name, "Open")),
    )
}

/// Category page - card grid with a name search.
async fn category_page(
    State(state): State<DashboardServer>,
    Path(category): Path<String>,
    Query(params): Query<SearchParams>,
) -> Html<String> {
    let title = format!("{} Tools", category);
    let mut content = page_header(
        &title,
        &format!(
            "This page displays a curated list of {} tools and resources. Browse through the cards below and click on any tool to learn more.",
            category
        ),
    );

    let tools = match state.app().catalog.tools_in_category(&category).await {
        Ok(tools) => tools,
        Err(e) => {
            content.push_str(&error_message("Failed to fetch tools from the sheet", &e));
            return state.page(&category, &content).await;
        }
    };

    let query = params.q.unwrap_or_default();
    content.push_str(&format!(
        r#"<form method="get"><label>Search by name</label>
            <input type="text" name="q" value="{}" placeholder="Type a website/app name..."></form>"#,
        html_escape(query.trim())
    ));

    let hits = search_by_name(&tools, &query);
    content.push_str(&format!(r#"<p class="caption">Results: {}</p>"#, hits.len()));

    if hits.is_empty() {
        content.push_str(&message(MessageKind::Info, "No tools match your search."));
    } else {
        content.push_str(r#"<div class="card-grid">"#);
        for tool in hits {
            content.push_str(&tool_card(tool));
        }
        content.push_str("</div>");
    }

    state.page(&category, &content).await
}

async fn add_item_content(state: &DashboardServer, notice: Option<String>) -> String {
    let mut content = page_header(
        "Add New Item",
        "Use this page to contribute a new tool to the collection. Fill in the fields below.",
    );
    if let Some(notice) = notice {
        content.push_str(&notice);
    }

    let categories = match state.app().catalog.categories_or_default().await {
        Ok(c) => c,
        Err(e) => {
            content.push_str(&error_message("Failed to load categories", &e));
            vec![crate::catalog::DEFAULT_CATEGORY.to_string()]
        }
    };

    content.push_str(&format!(
        r#"<form method="post" action="/items" class="stacked">
            <div class="row">
                <div><label>Select Category</label><select name="category">{categories}</select></div>
                <div><label>Name</label><input type="text" name="name"></div>
            </div>
            <label>Description</label><textarea name="description"></textarea>
            <div class="row">
                <div><label>Logo URL</label><input type="text" name="logo_url"></div>
                <div><label>Store Link</label><input type="text" name="store_link"></div>
            </div>
            <div class="row">
                <div><label>Button Name</label><input type="text" name="button_name"></div>
                <div><label>Used</label><select name="used">{used}</select></div>
            </div>
            <p><button type="submit">Add Item</button></p>
        </form>"#,
        categories = select_options(categories.iter().map(String::as_str), None),
        used = select_options([Usage::Yes.as_str(), Usage::No.as_str()], None),
    ));
    content
}

async fn add_item_page(State(state): State<DashboardServer>) -> Html<String> {
    let content = add_item_content(&state, None).await;
    state.page("Add New Item", &content).await
}

async fn add_item_submit(
    State(state): State<DashboardServer>,
    Form(form): Form<NewTool>,
) -> Html<String> {
    let notice = match state.app().catalog.add_tool(form).await {
        Ok(()) => message(MessageKind::Success, "New item added successfully!"),
        Err(e) if e.code == ErrorCode::MissingRequiredField => message(
            MessageKind::Warning,
            "Please fill in at least the Category and Name fields.",
        ),
        Err(e) => error_message("Failed to add item", &e),
    };
    let content = add_item_content(&state, Some(notice)).await;
    state.page("Add New Item", &content).await
}

// =============================================================================
// Prompts
// =============================================================================

async fn prompts_page(State(state): State<DashboardServer>) -> Html<String> {
    let mut content = page_header(
        "ChatGPT Prompts",
        "Browse useful ChatGPT prompts with short descriptions and pre-filled content.",
    );

    match state.app().prompts.prompts().await {
        Ok(prompts) if prompts.is_empty() => {
            content.push_str(&message(MessageKind::Info, "No prompts found."));
        }
        Ok(prompts) => {
            for prompt in prompts {
                content.push_str(&format!(
                    "<p>&#128204; {}</p><pre><code>{}</code></pre><hr>",
                    html_escape(&prompt.description),
                    html_escape(&prompt.prompt)
                ));
            }
        }
        Err(e) => content.push_str(&error_message("Failed to load prompts", &e)),
    }

    state.page("ChatGPT Prompts", &content).await
}

fn add_prompt_content(notice: Option<String>) -> String {
    let mut content = page_header(
        "Add New ChatGPT Prompt",
        "Fill in the details to save a new ChatGPT prompt.",
    );
    if let Some(notice) = notice {
        content.push_str(&notice);
    }
    content.push_str(
        r#"<form method="post" action="/prompts" class="stacked">
            <label>Description</label><textarea name="description"></textarea>
            <label>Prompt</label><textarea name="prompt"></textarea>
            <p><button type="submit">Add Prompt</button></p>
        </form>"#,
    );
    content
}

async fn add_prompt_page(State(state): State<DashboardServer>) -> Html<String> {
    state
        .page("Add New ChatGPT Prompt", &add_prompt_content(None))
        .await
}

#[derive(Debug, serde::Deserialize)]
struct PromptForm {
    #[serde(default)]
    description: String,
    #[serde(default)]
    prompt: String,
}

async fn add_prompt_submit(
    State(state): State<DashboardServer>,
    Form(form): Form<PromptForm>,
) -> Html<String> {
    let notice = match state
        .app()
        .prompts
        .add_prompt(&form.description, &form.prompt)
        .await
    {
        Ok(()) => message(MessageKind::Success, "Prompt added successfully!"),
        Err(e) if e.code == ErrorCode::MissingRequiredField => message(
            MessageKind::Warning,
            "Please fill in both the Description and Prompt fields.",
        ),
        Err(e) => error_message("Failed to add prompt", &e),
    };
    state
        .page("Add New ChatGPT Prompt", &add_prompt_content(Some(notice)))
        .await
}

// =============================================================================
// Todos
// =============================================================================

#[derive(Debug, serde::Deserialize)]
struct TodoPageParams {
    msg: Option<String>,
    error: Option<String>,
}

/// Inline colour for known statuses; other values are left unstyled.
fn status_style(status: &str) -> String {
    status
        .parse::<Status>()
        .map(|s| format!(r#" style="background-color: {};""#, s.color()))
        .unwrap_or_default()
}

fn todo_table(list: &TodoList) -> String {
    if list.is_empty() {
        return message(MessageKind::Info, "No todos found.");
    }
    let mut html = String::from("<table><thead><tr><th>#</th>");
    for header in &list.headers {
        html.push_str(&format!("<th>{}</th>", html_escape(header)));
    }
    html.push_str("</tr></thead><tbody>");
    for (idx, item) in list.items.iter().enumerate() {
        html.push_str(&format!(
            r#"<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td><span class="status"{}>{}</span></td></tr>"#,
            idx + 1,
            html_escape(&item.description),
            html_escape(&item.priority),
            html_escape(&item.date_added),
            html_escape(&item.date_completed),
            status_style(&item.status),
            html_escape(&item.status),
        ));
    }
    html.push_str("</tbody></table>");
    html
}

fn label_select(list: &TodoList, name: &str) -> String {
    let options = list.options();
    format!(
        r#"<select name="{}">{}</select>"#,
        name,
        select_options(options.iter().map(|o| o.label.as_str()), None)
    )
}

/// Todo page - table, create form, and update/delete selectors.
async fn todos_page(
    State(state): State<DashboardServer>,
    Query(params): Query<TodoPageParams>,
) -> Html<String> {
    let mut content = String::from("<h1>&#127969; MyTodo List</h1>");
    if let Some(msg) = params.msg.filter(|m| !m.is_empty()) {
        content.push_str(&message(MessageKind::Success, &msg));
    }
    if let Some(err) = params.error.filter(|m| !m.is_empty()) {
        content.push_str(&message(MessageKind::Error, &err));
    }

    let list = match state.app().todos.list().await {
        Ok(list) => list,
        Err(e) => {
            content.push_str(&error_message("Failed to load todos", &e));
            return state.page("Todo App", &content).await;
        }
    };
    content.push_str(&todo_table(&list));

    content.push_str(&format!(
        r#"<h2>&#128203; Add New Todo</h2>
        <form method="post" action="/todos" class="stacked">
            <label>Enter your todo:</label><input type="text" name="todo">
            <label>Select Priority</label><select name="priority">{}</select>
            <p><button type="submit">Add Todo</button></p>
        </form>"#,
        select_options(Priority::ALL.iter().map(|p| p.as_str()), None)
    ));

    if list.is_empty() {
        content.push_str(&message(
            MessageKind::Info,
            "No todos available to update or delete.",
        ));
    } else {
        content.push_str(&format!(
            r#"<h2>&#128271; Update a Todo</h2>
            <form method="get" action="/todos/edit" class="stacked">
                <label>Select a todo to update</label>{}
                <p><button type="submit">Edit</button></p>
            </form>
            <h2>&#128465; Delete a Todo</h2>
            <form method="post" action="/todos/delete" class="stacked">
                <label>Select a todo to delete</label>{}
                <p><button type="submit" class="danger">Delete Todo</button></p>
            </form>"#,
            label_select(&list, "label"),
            label_select(&list, "label"),
        ));
    }

    state.page("Todo App", &content).await
}

fn todos_redirect(key: &str, text: &str) -> Redirect {
    Redirect::to(&format!("/todos?{}={}", key, path_escape(text)))
}

#[derive(Debug, serde::Deserialize)]
struct CreateTodoForm {
    #[serde(default)]
    todo: String,
    priority: Priority,
}

async fn todo_create(
    State(state): State<DashboardServer>,
    Form(form): Form<CreateTodoForm>,
) -> Redirect {
    match state.app().todos.create(&form.todo, form.priority).await {
        Ok(_) => todos_redirect("msg", "Todo added!"),
        Err(e) if e.code == ErrorCode::MissingRequiredField => {
            todos_redirect("error", "Please enter a valid todo item.")
        }
        Err(e) => todos_redirect("error", &format!("Failed to add todo: {}", e)),
    }
}

#[derive(Debug, serde::Deserialize)]
struct SelectParams {
    label: String,
}

fn edit_form(item: &TodoItem, label: &str) -> String {
    format!(
        r#"<h1>&#128271; Update a Todo</h1>
        <form method="post" action="/todos/update" class="stacked">
            <input type="hidden" name="row" value="{row}">
            <input type="hidden" name="label" value="{label}">
            <label>Update Todo</label><input type="text" name="todo" value="{todo}">
            <div class="row">
                <div><label>Priority</label><select name="priority">{priorities}</select></div>
                <div><label>Date Completed</label><input type="date" name="date_completed" value="{completed}"></div>
                <div><label>Status</label><select name="status">{statuses}</select></div>
            </div>
            <p><button type="submit">Update Todo</button> <a href="/todos">Cancel</a></p>
        </form>"#,
        row = item.row,
        label = html_escape(label),
        todo = html_escape(&item.description),
        priorities = select_options(
            Priority::ALL.iter().map(|p| p.as_str()),
            Some(item.priority().as_str())
        ),
        completed = item.default_completion_date().format("%Y-%m-%d"),
        statuses = select_options(
            Status::ALL.iter().map(|s| s.as_str()),
            Some(item.status().as_str())
        ),
    )
}

/// Edit page for the selected label, pre-filled from the current row.
async fn todo_edit_page(
    State(state): State<DashboardServer>,
    Query(params): Query<SelectParams>,
) -> Response {
    let list = match state.app().todos.list().await {
        Ok(list) => list,
        Err(e) => return todos_redirect("error", &format!("Failed to load todos: {}", e)).into_response(),
    };
    match list.resolve(&params.label) {
        Some(item) => state
            .page("Todo App", &edit_form(item, &params.label))
            .await
            .into_response(),
        None => todos_redirect("error", "That todo no longer exists.").into_response(),
    }
}

#[derive(Debug, serde::Deserialize)]
struct UpdateTodoForm {
    row: usize,
    label: String,
    #[serde(default)]
    todo: String,
    priority: Priority,
    #[serde(default)]
    date_completed: String,
    status: Status,
}

fn parse_form_date(s: &str) -> Result<Option<NaiveDate>, AppError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| AppError::invalid_value("date_completed", "expected a YYYY-MM-DD date"))
}

async fn todo_update(
    State(state): State<DashboardServer>,
    Form(form): Form<UpdateTodoForm>,
) -> Redirect {
    let date_completed = match parse_form_date(&form.date_completed) {
        Ok(date) => date,
        Err(e) => return todos_redirect("error", &e.message),
    };
    let update = TodoUpdate {
        description: form.todo,
        priority: form.priority,
        date_completed,
        status: form.status,
    };
    match state
        .app()
        .todos
        .update(form.row, &update, Some(&form.label))
        .await
    {
        Ok(()) => {
            let completed = date_completed.map(format_date).unwrap_or_default();
            info!(row = form.row, completed = %completed, "Todo updated from dashboard");
            todos_redirect("msg", "Todo updated!")
        }
        Err(e) => todos_redirect("error", &format!("Failed to update todo: {}", e)),
    }
}

/// Resolve the selected label against the current sheet, then delete that row.
async fn todo_delete(
    State(state): State<DashboardServer>,
    Form(form): Form<SelectParams>,
) -> Redirect {
    let todos = &state.app().todos;
    let row = match todos.list().await {
        Ok(list) => list.resolve(&form.label).map(|item| item.row),
        Err(e) => return todos_redirect("error", &format!("Failed to load todos: {}", e)),
    };
    let Some(row) = row else {
        return todos_redirect("error", "That todo no longer exists.");
    };
    match todos.delete(row, Some(&form.label)).await {
        Ok(()) => todos_redirect("msg", "Todo deleted!"),
        Err(e) => todos_redirect("error", &format!("Failed to delete todo: {}", e)),
    }
}

// =============================================================================
// JSON API
// =============================================================================

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.code {
            ErrorCode::MissingRequiredField
            | ErrorCode::InvalidFieldValue
            | ErrorCode::InvalidState => StatusCode::BAD_REQUEST,
            ErrorCode::WorksheetNotFound | ErrorCode::RowNotFound => StatusCode::NOT_FOUND,
            ErrorCode::StaleSelection => StatusCode::CONFLICT,
            ErrorCode::BackendError => StatusCode::BAD_GATEWAY,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// Run a fallible API call and serialize its result.
async fn api_json<T, F>(fut: F) -> Response
where
    T: serde::Serialize,
    F: Future<Output = Result<T, AppError>>,
{
    match fut.await {
        Ok(value) => Json(value).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn api_summary(State(state): State<DashboardServer>) -> Response {
    api_json(DashboardSummary::collect(&state.app().catalog, &state.app().prompts)).await
}

async fn api_todos(State(state): State<DashboardServer>) -> Response {
    api_json(state.app().todos.list()).await
}

async fn api_tools(
    State(state): State<DashboardServer>,
    Path(category): Path<String>,
) -> Response {
    api_json(state.app().catalog.tools_in_category(&category)).await
}

/// Health check endpoint.
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the router with all routes.
pub fn build_router(state: DashboardServer) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Page routes
        .route("/", get(home_page))
        .route("/tools/{category}", get(category_page))
        .route("/items/new", get(add_item_page))
        .route("/items", post(add_item_submit))
        .route("/prompts", get(prompts_page).post(add_prompt_submit))
        .route("/prompts/new", get(add_prompt_page))
        .route("/todos", get(todos_page).post(todo_create))
        .route("/todos/edit", get(todo_edit_page))
        .route("/todos/update", post(todo_update))
        .route("/todos/delete", post(todo_delete))
        // API routes
        .route("/api/health", get(health))
        .route("/api/summary", get(api_summary))
        .route("/api/todos", get(api_todos))
        .route("/api/tools/{category}", get(api_tools))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the dashboard on 127.0.0.1:`port` until `shutdown` resolves.
pub async fn start_server<F>(app: Arc<Collectify>, port: u16, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let router = build_router(DashboardServer::new(app));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Dashboard server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("Dashboard server shutting down");
        })
        .await?;
    Ok(())
}
