//! Wiring of worksheets to the catalog, prompt and todo services.

use crate::catalog::{PromptBook, ToolCatalog};
use crate::config::{BackendKind, Config};
use crate::error::AppResult;
use crate::sheet::{CachedBackend, GoogleSheetsBackend, SheetBackend, SqliteWorkbook, Worksheet};
use crate::todo::TodoStore;
use anyhow::{Context, Result, bail};
use std::sync::Arc;
use tracing::info;

/// Everything the dashboard and CLI operate on.
#[derive(Debug, Clone)]
pub struct Collectify {
    pub catalog: ToolCatalog,
    pub prompts: PromptBook,
    pub todos: TodoStore,
}

impl Collectify {
    /// Open the configured backend(s) and make sure all worksheets exist.
    pub async fn open(config: &Config) -> Result<Self> {
        let (main, todo) = open_backends(config)?;
        let app = Self::from_backends(main, todo, config);
        app.ensure_worksheets()
            .await
            .context("preparing worksheets")?;
        Ok(app)
    }

    /// Build over a single backend holding every worksheet.
    pub fn with_backend(backend: Arc<dyn SheetBackend>, config: &Config) -> Self {
        Self::from_backends(Arc::clone(&backend), backend, config)
    }

    fn from_backends(
        main: Arc<dyn SheetBackend>,
        todo: Arc<dyn SheetBackend>,
        config: &Config,
    ) -> Self {
        let sheets = &config.worksheets;
        Self {
            catalog: ToolCatalog::new(Worksheet::new(Arc::clone(&main), &sheets.catalog)),
            prompts: PromptBook::new(Worksheet::new(main, &sheets.prompts)),
            todos: TodoStore::new(Worksheet::new(todo, &sheets.todo)),
        }
    }

    pub async fn ensure_worksheets(&self) -> AppResult<()> {
        self.catalog.ensure().await?;
        self.prompts.ensure().await?;
        self.todos.ensure().await?;
        Ok(())
    }
}

/// Backends for the catalog/prompt spreadsheet and the todo spreadsheet.
/// They are the same object unless a separate todo spreadsheet is configured.
fn open_backends(config: &Config) -> Result<(Arc<dyn SheetBackend>, Arc<dyn SheetBackend>)> {
    let backend = &config.backend;
    let (main, todo): (Arc<dyn SheetBackend>, Option<Arc<dyn SheetBackend>>) = match backend.kind {
        BackendKind::Sqlite => {
            config.ensure_db_dir()?;
            let workbook = SqliteWorkbook::open(&backend.db_path).with_context(|| {
                format!("opening workbook {}", backend.db_path.display())
            })?;
            info!(path = %backend.db_path.display(), "Using local workbook");
            (Arc::new(workbook), None)
        }
        BackendKind::GoogleSheets => {
            let Some(spreadsheet_id) = backend.spreadsheet_id.clone() else {
                bail!("backend.spreadsheet_id is required for the google_sheets backend");
            };
            let Some(token) = backend.access_token.clone() else {
                bail!("backend.access_token (or COLLECTIFY_SHEETS_TOKEN) is required for the google_sheets backend");
            };
            let google = |id: String| -> Arc<dyn SheetBackend> {
                Arc::new(GoogleSheetsBackend::with_base_url(
                    backend.api_base.clone(),
                    id,
                    token.clone(),
                    config.request_timeout(),
                ))
            };
            info!(spreadsheet = %spreadsheet_id, "Using Google Sheets");
            let todo = backend
                .todo_spreadsheet_id
                .clone()
                .filter(|id| *id != spreadsheet_id)
                .map(&google);
            (google(spreadsheet_id), todo)
        }
    };

    let cached = |inner: Arc<dyn SheetBackend>| -> Arc<dyn SheetBackend> {
        match config.cache_ttl() {
            Some(ttl) => Arc::new(CachedBackend::new(inner, ttl)),
            None => inner,
        }
    };
    let main = cached(main);
    let todo = match todo {
        Some(todo) => cached(todo),
        None => Arc::clone(&main),
    };
    Ok((main, todo))
}
