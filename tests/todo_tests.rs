//! Integration tests for the todo tracker over a local workbook.

use chrono::{Local, NaiveDate};
use collectify::app::Collectify;
use collectify::config::Config;
use collectify::error::ErrorCode;
use collectify::sheet::{Row, SheetBackend, SheetResult, SqliteWorkbook, Worksheet};
use collectify::todo::{Priority, Status, TodoStore, TodoUpdate, format_date};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Helper to create a todo store with an empty worksheet.
async fn setup_store() -> TodoStore {
    let workbook = SqliteWorkbook::open_in_memory().expect("Failed to create in-memory workbook");
    let app = Collectify::with_backend(Arc::new(workbook), &Config::default());
    app.ensure_worksheets().await.expect("Failed to create worksheets");
    app.todos
}

fn update(description: &str, status: Status, completed: Option<NaiveDate>) -> TodoUpdate {
    TodoUpdate {
        description: description.to_string(),
        priority: Priority::Medium,
        date_completed: completed,
        status,
    }
}

mod create_tests {
    use super::*;

    #[tokio::test]
    async fn create_appends_incomplete_item_dated_today() {
        let store = setup_store().await;

        let item = store.create("  Buy milk ", Priority::High).await.unwrap();
        assert_eq!(item.row, 2);
        assert_eq!(item.description, "Buy milk");

        let list = store.list().await.unwrap();
        assert_eq!(list.len(), 1);
        let stored = &list.items[0];
        assert_eq!(stored.priority, "High");
        assert_eq!(stored.date_added, format_date(Local::now().date_naive()));
        assert_eq!(stored.date_completed, "");
        assert_eq!(stored.status, "Incomplete");
    }

    #[tokio::test]
    async fn blank_description_is_rejected() {
        let store = setup_store().await;
        let err = store.create("   ", Priority::Low).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingRequiredField);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rows_follow_list_order() {
        let store = setup_store().await;
        for name in ["a", "b", "c"] {
            store.create(name, Priority::Low).await.unwrap();
        }
        let list = store.list().await.unwrap();
        let rows: Vec<_> = list.items.iter().map(|i| i.row).collect();
        assert_eq!(rows, vec![2, 3, 4]);
        assert_eq!(list.headers[0], "todo");
    }
}

mod update_tests {
    use super::*;

    #[tokio::test]
    async fn update_preserves_date_added() {
        let store = setup_store().await;
        store.create("Write report", Priority::Low).await.unwrap();
        let added = store.list().await.unwrap().items[0].date_added.clone();

        let done = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        store
            .update(2, &update("Write final report", Status::Completed, Some(done)), None)
            .await
            .unwrap();

        let item = store.list().await.unwrap().items[0].clone();
        assert_eq!(item.description, "Write final report");
        assert_eq!(item.priority, "Medium");
        assert_eq!(item.date_added, added);
        assert_eq!(item.date_completed, "01/04/2025");
        assert_eq!(item.status, "Completed");
    }

    /// Counts single-row reads made against the wrapped workbook.
    struct CountingBackend {
        inner: SqliteWorkbook,
        row_reads: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl SheetBackend for CountingBackend {
        fn kind(&self) -> &'static str {
            "counting"
        }

        async fn worksheet_names(&self) -> SheetResult<Vec<String>> {
            self.inner.worksheet_names().await
        }

        async fn ensure_worksheet(&self, worksheet: &str, headers: &[&str]) -> SheetResult<()> {
            self.inner.ensure_worksheet(worksheet, headers).await
        }

        async fn read_all_values(&self, worksheet: &str) -> SheetResult<Vec<Row>> {
            self.inner.read_all_values(worksheet).await
        }

        async fn row_values(&self, worksheet: &str, row: usize) -> SheetResult<Row> {
            self.row_reads.fetch_add(1, Ordering::SeqCst);
            self.inner.row_values(worksheet, row).await
        }

        async fn cell(&self, worksheet: &str, row: usize, col: usize) -> SheetResult<Option<String>> {
            self.row_reads.fetch_add(1, Ordering::SeqCst);
            self.inner.cell(worksheet, row, col).await
        }

        async fn append_row(&self, worksheet: &str, values: Row) -> SheetResult<()> {
            self.inner.append_row(worksheet, values).await
        }

        async fn update_row(&self, worksheet: &str, row: usize, values: Row) -> SheetResult<()> {
            self.inner.update_row(worksheet, row, values).await
        }

        async fn delete_row(&self, worksheet: &str, row: usize) -> SheetResult<()> {
            self.inner.delete_row(worksheet, row).await
        }
    }

    #[tokio::test]
    async fn update_reads_target_row_once() {
        let backend = Arc::new(CountingBackend {
            inner: SqliteWorkbook::open_in_memory().unwrap(),
            row_reads: AtomicUsize::new(0),
        });
        let store = TodoStore::new(Worksheet::new(backend.clone(), "Todo"));
        store.ensure().await.unwrap();
        store.create("Task", Priority::Low).await.unwrap();
        let added = store.list().await.unwrap().items[0].date_added.clone();

        backend.row_reads.store(0, Ordering::SeqCst);
        store
            .update(2, &update("Task", Status::Completed, None), Some("Task | Incomplete"))
            .await
            .unwrap();

        assert_eq!(backend.row_reads.load(Ordering::SeqCst), 1);
        let item = store.list().await.unwrap().items[0].clone();
        assert_eq!(item.date_added, added);
    }

    #[tokio::test]
    async fn clearing_completion_date_writes_empty_cell() {
        let store = setup_store().await;
        store.create("Task", Priority::Low).await.unwrap();
        let done = NaiveDate::from_ymd_opt(2025, 1, 2);
        store.update(2, &update("Task", Status::Completed, done), None).await.unwrap();
        store.update(2, &update("Task", Status::InProgress, None), None).await.unwrap();

        let item = store.list().await.unwrap().items[0].clone();
        assert_eq!(item.date_completed, "");
        assert_eq!(item.status, "In Progress");
    }

    #[tokio::test]
    async fn header_row_and_missing_rows_are_refused() {
        let store = setup_store().await;
        store.create("Only", Priority::Low).await.unwrap();

        let err = store
            .update(1, &update("x", Status::Incomplete, None), None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFieldValue);

        let err = store
            .update(5, &update("x", Status::Incomplete, None), None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::RowNotFound);
    }

    #[tokio::test]
    async fn stale_label_blocks_update() {
        let store = setup_store().await;
        store.create("First", Priority::Low).await.unwrap();
        store.create("Second", Priority::Low).await.unwrap();

        // "Second" was selected at row 3, then row 2 was deleted.
        store.delete(2, Some("First | Incomplete")).await.unwrap();
        let err = store
            .update(3, &update("Second!", Status::Completed, None), Some("Second | Incomplete"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::RowNotFound);

        store.create("Third", Priority::Low).await.unwrap();
        let err = store
            .update(2, &update("Oops", Status::Completed, None), Some("Third | Incomplete"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::StaleSelection);
        assert_eq!(store.list().await.unwrap().items[0].description, "Second");
    }
}

mod delete_tests {
    use super::*;

    #[tokio::test]
    async fn delete_renumbers_later_items() {
        let store = setup_store().await;
        for name in ["a", "b", "c"] {
            store.create(name, Priority::Low).await.unwrap();
        }

        store.delete(3, None).await.unwrap();
        let list = store.list().await.unwrap();
        let names: Vec<_> = list.items.iter().map(|i| (i.row, i.description.as_str())).collect();
        assert_eq!(names, vec![(2, "a"), (3, "c")]);
    }

    #[tokio::test]
    async fn duplicate_labels_resolve_to_distinct_rows() {
        let store = setup_store().await;
        store.create("Same", Priority::Low).await.unwrap();
        store.create("Same", Priority::High).await.unwrap();

        let list = store.list().await.unwrap();
        let second = list.resolve("Same | Incomplete (2)").unwrap();
        assert_eq!(second.row, 3);

        store.delete(second.row, Some("Same | Incomplete (2)")).await.unwrap();
        let list = store.list().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.items[0].priority, "Low");
    }

    #[tokio::test]
    async fn deleting_header_is_refused() {
        let store = setup_store().await;
        let err = store.delete(1, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFieldValue);
    }
}
