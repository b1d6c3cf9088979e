//! Local workbook backed by SQLite.
//!
//! Each worksheet is a set of `(position, cells)` rows where `cells` is a
//! JSON array of strings. Positions stay contiguous from 1.

use super::{normalize_rows, overlay_row, Row, SheetBackend, SheetError, SheetResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Workbook handle wrapping a SQLite connection.
#[derive(Clone)]
pub struct SqliteWorkbook {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteWorkbook {
    /// Open or create the workbook at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> SheetResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA foreign_keys=ON;
             PRAGMA busy_timeout=5000;",
        )?;

        let workbook = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        workbook.run_migrations()?;
        Ok(workbook)
    }

    /// Open an in-memory workbook (for testing).
    pub fn open_in_memory() -> SheetResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let workbook = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        workbook.run_migrations()?;
        Ok(workbook)
    }

    fn run_migrations(&self) -> SheetResult<()> {
        let mut conn = self.lock();
        embedded::migrations::runner().run(&mut *conn)?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Execute a function with exclusive access to the connection.
    fn with_conn<F, T>(&self, f: F) -> SheetResult<T>
    where
        F: FnOnce(&Connection) -> SheetResult<T>,
    {
        let conn = self.lock();
        f(&conn)
    }

    /// Execute a function with mutable access to the connection (for transactions).
    fn with_conn_mut<F, T>(&self, f: F) -> SheetResult<T>
    where
        F: FnOnce(&mut Connection) -> SheetResult<T>,
    {
        let mut conn = self.lock();
        f(&mut conn)
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn worksheet_id(conn: &Connection, title: &str) -> SheetResult<i64> {
    conn.query_row(
        "SELECT id FROM worksheets WHERE title = ?1",
        params![title],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| SheetError::WorksheetNotFound(title.to_string()))
}

fn row_count(conn: &Connection, worksheet_id: i64) -> SheetResult<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sheet_rows WHERE worksheet_id = ?1",
        params![worksheet_id],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

fn check_row(title: &str, row: usize, rows: usize) -> SheetResult<()> {
    if row == 0 || row > rows {
        return Err(SheetError::RowOutOfRange {
            worksheet: title.to_string(),
            row,
            rows,
        });
    }
    Ok(())
}

fn insert_row(conn: &Connection, worksheet_id: i64, values: &Row) -> SheetResult<()> {
    let cells = serde_json::to_string(values)?;
    conn.execute(
        "INSERT INTO sheet_rows (worksheet_id, position, cells, updated_at)
         VALUES (?1, (SELECT COALESCE(MAX(position), 0) + 1 FROM sheet_rows WHERE worksheet_id = ?1), ?2, ?3)",
        params![worksheet_id, cells, now_ms()],
    )?;
    Ok(())
}

#[async_trait]
impl SheetBackend for SqliteWorkbook {
    fn kind(&self) -> &'static str {
        "sqlite"
    }

    async fn worksheet_names(&self) -> SheetResult<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT title FROM worksheets ORDER BY id")?;
            let titles = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(titles)
        })
    }

    async fn ensure_worksheet(&self, worksheet: &str, headers: &[&str]) -> SheetResult<()> {
        self.with_conn(|conn| {
            let created = conn.execute(
                "INSERT OR IGNORE INTO worksheets (title, created_at) VALUES (?1, ?2)",
                params![worksheet, now_ms()],
            )?;
            if created > 0 {
                debug!(worksheet, "Created worksheet");
                if !headers.is_empty() {
                    let id = worksheet_id(conn, worksheet)?;
                    let header_row: Row = headers.iter().map(|h| h.to_string()).collect();
                    insert_row(conn, id, &header_row)?;
                }
            }
            Ok(())
        })
    }

    async fn read_all_values(&self, worksheet: &str) -> SheetResult<Vec<Row>> {
        self.with_conn(|conn| {
            let id = worksheet_id(conn, worksheet)?;
            let mut stmt = conn.prepare(
                "SELECT cells FROM sheet_rows WHERE worksheet_id = ?1 ORDER BY position",
            )?;
            let raw = stmt
                .query_map(params![id], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            let rows = raw
                .iter()
                .map(|cells| serde_json::from_str::<Row>(cells))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(normalize_rows(rows))
        })
    }

    async fn append_row(&self, worksheet: &str, values: Row) -> SheetResult<()> {
        self.with_conn(|conn| {
            let id = worksheet_id(conn, worksheet)?;
            insert_row(conn, id, &values)
        })
    }

    async fn update_row(&self, worksheet: &str, row: usize, values: Row) -> SheetResult<()> {
        self.with_conn(|conn| {
            let id = worksheet_id(conn, worksheet)?;
            check_row(worksheet, row, row_count(conn, id)?)?;

            let cells: String = conn.query_row(
                "SELECT cells FROM sheet_rows WHERE worksheet_id = ?1 AND position = ?2",
                params![id, row as i64],
                |r| r.get(0),
            )?;
            let existing: Row = serde_json::from_str(&cells)?;
            let merged = serde_json::to_string(&overlay_row(existing, values))?;

            conn.execute(
                "UPDATE sheet_rows SET cells = ?1, updated_at = ?2
                 WHERE worksheet_id = ?3 AND position = ?4",
                params![merged, now_ms(), id, row as i64],
            )?;
            Ok(())
        })
    }

    async fn delete_row(&self, worksheet: &str, row: usize) -> SheetResult<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let id = worksheet_id(&tx, worksheet)?;
            check_row(worksheet, row, row_count(&tx, id)?)?;

            tx.execute(
                "DELETE FROM sheet_rows WHERE worksheet_id = ?1 AND position = ?2",
                params![id, row as i64],
            )?;
            // Shift through negative positions so the primary key never collides.
            tx.execute(
                "UPDATE sheet_rows SET position = -(position - 1)
                 WHERE worksheet_id = ?1 AND position > ?2",
                params![id, row as i64],
            )?;
            tx.execute(
                "UPDATE sheet_rows SET position = -position
                 WHERE worksheet_id = ?1 AND position < 0",
                params![id],
            )?;
            tx.commit()?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Row {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn ensure_worksheet_is_idempotent() {
        let wb = SqliteWorkbook::open_in_memory().unwrap();
        wb.ensure_worksheet("Todo", &["a", "b"]).await.unwrap();
        wb.ensure_worksheet("Todo", &["a", "b"]).await.unwrap();

        let rows = wb.read_all_values("Todo").await.unwrap();
        assert_eq!(rows, vec![strings(&["a", "b"])]);
        assert_eq!(wb.worksheet_names().await.unwrap(), vec!["Todo"]);
    }

    #[tokio::test]
    async fn missing_worksheet_is_reported() {
        let wb = SqliteWorkbook::open_in_memory().unwrap();
        let err = wb.read_all_values("nope").await.unwrap_err();
        assert!(matches!(err, SheetError::WorksheetNotFound(ref t) if t == "nope"));
    }

    #[tokio::test]
    async fn update_rejects_row_zero() {
        let wb = SqliteWorkbook::open_in_memory().unwrap();
        wb.ensure_worksheet("s", &["h"]).await.unwrap();
        let err = wb.update_row("s", 0, strings(&["x"])).await.unwrap_err();
        assert!(matches!(err, SheetError::RowOutOfRange { row: 0, rows: 1, .. }));
    }
}
