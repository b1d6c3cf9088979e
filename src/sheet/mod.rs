//! Record store adapter over spreadsheet worksheets.
//!
//! A worksheet is an ordered list of string rows addressed by 1-based row
//! numbers, with row 1 holding the headers. Identity is positional: deleting
//! a row shifts every later row up by one.

mod cache;
mod google;
mod sqlite;

pub use cache::CachedBackend;
pub use google::{GoogleSheetsBackend, SHEETS_API_BASE};
pub use sqlite::SqliteWorkbook;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A single worksheet row.
pub type Row = Vec<String>;

/// Result type for backend operations.
pub type SheetResult<T> = std::result::Result<T, SheetError>;

/// Failures raised by a spreadsheet backend.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("worksheet not found: {0}")]
    WorksheetNotFound(String),

    #[error("row {row} is out of range for worksheet {worksheet} ({rows} rows)")]
    RowOutOfRange {
        worksheet: String,
        row: usize,
        rows: usize,
    },

    #[error("spreadsheet API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("spreadsheet request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("workbook database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("workbook migration failed: {0}")]
    Migration(#[from] refinery::Error),

    #[error("malformed row data: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Positional, stringly-typed access to the worksheets of one spreadsheet.
#[async_trait]
pub trait SheetBackend: Send + Sync {
    /// Short backend name for logs.
    fn kind(&self) -> &'static str;

    /// Titles of all worksheets in the spreadsheet.
    async fn worksheet_names(&self) -> SheetResult<Vec<String>>;

    /// Create `worksheet` with a header row unless it already exists.
    async fn ensure_worksheet(&self, worksheet: &str, headers: &[&str]) -> SheetResult<()>;

    /// Every row of the worksheet, header included, padded to equal width.
    async fn read_all_values(&self, worksheet: &str) -> SheetResult<Vec<Row>>;

    /// One row; empty when `row` lies past the last row.
    async fn row_values(&self, worksheet: &str, row: usize) -> SheetResult<Row> {
        let rows = self.read_all_values(worksheet).await?;
        Ok(row
            .checked_sub(1)
            .and_then(|idx| rows.get(idx).cloned())
            .unwrap_or_default())
    }

    /// One cell, `None` when the row or column does not exist.
    async fn cell(&self, worksheet: &str, row: usize, col: usize) -> SheetResult<Option<String>> {
        let values = self.row_values(worksheet, row).await?;
        Ok(col.checked_sub(1).and_then(|idx| values.get(idx).cloned()))
    }

    /// Add a row after the last one.
    async fn append_row(&self, worksheet: &str, values: Row) -> SheetResult<()>;

    /// Overwrite columns `1..=values.len()` of `row`.
    async fn update_row(&self, worksheet: &str, row: usize, values: Row) -> SheetResult<()>;

    /// Remove `row`, shifting later rows up.
    async fn delete_row(&self, worksheet: &str, row: usize) -> SheetResult<()>;
}

/// Handle to a named worksheet on some backend.
#[derive(Clone)]
pub struct Worksheet {
    backend: Arc<dyn SheetBackend>,
    title: String,
}

impl Worksheet {
    pub fn new(backend: Arc<dyn SheetBackend>, title: impl Into<String>) -> Self {
        Self {
            backend,
            title: title.into(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn backend(&self) -> &Arc<dyn SheetBackend> {
        &self.backend
    }

    pub async fn ensure(&self, headers: &[&str]) -> SheetResult<()> {
        self.backend.ensure_worksheet(&self.title, headers).await
    }

    pub async fn read_all_values(&self) -> SheetResult<Vec<Row>> {
        self.backend.read_all_values(&self.title).await
    }

    pub async fn row_values(&self, row: usize) -> SheetResult<Row> {
        self.backend.row_values(&self.title, row).await
    }

    pub async fn cell(&self, row: usize, col: usize) -> SheetResult<Option<String>> {
        self.backend.cell(&self.title, row, col).await
    }

    pub async fn append_row(&self, values: Row) -> SheetResult<()> {
        self.backend.append_row(&self.title, values).await
    }

    pub async fn update_row(&self, row: usize, values: Row) -> SheetResult<()> {
        self.backend.update_row(&self.title, row, values).await
    }

    pub async fn delete_row(&self, row: usize) -> SheetResult<()> {
        self.backend.delete_row(&self.title, row).await
    }
}

impl fmt::Debug for Worksheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worksheet")
            .field("backend", &self.backend.kind())
            .field("title", &self.title)
            .finish()
    }
}

/// Spreadsheet column letter for a 1-based column number (1 -> A, 27 -> AA).
pub fn column_letter(mut col: usize) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        letters.push(b'A' + rem as u8);
        col = (col - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// A1 range covering the first `width` columns of `row`, e.g. `A5:E5`.
pub fn row_range(row: usize, width: usize) -> String {
    format!("A{row}:{}{row}", column_letter(width.max(1)))
}

/// Pad every row with empty cells to the width of the widest row.
pub(crate) fn normalize_rows(mut rows: Vec<Row>) -> Vec<Row> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    for row in &mut rows {
        row.resize(width, String::new());
    }
    rows
}

/// Overlay `values` onto the start of `existing`, keeping any later cells.
pub(crate) fn overlay_row(mut existing: Row, values: Row) -> Row {
    if existing.len() < values.len() {
        existing.resize(values.len(), String::new());
    }
    for (idx, value) in values.into_iter().enumerate() {
        existing[idx] = value;
    }
    existing
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(5), "E");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(52), "AZ");
        assert_eq!(column_letter(703), "AAA");
    }

    #[test]
    fn row_range_spans_width() {
        assert_eq!(row_range(5, 5), "A5:E5");
        assert_eq!(row_range(2, 1), "A2:A2");
        assert_eq!(row_range(3, 0), "A3:A3");
    }

    #[test]
    fn normalize_pads_to_widest_row() {
        let rows = vec![
            vec!["a".to_string()],
            vec!["b".to_string(), "c".to_string(), "d".to_string()],
            vec![],
        ];
        let rows = normalize_rows(rows);
        assert!(rows.iter().all(|r| r.len() == 3));
        assert_eq!(rows[0], vec!["a", "", ""]);
        assert_eq!(rows[2], vec!["", "", ""]);
    }

    #[test]
    fn overlay_keeps_trailing_cells() {
        let existing = vec!["a".into(), "b".into(), "c".into()];
        let row = overlay_row(existing, vec!["x".into(), "y".into()]);
        assert_eq!(row, vec!["x", "y", "c"]);

        let row = overlay_row(vec!["a".into()], vec!["x".into(), "y".into()]);
        assert_eq!(row, vec!["x", "y"]);
    }
}
