//! Todo tracker stored in a five-column worksheet.
//!
//! Columns A..E are `todo`, `priority`, `date_added`, `date_completed` and
//! `status`. Items are identified by their row number: the first data row is
//! row 2, so list index `i` maps to row `i + 2`. Deleting a row renumbers
//! every row after it, which is why mutations can carry the label the user
//! selected and are refused when the row no longer shows that label.

use crate::error::{AppError, AppResult};
use crate::sheet::{Row, Worksheet};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Header row written when the worksheet is created.
pub const TODO_HEADERS: [&str; 5] = ["todo", "priority", "date_added", "date_completed", "status"];

/// Date format used in the date columns.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Row number of the first data row.
pub const FIRST_DATA_ROW: usize = 2;

const DATE_ADDED_COL: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }

    /// Lenient parse for cell values; anything unrecognized is `Low`.
    pub fn from_cell(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl FromStr for Priority {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(AppError::invalid_value(
                "priority",
                "priority must be Low, Medium or High",
            )),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Status {
    Completed,
    #[default]
    Incomplete,
    #[serde(rename = "In Progress")]
    InProgress,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Completed, Status::Incomplete, Status::InProgress];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Completed => "Completed",
            Status::Incomplete => "Incomplete",
            Status::InProgress => "In Progress",
        }
    }

    /// Lenient parse for cell values; anything unrecognized is `Incomplete`.
    pub fn from_cell(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }

    /// Background colour used when rendering the status cell.
    pub fn color(&self) -> &'static str {
        match self {
            Status::Completed => "#77B254",
            Status::Incomplete => "#FF7777",
            Status::InProgress => "#4CC9FE",
        }
    }
}

impl FromStr for Status {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_'], " ").as_str() {
            "completed" => Ok(Status::Completed),
            "incomplete" => Ok(Status::Incomplete),
            "in progress" => Ok(Status::InProgress),
            _ => Err(AppError::invalid_value(
                "status",
                "status must be Completed, Incomplete or In Progress",
            )),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// One todo row as stored; cells are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TodoItem {
    pub row: usize,
    pub description: String,
    pub priority: String,
    pub date_added: String,
    pub date_completed: String,
    pub status: String,
}

impl TodoItem {
    fn from_row(row: usize, cells: &[String]) -> Self {
        let cell = |idx: usize| cells.get(idx).cloned().unwrap_or_default();
        Self {
            row,
            description: cell(0),
            priority: cell(1),
            date_added: cell(2),
            date_completed: cell(3),
            status: cell(4),
        }
    }

    /// Selection label shown to the user.
    pub fn label(&self) -> String {
        item_label(&self.description, &self.status)
    }

    pub fn priority(&self) -> Priority {
        Priority::from_cell(&self.priority)
    }

    pub fn status(&self) -> Status {
        Status::from_cell(&self.status)
    }

    pub fn completed_on(&self) -> Option<NaiveDate> {
        parse_date(&self.date_completed)
    }

    /// Completion date to pre-fill an edit form with.
    pub fn default_completion_date(&self) -> NaiveDate {
        self.completed_on().unwrap_or_else(today)
    }
}

fn item_label(description: &str, status: &str) -> String {
    format!("{} | {}", description, status)
}

/// A selectable entry mapping a display label to a row number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub label: String,
    pub row: usize,
}

/// Snapshot of the todo worksheet.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TodoList {
    pub headers: Vec<String>,
    pub items: Vec<TodoItem>,
}

impl TodoList {
    fn from_rows(mut rows: Vec<Row>) -> Self {
        if rows.len() <= 1 {
            return Self::default();
        }
        let data = rows.split_off(1);
        let headers = rows.pop().unwrap_or_default();
        let items = data
            .iter()
            .enumerate()
            .map(|(idx, cells)| TodoItem::from_row(idx + FIRST_DATA_ROW, cells))
            .collect();
        Self { headers, items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Selection labels in row order. Repeated labels get a ` (n)` suffix so
    /// that every row remains reachable; a suffix never reuses a label that
    /// some row already shows.
    pub fn options(&self) -> Vec<SelectOption> {
        let bases: HashSet<String> = self.items.iter().map(TodoItem::label).collect();
        let mut emitted: HashSet<String> = HashSet::new();
        let mut next_suffix: HashMap<String, usize> = HashMap::new();
        self.items
            .iter()
            .map(|item| {
                let base = item.label();
                let label = if emitted.contains(&base) {
                    let n = next_suffix.entry(base.clone()).or_insert(2);
                    loop {
                        let candidate = format!("{} ({})", base, n);
                        *n += 1;
                        if !bases.contains(&candidate) && !emitted.contains(&candidate) {
                            break candidate;
                        }
                    }
                } else {
                    base
                };
                emitted.insert(label.clone());
                SelectOption {
                    label,
                    row: item.row,
                }
            })
            .collect()
    }

    /// Map a selection label back to its item.
    pub fn resolve(&self, label: &str) -> Option<&TodoItem> {
        let row = self
            .options()
            .into_iter()
            .find(|opt| opt.label == label)?
            .row;
        self.get(row)
    }

    /// Item at an absolute row number.
    pub fn get(&self, row: usize) -> Option<&TodoItem> {
        row.checked_sub(FIRST_DATA_ROW)
            .and_then(|idx| self.items.get(idx))
    }
}

/// New values for an existing row. The date-added cell is never rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoUpdate {
    pub description: String,
    pub priority: Priority,
    pub date_completed: Option<NaiveDate>,
    pub status: Status,
}

/// Todo operations against one worksheet.
#[derive(Debug, Clone)]
pub struct TodoStore {
    sheet: Worksheet,
}

impl TodoStore {
    pub fn new(sheet: Worksheet) -> Self {
        Self { sheet }
    }

    pub fn worksheet(&self) -> &Worksheet {
        &self.sheet
    }

    /// Create the worksheet with its header row if it is missing.
    pub async fn ensure(&self) -> AppResult<()> {
        self.sheet.ensure(&TODO_HEADERS).await?;
        Ok(())
    }

    /// Append a new incomplete item added today.
    pub async fn create(&self, description: &str, priority: Priority) -> AppResult<TodoItem> {
        let description = description.trim();
        if description.is_empty() {
            return Err(AppError::missing_field("todo"));
        }

        let row = vec![
            description.to_string(),
            priority.as_str().to_string(),
            format_date(today()),
            String::new(),
            Status::Incomplete.as_str().to_string(),
        ];
        self.sheet.append_row(row.clone()).await?;

        let position = self.sheet.read_all_values().await?.len();
        info!(row = position, priority = %priority, "Added todo");
        Ok(TodoItem::from_row(position, &row))
    }

    pub async fn list(&self) -> AppResult<TodoList> {
        Ok(TodoList::from_rows(self.sheet.read_all_values().await?))
    }

    /// Rewrite columns A..E of `row`, keeping its date-added value.
    ///
    /// When `expected_label` is given, the row must still show that label.
    pub async fn update(
        &self,
        row: usize,
        update: &TodoUpdate,
        expected_label: Option<&str>,
    ) -> AppResult<()> {
        let description = update.description.trim();
        if description.is_empty() {
            return Err(AppError::missing_field("todo"));
        }
        let cells = self.check_target(row, expected_label).await?;

        let date_added = cells.get(DATE_ADDED_COL - 1).cloned().unwrap_or_default();
        let date_completed = update.date_completed.map(format_date).unwrap_or_default();

        self.sheet
            .update_row(
                row,
                vec![
                    description.to_string(),
                    update.priority.as_str().to_string(),
                    date_added,
                    date_completed,
                    update.status.as_str().to_string(),
                ],
            )
            .await?;
        info!(row, status = %update.status, "Updated todo");
        Ok(())
    }

    /// Remove `row`; later rows move up by one.
    pub async fn delete(&self, row: usize, expected_label: Option<&str>) -> AppResult<()> {
        self.check_target(row, expected_label).await?;
        self.sheet.delete_row(row).await?;
        info!(row, "Deleted todo");
        Ok(())
    }

    /// The row must be a data row that currently exists, and match the
    /// selected label when one is supplied. Returns the row's cells.
    async fn check_target(&self, row: usize, expected_label: Option<&str>) -> AppResult<Row> {
        if row < FIRST_DATA_ROW {
            return Err(AppError::invalid_value(
                "row",
                "row must be 2 or greater; row 1 holds the headers",
            ));
        }
        let cells = self.sheet.row_values(row).await?;
        if cells.iter().all(String::is_empty) {
            return Err(AppError::row_not_found(self.sheet.title(), row));
        }
        if let Some(expected) = expected_label {
            let current = TodoItem::from_row(row, &cells).label();
            // Disambiguated labels carry a " (n)" suffix; compare the base label.
            if !label_matches(expected, &current) {
                return Err(AppError::stale_selection(row, expected, &current));
            }
        }
        Ok(cells)
    }
}

fn label_matches(expected: &str, current: &str) -> bool {
    if expected == current {
        return true;
    }
    expected
        .strip_prefix(current)
        .and_then(|rest| rest.strip_prefix(" ("))
        .and_then(|rest| rest.strip_suffix(')'))
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}
