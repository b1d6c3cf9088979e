//! Structured error types for dashboard and CLI operations.

use crate::sheet::SheetError;
use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,
    InvalidState,

    // Not found errors
    WorksheetNotFound,
    RowNotFound,

    // Conflict errors
    StaleSelection,

    // Backend and internal errors
    BackendError,
    InternalError,
}

/// Structured error surfaced to the user.
#[derive(Debug, Serialize)]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("{} is required", field),
        )
        .with_field(field)
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason).with_field(field)
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidState, message)
    }

    pub fn row_not_found(worksheet: &str, row: usize) -> Self {
        Self::new(
            ErrorCode::RowNotFound,
            format!("Row {} not found in worksheet '{}'", row, worksheet),
        )
    }

    pub fn stale_selection(row: usize, expected: &str, found: &str) -> Self {
        Self::new(
            ErrorCode::StaleSelection,
            format!("Row {} changed since it was selected; reload and try again", row),
        )
        .with_details(format!("expected '{}', found '{}'", expected, found))
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl From<SheetError> for AppError {
    fn from(err: SheetError) -> Self {
        match err {
            SheetError::WorksheetNotFound(ref title) => Self::new(
                ErrorCode::WorksheetNotFound,
                format!("Worksheet not found: {}", title),
            ),
            SheetError::RowOutOfRange { ref worksheet, row, .. } => {
                Self::row_not_found(worksheet, row).with_details(err.to_string())
            }
            other => Self::new(ErrorCode::BackendError, other.to_string()),
        }
    }
}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<AppError>() {
            Ok(app_err) => app_err,
            Err(err) => AppError::internal(err),
        }
    }
}

/// Result type for dashboard and CLI operations.
pub type AppResult<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_serialize_screaming_snake() {
        let err = AppError::missing_field("name");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "MISSING_REQUIRED_FIELD");
        assert_eq!(json["field"], "name");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn sheet_errors_map_to_codes() {
        let err: AppError = SheetError::WorksheetNotFound("Todo".into()).into();
        assert_eq!(err.code, ErrorCode::WorksheetNotFound);

        let err: AppError = SheetError::RowOutOfRange {
            worksheet: "Todo".into(),
            row: 9,
            rows: 3,
        }
        .into();
        assert_eq!(err.code, ErrorCode::RowNotFound);

        let err: AppError = SheetError::Api {
            status: 403,
            message: "denied".into(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::BackendError);
        assert!(err.message.contains("denied"));
    }
}
