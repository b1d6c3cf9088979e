//! Hosted spreadsheet backend using the Google Sheets v4 REST API.
//!
//! Authentication is a static bearer token supplied by configuration; token
//! minting and refresh happen outside this process.

use super::{normalize_rows, row_range, Row, SheetBackend, SheetError, SheetResult};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

/// Default API root.
pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";

/// Client for one spreadsheet.
pub struct GoogleSheetsBackend {
    client: Client,
    base_url: String,
    spreadsheet_id: String,
    access_token: String,
    timeout: Duration,
}

/// `ValueRange` resource.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    major_dimension: Option<String>,
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

impl GoogleSheetsBackend {
    pub fn new(
        spreadsheet_id: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self::with_base_url(SHEETS_API_BASE, spreadsheet_id, access_token, timeout)
    }

    /// Point the client at a different API root (proxies, emulators).
    pub fn with_base_url(
        base_url: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            access_token: access_token.into(),
            timeout,
        }
    }

    fn spreadsheet_url(&self) -> String {
        format!("{}/spreadsheets/{}", self.base_url, self.spreadsheet_id)
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/values/{}",
            self.spreadsheet_url(),
            urlencoding::encode(range)
        )
    }

    /// `values.append` endpoint for the worksheet.
    fn append_url(&self, worksheet: &str) -> String {
        format!(
            "{}:append",
            self.values_url(&sheet_range(worksheet, Some("A1")))
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.access_token)
            .timeout(self.timeout)
    }

    async fn sheet_properties(&self) -> SheetResult<Vec<SheetProperties>> {
        let request = self
            .client
            .get(self.spreadsheet_url())
            .query(&[("fields", "sheets.properties(sheetId,title)")]);
        let response = check(self.authorized(request).send().await?).await?;
        let meta: SpreadsheetMeta = response.json().await?;
        Ok(meta.sheets.into_iter().map(|s| s.properties).collect())
    }

    async fn sheet_id(&self, worksheet: &str) -> SheetResult<i64> {
        self.sheet_properties()
            .await?
            .into_iter()
            .find(|p| p.title == worksheet)
            .map(|p| p.sheet_id)
            .ok_or_else(|| SheetError::WorksheetNotFound(worksheet.to_string()))
    }

    async fn batch_update(&self, requests: serde_json::Value) -> SheetResult<()> {
        let request = self
            .client
            .post(format!("{}:batchUpdate", self.spreadsheet_url()))
            .json(&json!({ "requests": requests }));
        check(self.authorized(request).send().await?).await?;
        Ok(())
    }

    async fn get_range(&self, range: &str) -> SheetResult<Vec<Row>> {
        let request = self
            .client
            .get(self.values_url(range))
            .query(&[("majorDimension", "ROWS")]);
        let response = check(self.authorized(request).send().await?).await?;
        let body: ValueRange = response.json().await?;
        Ok(body.values.into_iter().map(cells_to_row).collect())
    }
}

/// `'Title'!A1` style range with the title quoted as the API expects.
pub(crate) fn sheet_range(worksheet: &str, cells: Option<&str>) -> String {
    let quoted = format!("'{}'", worksheet.replace('\'', "''"));
    match cells {
        Some(cells) => format!("{quoted}!{cells}"),
        None => quoted,
    }
}

/// Range covering columns `A..` of one row, `'Todo'!A5:E5`.
fn update_range(worksheet: &str, row: usize, width: usize) -> String {
    sheet_range(worksheet, Some(&row_range(row, width)))
}

/// `deleteDimension` request removing 1-based `row`.
fn delete_dimension_request(sheet_id: i64, row: usize) -> serde_json::Value {
    json!({
        "deleteDimension": {
            "range": {
                "sheetId": sheet_id,
                "dimension": "ROWS",
                "startIndex": row - 1,
                "endIndex": row,
            }
        }
    })
}

/// Render API cell values as strings; numbers and booleans keep their text form.
fn cells_to_row(cells: Vec<serde_json::Value>) -> Row {
    cells
        .into_iter()
        .map(|value| match value {
            serde_json::Value::String(s) => s,
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        })
        .collect()
}

/// Turn a non-success response into `SheetError::Api`.
async fn check(response: Response) -> SheetResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    Err(SheetError::Api {
        status: status.as_u16(),
        message: api_error_message(&text),
    })
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl SheetBackend for GoogleSheetsBackend {
    fn kind(&self) -> &'static str {
        "google-sheets"
    }

    async fn worksheet_names(&self) -> SheetResult<Vec<String>> {
        Ok(self
            .sheet_properties()
            .await?
            .into_iter()
            .map(|p| p.title)
            .collect())
    }

    async fn ensure_worksheet(&self, worksheet: &str, headers: &[&str]) -> SheetResult<()> {
        if self.worksheet_names().await?.iter().any(|t| t == worksheet) {
            return Ok(());
        }
        info!(worksheet, spreadsheet = %self.spreadsheet_id, "Creating worksheet");
        self.batch_update(json!([{ "addSheet": { "properties": { "title": worksheet } } }]))
            .await?;
        if !headers.is_empty() {
            self.append_row(worksheet, headers.iter().map(|h| h.to_string()).collect())
                .await?;
        }
        Ok(())
    }

    async fn read_all_values(&self, worksheet: &str) -> SheetResult<Vec<Row>> {
        let rows = self.get_range(&sheet_range(worksheet, None)).await?;
        debug!(worksheet, rows = rows.len(), "Fetched worksheet values");
        Ok(normalize_rows(rows))
    }

    async fn row_values(&self, worksheet: &str, row: usize) -> SheetResult<Row> {
        let range = sheet_range(worksheet, Some(&format!("{row}:{row}")));
        Ok(self.get_range(&range).await?.into_iter().next().unwrap_or_default())
    }

    async fn append_row(&self, worksheet: &str, values: Row) -> SheetResult<()> {
        let request = self
            .client
            .post(self.append_url(worksheet))
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({ "values": [values] }));
        check(self.authorized(request).send().await?).await?;
        Ok(())
    }

    async fn update_row(&self, worksheet: &str, row: usize, values: Row) -> SheetResult<()> {
        let range = update_range(worksheet, row, values.len());
        let body = ValueRange {
            range: Some(range.clone()),
            major_dimension: Some("ROWS".to_string()),
            values: vec![values.into_iter().map(serde_json::Value::String).collect()],
        };
        let request = self
            .client
            .put(self.values_url(&range))
            .query(&[("valueInputOption", "RAW")])
            .json(&body);
        check(self.authorized(request).send().await?).await?;
        Ok(())
    }

    async fn delete_row(&self, worksheet: &str, row: usize) -> SheetResult<()> {
        if row == 0 {
            return Err(SheetError::RowOutOfRange {
                worksheet: worksheet.to_string(),
                row,
                rows: 0,
            });
        }
        let sheet_id = self.sheet_id(worksheet).await?;
        self.batch_update(json!([delete_dimension_request(sheet_id, row)]))
            .await
    }
}
