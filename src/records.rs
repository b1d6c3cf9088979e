//! Header-keyed view over a worksheet.

use crate::error::{AppError, AppResult};
use crate::sheet::{Row, Worksheet};
use std::collections::HashMap;

/// One data row keyed by header name.
pub type Record = HashMap<String, String>;

/// Zip a header row with data rows. Missing cells become empty strings.
pub fn rows_to_records(rows: &[Row]) -> Vec<Record> {
    let Some((headers, data)) = rows.split_first() else {
        return Vec::new();
    };
    data.iter()
        .map(|row| {
            headers
                .iter()
                .enumerate()
                .filter(|(_, header)| !header.is_empty())
                .map(|(idx, header)| (header.clone(), row.get(idx).cloned().unwrap_or_default()))
                .collect()
        })
        .collect()
}

/// Order a record's values by `headers`, leaving absent keys empty.
pub fn record_to_row(headers: &[String], record: &Record) -> Row {
    headers
        .iter()
        .map(|header| record.get(header).cloned().unwrap_or_default())
        .collect()
}

/// All data rows of the worksheet as records.
pub async fn get_all_records(sheet: &Worksheet) -> AppResult<Vec<Record>> {
    let rows = sheet.read_all_values().await?;
    Ok(rows_to_records(&rows))
}

/// Append `record` in the column order of the worksheet's header row.
pub async fn append_record(sheet: &Worksheet, record: &Record) -> AppResult<()> {
    let headers = sheet.row_values(1).await?;
    if headers.iter().all(String::is_empty) {
        return Err(AppError::invalid_state(format!(
            "worksheet '{}' has no header row",
            sheet.title()
        )));
    }
    sheet.append_row(record_to_row(&headers, record)).await?;
    Ok(())
}
