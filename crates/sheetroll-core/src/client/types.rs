//! Type definitions for the Google Sheets API.

use serde::{Deserialize, Serialize};

// API request/response types for internal use with Google Sheets API

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetsValueRange {
    #[serde(default)]
    pub range: String,
    #[serde(default)]
    pub values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetsValueRangeInput<'a> {
    pub range: &'a str,
    pub major_dimension: &'static str,
    pub values: &'a [Vec<String>],
}

#[derive(Debug, Serialize)]
pub struct SheetsAppendInput<'a> {
    pub values: &'a [Vec<String>],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetsAppendResponse {
    #[serde(default)]
    pub table_range: Option<String>,
    pub updates: UpdateValuesResponse,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateValuesResponse {
    #[serde(default)]
    pub updated_range: String,
    #[serde(default)]
    pub updated_rows: u32,
    #[serde(default)]
    pub updated_columns: u32,
    #[serde(default)]
    pub updated_cells: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetTitle {
    #[serde(default)]
    pub properties: Option<TitleProperties>,
}

#[derive(Debug, Deserialize)]
pub struct TitleProperties {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct SpreadsheetSheets {
    #[serde(default)]
    pub sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
pub struct SheetEntry {
    pub properties: SheetProperties,
}

/// Properties of one sheet (tab) within a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    #[serde(default)]
    pub sheet_id: u32,
    pub title: String,
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub grid_properties: Option<GridProperties>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridProperties {
    #[serde(default)]
    pub row_count: u32,
    #[serde(default)]
    pub column_count: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateRequest {
    pub requests: Vec<Request>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub delete_dimension: DeleteDimension,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteDimension {
    pub range: DimensionRange,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionRange {
    pub sheet_id: u32,
    pub dimension: &'static str,
    pub start_index: usize,
    pub end_index: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateResponse {
    #[serde(default)]
    pub spreadsheet_id: String,
}
