//! Wire models for the Sheets v4 REST API and the gviz query endpoint.

use serde::Deserialize;
use serde_json::Value;

pub(crate) const MAJOR_DIMENSION_ROWS: &str = "ROWS";
pub(crate) const VALUE_INPUT_USER_ENTERED: &str = "USER_ENTERED";
pub(crate) const RESPONSE_VALUE_RENDER_FORMATTED: &str = "FORMATTED_VALUE";

/// How `values:append` treats existing data below the write position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendMode {
    /// Insert new rows, shifting existing data down.
    Insert,
    /// Overwrite whatever follows the last non-empty row.
    Overwrite,
}

impl AppendMode {
    /// Returns the `insertDataOption` wire value.
    pub fn as_str(&self) -> &'static str {
        match self {
            AppendMode::Insert => "INSERT_ROWS",
            AppendMode::Overwrite => "OVERWRITE",
        }
    }
}

/// A parsed A1-notation range reference.
///
/// Parsing splits on the sheet separator (`!`) first, then on the range
/// separator (`:`). A bare cell with neither separator parses with an empty
/// sheet name and `from_cell == to_cell`. The original text is kept so the
/// reference round-trips exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct A1Range {
    pub original: String,
    pub sheet_name: String,
    pub from_cell: String,
    pub to_cell: String,
}

impl A1Range {
    pub fn parse(s: &str) -> Self {
        let (sheet_name, cells) = match s.find('!') {
            Some(idx) => (&s[..idx], &s[idx + 1..]),
            None => ("", s),
        };
        let (from_cell, to_cell) = match cells.find(':') {
            Some(idx) => (&cells[..idx], &cells[idx + 1..]),
            None => (cells, cells),
        };
        A1Range {
            original: s.to_string(),
            sheet_name: sheet_name.to_string(),
            from_cell: from_cell.to_string(),
            to_cell: to_cell.to_string(),
        }
    }
}

impl std::fmt::Display for A1Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.original)
    }
}

/// Result of an append-style row insertion.
#[derive(Debug, Clone)]
pub struct InsertRowsResult {
    pub updated_range: A1Range,
    pub updated_rows: u64,
    pub updated_columns: u64,
    pub updated_cells: u64,
    pub inserted_values: Vec<Vec<Value>>,
}

/// Result of an in-place range update.
#[derive(Debug, Clone)]
pub struct UpdateRowsResult {
    pub updated_range: A1Range,
    pub updated_rows: u64,
    pub updated_columns: u64,
    pub updated_cells: u64,
    pub updated_values: Vec<Vec<Value>>,
}

/// One range-addressed write inside a batched update.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchUpdateRowsRequest {
    pub a1_range: String,
    pub values: Vec<Vec<Value>>,
}

pub type BatchUpdateRowsResult = Vec<UpdateRowsResult>;

/// Decoded rows from a gviz query: one inner vector per row, cells already
/// converted per the originating column type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRowsResult {
    pub rows: Vec<Vec<Value>>,
}

// ---------------------------------------------------------------------------
// Raw Sheets v4 response payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawSpreadsheetCreated {
    pub spreadsheet_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSpreadsheet {
    pub sheets: Option<Vec<RawSheet>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSheet {
    pub properties: Option<RawSheetProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawSheetProperties {
    pub title: Option<String>,
    pub sheet_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAppendResponse {
    pub updates: Option<RawUpdateResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawUpdateResponse {
    pub updated_range: Option<String>,
    pub updated_rows: Option<u64>,
    pub updated_columns: Option<u64>,
    pub updated_cells: Option<u64>,
    pub updated_data: Option<RawValueRange>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawValueRange {
    pub values: Option<Vec<Vec<Value>>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawBatchUpdateResponse {
    pub responses: Option<Vec<RawUpdateResponse>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawBatchClearResponse {
    pub cleared_ranges: Option<Vec<String>>,
}

impl RawUpdateResponse {
    pub(crate) fn into_update_result(self) -> UpdateRowsResult {
        UpdateRowsResult {
            updated_range: A1Range::parse(&self.updated_range.unwrap_or_default()),
            updated_rows: self.updated_rows.unwrap_or(0),
            updated_columns: self.updated_columns.unwrap_or(0),
            updated_cells: self.updated_cells.unwrap_or(0),
            updated_values: self.updated_data.unwrap_or_default().values.unwrap_or_default(),
        }
    }

    pub(crate) fn into_insert_result(self) -> InsertRowsResult {
        InsertRowsResult {
            updated_range: A1Range::parse(&self.updated_range.unwrap_or_default()),
            updated_rows: self.updated_rows.unwrap_or(0),
            updated_columns: self.updated_columns.unwrap_or(0),
            updated_cells: self.updated_cells.unwrap_or(0),
            inserted_values: self.updated_data.unwrap_or_default().values.unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Raw gviz query payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct RawQueryResult {
    pub table: Option<RawQueryTable>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawQueryTable {
    #[serde(default)]
    pub cols: Vec<RawQueryColumn>,
    #[serde(default)]
    pub rows: Vec<RawQueryRow>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawQueryColumn {
    #[serde(rename = "type")]
    pub col_type: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawQueryRow {
    #[serde(default)]
    pub c: Vec<Option<RawQueryCell>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawQueryCell {
    /// Raw value.
    pub v: Option<Value>,
    /// Formatted value, pre-rendered by the backend.
    pub f: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fully_qualified_range() {
        let r = A1Range::parse("Sheet1!A1:B2");
        assert_eq!(r.sheet_name, "Sheet1");
        assert_eq!(r.from_cell, "A1");
        assert_eq!(r.to_cell, "B2");
        assert_eq!(r.to_string(), "Sheet1!A1:B2");
    }

    #[test]
    fn test_parse_qualified_single_cell() {
        let r = A1Range::parse("Sheet1!C3");
        assert_eq!(r.sheet_name, "Sheet1");
        assert_eq!(r.from_cell, "C3");
        assert_eq!(r.to_cell, "C3");
    }

    #[test]
    fn test_parse_bare_range() {
        let r = A1Range::parse("A1:B2");
        assert_eq!(r.sheet_name, "");
        assert_eq!(r.from_cell, "A1");
        assert_eq!(r.to_cell, "B2");
    }

    #[test]
    fn test_parse_bare_cell() {
        let r = A1Range::parse("A1");
        assert_eq!(r.sheet_name, "");
        assert_eq!(r.from_cell, "A1");
        assert_eq!(r.to_cell, "A1");
        assert_eq!(r.to_string(), "A1");
    }

    #[test]
    fn test_append_mode_wire_values() {
        assert_eq!(AppendMode::Insert.as_str(), "INSERT_ROWS");
        assert_eq!(AppendMode::Overwrite.as_str(), "OVERWRITE");
    }
}
