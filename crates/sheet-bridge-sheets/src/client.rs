//! Sheets v4 REST wrapper and gviz query execution.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use sheet_bridge_common::{Result, SheetBridgeError};
use tracing::debug;

use crate::auth::TokenProvider;
use crate::models::{
    AppendMode, BatchUpdateRowsRequest, BatchUpdateRowsResult, InsertRowsResult, QueryRowsResult,
    RawAppendResponse, RawBatchClearResponse, RawBatchUpdateResponse, RawQueryCell, RawQueryResult,
    RawSpreadsheet, RawSpreadsheetCreated, RawUpdateResponse, UpdateRowsResult,
    MAJOR_DIMENSION_ROWS, RESPONSE_VALUE_RENDER_FORMATTED, VALUE_INPUT_USER_ENTERED,
};

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const GVIZ_BASE_URL: &str = "https://docs.google.com/spreadsheets/d";

/// The gviz endpoint wraps its JSON payload in a JS callback invocation; the
/// handler name itself is irrelevant, it only has to be present.
const GVIZ_RESPONSE_HANDLER: &str = "responseHandler:sheetbridge";

/// Transport contract consumed by the statement engine.
///
/// `SheetsClient` is the production implementation; tests substitute a mock.
#[async_trait]
pub trait SheetsTransport: Send + Sync {
    /// Creates a new spreadsheet and returns its identifier.
    async fn create_spreadsheet(&self, title: &str) -> Result<String>;

    /// Adds a sheet with the given name. Fails if the name already exists.
    async fn create_sheet(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<()>;

    /// Returns the mapping of sheet titles to sheet IDs.
    async fn get_sheet_name_to_id(&self, spreadsheet_id: &str) -> Result<HashMap<String, i64>>;

    /// Deletes the sheets with the given IDs.
    async fn delete_sheets(&self, spreadsheet_id: &str, sheet_ids: &[i64]) -> Result<()>;

    /// Appends rows after the last non-empty row, shifting data down.
    async fn insert_rows(
        &self,
        spreadsheet_id: &str,
        a1_range: &str,
        values: &[Vec<Value>],
    ) -> Result<InsertRowsResult>;

    /// Appends rows after the last non-empty row, overwriting what follows.
    async fn overwrite_rows(
        &self,
        spreadsheet_id: &str,
        a1_range: &str,
        values: &[Vec<Value>],
    ) -> Result<InsertRowsResult>;

    /// Writes rows at exactly the given range.
    async fn update_rows(
        &self,
        spreadsheet_id: &str,
        a1_range: &str,
        values: &[Vec<Value>],
    ) -> Result<UpdateRowsResult>;

    /// Writes several ranges in one batched call.
    async fn batch_update_rows(
        &self,
        spreadsheet_id: &str,
        requests: Vec<BatchUpdateRowsRequest>,
    ) -> Result<BatchUpdateRowsResult>;

    /// Executes a query-language statement against one sheet and returns the
    /// decoded rows.
    async fn query_rows(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        query: &str,
        skip_header: bool,
    ) -> Result<QueryRowsResult>;

    /// Clears the given ranges and returns the ranges actually cleared.
    async fn clear(&self, spreadsheet_id: &str, ranges: &[String]) -> Result<Vec<String>>;
}

/// reqwest-backed implementation of [`SheetsTransport`].
///
/// A fresh bearer token is fetched from the [`TokenProvider`] immediately
/// before every request so a refreshing provider always supplies a live one.
pub struct SheetsClient {
    http: reqwest::Client,
    auth: Arc<dyn TokenProvider>,
    base_url: String,
    gviz_base_url: String,
}

impl SheetsClient {
    pub fn new(auth: Arc<dyn TokenProvider>) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth,
            base_url: SHEETS_BASE_URL.to_string(),
            gviz_base_url: GVIZ_BASE_URL.to_string(),
        }
    }

    /// Overrides both endpoint roots. Intended for tests.
    pub fn with_base_urls(
        auth: Arc<dyn TokenProvider>,
        base_url: impl Into<String>,
        gviz_base_url: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth,
            base_url: base_url.into(),
            gviz_base_url: gviz_base_url.into(),
        }
    }

    async fn bearer(&self) -> Result<String> {
        self.auth.access_token().await
    }

    /// Sends `request` with a fresh token and decodes a JSON body, mapping
    /// non-2xx statuses to transport errors.
    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let token = self.bearer().await?;
        let response = request.bearer_auth(token).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SheetBridgeError::Http(format!(
                "request failed with status {}: {}",
                status.as_u16(),
                body
            )));
        }

        Ok(response.json::<T>().await?)
    }

    async fn append_rows(
        &self,
        spreadsheet_id: &str,
        a1_range: &str,
        values: &[Vec<Value>],
        mode: AppendMode,
    ) -> Result<InsertRowsResult> {
        let url = format!(
            "{}/{}/values/{}:append",
            self.base_url, spreadsheet_id, a1_range
        );
        let request = self
            .http
            .post(&url)
            .query(&[
                ("insertDataOption", mode.as_str()),
                ("valueInputOption", VALUE_INPUT_USER_ENTERED),
                ("includeValuesInResponse", "true"),
                ("responseValueRenderOption", RESPONSE_VALUE_RENDER_FORMATTED),
            ])
            .json(&json!({
                "majorDimension": MAJOR_DIMENSION_ROWS,
                "range": a1_range,
                "values": values,
            }));

        let response: RawAppendResponse = self.send_json(request).await?;
        let updates = response.updates.ok_or_else(|| {
            SheetBridgeError::Protocol("append response carried no updates".to_string())
        })?;
        Ok(updates.into_insert_result())
    }
}

#[async_trait]
impl SheetsTransport for SheetsClient {
    async fn create_spreadsheet(&self, title: &str) -> Result<String> {
        let request = self
            .http
            .post(&self.base_url)
            .json(&json!({ "properties": { "title": title } }));

        let response: RawSpreadsheetCreated = self.send_json(request).await?;
        response.spreadsheet_id.ok_or_else(|| {
            SheetBridgeError::Protocol("spreadsheet created without an id".to_string())
        })
    }

    async fn create_sheet(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<()> {
        let url = format!("{}/{}:batchUpdate", self.base_url, spreadsheet_id);
        let request = self.http.post(&url).json(&json!({
            "requests": [
                { "addSheet": { "properties": { "title": sheet_name } } }
            ]
        }));

        self.send_json::<Value>(request).await?;
        Ok(())
    }

    async fn get_sheet_name_to_id(&self, spreadsheet_id: &str) -> Result<HashMap<String, i64>> {
        let url = format!("{}/{}", self.base_url, spreadsheet_id);
        let response: RawSpreadsheet = self.send_json(self.http.get(&url)).await?;

        let sheets = response.sheets.ok_or_else(|| {
            SheetBridgeError::Protocol("spreadsheet metadata carried no sheets".to_string())
        })?;

        let mut result = HashMap::new();
        for sheet in sheets {
            let properties = sheet.properties.ok_or_else(|| {
                SheetBridgeError::Protocol("sheet metadata carried no properties".to_string())
            })?;
            if let (Some(title), Some(id)) = (properties.title, properties.sheet_id) {
                result.insert(title, id);
            }
        }
        Ok(result)
    }

    async fn delete_sheets(&self, spreadsheet_id: &str, sheet_ids: &[i64]) -> Result<()> {
        let requests: Vec<Value> = sheet_ids
            .iter()
            .map(|id| json!({ "deleteSheet": { "sheetId": id } }))
            .collect();

        let url = format!("{}/{}:batchUpdate", self.base_url, spreadsheet_id);
        let request = self.http.post(&url).json(&json!({ "requests": requests }));

        self.send_json::<Value>(request).await?;
        Ok(())
    }

    async fn insert_rows(
        &self,
        spreadsheet_id: &str,
        a1_range: &str,
        values: &[Vec<Value>],
    ) -> Result<InsertRowsResult> {
        self.append_rows(spreadsheet_id, a1_range, values, AppendMode::Insert)
            .await
    }

    async fn overwrite_rows(
        &self,
        spreadsheet_id: &str,
        a1_range: &str,
        values: &[Vec<Value>],
    ) -> Result<InsertRowsResult> {
        self.append_rows(spreadsheet_id, a1_range, values, AppendMode::Overwrite)
            .await
    }

    async fn update_rows(
        &self,
        spreadsheet_id: &str,
        a1_range: &str,
        values: &[Vec<Value>],
    ) -> Result<UpdateRowsResult> {
        let url = format!("{}/{}/values/{}", self.base_url, spreadsheet_id, a1_range);
        let request = self
            .http
            .put(&url)
            .query(&[
                ("valueInputOption", VALUE_INPUT_USER_ENTERED),
                ("includeValuesInResponse", "true"),
                ("responseValueRenderOption", RESPONSE_VALUE_RENDER_FORMATTED),
            ])
            .json(&json!({
                "majorDimension": MAJOR_DIMENSION_ROWS,
                "range": a1_range,
                "values": values,
            }));

        let response: RawUpdateResponse = self.send_json(request).await?;
        Ok(response.into_update_result())
    }

    async fn batch_update_rows(
        &self,
        spreadsheet_id: &str,
        requests: Vec<BatchUpdateRowsRequest>,
    ) -> Result<BatchUpdateRowsResult> {
        let data: Vec<Value> = requests
            .iter()
            .map(|req| {
                json!({
                    "majorDimension": MAJOR_DIMENSION_ROWS,
                    "range": req.a1_range,
                    "values": req.values,
                })
            })
            .collect();

        let url = format!("{}/{}/values:batchUpdate", self.base_url, spreadsheet_id);
        let request = self.http.post(&url).json(&json!({
            "data": data,
            "valueInputOption": VALUE_INPUT_USER_ENTERED,
            "includeValuesInResponse": true,
            "responseValueRenderOption": RESPONSE_VALUE_RENDER_FORMATTED,
        }));

        let response: RawBatchUpdateResponse = self.send_json(request).await?;
        let responses = response.responses.ok_or_else(|| {
            SheetBridgeError::Protocol("batch update response carried no responses".to_string())
        })?;
        Ok(responses
            .into_iter()
            .map(RawUpdateResponse::into_update_result)
            .collect())
    }

    async fn query_rows(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        query: &str,
        skip_header: bool,
    ) -> Result<QueryRowsResult> {
        debug!(%sheet_name, %query, "executing gviz query");

        let url = format!("{}/{}/gviz/tq", self.gviz_base_url, spreadsheet_id);
        let token = self.bearer().await?;
        let response = self
            .http
            .get(&url)
            .query(&[
                ("sheet", sheet_name),
                ("tqx", GVIZ_RESPONSE_HANDLER),
                ("tq", query),
                ("headers", if skip_header { "1" } else { "0" }),
            ])
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SheetBridgeError::Http(format!(
                "failed to query rows, status: {}",
                status.as_u16()
            )));
        }

        let body = response.text().await?;
        let raw: RawQueryResult = serde_json::from_str(extract_json_payload(&body)?)
            .map_err(|e| SheetBridgeError::Protocol(format!("failed to parse query response: {}", e)))?;
        to_query_rows_result(raw)
    }

    async fn clear(&self, spreadsheet_id: &str, ranges: &[String]) -> Result<Vec<String>> {
        let url = format!("{}/{}/values:batchClear", self.base_url, spreadsheet_id);
        let request = self.http.post(&url).json(&json!({ "ranges": ranges }));

        let response: RawBatchClearResponse = self.send_json(request).await?;
        Ok(response.cleared_ranges.unwrap_or_default())
    }
}

/// The gviz response is a JS callback invocation wrapping a JSON object.
/// Cut out the payload between the first `{` and the last `}`.
fn extract_json_payload(body: &str) -> Result<&str> {
    let first = body.find('{').ok_or_else(|| {
        SheetBridgeError::Protocol(format!("opening curly bracket not found: {}", body))
    })?;
    let last = body.rfind('}').ok_or_else(|| {
        SheetBridgeError::Protocol(format!("closing curly bracket not found: {}", body))
    })?;
    Ok(&body[first..=last])
}

fn to_query_rows_result(raw: RawQueryResult) -> Result<QueryRowsResult> {
    let Some(table) = raw.table else {
        return Ok(QueryRowsResult::default());
    };

    let mut rows = Vec::with_capacity(table.rows.len());
    for raw_row in table.rows {
        let mut row = Vec::with_capacity(raw_row.c.len());
        for (idx, cell) in raw_row.c.into_iter().enumerate() {
            let col_type = table.cols.get(idx).map(|c| c.col_type.as_str()).ok_or_else(
                || SheetBridgeError::Protocol("row is wider than column metadata".to_string()),
            )?;
            row.push(convert_raw_cell(col_type, cell)?);
        }
        rows.push(row);
    }
    Ok(QueryRowsResult { rows })
}

fn convert_raw_cell(col_type: &str, cell: Option<RawQueryCell>) -> Result<Value> {
    let Some(cell) = cell else {
        return Ok(Value::Null);
    };

    match col_type {
        "boolean" | "number" | "string" => Ok(cell.v.unwrap_or(Value::Null)),
        // Date-like cells carry an epoch-relative encoding in `v`; the
        // pre-formatted text in `f` is the usable representation.
        "date" | "datetime" | "timeofday" => {
            Ok(cell.f.map(Value::String).unwrap_or(Value::Null))
        }
        other => Err(SheetBridgeError::Protocol(format!(
            "unsupported cell value type: {}",
            other
        ))),
    }
}
