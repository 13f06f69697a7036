//! Scripted transport double for statement and key-value tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use sheet_bridge_common::Result;
use sheet_bridge_sheets::models::{
    A1Range, BatchUpdateRowsRequest, BatchUpdateRowsResult, InsertRowsResult, QueryRowsResult,
    UpdateRowsResult,
};
use sheet_bridge_sheets::SheetsTransport;

/// One recorded transport invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateSheet {
        sheet_name: String,
    },
    OverwriteRows {
        a1_range: String,
        values: Vec<Vec<Value>>,
    },
    InsertRows {
        a1_range: String,
        values: Vec<Vec<Value>>,
    },
    UpdateRows {
        a1_range: String,
        values: Vec<Vec<Value>>,
    },
    BatchUpdateRows {
        requests: Vec<BatchUpdateRowsRequest>,
    },
    QueryRows {
        query: String,
        skip_header: bool,
    },
    Clear {
        ranges: Vec<String>,
    },
}

/// Records every call and replays scripted query results in FIFO order.
/// An unscripted query returns an empty result.
pub struct MockTransport {
    calls: Mutex<Vec<Call>>,
    query_results: Mutex<VecDeque<QueryRowsResult>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            query_results: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push_query_result(&self, result: QueryRowsResult) {
        self.query_results.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// The query string of the most recent `query_rows` call.
    pub fn last_query(&self) -> Option<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|call| match call {
                Call::QueryRows { query, .. } => Some(query.clone()),
                _ => None,
            })
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn empty_insert_result() -> InsertRowsResult {
        InsertRowsResult {
            updated_range: A1Range::parse(""),
            updated_rows: 0,
            updated_columns: 0,
            updated_cells: 0,
            inserted_values: Vec::new(),
        }
    }

    fn empty_update_result() -> UpdateRowsResult {
        UpdateRowsResult {
            updated_range: A1Range::parse(""),
            updated_rows: 0,
            updated_columns: 0,
            updated_cells: 0,
            updated_values: Vec::new(),
        }
    }
}

#[async_trait]
impl SheetsTransport for MockTransport {
    async fn create_spreadsheet(&self, _title: &str) -> Result<String> {
        Ok("mock-spreadsheet".to_string())
    }

    async fn create_sheet(&self, _spreadsheet_id: &str, sheet_name: &str) -> Result<()> {
        self.record(Call::CreateSheet {
            sheet_name: sheet_name.to_string(),
        });
        Ok(())
    }

    async fn get_sheet_name_to_id(&self, _spreadsheet_id: &str) -> Result<HashMap<String, i64>> {
        Ok(HashMap::new())
    }

    async fn delete_sheets(&self, _spreadsheet_id: &str, _sheet_ids: &[i64]) -> Result<()> {
        Ok(())
    }

    async fn insert_rows(
        &self,
        _spreadsheet_id: &str,
        a1_range: &str,
        values: &[Vec<Value>],
    ) -> Result<InsertRowsResult> {
        self.record(Call::InsertRows {
            a1_range: a1_range.to_string(),
            values: values.to_vec(),
        });
        Ok(Self::empty_insert_result())
    }

    async fn overwrite_rows(
        &self,
        _spreadsheet_id: &str,
        a1_range: &str,
        values: &[Vec<Value>],
    ) -> Result<InsertRowsResult> {
        self.record(Call::OverwriteRows {
            a1_range: a1_range.to_string(),
            values: values.to_vec(),
        });
        Ok(Self::empty_insert_result())
    }

    async fn update_rows(
        &self,
        _spreadsheet_id: &str,
        a1_range: &str,
        values: &[Vec<Value>],
    ) -> Result<UpdateRowsResult> {
        self.record(Call::UpdateRows {
            a1_range: a1_range.to_string(),
            values: values.to_vec(),
        });
        Ok(Self::empty_update_result())
    }

    async fn batch_update_rows(
        &self,
        _spreadsheet_id: &str,
        requests: Vec<BatchUpdateRowsRequest>,
    ) -> Result<BatchUpdateRowsResult> {
        let count = requests.len();
        self.record(Call::BatchUpdateRows { requests });
        Ok((0..count).map(|_| Self::empty_update_result()).collect())
    }

    async fn query_rows(
        &self,
        _spreadsheet_id: &str,
        _sheet_name: &str,
        query: &str,
        skip_header: bool,
    ) -> Result<QueryRowsResult> {
        self.record(Call::QueryRows {
            query: query.to_string(),
            skip_header,
        });
        Ok(self
            .query_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }

    async fn clear(&self, _spreadsheet_id: &str, ranges: &[String]) -> Result<Vec<String>> {
        self.record(Call::Clear {
            ranges: ranges.to_vec(),
        });
        Ok(ranges.to_vec())
    }
}
