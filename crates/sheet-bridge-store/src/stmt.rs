//! The five row-store statements: Select, Insert, Update, Delete and Count.
//!
//! Every statement is a one-shot builder: configure it through chained
//! setters, then consume it with `exec`. Statements share the row-identity
//! convention — a hidden leading column holding `=ROW()` — which lets
//! where-less mutations target only rows that have ever held data.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use sheet_bridge_common::{Result, SheetBridgeError};
use sheet_bridge_sheets::models::{BatchUpdateRowsRequest, QueryRowsResult};
use tracing::debug;

use crate::query::{ColumnOrderBy, QueryArg, QueryBuilder};
use crate::range::{a1_range, row_delete_range, ROW_FULL_TABLE_RANGE};
use crate::row::RowStore;
use crate::values::{check_safe_integer, escape_column_value};

/// Name of the hidden row-identity column.
pub const ROW_IDX_COL: &str = "_rid";

/// Formula written into the identity cell of every inserted row. It
/// evaluates to the cell's own row number, so a populated identity cell
/// marks the row as "has held data" even after its other cells are cleared.
pub const ROW_IDX_FORMULA: &str = "=ROW()";

/// Wraps a caller-supplied condition with the row-identity guard.
///
/// Without the guard, a where-less update or delete would treat every row of
/// the fixed scan range as a target, including rows that were never written.
pub(crate) fn rid_where_interceptor(where_clause: &str) -> String {
    if where_clause.is_empty() {
        format!("{} is not null", ROW_IDX_COL)
    } else {
        format!("{} is not null AND {}", ROW_IDX_COL, where_clause)
    }
}

/// Row selection. Produced by [`RowStore::select`].
pub struct SelectStmt<'a> {
    store: &'a RowStore,
    columns: Vec<String>,
    builder: QueryBuilder,
}

impl<'a> SelectStmt<'a> {
    pub(crate) fn new(store: &'a RowStore, columns: Vec<String>) -> Self {
        let columns = if columns.is_empty() {
            store.columns().to_vec()
        } else {
            columns
        };
        let builder = QueryBuilder::new(
            store.mapping().name_map(),
            Some(rid_where_interceptor),
            columns.clone(),
        );
        Self {
            store,
            columns,
            builder,
        }
    }

    /// Sets the condition. `condition` uses `?` placeholders bound to `args`.
    pub fn where_clause(mut self, condition: impl Into<String>, args: Vec<QueryArg>) -> Self {
        self.builder = self.builder.where_clause(condition, args);
        self
    }

    pub fn order_by(mut self, ordering: Vec<ColumnOrderBy>) -> Self {
        self.builder = self.builder.order_by(ordering);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.builder = self.builder.limit(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.builder = self.builder.offset(offset);
        self
    }

    /// Runs the query and maps each row onto the requested column names.
    /// The identity column is never part of the output records.
    pub async fn exec(self) -> Result<Vec<HashMap<String, Value>>> {
        let stmt = self.builder.generate()?;
        debug!(query = %stmt, "executing select");

        let result = self
            .store
            .transport()
            .query_rows(
                self.store.spreadsheet_id(),
                self.store.sheet_name(),
                &stmt,
                true,
            )
            .await?;
        Ok(self.build_result_map(result))
    }

    fn build_result_map(&self, result: QueryRowsResult) -> Vec<HashMap<String, Value>> {
        result
            .rows
            .into_iter()
            .map(|row| {
                let mut record = HashMap::new();
                for (idx, col) in self.columns.iter().enumerate() {
                    if col == ROW_IDX_COL {
                        continue;
                    }
                    record.insert(
                        col.clone(),
                        row.get(idx).cloned().unwrap_or(Value::Null),
                    );
                }
                record
            })
            .collect()
    }
}

/// Row insertion. Produced by [`RowStore::insert`].
pub struct InsertStmt<'a, T: Serialize> {
    store: &'a RowStore,
    rows: &'a [T],
}

impl<'a, T: Serialize> InsertStmt<'a, T> {
    pub(crate) fn new(store: &'a RowStore, rows: &'a [T]) -> Self {
        Self { store, rows }
    }

    /// Converts every record and submits them as one append-style write into
    /// the full-table range. An empty row list is a no-op.
    pub async fn exec(self) -> Result<()> {
        if self.rows.is_empty() {
            return Ok(());
        }

        let mut converted = Vec::with_capacity(self.rows.len());
        for row in self.rows {
            converted.push(self.convert_row(row)?);
        }

        debug!(rows = converted.len(), "inserting rows");
        self.store
            .transport()
            .overwrite_rows(
                self.store.spreadsheet_id(),
                &a1_range(self.store.sheet_name(), ROW_FULL_TABLE_RANGE),
                &converted,
            )
            .await?;
        Ok(())
    }

    /// Flattens one record into a positional cell array. Position 0 always
    /// holds the identity formula; fields that are not configured columns
    /// are ignored; omitted columns stay unset.
    fn convert_row(&self, row: &T) -> Result<Vec<Value>> {
        let fields = match serde_json::to_value(row)? {
            Value::Object(map) => map,
            Value::Null => {
                return Err(SheetBridgeError::Query(
                    "row type must not be null".to_string(),
                ))
            }
            other => {
                return Err(SheetBridgeError::Query(format!(
                    "row type must be a structured record, got: {}",
                    other
                )))
            }
        };

        let mut result = vec![Value::Null; self.store.mapping().len()];
        result[0] = Value::String(ROW_IDX_FORMULA.to_string());

        for (col, value) in fields {
            let Some(col_ref) = self.store.mapping().get(&col) else {
                continue;
            };
            let escaped = escape_column_value(&col, value, self.store.formula_columns())?;
            check_safe_integer(&escaped)?;
            result[col_ref.index] = escaped;
        }

        Ok(result)
    }
}

/// Selective column update. Produced by [`RowStore::update`].
pub struct UpdateStmt<'a> {
    store: &'a RowStore,
    col_to_value: HashMap<String, Value>,
    builder: QueryBuilder,
}

impl<'a> UpdateStmt<'a> {
    pub(crate) fn new(store: &'a RowStore, col_to_value: HashMap<String, Value>) -> Self {
        let builder = QueryBuilder::new(
            store.mapping().name_map(),
            Some(rid_where_interceptor),
            vec![ROW_IDX_COL.to_string()],
        );
        Self {
            store,
            col_to_value,
            builder,
        }
    }

    pub fn where_clause(mut self, condition: impl Into<String>, args: Vec<QueryArg>) -> Self {
        self.builder = self.builder.where_clause(condition, args);
        self
    }

    /// Looks up the matching row indices, then writes every targeted cell in
    /// one batched call. Matching nothing is a no-op; an empty payload is a
    /// usage error raised before any network call.
    pub async fn exec(self) -> Result<()> {
        if self.col_to_value.is_empty() {
            return Err(SheetBridgeError::Config(
                "empty update payload, at least one column must be updated".to_string(),
            ));
        }

        let query = self.builder.generate()?;
        let indices = get_row_indices(self.store, &query).await?;
        if indices.is_empty() {
            return Ok(());
        }

        let requests = self.build_batch_requests(&indices)?;
        debug!(cells = requests.len(), "updating cells");
        self.store
            .transport()
            .batch_update_rows(self.store.spreadsheet_id(), requests)
            .await?;
        Ok(())
    }

    /// One single-cell write request per (column, matching row) pair,
    /// grouped by column in definition order.
    fn build_batch_requests(&self, indices: &[u64]) -> Result<Vec<BatchUpdateRowsRequest>> {
        for col in self.col_to_value.keys() {
            if !self.store.mapping().contains(col) {
                return Err(SheetBridgeError::Query(format!(
                    "failed to update, unknown column name provided: {}",
                    col
                )));
            }
        }

        let mut requests = Vec::with_capacity(self.col_to_value.len() * indices.len());
        for (col, col_ref) in self.store.mapping().iter() {
            let Some(value) = self.col_to_value.get(col) else {
                continue;
            };
            let escaped =
                escape_column_value(col, value.clone(), self.store.formula_columns())?;
            check_safe_integer(&escaped)?;

            for row_idx in indices {
                let cell = format!("{}{}", col_ref.letter, row_idx);
                requests.push(BatchUpdateRowsRequest {
                    a1_range: a1_range(self.store.sheet_name(), &cell),
                    values: vec![vec![escaped.clone()]],
                });
            }
        }
        Ok(requests)
    }
}

/// Row deletion. Produced by [`RowStore::delete`].
pub struct DeleteStmt<'a> {
    store: &'a RowStore,
    builder: QueryBuilder,
}

impl<'a> DeleteStmt<'a> {
    pub(crate) fn new(store: &'a RowStore) -> Self {
        let builder = QueryBuilder::new(
            store.mapping().name_map(),
            Some(rid_where_interceptor),
            vec![ROW_IDX_COL.to_string()],
        );
        Self { store, builder }
    }

    pub fn where_clause(mut self, condition: impl Into<String>, args: Vec<QueryArg>) -> Self {
        self.builder = self.builder.where_clause(condition, args);
        self
    }

    /// Clears the full-width range of every matching row in one call.
    /// Clearing wipes the identity cell too, so the row stops existing as
    /// far as the statement protocol is concerned.
    pub async fn exec(self) -> Result<()> {
        let query = self.builder.generate()?;
        let indices = get_row_indices(self.store, &query).await?;
        if indices.is_empty() {
            return Ok(());
        }

        let ranges: Vec<String> = indices
            .iter()
            .map(|idx| a1_range(self.store.sheet_name(), &row_delete_range(*idx, *idx)))
            .collect();
        debug!(rows = ranges.len(), "deleting rows");
        self.store
            .transport()
            .clear(self.store.spreadsheet_id(), &ranges)
            .await?;
        Ok(())
    }
}

/// Row counting. Produced by [`RowStore::count`].
pub struct CountStmt<'a> {
    store: &'a RowStore,
    builder: QueryBuilder,
}

impl<'a> CountStmt<'a> {
    pub(crate) fn new(store: &'a RowStore) -> Self {
        let builder = QueryBuilder::new(
            store.mapping().name_map(),
            Some(rid_where_interceptor),
            vec![format!("COUNT({})", ROW_IDX_COL)],
        );
        Self { store, builder }
    }

    pub fn where_clause(mut self, condition: impl Into<String>, args: Vec<QueryArg>) -> Self {
        self.builder = self.builder.where_clause(condition, args);
        self
    }

    /// Expects a single numeric cell and truncates it toward zero. The
    /// backend reports "nothing matched" as an entirely empty result, which
    /// counts as zero.
    pub async fn exec(self) -> Result<u64> {
        let query = self.builder.generate()?;
        let result = self
            .store
            .transport()
            .query_rows(
                self.store.spreadsheet_id(),
                self.store.sheet_name(),
                &query,
                true,
            )
            .await?;

        if result.rows.is_empty() || result.rows[0].is_empty() {
            return Ok(0);
        }
        if result.rows.len() != 1 || result.rows[0].len() != 1 {
            return Err(SheetBridgeError::Protocol(format!(
                "unexpected result shape for count: {} rows",
                result.rows.len()
            )));
        }

        match &result.rows[0][0] {
            Value::Number(n) => {
                let raw = n.as_f64().ok_or_else(|| {
                    SheetBridgeError::Protocol(format!("invalid count value: {}", n))
                })?;
                Ok(raw.trunc() as u64)
            }
            other => Err(SheetBridgeError::Protocol(format!(
                "invalid count type: {}",
                other
            ))),
        }
    }
}

/// Runs an identity-projected lookup and parses each row as one row index.
async fn get_row_indices(store: &RowStore, query: &str) -> Result<Vec<u64>> {
    debug!(%query, "looking up row indices");
    let result = store
        .transport()
        .query_rows(store.spreadsheet_id(), store.sheet_name(), query, true)
        .await?;

    let mut indices = Vec::with_capacity(result.rows.len());
    for row in result.rows {
        if row.len() != 1 {
            return Err(SheetBridgeError::Protocol(format!(
                "error retrieving row indices: expected one cell per row, got {}",
                row.len()
            )));
        }
        match &row[0] {
            Value::Number(n) => {
                let raw = n.as_f64().ok_or_else(|| {
                    SheetBridgeError::Protocol(format!("error converting row index: {}", n))
                })?;
                indices.push(raw.trunc() as u64);
            }
            other => {
                return Err(SheetBridgeError::Protocol(format!(
                    "error converting row index, value: {}",
                    other
                )))
            }
        }
    }
    Ok(indices)
}
