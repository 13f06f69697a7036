//! Row store construction and statement factories.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use sheet_bridge_common::Result;
use sheet_bridge_common::SheetBridgeError;
use sheet_bridge_sheets::auth::TokenProvider;
use sheet_bridge_sheets::client::{SheetsClient, SheetsTransport};
use tracing::debug;

use crate::range::{a1_range, ColumnMapping, MAX_COLUMN, ROW_HEADER_RANGE};
use crate::stmt::{
    CountStmt, DeleteStmt, InsertStmt, SelectStmt, UpdateStmt, ROW_IDX_COL,
};

/// Column configuration for a row store.
///
/// Column ordering matters: it fixes the physical column layout in the
/// sheet. Reordering columns here without migrating the sheet produces
/// garbage reads.
#[derive(Debug, Clone)]
pub struct RowStoreConfig {
    /// Logical column names, in sheet order.
    pub columns: Vec<String>,
    /// Columns whose values are raw formulas. Only string values are
    /// accepted for these, and they are written without escaping.
    pub columns_with_formula: Vec<String>,
}

impl RowStoreConfig {
    pub fn new<S: Into<String>>(columns: Vec<S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            columns_with_formula: Vec::new(),
        }
    }

    pub fn with_formula_columns<S: Into<String>>(mut self, columns: Vec<S>) -> Self {
        self.columns_with_formula = columns.into_iter().map(Into::into).collect();
        self
    }

    fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(SheetBridgeError::Config(
                "columns must have at least one column".to_string(),
            ));
        }
        if self.columns.len() > MAX_COLUMN {
            return Err(SheetBridgeError::Config(format!(
                "you can only have up to {} columns",
                MAX_COLUMN
            )));
        }
        Ok(())
    }
}

/// Prepends the hidden row-identity column to the user's columns. It must be
/// first so the fixed ranges and the identity guard always address column A.
fn inject_rid_col(config: RowStoreConfig) -> RowStoreConfig {
    let mut columns = Vec::with_capacity(config.columns.len() + 1);
    columns.push(ROW_IDX_COL.to_string());
    columns.extend(config.columns);
    RowStoreConfig {
        columns,
        columns_with_formula: config.columns_with_formula,
    }
}

/// Treats one sheet of a spreadsheet as a relational-ish table.
///
/// Construction validates the configuration, ensures the sheet exists and
/// (re)writes its header row. Afterwards the store is immutable; each CRUD
/// statement is created through a factory method and executed one-shot.
pub struct RowStore {
    transport: Arc<dyn SheetsTransport>,
    spreadsheet_id: String,
    sheet_name: String,
    config: RowStoreConfig,
    mapping: ColumnMapping,
    formula_columns: HashSet<String>,
}

impl std::fmt::Debug for RowStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowStore")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("sheet_name", &self.sheet_name)
            .field("config", &self.config)
            .field("mapping", &self.mapping)
            .field("formula_columns", &self.formula_columns)
            .finish()
    }
}

impl RowStore {
    /// Creates a row store talking to the real backend.
    pub async fn create(
        auth: Arc<dyn TokenProvider>,
        spreadsheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
        config: RowStoreConfig,
    ) -> Result<Self> {
        let transport: Arc<dyn SheetsTransport> = Arc::new(SheetsClient::new(auth));
        Self::with_transport(transport, spreadsheet_id, sheet_name, config).await
    }

    /// Creates a row store over an arbitrary transport implementation.
    pub async fn with_transport(
        transport: Arc<dyn SheetsTransport>,
        spreadsheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
        config: RowStoreConfig,
    ) -> Result<Self> {
        config.validate()?;
        let config = inject_rid_col(config);

        let spreadsheet_id = spreadsheet_id.into();
        let sheet_name = sheet_name.into();

        // Idempotent ensure: the call fails when the sheet already exists,
        // which is the common case after the first run.
        if let Err(err) = transport.create_sheet(&spreadsheet_id, &sheet_name).await {
            debug!(%sheet_name, error = %err, "create sheet skipped");
        }

        let store = Self {
            transport,
            spreadsheet_id,
            sheet_name,
            mapping: ColumnMapping::new(&config.columns),
            formula_columns: config.columns_with_formula.iter().cloned().collect(),
            config,
        };

        store.ensure_headers().await?;
        Ok(store)
    }

    /// Prepares a selection. `columns` empty means all configured columns.
    /// Terminal: [`SelectStmt::exec`].
    pub fn select(&self, columns: &[&str]) -> SelectStmt<'_> {
        SelectStmt::new(self, columns.iter().map(|c| c.to_string()).collect())
    }

    /// Prepares an insertion of record-shaped values.
    /// Terminal: [`InsertStmt::exec`].
    pub fn insert<'a, T: Serialize>(&'a self, rows: &'a [T]) -> InsertStmt<'a, T> {
        InsertStmt::new(self, rows)
    }

    /// Prepares an update setting each given column to its new value.
    /// Terminal: [`UpdateStmt::exec`].
    pub fn update(
        &self,
        col_to_value: std::collections::HashMap<String, Value>,
    ) -> UpdateStmt<'_> {
        UpdateStmt::new(self, col_to_value)
    }

    /// Prepares a row deletion. Terminal: [`DeleteStmt::exec`].
    pub fn delete(&self) -> DeleteStmt<'_> {
        DeleteStmt::new(self)
    }

    /// Prepares a row count. Terminal: [`CountStmt::exec`].
    pub fn count(&self) -> CountStmt<'_> {
        CountStmt::new(self)
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    pub(crate) fn transport(&self) -> &dyn SheetsTransport {
        self.transport.as_ref()
    }

    pub(crate) fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    pub(crate) fn formula_columns(&self) -> &HashSet<String> {
        &self.formula_columns
    }

    /// All configured columns, identity column included.
    pub(crate) fn columns(&self) -> &[String] {
        &self.config.columns
    }

    /// Clears the header row and rewrites the configured column names.
    async fn ensure_headers(&self) -> Result<()> {
        let header_range = a1_range(&self.sheet_name, ROW_HEADER_RANGE);
        self.transport
            .clear(&self.spreadsheet_id, &[header_range.clone()])
            .await?;

        let header: Vec<Value> = self
            .config
            .columns
            .iter()
            .map(|col| Value::String(col.clone()))
            .collect();
        self.transport
            .update_rows(&self.spreadsheet_id, &header_range, &[header])
            .await?;
        Ok(())
    }
}
