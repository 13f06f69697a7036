//! Key-value store over a two-column row store.
//!
//! Keys and values live in the `key` and `value` columns of a regular row
//! store sheet. The store runs in one of two modes: overwrite keeps at most
//! one live row per key, append-only keeps the full write history and treats
//! the newest row as current.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use sheet_bridge_common::{Result, SheetBridgeError};
use sheet_bridge_sheets::auth::TokenProvider;

use crate::codec::{BasicCodec, Codec};
use crate::query::ColumnOrderBy;
use crate::row::{RowStore, RowStoreConfig};
use crate::stmt::ROW_IDX_COL;

const KEY_COL: &str = "key";
const VALUE_COL: &str = "value";

/// How the store treats repeated writes to the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvMode {
    /// At most one live row per key. `set` deletes the previous row before
    /// inserting, `delete` removes the row outright.
    Overwrite,
    /// Every write inserts a new row; the most recently inserted row wins.
    /// `delete` inserts an empty-value tombstone instead of removing data.
    AppendOnly,
}

#[derive(Serialize)]
struct KvRow {
    key: String,
    value: String,
}

/// Get/set/delete interface over a spreadsheet sheet.
///
/// Values are wrapped through a [`Codec`] before storage, so an encoded value
/// is never the empty string. That reserves the empty cell for the
/// append-only tombstone and makes "key absent" and "key tombstoned"
/// indistinguishable on read, which both surface as
/// [`SheetBridgeError::KeyNotFound`].
pub struct KvStore {
    row_store: RowStore,
    mode: KvMode,
    codec: Box<dyn Codec>,
}

impl KvStore {
    /// Creates a key-value store talking to the real backend, with the
    /// standard [`BasicCodec`].
    pub async fn create(
        auth: Arc<dyn TokenProvider>,
        spreadsheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
        mode: KvMode,
    ) -> Result<Self> {
        let config = RowStoreConfig::new(vec![KEY_COL, VALUE_COL]);
        let row_store = RowStore::create(auth, spreadsheet_id, sheet_name, config).await?;
        Ok(Self::with_row_store(row_store, mode, Box::new(BasicCodec)))
    }

    /// Wraps an existing row store. The row store must be configured with the
    /// `key` and `value` columns, in that order.
    pub fn with_row_store(row_store: RowStore, mode: KvMode, codec: Box<dyn Codec>) -> Self {
        Self {
            row_store,
            mode,
            codec,
        }
    }

    /// Returns the current value for `key`.
    ///
    /// In append-only mode the lookup orders by row identity descending, so
    /// the most recently inserted row decides. A missing row, an empty cell
    /// and a tombstone all fail with [`SheetBridgeError::KeyNotFound`].
    pub async fn get(&self, key: &str) -> Result<String> {
        let stmt = self
            .row_store
            .select(&[VALUE_COL])
            .where_clause(format!("{} = ?", KEY_COL), vec![key.into()])
            .limit(1);
        let stmt = match self.mode {
            KvMode::Overwrite => stmt,
            KvMode::AppendOnly => stmt.order_by(vec![ColumnOrderBy::desc(ROW_IDX_COL)]),
        };

        let rows = stmt.exec().await?;
        let Some(record) = rows.into_iter().next() else {
            return Err(SheetBridgeError::KeyNotFound);
        };

        match record.get(VALUE_COL) {
            Some(Value::String(s)) if !s.is_empty() => self.codec.decode(s),
            None | Some(Value::Null) | Some(Value::String(_)) => {
                Err(SheetBridgeError::KeyNotFound)
            }
            Some(other) => Err(SheetBridgeError::Protocol(format!(
                "kv value cell is not a string: {}",
                other
            ))),
        }
    }

    /// Stores `value` under `key`.
    ///
    /// Overwrite mode deletes the existing row first, so the key is briefly
    /// absent between the two calls. Append-only mode only ever inserts.
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        let encoded = self.codec.encode(value);

        if self.mode == KvMode::Overwrite {
            self.row_store
                .delete()
                .where_clause(format!("{} = ?", KEY_COL), vec![key.into()])
                .exec()
                .await?;
        }

        let row = KvRow {
            key: key.to_string(),
            value: encoded,
        };
        self.row_store.insert(&[row]).exec().await?;
        Ok(())
    }

    /// Removes `key`. Overwrite mode clears the row; append-only mode inserts
    /// an empty-value tombstone that [`get`](Self::get) reads as not-found.
    pub async fn delete(&self, key: &str) -> Result<()> {
        match self.mode {
            KvMode::Overwrite => {
                self.row_store
                    .delete()
                    .where_clause(format!("{} = ?", KEY_COL), vec![key.into()])
                    .exec()
                    .await
            }
            KvMode::AppendOnly => {
                let row = KvRow {
                    key: key.to_string(),
                    value: String::new(),
                };
                self.row_store.insert(&[row]).exec().await?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stmt::ROW_IDX_FORMULA;
    use crate::testutil::{Call, MockTransport};
    use serde_json::json;
    use sheet_bridge_sheets::models::QueryRowsResult;

    async fn kv_with(transport: Arc<MockTransport>, mode: KvMode) -> KvStore {
        let config = RowStoreConfig::new(vec![KEY_COL, VALUE_COL]);
        let row_store = RowStore::with_transport(transport, "sheet-id", "kv", config)
            .await
            .unwrap();
        KvStore::with_row_store(row_store, mode, Box::new(BasicCodec))
    }

    fn rows(raw: Vec<Vec<Value>>) -> QueryRowsResult {
        QueryRowsResult { rows: raw }
    }

    #[tokio::test]
    async fn test_overwrite_set_deletes_then_inserts() {
        let transport = Arc::new(MockTransport::new());
        let kv = kv_with(transport.clone(), KvMode::Overwrite).await;
        // The delete's identity lookup finds one previous row for the key.
        transport.push_query_result(rows(vec![vec![json!(4.0)]]));

        kv.set("k", "v1").await.unwrap();

        assert_eq!(
            transport.last_query().unwrap(),
            "select A where A is not null AND B = \"k\""
        );
        // The previous row is cleared right before the insert.
        let calls = transport.calls();
        assert_eq!(
            calls[calls.len() - 2],
            Call::Clear {
                ranges: vec!["kv!A4:Z4".to_string()]
            }
        );
        let Call::OverwriteRows { values, .. } = calls.last().unwrap() else {
            panic!("expected a trailing insert");
        };
        assert_eq!(
            values,
            &vec![vec![json!(ROW_IDX_FORMULA), json!("'k"), json!("'!v1")]]
        );
    }

    #[tokio::test]
    async fn test_overwrite_get_decodes_value() {
        let transport = Arc::new(MockTransport::new());
        let kv = kv_with(transport.clone(), KvMode::Overwrite).await;
        transport.push_query_result(rows(vec![vec![json!("!v1")]]));

        assert_eq!(kv.get("k").await.unwrap(), "v1");
        assert_eq!(
            transport.last_query().unwrap(),
            "select C where A is not null AND B = \"k\" limit 1"
        );
    }

    #[tokio::test]
    async fn test_append_only_get_orders_by_identity_desc() {
        let transport = Arc::new(MockTransport::new());
        let kv = kv_with(transport.clone(), KvMode::AppendOnly).await;
        transport.push_query_result(rows(vec![vec![json!("!v2")]]));

        assert_eq!(kv.get("k").await.unwrap(), "v2");
        assert_eq!(
            transport.last_query().unwrap(),
            "select C where A is not null AND B = \"k\" order by A DESC limit 1"
        );
    }

    #[tokio::test]
    async fn test_append_only_set_only_inserts() {
        let transport = Arc::new(MockTransport::new());
        let kv = kv_with(transport.clone(), KvMode::AppendOnly).await;
        let calls_before = transport.calls().len();

        kv.set("k", "v1").await.unwrap();
        kv.set("k", "v2").await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), calls_before + 2);
        assert!(calls[calls_before..]
            .iter()
            .all(|c| matches!(c, Call::OverwriteRows { .. })));
    }

    #[tokio::test]
    async fn test_missing_key_is_not_found() {
        let transport = Arc::new(MockTransport::new());
        let kv = kv_with(transport.clone(), KvMode::Overwrite).await;
        transport.push_query_result(rows(vec![]));

        let err = kv.get("ghost").await.unwrap_err();
        assert!(err.is_key_not_found());
    }

    #[tokio::test]
    async fn test_empty_and_tombstoned_values_are_not_found() {
        let transport = Arc::new(MockTransport::new());
        let kv = kv_with(transport.clone(), KvMode::AppendOnly).await;

        transport.push_query_result(rows(vec![vec![json!("")]]));
        assert!(kv.get("k").await.unwrap_err().is_key_not_found());

        transport.push_query_result(rows(vec![vec![Value::Null]]));
        assert!(kv.get("k").await.unwrap_err().is_key_not_found());
    }

    #[tokio::test]
    async fn test_overwrite_delete_clears_row() {
        let transport = Arc::new(MockTransport::new());
        let kv = kv_with(transport.clone(), KvMode::Overwrite).await;
        transport.push_query_result(rows(vec![vec![json!(3.0)]]));

        kv.delete("k").await.unwrap();

        let Call::Clear { ranges } = transport.calls().into_iter().last().unwrap() else {
            panic!("expected a clear call");
        };
        assert_eq!(ranges, vec!["kv!A3:Z3".to_string()]);
    }

    #[tokio::test]
    async fn test_append_only_delete_inserts_tombstone() {
        let transport = Arc::new(MockTransport::new());
        let kv = kv_with(transport.clone(), KvMode::AppendOnly).await;

        kv.delete("k").await.unwrap();

        let Call::OverwriteRows { values, .. } =
            transport.calls().into_iter().last().unwrap()
        else {
            panic!("expected an insert call");
        };
        // The tombstone value is the escaped empty string, which reads back
        // as an empty cell.
        assert_eq!(
            values,
            vec![vec![json!(ROW_IDX_FORMULA), json!("'k"), json!("'")]]
        );
    }

    #[tokio::test]
    async fn test_undecodable_value_is_serialization_error() {
        let transport = Arc::new(MockTransport::new());
        let kv = kv_with(transport.clone(), KvMode::Overwrite).await;
        transport.push_query_result(rows(vec![vec![json!("raw-unencoded")]]));

        let err = kv.get("k").await.unwrap_err();
        assert!(matches!(err, SheetBridgeError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_non_string_value_cell_is_protocol_error() {
        let transport = Arc::new(MockTransport::new());
        let kv = kv_with(transport.clone(), KvMode::Overwrite).await;
        transport.push_query_result(rows(vec![vec![json!(12.5)]]));

        let err = kv.get("k").await.unwrap_err();
        assert!(matches!(err, SheetBridgeError::Protocol(_)));
    }
}
