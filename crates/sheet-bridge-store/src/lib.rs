//! sheet-bridge-store: a relational-ish row store and a key-value store on
//! top of a spreadsheet sheet.
//!
//! The row store maps logical column names onto sheet columns and implements
//! Select/Insert/Update/Delete/Count by translating them into range writes
//! and visualization-language queries. Stable row identity comes from a
//! hidden leading column holding a `=ROW()` formula, which lets the engine
//! tell rows that have held data apart from rows that were never written.
//!
//! The key-value store specializes a two-column row store into get/set/delete
//! with an overwrite mode and a history-preserving append-only mode.
//!
//! Network I/O goes through the `SheetsTransport` contract from the
//! `sheet-bridge-sheets` crate; everything here is deterministic given the
//! transport's responses.

pub mod codec;
pub mod kv;
pub mod query;
pub mod range;
pub mod row;
pub mod stmt;
pub mod values;

#[cfg(test)]
pub(crate) mod testutil;

pub use codec::{BasicCodec, Codec};
pub use kv::{KvMode, KvStore};
pub use query::{ColumnOrderBy, OrderBy, QueryArg, QueryBuilder};
pub use range::{column_name, ColumnMapping, ColumnRef};
pub use row::{RowStore, RowStoreConfig};
pub use stmt::{CountStmt, DeleteStmt, InsertStmt, SelectStmt, UpdateStmt};

pub use sheet_bridge_common::{Result, SheetBridgeError};
