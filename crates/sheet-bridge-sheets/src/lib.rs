//! sheet-bridge-sheets: Google Sheets transport layer
//!
//! This crate provides the network-facing half of sheet-bridge:
//! - `TokenProvider`: auth seam supplying bearer tokens per request
//! - `SheetsTransport`: the transport contract the statement engine consumes
//! - `SheetsClient`: reqwest implementation over the Sheets v4 REST API and
//!   the visualization-query (gviz) endpoint
//!
//! The statement engine itself lives in the `sheet-bridge-store` crate.

pub mod auth;
pub mod client;
pub mod models;

pub use auth::{OAuth2Config, OAuth2TokenProvider, StaticTokenProvider, TokenProvider};
pub use client::{SheetsClient, SheetsTransport};
pub use models::{
    A1Range, AppendMode, BatchUpdateRowsRequest, BatchUpdateRowsResult, InsertRowsResult,
    QueryRowsResult, UpdateRowsResult,
};

pub use sheet_bridge_common::{Result, SheetBridgeError};
