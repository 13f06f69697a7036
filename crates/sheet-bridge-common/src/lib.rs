//! Common utilities for sheet-bridge
//!
//! This crate provides the shared error type used across all sheet-bridge crates.

pub mod error;

pub use error::{Result, SheetBridgeError};
