//! Cell value escaping and numeric safety checks.

use std::collections::HashSet;

use serde_json::Value;
use sheet_bridge_common::{Result, SheetBridgeError};

/// Largest integer a double represents exactly: 2^53 - 1.
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

/// Escapes a value for writing into a cell.
///
/// Strings get a leading single quote so the backend stores them verbatim
/// instead of coercing them to numbers, dates or formulas. Everything else
/// passes through unchanged.
pub fn escape_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(format!("'{}", s)),
        other => other,
    }
}

/// Escapes a value for a specific column.
///
/// Formula columns carry raw formulas: the value must be a string and is
/// passed through without the quote prefix. All other columns go through
/// [`escape_value`].
pub fn escape_column_value(
    column: &str,
    value: Value,
    formula_columns: &HashSet<String>,
) -> Result<Value> {
    if !formula_columns.contains(column) {
        return Ok(escape_value(value));
    }
    match value {
        Value::String(_) => Ok(value),
        other => Err(SheetBridgeError::Query(format!(
            "value of column {} is not a string, but expected to contain a formula: {}",
            column, other
        ))),
    }
}

/// Rejects integers the backend's doubles cannot represent exactly.
///
/// Fractional numbers pass: the envelope guards integer identity (keys, row
/// counts), not general floating-point precision.
pub fn check_safe_integer(value: &Value) -> Result<()> {
    let Value::Number(n) = value else {
        return Ok(());
    };

    if let Some(i) = n.as_i64() {
        return check_safe_i64(i);
    }
    if n.as_u64().is_some() {
        // Only u64 values above i64::MAX reach here; far past 2^53 - 1.
        return Err(SheetBridgeError::UnsafeInteger);
    }
    if let Some(f) = n.as_f64() {
        if f.fract() == 0.0 && f.abs() > MAX_SAFE_INTEGER as f64 {
            return Err(SheetBridgeError::UnsafeInteger);
        }
    }
    Ok(())
}

/// Integer-typed variant of [`check_safe_integer`] for query arguments.
pub fn check_safe_i64(value: i64) -> Result<()> {
    if !(-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&value) {
        return Err(SheetBridgeError::UnsafeInteger);
    }
    Ok(())
}
