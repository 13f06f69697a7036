//! Error types for sheet-bridge

use thiserror::Error;

/// Result type alias for sheet-bridge operations
pub type Result<T> = std::result::Result<T, SheetBridgeError>;

/// Unified error type for all sheet-bridge operations
#[derive(Error, Debug, Clone)]
pub enum SheetBridgeError {
    /// Invalid store configuration (empty column list, too many columns,
    /// empty update payload). Raised before any network call.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Query construction failure: placeholder/argument arity mismatch,
    /// unknown column, unsupported argument value.
    #[error("Query error: {0}")]
    Query(String),

    /// An integer left the range a double can represent exactly.
    /// The spreadsheet backend stores every number as a double, so such a
    /// value would silently lose precision in transit.
    #[error(
        "integer is outside the IEEE 754 safe integer range [-(2^53 - 1), 2^53 - 1] \
         and may lose precision"
    )]
    UnsafeInteger,

    /// The backend returned a response that violates the expected shape
    /// (wrong row/column count, non-numeric row index, unknown cell type).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Network or backend failure, propagated unchanged.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Token acquisition or refresh failure.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Payload (de)serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Key-value store lookup miss. An empty or tombstoned value is
    /// normalized to this error as well.
    #[error("key not found")]
    KeyNotFound,
}

impl SheetBridgeError {
    /// Returns true if this error is the key-value store's domain-level miss,
    /// as opposed to a transport or protocol failure.
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, SheetBridgeError::KeyNotFound)
    }

    /// Returns true if the error was raised before any network call was made.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            SheetBridgeError::Config(_)
                | SheetBridgeError::Query(_)
                | SheetBridgeError::UnsafeInteger
        )
    }
}

impl From<serde_json::Error> for SheetBridgeError {
    fn from(err: serde_json::Error) -> Self {
        SheetBridgeError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for SheetBridgeError {
    fn from(err: reqwest::Error) -> Self {
        SheetBridgeError::Http(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_not_found_predicate() {
        assert!(SheetBridgeError::KeyNotFound.is_key_not_found());
        assert!(!SheetBridgeError::Http("boom".to_string()).is_key_not_found());
    }

    #[test]
    fn test_usage_error_predicate() {
        assert!(SheetBridgeError::Config("no columns".to_string()).is_usage_error());
        assert!(SheetBridgeError::UnsafeInteger.is_usage_error());
        assert!(!SheetBridgeError::Protocol("bad shape".to_string()).is_usage_error());
    }

    #[test]
    fn test_display_messages() {
        let err = SheetBridgeError::Query("2 placeholders, 1 argument".to_string());
        assert_eq!(err.to_string(), "Query error: 2 placeholders, 1 argument");
        assert_eq!(SheetBridgeError::KeyNotFound.to_string(), "key not found");
    }
}
