//! Value codec for the key-value store.

use sheet_bridge_common::{Result, SheetBridgeError};

/// Encodes values into the stored string form and back.
pub trait Codec: Send + Sync {
    fn encode(&self, data: &str) -> String;
    fn decode(&self, data: &str) -> Result<String>;
}

/// Prefixes the raw data with a single marker byte.
///
/// The marker keeps an encoded value from ever being the empty string, which
/// the key-value store reserves as its tombstone, and makes accidental reads
/// of unencoded cells detectable.
pub struct BasicCodec;

const PREFIX: &str = "!";

impl Codec for BasicCodec {
    fn encode(&self, data: &str) -> String {
        format!("{}{}", PREFIX, data)
    }

    fn decode(&self, data: &str) -> Result<String> {
        if data.is_empty() {
            return Err(SheetBridgeError::Serialization(
                "data can't be empty".to_string(),
            ));
        }
        match data.strip_prefix(PREFIX) {
            Some(rest) => Ok(rest.to_string()),
            None => Err(SheetBridgeError::Serialization(
                "malformed data".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_prefixes() {
        assert_eq!(BasicCodec.encode("value"), "!value");
        assert_eq!(BasicCodec.encode(""), "!");
    }

    #[test]
    fn test_round_trip() {
        let encoded = BasicCodec.encode("some payload");
        assert_eq!(BasicCodec.decode(&encoded).unwrap(), "some payload");
    }

    #[test]
    fn test_decode_empty_fails() {
        assert!(BasicCodec.decode("").is_err());
    }

    #[test]
    fn test_decode_unprefixed_fails() {
        assert!(BasicCodec.decode("value").is_err());
    }
}
