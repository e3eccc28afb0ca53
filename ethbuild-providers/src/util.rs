//! JSON-RPC QUANTITY helpers.
//!
//! Quantities arrive either as `0x`-prefixed hex strings, as the wire format
//! mandates, or as bare JSON integers the way configuration files and lenient
//! tooling produce them. All parsers here accept both.

use serde_json::Value;

use crate::errors::{ProviderError, Result};

pub fn quantity_to_u64(value: &Value) -> Result<u64> {
    match value {
        Value::String(s) => {
            let digits = s.strip_prefix("0x").unwrap_or(s);
            u64::from_str_radix(digits, 16)
                .map_err(|_| ProviderError::InvalidQuantity(s.clone()))
        }
        Value::Number(n) => {
            n.as_u64().ok_or_else(|| ProviderError::InvalidQuantity(n.to_string()))
        }
        other => Err(ProviderError::InvalidQuantity(other.to_string())),
    }
}

pub fn quantity_to_u128(value: &Value) -> Result<u128> {
    match value {
        Value::String(s) => {
            let digits = s.strip_prefix("0x").unwrap_or(s);
            u128::from_str_radix(digits, 16)
                .map_err(|_| ProviderError::InvalidQuantity(s.clone()))
        }
        Value::Number(n) => n
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| ProviderError::InvalidQuantity(n.to_string())),
        other => Err(ProviderError::InvalidQuantity(other.to_string())),
    }
}

/// Formats a value as a `0x`-prefixed hex QUANTITY, without leading zeros.
pub fn to_quantity(value: u128) -> String {
    format!("0x{value:x}")
}

/// The transaction object of an `eth_sendTransaction`/`eth_call` request, if
/// the first parameter is an object.
pub(crate) fn transaction_object(params: &mut [Value]) -> Option<&mut serde_json::Map<String, Value>> {
    params.first_mut()?.as_object_mut()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_both_quantity_encodings() {
        assert_eq!(quantity_to_u64(&json!("0x7b")).unwrap(), 123);
        assert_eq!(quantity_to_u64(&json!(123)).unwrap(), 123);
        assert_eq!(quantity_to_u128(&json!("0x0")).unwrap(), 0);
        assert!(quantity_to_u64(&json!("123x")).is_err());
        assert!(quantity_to_u64(&json!(null)).is_err());
        assert!(quantity_to_u64(&json!(-1)).is_err());
    }

    #[test]
    fn formats_without_leading_zeros() {
        assert_eq!(to_quantity(0), "0x0");
        assert_eq!(to_quantity(1645), "0x66d");
    }
}
