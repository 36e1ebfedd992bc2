//! Evaluation stack decoding
//!
//! The node returns each stack entry as `{"type": "...", "value": ...}`.
//! Only `ByteArray` entries are decoded; every other tag becomes an explicit
//! [`StackValue::Ignored`] slot so results stay positionally aligned with the
//! calls that produced them.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// Tag of the only entry type the lock proxy contracts return
pub const BYTE_ARRAY: &str = "ByteArray";

/// Raw stack entry as returned by `invokescript`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackItem {
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl StackItem {
    pub fn byte_array(hex_value: impl Into<String>) -> Self {
        Self {
            item_type: BYTE_ARRAY.to_string(),
            value: serde_json::Value::String(hex_value.into()),
        }
    }

    pub fn integer(value: impl ToString) -> Self {
        Self {
            item_type: "Integer".to_string(),
            value: serde_json::Value::String(value.to_string()),
        }
    }
}

/// Decoded slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackValue {
    Bytes(Vec<u8>),
    /// Entry with a tag other than `ByteArray`, or a payload that is not hex
    Ignored(String),
}

impl StackValue {
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            StackValue::Bytes(b) => Some(b),
            StackValue::Ignored(_) => None,
        }
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, StackValue::Ignored(_))
    }

    /// Unsigned little-endian integer; ignored slots read as zero
    pub fn to_biguint(&self) -> BigUint {
        self.as_bytes()
            .map(BigUint::from_bytes_le)
            .unwrap_or_default()
    }

    /// Payload as hex, exactly as the contract stored it; ignored slots are ""
    pub fn to_hex(&self) -> String {
        self.as_bytes().map(hex::encode).unwrap_or_default()
    }
}

/// Decode one entry
pub fn decode_item(item: &StackItem) -> StackValue {
    if item.item_type != BYTE_ARRAY {
        return StackValue::Ignored(item.item_type.clone());
    }
    match item.value.as_str() {
        Some(s) => match hex::decode(s) {
            Ok(bytes) => StackValue::Bytes(bytes),
            Err(_) => StackValue::Ignored(format!("{}(non-hex)", BYTE_ARRAY)),
        },
        None => StackValue::Ignored(format!("{}(non-string)", BYTE_ARRAY)),
    }
}

/// Decode into exactly `expected` slots. Missing entries are ignored slots;
/// surplus entries are dropped.
pub fn decode_positional(stack: &[StackItem], expected: usize) -> Vec<StackValue> {
    (0..expected)
        .map(|i| match stack.get(i) {
            Some(item) => decode_item(item),
            None => StackValue::Ignored("<missing>".to_string()),
        })
        .collect()
}

/// First decodable `ByteArray` entry, if any
pub fn first_bytes(stack: &[StackItem]) -> Option<Vec<u8>> {
    stack.iter().find_map(|item| match decode_item(item) {
        StackValue::Bytes(b) => Some(b),
        StackValue::Ignored(_) => None,
    })
}

/// Encode an unsigned integer the way the VM stores it (little-endian, empty for zero)
pub fn encode_biguint(n: &BigUint) -> Vec<u8> {
    if n.bits() == 0 {
        Vec::new()
    } else {
        n.to_bytes_le()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(n: BigUint) {
        let item = StackItem::byte_array(hex::encode(encode_biguint(&n)));
        assert_eq!(decode_item(&item).to_biguint(), n);
    }

    #[test]
    fn test_balance_roundtrip() {
        roundtrip(BigUint::from(0u32));
        roundtrip(BigUint::from(1u32));
        roundtrip(BigUint::from(u64::MAX));
    }

    #[test]
    fn test_empty_bytes_is_zero() {
        let item = StackItem::byte_array("");
        assert_eq!(decode_item(&item), StackValue::Bytes(vec![]));
        assert_eq!(decode_item(&item).to_biguint(), BigUint::from(0u32));
    }

    #[test]
    fn test_little_endian() {
        let item = StackItem::byte_array("0001");
        assert_eq!(decode_item(&item).to_biguint(), BigUint::from(256u32));
    }

    #[test]
    fn test_non_byte_array_is_ignored() {
        let item = StackItem::integer(5);
        let value = decode_item(&item);
        assert_eq!(value, StackValue::Ignored("Integer".to_string()));
        assert_eq!(value.to_biguint(), BigUint::from(0u32));
        assert_eq!(value.to_hex(), "");
    }

    #[test]
    fn test_positional_alignment() {
        let stack = vec![
            StackItem::byte_array("05"),
            StackItem::integer(9),
            StackItem::byte_array("0a"),
        ];
        let decoded = decode_positional(&stack, 3);
        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded[0].to_biguint(), BigUint::from(5u32));
        assert!(decoded[1].is_ignored());
        assert_eq!(decoded[2].to_biguint(), BigUint::from(10u32));

        let short = decode_positional(&stack[..1], 3);
        assert_eq!(short.len(), 3);
        assert!(short[2].is_ignored());

        let long = decode_positional(&stack, 2);
        assert_eq!(long.len(), 2);
    }

    #[test]
    fn test_first_bytes_skips_other_tags() {
        let stack = vec![StackItem::integer(1), StackItem::byte_array("abcd")];
        assert_eq!(first_bytes(&stack), Some(vec![0xab, 0xcd]));
        assert_eq!(first_bytes(&[StackItem::integer(1)]), None);
    }

    #[test]
    fn test_deserialize_rpc_shape() {
        let json = r#"[{"type":"ByteArray","value":"0102"},{"type":"Boolean","value":true}]"#;
        let stack: Vec<StackItem> = serde_json::from_str(json).unwrap();
        assert_eq!(decode_item(&stack[0]), StackValue::Bytes(vec![1, 2]));
        assert!(decode_item(&stack[1]).is_ignored());
    }
}
