//! Secondary index definitions and order-preserving key encoding.
//!
//! Index entries live in their own sled tree per index. Keys are the encoded
//! indexed field values (followed by the primary key for non-unique
//! indexes); the value is always the encoded primary key of the document.
//!
//! Component format: `[type tag][payload]`, where the payload is chosen so
//! that byte order matches [`compare_values`](crate::document::compare_values)
//! and each component is self-delimiting. Descending components are stored
//! with every byte inverted.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{get_path, Document};

const TAG_NULL: u8 = 0x01;
const TAG_NUMBER: u8 = 0x02;
const TAG_STRING: u8 = 0x03;
const TAG_OBJECT: u8 = 0x04;
const TAG_ARRAY: u8 = 0x05;
const TAG_BOOL: u8 = 0x06;

/// Direction of an index key or sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Declaration of a secondary index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Index name, used by hints.
    pub name: String,
    /// Indexed fields in key order.
    pub keys: Vec<(String, SortOrder)>,
    /// Reject documents whose key already exists.
    pub unique: bool,
}

impl IndexSpec {
    /// Start an index declaration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keys: Vec::new(),
            unique: false,
        }
    }

    /// Add an ascending key field.
    pub fn asc(mut self, field: impl Into<String>) -> Self {
        self.keys.push((field.into(), SortOrder::Asc));
        self
    }

    /// Add a descending key field.
    pub fn desc(mut self, field: impl Into<String>) -> Self {
        self.keys.push((field.into(), SortOrder::Desc));
        self
    }

    /// Mark the index unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// The leading key field.
    pub fn first_field(&self) -> Option<&str> {
        self.keys.first().map(|(f, _)| f.as_str())
    }

    /// Encode the indexed values of a document.
    pub(crate) fn key_values(&self, doc: &Document) -> Vec<u8> {
        let mut key = Vec::new();
        for (field, order) in &self.keys {
            let value = get_path(doc, field).unwrap_or(&Value::Null);
            encode_component(value, *order, &mut key);
        }
        key
    }

    /// Full entry key for a document with the given encoded primary key.
    pub(crate) fn entry_key(&self, doc: &Document, primary: &[u8]) -> Vec<u8> {
        let mut key = self.key_values(doc);
        if !self.unique {
            key.extend_from_slice(primary);
        }
        key
    }

    /// Prefix matching every entry whose leading field equals `value`.
    pub(crate) fn leading_prefix(&self, value: &Value) -> Vec<u8> {
        let order = self
            .keys
            .first()
            .map(|(_, o)| *o)
            .unwrap_or(SortOrder::Asc);
        let mut prefix = Vec::new();
        encode_component(value, order, &mut prefix);
        prefix
    }
}

/// Encode a primary key value.
pub fn encode_primary(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    encode_component(value, SortOrder::Asc, &mut out);
    out
}

/// Append an order-preserving encoding of `value` to `out`.
pub fn encode_component(value: &Value, order: SortOrder, out: &mut Vec<u8>) {
    let start = out.len();
    match value {
        Value::Null => out.push(TAG_NULL),
        Value::Number(n) => {
            out.push(TAG_NUMBER);
            let f = n.as_f64().unwrap_or(0.0);
            out.extend_from_slice(&order_f64(f).to_be_bytes());
        }
        Value::String(s) => {
            out.push(TAG_STRING);
            escape_into(s.as_bytes(), out);
        }
        Value::Object(_) => {
            out.push(TAG_OBJECT);
            escape_into(value.to_string().as_bytes(), out);
        }
        Value::Array(_) => {
            out.push(TAG_ARRAY);
            escape_into(value.to_string().as_bytes(), out);
        }
        Value::Bool(b) => {
            out.push(TAG_BOOL);
            out.push(u8::from(*b));
        }
    }
    if order == SortOrder::Desc {
        for byte in &mut out[start..] {
            *byte = !*byte;
        }
    }
}

/// Map an f64 to a u64 whose unsigned order matches the float order.
fn order_f64(f: f64) -> u64 {
    let bits = f.to_bits();
    if bits >> 63 == 1 {
        !bits
    } else {
        bits | (1 << 63)
    }
}

/// Escape `0x00` bytes and terminate, keeping byte order intact.
fn escape_into(bytes: &[u8], out: &mut Vec<u8>) {
    for &b in bytes {
        if b == 0x00 {
            out.extend_from_slice(&[0x00, 0xFF]);
        } else {
            out.push(b);
        }
    }
    out.extend_from_slice(&[0x00, 0x01]);
}
