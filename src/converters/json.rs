//! JSON text encoding
//!
//! `serde_json` already leaves `/` and non-ASCII characters unescaped; the
//! pretty form indents with four spaces.

use crate::error::Result;
use crate::value::Value;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

const INDENT: &[u8] = b"    ";

/// Encode a value as pretty-printed JSON
pub fn to_pretty_json(value: &Value) -> Result<String> {
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
    value.serialize(&mut serializer)?;
    Ok(into_string(buf))
}

/// Encode a value as single-line JSON
pub fn to_compact_json(value: &Value) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Parse JSON text back into a value, keeping key order
pub fn from_json(text: &str) -> Result<Value> {
    Ok(serde_json::from_str(text)?)
}

fn into_string(buf: Vec<u8>) -> String {
    // The serializer only ever writes UTF-8.
    String::from_utf8(buf).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}
