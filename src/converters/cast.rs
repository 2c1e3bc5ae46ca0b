//! Scalar type inference for text content
//!
//! Trimmed element text becomes a boolean, integer, float, string, or null.
//! CDATA mode turns inference off entirely.

use crate::value::Value;
use once_cell::sync::Lazy;
use regex::Regex;

/// Numeric strings: optional sign, digits with optional fraction, optional exponent
static NUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").expect("static regex"));

/// Integers whose leading zero is significant (postal codes, identifiers)
static LEADING_ZERO: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0[0-9]+$").expect("static regex"));

/// Whether `text` looks like a number
pub fn is_numeric(text: &str) -> bool {
    NUMERIC.is_match(text)
}

/// Convert text into a typed scalar
///
/// With `is_cdata` the text is returned verbatim as a string. Otherwise:
/// empty text is `Null`, `true`/`false` (any case) are booleans, numbers
/// become `Int` or `Float` (a `.` forces `Float`), and numbers with a
/// significant leading zero such as `010` stay strings. Never fails.
pub fn auto_cast(text: &str, is_cdata: bool) -> Value {
    if is_cdata {
        return Value::String(text.to_string());
    }

    if text.is_empty() {
        return Value::Null;
    }

    if text.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if text.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }

    if is_numeric(text) {
        if LEADING_ZERO.is_match(text) {
            return Value::String(text.to_string());
        }
        if let Some(number) = cast_number(text) {
            return number;
        }
    }

    Value::String(text.to_string())
}

fn cast_number(text: &str) -> Option<Value> {
    if text.contains('.') {
        return finite_float(text);
    }

    if let Ok(int) = text.parse::<i64>() {
        return Some(Value::Int(int));
    }

    // Exponent forms and integers beyond i64
    let float = text.parse::<f64>().ok().filter(|f| f.is_finite())?;
    let has_exponent = text.contains(['e', 'E']);
    if has_exponent && float.fract() == 0.0 && float.abs() < i64::MAX as f64 {
        Some(Value::Int(float as i64))
    } else {
        Some(Value::Float(float))
    }
}

fn finite_float(text: &str) -> Option<Value> {
    text.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(Value::Float)
}
