//! Shape-checked accessors over `serde_json` values
//!
//! Codec JSON readers all funnel through these helpers so that a value
//! of the wrong JSON type is reported uniformly, with the expected and
//! actual type names spelled out. Hand-written codecs in host code are
//! expected to use them the same way.

use serde_json::{Map, Value};

use crate::error::{SchemaError, SchemaErrorKind};

/// Returns the JSON type name of `value`, as used in error messages.
#[must_use]
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn wrong_type(expected: &'static str, value: &Value) -> SchemaError {
    SchemaError::new(SchemaErrorKind::WrongType {
        expected,
        actual: kind_of(value),
    })
}

/// Interprets `value` as an object.
pub fn expect_object(value: &Value) -> Result<&Map<String, Value>, SchemaError> {
    value.as_object().ok_or_else(|| wrong_type("object", value))
}

/// Interprets `value` as an array.
pub fn expect_array(value: &Value) -> Result<&[Value], SchemaError> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| wrong_type("array", value))
}

/// Interprets `value` as a string.
pub fn expect_str(value: &Value) -> Result<&str, SchemaError> {
    value.as_str().ok_or_else(|| wrong_type("string", value))
}

/// Interprets `value` as a boolean.
pub fn expect_bool(value: &Value) -> Result<bool, SchemaError> {
    value.as_bool().ok_or_else(|| wrong_type("boolean", value))
}

/// Interprets `value` as a signed 32-bit integer, range-checked.
pub fn expect_i32(value: &Value) -> Result<i32, SchemaError> {
    let wide = value.as_i64().ok_or_else(|| wrong_type("number", value))?;
    i32::try_from(wide).map_err(|_| {
        SchemaError::new(SchemaErrorKind::NumberOutOfRange {
            value: wide,
            min: i32::MIN as i64,
            max: i32::MAX as i64,
        })
    })
}

/// Interprets `value` as a double-precision float.
pub fn expect_f64(value: &Value) -> Result<f64, SchemaError> {
    value.as_f64().ok_or_else(|| wrong_type("number", value))
}

/// Interprets `value` as a single-precision float.
pub fn expect_f32(value: &Value) -> Result<f32, SchemaError> {
    expect_f64(value).map(|wide| wide as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wrong_type_names_both_sides() {
        let err = expect_str(&json!(12)).unwrap_err();
        assert_eq!(err.to_string(), "expected string, found number");
    }

    #[test]
    fn i32_read_is_range_checked() {
        assert_eq!(expect_i32(&json!(-7)).unwrap(), -7);
        let err = expect_i32(&json!(4_000_000_000_i64)).unwrap_err();
        assert!(matches!(
            err.kind(),
            SchemaErrorKind::NumberOutOfRange { .. }
        ));
    }

    #[test]
    fn numbers_decode_as_floats() {
        assert_eq!(expect_f64(&json!(1.5)).unwrap(), 1.5);
        assert_eq!(expect_f32(&json!(3)).unwrap(), 3.0);
    }
}
