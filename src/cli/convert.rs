//! JSON <-> Val conversion utilities

use serde_json::{Number, Value};

use crate::Val;

/// Convert a JSON value to a row value.
///
/// Whole numbers become Long, other numbers Double. Arrays and objects have
/// no counterpart and are kept as their JSON text.
pub fn json_to_val(v: Value) -> Val {
    match v {
        Value::Null => Val::Null,
        Value::Bool(b) => Val::Boolean(b),
        Value::Number(n) => match n.as_i64() {
            Some(l) => Val::Long(l),
            None => n.as_f64().map_or(Val::Null, Val::Double),
        },
        Value::String(s) => Val::String(s),
        other @ (Value::Array(_) | Value::Object(_)) => Val::String(other.to_string()),
    }
}

/// Convert a result to JSON. Errors render as `{"error": message}`.
pub fn val_to_json(v: Val) -> Value {
    match v {
        Val::Null => Value::Null,
        Val::Boolean(b) => Value::Bool(b),
        Val::Integer(i) => Value::Number(i.into()),
        Val::Long(l) => Value::Number(l.into()),
        Val::Double(d) => Number::from_f64(d).map_or(Value::Null, Value::Number),
        Val::String(s) => Value::String(s),
        Val::Error(message) => serde_json::json!({ "error": message }),
    }
}
