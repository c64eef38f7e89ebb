use super::{Category, FunctionDef, Signature, arg};
use crate::value::Val;

pub(crate) fn definitions() -> Vec<FunctionDef> {
    vec![
        cast("toBoolean", "boolean", "Boolean from true/false text or a number", |args, _| {
            convert(&args[0], "boolean", |v| v.to_boolean().map(Val::Boolean))
        }),
        cast("toDouble", "double", "Double from a number or numeric text", |args, _| {
            convert(&args[0], "double", |v| v.to_double().map(Val::Double))
        }),
        cast("toInteger", "integer", "Integer, truncating any fraction", |args, _| {
            convert(&args[0], "integer", |v| v.to_integer().map(Val::Integer))
        }),
        cast("toLong", "long", "Long, truncating any fraction", |args, _| {
            convert(&args[0], "long", |v| v.to_long().map(Val::Long))
        }),
        cast("toString", "string", "Text form of the value", |args, _| {
            convert(&args[0], "string", |v| Some(Val::String(v.to_text())))
        }),
    ]
}

fn cast(name: &'static str, returns: &'static str, description: &'static str, f: super::ScalarFn) -> FunctionDef {
    FunctionDef::new(name, Category::Cast).signature(Signature::scalar(vec![arg("value")], returns, description, f))
}

/// Null stays Null; a value with no view of the target type is an Error.
fn convert(val: &Val, target: &str, view: fn(&Val) -> Option<Val>) -> Val {
    if val.is_null() {
        return Val::Null;
    }
    view(val).unwrap_or_else(|| Val::error(format!("Unable to convert '{}' to {}", val, target)))
}
