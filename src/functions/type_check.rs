//! Type inspection. These functions see Error arguments instead of
//! propagating them.

use super::{Category, FunctionDef, Signature, arg};
use crate::value::{Val, ValType};

pub(crate) fn definitions() -> Vec<FunctionDef> {
    vec![
        check("isNull", "True for null", |args, _| Val::Boolean(args[0].is_null())),
        check("isError", "True for an error", |args, _| Val::Boolean(args[0].is_error())),
        check("isValue", "True for anything other than null or an error", |args, _| {
            Val::Boolean(args[0].is_value())
        }),
        check("isBoolean", "True for a boolean", |args, _| is(&args[0], &[ValType::Boolean])),
        check("isNumber", "True for a double, integer or long", |args, _| {
            Val::Boolean(args[0].is_numeric())
        }),
        check("isString", "True for a string", |args, _| is(&args[0], &[ValType::String])),
        check("isInteger", "True for an integer", |args, _| is(&args[0], &[ValType::Integer])),
        check("isLong", "True for a long", |args, _| is(&args[0], &[ValType::Long])),
        check("isDouble", "True for a double", |args, _| is(&args[0], &[ValType::Double])),
        FunctionDef::new("typeOf", Category::TypeChecking)
            .signature(Signature::scalar(
                vec![arg("value")],
                "string",
                "Name of the value's type",
                |args, _| Val::string(args[0].val_type().name()),
            ))
            .lenient(),
    ]
}

fn check(name: &'static str, description: &'static str, f: super::ScalarFn) -> FunctionDef {
    FunctionDef::new(name, Category::TypeChecking)
        .signature(Signature::scalar(vec![arg("value")], "boolean", description, f))
        .lenient()
}

fn is(val: &Val, types: &[ValType]) -> Val {
    Val::Boolean(types.contains(&val.val_type()))
}
