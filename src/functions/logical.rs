//! Conditions, comparisons and boolean logic, plus the constant-value
//! functions `true()`, `false()`, `null()` and `err()`.

use super::{Category, FunctionDef, Signature, arg, boolean};
use crate::{compare, value::Val};

pub(crate) fn definitions() -> Vec<FunctionDef> {
    vec![
        FunctionDef::new("if", Category::Logical)
            .signature(Signature::scalar(
                vec![boolean("condition"), arg("then"), arg("else")],
                "any",
                "The then value when the condition holds, else the else value",
                |args, _| if_then_else(args),
            ))
            .lenient(),
        FunctionDef::new("not", Category::Logical).signature(Signature::scalar(
            vec![boolean("value")],
            "boolean",
            "Boolean inverse",
            |args, _| not(&args[0]),
        )),
        FunctionDef::new("and", Category::Logical).signature(
            Signature::scalar(
                vec![boolean("a"), boolean("b")],
                "boolean",
                "True when every argument is true",
                |args, _| and(args),
            )
            .variadic(boolean("more")),
        ),
        FunctionDef::new("or", Category::Logical).signature(
            Signature::scalar(
                vec![boolean("a"), boolean("b")],
                "boolean",
                "True when any argument is true",
                |args, _| or(args),
            )
            .variadic(boolean("more")),
        ),
        comparison("equals", "a = b", |args, _| compare::equals(&args[0], &args[1])),
        comparison("notEquals", "a != b", |args, _| {
            compare::compare_with(&args[0], &args[1], |o| o.is_ne())
        }),
        comparison("greaterThan", "a > b", |args, _| {
            compare::compare_with(&args[0], &args[1], |o| o.is_gt())
        }),
        comparison("greaterThanOrEqualTo", "a >= b", |args, _| {
            compare::compare_with(&args[0], &args[1], |o| o.is_ge())
        }),
        comparison("lessThan", "a < b", |args, _| {
            compare::compare_with(&args[0], &args[1], |o| o.is_lt())
        }),
        comparison("lessThanOrEqualTo", "a <= b", |args, _| {
            compare::compare_with(&args[0], &args[1], |o| o.is_le())
        }),
        constant("true", "boolean", "The boolean true", |_, _| Val::Boolean(true)),
        constant("false", "boolean", "The boolean false", |_, _| Val::Boolean(false)),
        constant("null", "null", "The null value", |_, _| Val::Null),
        constant("err", "error", "An error value", |_, _| Val::error("err")),
    ]
}

fn comparison(name: &'static str, description: &'static str, f: super::ScalarFn) -> FunctionDef {
    FunctionDef::new(name, Category::Logical).signature(Signature::scalar(
        vec![arg("a"), arg("b")],
        "boolean",
        description,
        f,
    ))
}

fn constant(
    name: &'static str,
    returns: &'static str,
    description: &'static str,
    f: super::ScalarFn,
) -> FunctionDef {
    FunctionDef::new(name, Category::Value).signature(Signature::scalar(vec![], returns, description, f))
}

fn as_boolean(val: &Val) -> Result<Option<bool>, Val> {
    match val {
        Val::Null => Ok(None),
        Val::Error(m) => Err(Val::Error(m.clone())),
        other => other
            .to_boolean()
            .map(Some)
            .ok_or_else(|| Val::error(format!("Expected a boolean but found '{}'", other))),
    }
}

/// Conjunction. Errors win, then any false, then any null; otherwise true.
pub fn and(args: &[Val]) -> Val {
    logic(args, false)
}

/// Disjunction. Errors win, then any true, then any null; otherwise false.
pub fn or(args: &[Val]) -> Val {
    logic(args, true)
}

/// `decisive` is the value that settles the result on its own.
fn logic(args: &[Val], decisive: bool) -> Val {
    let mut seen_decisive = false;
    let mut seen_null = false;
    for val in args {
        match as_boolean(val) {
            Err(e) => return e,
            Ok(None) => seen_null = true,
            Ok(Some(b)) if b == decisive => seen_decisive = true,
            Ok(Some(_)) => {}
        }
    }
    if seen_decisive {
        Val::Boolean(decisive)
    } else if seen_null {
        Val::Null
    } else {
        Val::Boolean(!decisive)
    }
}

fn not(val: &Val) -> Val {
    match as_boolean(val) {
        Ok(Some(b)) => Val::Boolean(!b),
        Ok(None) => Val::Null,
        Err(e) => e,
    }
}

/// Only the chosen branch's error propagates.
fn if_then_else(args: &[Val]) -> Val {
    match as_boolean(&args[0]) {
        Ok(Some(true)) => args[1].clone(),
        Ok(Some(false)) => args[2].clone(),
        Ok(None) => Val::error("Condition of if is null"),
        Err(e) => e,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_or() {
        let t = Val::Boolean(true);
        let f = Val::Boolean(false);
        assert_eq!(and(&[t.clone(), t.clone()]), t);
        assert_eq!(and(&[t.clone(), f.clone()]), f);
        assert_eq!(and(&[Val::Null, f.clone()]), f);
        assert_eq!(and(&[Val::Null, t.clone()]), Val::Null);
        assert_eq!(or(&[f.clone(), t.clone()]), t);
        assert_eq!(or(&[Val::Null, f.clone()]), Val::Null);
        assert_eq!(or(&[t.clone(), Val::error("x")]), Val::error("x"));
        assert!(and(&[t, Val::from("maybe")]).is_error());
    }

    #[test]
    fn test_if_is_lazy_about_errors() {
        let args = [Val::from("true"), Val::Double(1.0), Val::error("unused")];
        assert_eq!(if_then_else(&args), Val::Double(1.0));
        let args = [Val::Boolean(false), Val::Double(1.0), Val::error("used")];
        assert_eq!(if_then_else(&args), Val::error("used"));
        assert!(if_then_else(&[Val::Null, Val::Null, Val::Null]).is_error());
    }

    #[test]
    fn test_not() {
        assert_eq!(not(&Val::Boolean(true)), Val::Boolean(false));
        assert_eq!(not(&Val::Null), Val::Null);
    }
}
