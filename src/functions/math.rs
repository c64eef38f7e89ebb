//! Arithmetic and rounding.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};

use super::{Category, FunctionDef, Signature, arg, number, number_arg};
use crate::value::{Val, parse_number};

pub(crate) fn definitions() -> Vec<FunctionDef> {
    vec![
        FunctionDef::new("add", Category::Mathematics).signature(
            Signature::scalar(vec![arg("a"), arg("b")], "number or text", "Sum of the arguments, or their concatenation when any is text", |args, _| {
                fold_binary(args, add)
            })
            .variadic(arg("more")),
        ),
        FunctionDef::new("subtract", Category::Mathematics).signature(
            Signature::scalar(vec![number("a"), number("b")], "number", "Each argument subtracted in turn from the first", |args, _| {
                fold_binary(args, subtract)
            })
            .variadic(number("more")),
        ),
        FunctionDef::new("multiply", Category::Mathematics).signature(
            Signature::scalar(vec![number("a"), number("b")], "number", "Product of the arguments", |args, _| {
                fold_binary(args, multiply)
            })
            .variadic(number("more")),
        ),
        FunctionDef::new("divide", Category::Mathematics).signature(
            Signature::scalar(vec![number("a"), number("b")], "double", "The first argument divided by each of the others in turn", |args, _| {
                fold_binary(args, divide)
            })
            .variadic(number("more")),
        ),
        FunctionDef::new("modulus", Category::Mathematics)
            .aliases(&["mod"])
            .signature(Signature::scalar(
                vec![number("a"), number("b")],
                "number",
                "Remainder of dividing a by b",
                |args, _| modulus(&args[0], &args[1]),
            )),
        FunctionDef::new("power", Category::Mathematics)
            .aliases(&["pow"])
            .signature(Signature::scalar(
                vec![number("base"), number("exponent")],
                "double",
                "base raised to the power of exponent",
                |args, _| power(&args[0], &args[1]),
            )),
        FunctionDef::new("negate", Category::Mathematics).signature(Signature::scalar(
            vec![number("value")],
            "number",
            "The value with its sign flipped",
            |args, _| negate(&args[0]),
        )),
        FunctionDef::new("round", Category::Mathematics)
            .signature(Signature::scalar(
                vec![number("value")],
                "double",
                "Round to the nearest whole number, halves away from zero",
                |args, _| round_with(args, RoundingStrategy::MidpointAwayFromZero),
            ))
            .signature(Signature::scalar(
                vec![number("value"), number("places")],
                "double",
                "Round to a number of decimal places, halves away from zero",
                |args, _| round_with(args, RoundingStrategy::MidpointAwayFromZero),
            )),
        FunctionDef::new("floor", Category::Mathematics)
            .signature(Signature::scalar(
                vec![number("value")],
                "double",
                "Round down to a whole number",
                |args, _| round_with(args, RoundingStrategy::ToNegativeInfinity),
            ))
            .signature(Signature::scalar(
                vec![number("value"), number("places")],
                "double",
                "Round down to a number of decimal places",
                |args, _| round_with(args, RoundingStrategy::ToNegativeInfinity),
            )),
        FunctionDef::new("ceiling", Category::Mathematics)
            .signature(Signature::scalar(
                vec![number("value")],
                "double",
                "Round up to a whole number",
                |args, _| round_with(args, RoundingStrategy::ToPositiveInfinity),
            ))
            .signature(Signature::scalar(
                vec![number("value"), number("places")],
                "double",
                "Round up to a number of decimal places",
                |args, _| round_with(args, RoundingStrategy::ToPositiveInfinity),
            )),
    ]
}

fn fold_binary(args: &[Val], op: fn(&Val, &Val) -> Val) -> Val {
    let mut iter = args.iter();
    let Some(first) = iter.next() else {
        return Val::Null;
    };
    iter.fold(first.clone(), |acc, v| op(&acc, v))
}

/// Operand of a numeric operator.
#[derive(Debug, Clone, Copy)]
enum Num {
    /// Integral value; `true` when it came from a Long
    Int(i64, bool),
    Float(f64),
}

/// Classify an operand. `Ok(None)` means Null; `Err` carries the error to
/// return.
fn num(val: &Val) -> Result<Option<Num>, Val> {
    match val {
        Val::Error(m) => Err(Val::Error(m.clone())),
        Val::Null => Ok(None),
        Val::Integer(i) => Ok(Some(Num::Int(i64::from(*i), false))),
        Val::Long(l) => Ok(Some(Num::Int(*l, true))),
        Val::Double(d) => Ok(Some(Num::Float(*d))),
        Val::Boolean(b) => Ok(Some(Num::Float(if *b { 1.0 } else { 0.0 }))),
        Val::String(s) => parse_number(s)
            .map(|d| Some(Num::Float(d)))
            .ok_or_else(|| Val::error(format!("Expected a number but found '{}'", s))),
    }
}

impl Num {
    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i, _) => i as f64,
            Num::Float(d) => d,
        }
    }
}

fn integral_result(value: i64, long: bool) -> Val {
    if long {
        return Val::Long(value);
    }
    match i32::try_from(value) {
        Ok(i) => Val::Integer(i),
        Err(_) => Val::Long(value),
    }
}

/// Apply a numeric operator: integral operands stay integral unless the
/// checked operation overflows, then the result is a Double.
fn arithmetic(
    left: &Val,
    right: &Val,
    checked: fn(i64, i64) -> Option<i64>,
    float: fn(f64, f64) -> f64,
) -> Val {
    let (l, r) = match (num(left), num(right)) {
        (Err(e), _) | (_, Err(e)) => return e,
        (Ok(None), _) | (_, Ok(None)) => return Val::Null,
        (Ok(Some(l)), Ok(Some(r))) => (l, r),
    };
    match (l, r) {
        (Num::Int(a, la), Num::Int(b, lb)) => match checked(a, b) {
            Some(v) => integral_result(v, la || lb),
            None => Val::Double(float(a as f64, b as f64)),
        },
        _ => Val::Double(float(l.as_f64(), r.as_f64())),
    }
}

/// `+`: concatenates when either side is text, otherwise adds.
pub fn add(left: &Val, right: &Val) -> Val {
    match (left, right) {
        (Val::Error(m), _) | (_, Val::Error(m)) => Val::Error(m.clone()),
        (Val::Null, Val::Null) => Val::Null,
        (Val::String(_), _) | (_, Val::String(_)) => {
            Val::String(format!("{}{}", left.to_text(), right.to_text()))
        }
        _ => arithmetic(left, right, i64::checked_add, |a, b| a + b),
    }
}

pub fn subtract(left: &Val, right: &Val) -> Val {
    arithmetic(left, right, i64::checked_sub, |a, b| a - b)
}

pub fn multiply(left: &Val, right: &Val) -> Val {
    arithmetic(left, right, i64::checked_mul, |a, b| a * b)
}

/// `/` always yields a Double; dividing by zero is an error.
pub fn divide(left: &Val, right: &Val) -> Val {
    let (l, r) = match (num(left), num(right)) {
        (Err(e), _) | (_, Err(e)) => return e,
        (Ok(None), _) | (_, Ok(None)) => return Val::Null,
        (Ok(Some(l)), Ok(Some(r))) => (l.as_f64(), r.as_f64()),
    };
    if r == 0.0 {
        return Val::error("Division by zero");
    }
    Val::Double(l / r)
}

pub fn modulus(left: &Val, right: &Val) -> Val {
    if let (Ok(Some(_)), Ok(Some(r))) = (num(left), num(right)) {
        if r.as_f64() == 0.0 {
            return Val::error("Division by zero");
        }
    }
    arithmetic(left, right, i64::checked_rem, |a, b| a % b)
}

pub fn power(left: &Val, right: &Val) -> Val {
    match (num(left), num(right)) {
        (Err(e), _) | (_, Err(e)) => e,
        (Ok(None), _) | (_, Ok(None)) => Val::Null,
        (Ok(Some(l)), Ok(Some(r))) => Val::Double(l.as_f64().powf(r.as_f64())),
    }
}

/// Unary minus.
pub fn negate(val: &Val) -> Val {
    match num(val) {
        Err(e) => e,
        Ok(None) => Val::Null,
        Ok(Some(Num::Int(i, long))) => match i.checked_neg() {
            Some(n) => integral_result(n, long),
            None => Val::Double(-(i as f64)),
        },
        Ok(Some(Num::Float(d))) => Val::Double(-d),
    }
}

fn round_with(args: &[Val], strategy: RoundingStrategy) -> Val {
    let value = match number_arg(args, 0) {
        Err(e) => return e,
        Ok(None) => return Val::Null,
        Ok(Some(v)) => v,
    };
    let places = match number_arg(args, 1) {
        Err(e) => return e,
        Ok(p) => p.unwrap_or(0.0) as i32,
    };
    Val::Double(round_places(value, places, strategy))
}

/// Round using decimal arithmetic so that `3.8655` to 2 places is `3.87`,
/// falling back to binary floating point outside the decimal range.
pub(crate) fn round_places(value: f64, places: i32, strategy: RoundingStrategy) -> f64 {
    if places >= 0 {
        if let Ok(d) = Decimal::from_str(&value.to_string()) {
            if let Some(r) = d.round_dp_with_strategy(places as u32, strategy).to_f64() {
                return r;
            }
        }
    }
    let apply = |x: f64| match strategy {
        RoundingStrategy::ToNegativeInfinity => x.floor(),
        RoundingStrategy::ToPositiveInfinity => x.ceil(),
        _ => x.round(),
    };
    if places >= 0 {
        let scale = 10f64.powi(places);
        apply(value * scale) / scale
    } else {
        let scale = 10f64.powi(-places);
        apply(value / scale) * scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integral_arithmetic_stays_integral() {
        assert_eq!(add(&Val::Integer(2), &Val::Integer(3)), Val::Integer(5));
        assert_eq!(add(&Val::Integer(2), &Val::Long(3)), Val::Long(5));
        assert_eq!(
            multiply(&Val::Integer(i32::MAX), &Val::Integer(2)),
            Val::Long(i64::from(i32::MAX) * 2)
        );
        assert_eq!(
            add(&Val::Long(i64::MAX), &Val::Long(1)),
            Val::Double(i64::MAX as f64 + 1.0)
        );
    }

    #[test]
    fn test_division() {
        assert_eq!(divide(&Val::Integer(7), &Val::Integer(2)), Val::Double(3.5));
        assert!(divide(&Val::Double(8.0), &Val::Double(0.0)).is_error());
        assert!(modulus(&Val::Long(8), &Val::Long(0)).is_error());
        assert_eq!(modulus(&Val::Long(8), &Val::Long(3)), Val::Long(2));
    }

    #[test]
    fn test_add_concatenates_text() {
        assert_eq!(add(&Val::from("a"), &Val::Double(1.0)), Val::from("a1"));
        assert_eq!(add(&Val::Null, &Val::from("test")), Val::from("test"));
        assert_eq!(add(&Val::Null, &Val::Null), Val::Null);
        assert_eq!(add(&Val::Null, &Val::Double(1.0)), Val::Null);
    }

    #[test]
    fn test_non_numeric_text_is_an_error() {
        assert!(subtract(&Val::from("abc"), &Val::Double(1.0)).is_error());
        assert_eq!(subtract(&Val::from("5"), &Val::Double(1.0)), Val::Double(4.0));
    }

    #[test]
    fn test_negate() {
        assert_eq!(negate(&Val::Integer(3)), Val::Integer(-3));
        assert_eq!(negate(&Val::Integer(i32::MIN)), Val::Long(-(i64::from(i32::MIN))));
        assert_eq!(negate(&Val::Double(2.5)), Val::Double(-2.5));
        assert_eq!(negate(&Val::Null), Val::Null);
    }

    #[test]
    fn test_round_places() {
        assert_eq!(round_places(3.8655, 2, RoundingStrategy::MidpointAwayFromZero), 3.87);
        assert_eq!(round_places(3.8655, 2, RoundingStrategy::ToNegativeInfinity), 3.86);
        assert_eq!(round_places(1.005, 2, RoundingStrategy::MidpointAwayFromZero), 1.01);
        assert_eq!(round_places(1234.0, -2, RoundingStrategy::MidpointAwayFromZero), 1200.0);
        assert_eq!(round_places(-2.5, 0, RoundingStrategy::MidpointAwayFromZero), -3.0);
    }
}
