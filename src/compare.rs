//! Comparison rules.
//!
//! Two orderings live here and they are deliberately kept apart:
//!
//! - [`compare`] is what the comparison operators use. It decides per call:
//!   two values are compared numerically only when both have a numeric view,
//!   otherwise their text is compared lexicographically. Null and Error are
//!   not comparable.
//! - [`total_cmp`] is a total order for sorting and de-duplicating stored
//!   values. Each value maps to one sort key on its own (numeric text keys as
//!   a number, other text as text), so mixing numeric-looking and other text
//!   cannot break transitivity.

use std::cmp::Ordering;

use crate::value::{Val, parse_number};

/// Compare two values for an operator.
///
/// Returns the error value to propagate when the pair is not comparable.
pub fn compare(left: &Val, right: &Val) -> Result<Ordering, Val> {
    match (left, right) {
        (Val::Error(m), _) | (_, Val::Error(m)) => Err(Val::Error(m.clone())),
        (Val::Null, _) | (_, Val::Null) => Err(Val::error("Unable to compare null values")),

        (Val::Boolean(a), Val::Boolean(b)) => Ok(a.cmp(b)),

        (Val::String(a), Val::String(b)) => match (parse_number(a), parse_number(b)) {
            (Some(x), Some(y)) => compare_doubles(x, y),
            _ => Ok(a.as_str().cmp(b.as_str())),
        },

        // Booleans read as text against strings and as 1/0 against numbers
        (Val::Boolean(a), Val::String(b)) => Ok(bool_text(*a).cmp(b.as_str())),
        (Val::String(a), Val::Boolean(b)) => Ok(a.as_str().cmp(bool_text(*b))),

        (Val::String(s), n) => match parse_number(s) {
            Some(x) => compare_numbers(&Val::Double(x), n),
            None => Ok(s.as_str().cmp(n.to_string().as_str())),
        },
        (n, Val::String(s)) => match parse_number(s) {
            Some(y) => compare_numbers(n, &Val::Double(y)),
            None => Ok(n.to_string().as_str().cmp(s.as_str())),
        },

        (a, b) => compare_numbers(a, b),
    }
}

/// Equality as seen by `=`: any pair that `compare` orders as equal.
pub fn equals(left: &Val, right: &Val) -> Val {
    compare(left, right).map_or_else(|e| e, |o| Val::Boolean(o == Ordering::Equal))
}

/// Apply a comparison and turn the ordering into a boolean.
pub fn compare_with(left: &Val, right: &Val, test: fn(Ordering) -> bool) -> Val {
    compare(left, right).map_or_else(|e| e, |o| Val::Boolean(test(o)))
}

fn bool_text(b: bool) -> &'static str {
    if b { "true" } else { "false" }
}

/// Both sides are Boolean/Integer/Long/Double here.
fn compare_numbers(left: &Val, right: &Val) -> Result<Ordering, Val> {
    if let (Some(a), Some(b)) = (integral(left), integral(right)) {
        return Ok(a.cmp(&b));
    }
    match (left.to_double(), right.to_double()) {
        (Some(a), Some(b)) => compare_doubles(a, b),
        _ => Err(Val::error(format!(
            "Unable to compare {} with {}",
            left.val_type(),
            right.val_type()
        ))),
    }
}

fn compare_doubles(a: f64, b: f64) -> Result<Ordering, Val> {
    a.partial_cmp(&b)
        .ok_or_else(|| Val::error("Unable to compare NaN"))
}

fn integral(val: &Val) -> Option<i64> {
    match val {
        Val::Boolean(b) => Some(i64::from(*b)),
        Val::Integer(i) => Some(i64::from(*i)),
        Val::Long(l) => Some(*l),
        _ => None,
    }
}

/// Sort key of a value. Every value maps to exactly one key, independent of
/// what it is compared with, which keeps [`total_cmp`] transitive.
enum SortKey<'a> {
    Boolean(bool),
    Int(i64),
    Float(f64),
    Text(&'a str),
    Null,
    Error(&'a str),
}

impl SortKey<'_> {
    fn rank(&self) -> u8 {
        match self {
            SortKey::Boolean(_) => 0,
            SortKey::Int(_) | SortKey::Float(_) => 1,
            SortKey::Text(_) => 2,
            SortKey::Null => 3,
            SortKey::Error(_) => 4,
        }
    }
}

fn sort_key(val: &Val) -> SortKey<'_> {
    match val {
        Val::Boolean(b) => SortKey::Boolean(*b),
        Val::Integer(i) => SortKey::Int(i64::from(*i)),
        Val::Long(l) => SortKey::Int(*l),
        Val::Double(d) => SortKey::Float(float_key(*d)),
        // Text holding a number sorts with the numbers
        Val::String(s) => match parse_number(s) {
            Some(d) => SortKey::Float(float_key(d)),
            None => SortKey::Text(s),
        },
        Val::Null => SortKey::Null,
        Val::Error(m) => SortKey::Error(m),
    }
}

/// One key per numeric value: both zeros are 0 and every NaN is the same NaN.
fn float_key(d: f64) -> f64 {
    if d == 0.0 {
        0.0
    } else if d.is_nan() {
        f64::NAN
    } else {
        d
    }
}

/// Exact comparison of an integer with a double; NaN sorts last.
fn cmp_int_float(i: i64, f: f64) -> Ordering {
    if f.is_nan() || f >= 9_223_372_036_854_775_808.0 {
        return Ordering::Less;
    }
    if f < -9_223_372_036_854_775_808.0 {
        return Ordering::Greater;
    }
    let whole = f.trunc() as i64;
    match i.cmp(&whole) {
        Ordering::Equal => 0.0_f64.total_cmp(&(f - f.trunc())),
        other => other,
    }
}

/// Total order over all values: booleans, then numbers (including numeric
/// text), then other text, then null, then errors.
pub fn total_cmp(left: &Val, right: &Val) -> Ordering {
    match (sort_key(left), sort_key(right)) {
        (SortKey::Boolean(a), SortKey::Boolean(b)) => a.cmp(&b),
        (SortKey::Int(a), SortKey::Int(b)) => a.cmp(&b),
        (SortKey::Float(a), SortKey::Float(b)) => a.total_cmp(&b),
        (SortKey::Int(a), SortKey::Float(b)) => cmp_int_float(a, b),
        (SortKey::Float(a), SortKey::Int(b)) => cmp_int_float(b, a).reverse(),
        (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
        (SortKey::Error(a), SortKey::Error(b)) => a.cmp(b),
        (a, b) => a.rank().cmp(&b.rank()),
    }
}

/// [`total_cmp`] refined so that distinct values it calls equal, such as
/// `Integer(2)`, `Double(2.0)` and `"2"`, still have a fixed order: by type,
/// then by display text.
pub fn canonical_cmp(left: &Val, right: &Val) -> Ordering {
    total_cmp(left, right)
        .then_with(|| type_rank(left).cmp(&type_rank(right)))
        .then_with(|| left.to_text().cmp(&right.to_text()))
}

fn type_rank(val: &Val) -> u8 {
    match val {
        Val::Boolean(_) => 0,
        Val::Integer(_) => 1,
        Val::Long(_) => 2,
        Val::Double(_) => 3,
        Val::String(_) => 4,
        Val::Null => 5,
        Val::Error(_) => 6,
    }
}

/// A [`Val`] ordered by [`total_cmp`], for use as a set or map key.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OrderedVal(pub Val);

impl PartialEq for OrderedVal {
    fn eq(&self, other: &Self) -> bool {
        total_cmp(&self.0, &other.0) == Ordering::Equal
    }
}

impl Eq for OrderedVal {}

impl PartialOrd for OrderedVal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedVal {
    fn cmp(&self, other: &Self) -> Ordering {
        total_cmp(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_promotion() {
        assert_eq!(compare(&Val::Integer(2), &Val::Long(2)), Ok(Ordering::Equal));
        assert_eq!(compare(&Val::Long(3), &Val::Double(2.5)), Ok(Ordering::Greater));
        assert_eq!(compare(&Val::Boolean(true), &Val::Double(1.0)), Ok(Ordering::Equal));
    }

    #[test]
    fn test_strings_numeric_only_when_both_parse() {
        assert_eq!(compare(&Val::from("10"), &Val::from("9")), Ok(Ordering::Greater));
        assert_eq!(compare(&Val::from("10"), &Val::from("9a")), Ok(Ordering::Less));
        assert_eq!(compare(&Val::Long(2), &Val::from("1")), Ok(Ordering::Greater));
        assert_eq!(compare(&Val::from("AAA"), &Val::from("1")), Ok(Ordering::Greater));
        assert_eq!(compare(&Val::Boolean(true), &Val::from("true")), Ok(Ordering::Equal));
    }

    #[test]
    fn test_null_and_error_are_not_comparable() {
        assert!(equals(&Val::Null, &Val::Null).is_error());
        assert!(equals(&Val::Null, &Val::Long(1)).is_error());
        assert_eq!(
            equals(&Val::error("boom"), &Val::Long(1)),
            Val::error("boom")
        );
    }

    #[test]
    fn test_total_order_is_transitive_across_kinds() {
        // Under a numeric-if-either-parses rule these three form a cycle
        let values = [
            Val::from("2"),
            Val::from("10"),
            Val::from("1a"),
            Val::Double(-0.0),
            Val::Double(0.0),
            Val::Long(0),
            Val::from("-0"),
            Val::Double(f64::NAN),
            Val::Double(-f64::NAN),
            Val::Long(i64::MAX),
        ];
        for a in &values {
            for b in &values {
                for c in &values {
                    if total_cmp(a, b) != Ordering::Greater && total_cmp(b, c) != Ordering::Greater {
                        assert_ne!(total_cmp(a, c), Ordering::Greater, "{a:?} {b:?} {c:?}");
                    }
                    if total_cmp(a, b) == Ordering::Equal && total_cmp(b, c) == Ordering::Equal {
                        assert_eq!(total_cmp(a, c), Ordering::Equal, "{a:?} {b:?} {c:?}");
                    }
                }
            }
        }
        assert_eq!(total_cmp(&Val::Double(-0.0), &Val::Double(0.0)), Ordering::Equal);
        assert_eq!(total_cmp(&Val::Double(f64::NAN), &Val::Double(-f64::NAN)), Ordering::Equal);
        assert_eq!(total_cmp(&Val::Long(5), &Val::from("1")), Ordering::Greater);
        assert_eq!(total_cmp(&Val::Long(5), &Val::from("a")), Ordering::Less);
        assert_eq!(total_cmp(&Val::Long(2), &Val::Double(2.5)), Ordering::Less);
        assert_eq!(total_cmp(&Val::Double(2.0), &Val::Integer(2)), Ordering::Equal);
        assert_eq!(total_cmp(&Val::Null, &Val::error("x")), Ordering::Less);
    }

    #[test]
    fn test_canonical_order_breaks_ties() {
        let tied = [Val::from("2.0"), Val::Double(2.0), Val::from("2"), Val::Integer(2)];
        let mut forward = tied.to_vec();
        forward.sort_by(canonical_cmp);
        let mut reverse: Vec<Val> = tied.iter().rev().cloned().collect();
        reverse.sort_by(canonical_cmp);
        assert_eq!(forward, reverse);
        assert_eq!(forward[0], Val::Integer(2));
        assert_eq!(canonical_cmp(&Val::Long(1), &Val::Double(2.0)), Ordering::Less);
    }
}
