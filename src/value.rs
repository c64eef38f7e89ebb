use std::fmt;

use serde::{Deserialize, Serialize};

/// A typed value flowing through an expression.
///
/// `Val` is the closed set of values every function and operator consumes and
/// produces. Two of the variants carry special meaning:
///
/// - [`Val::Null`] is "no value". It is not comparable: any comparison that
///   touches it yields an error.
/// - [`Val::Error`] is "computation failed". It is absorbing: any operator or
///   function handed an error returns an error, except the functions that
///   exist to inspect values (`isError`, `typeOf`, ...).
///
/// # Examples
///
/// ```
/// use stroomql::Val;
///
/// let count = Val::Long(3);
/// let mean = Val::Double(2.5);
/// let name = Val::from("web-01");
///
/// assert_eq!(count.to_double(), Some(3.0));
/// assert_eq!(mean.to_string(), "2.5");
/// assert_eq!(name.val_type().name(), "string");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Val {
    Boolean(bool),
    Double(f64),
    Integer(i32),
    Long(i64),
    String(String),
    Null,
    /// Failed computation with a message describing why
    Error(String),
}

/// Type tag of a [`Val`], used for type badges and `typeOf()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValType {
    Boolean,
    Double,
    Integer,
    Long,
    String,
    Null,
    Error,
}

impl ValType {
    pub fn name(&self) -> &'static str {
        match self {
            ValType::Boolean => "boolean",
            ValType::Double => "double",
            ValType::Integer => "integer",
            ValType::Long => "long",
            ValType::String => "string",
            ValType::Null => "null",
            ValType::Error => "error",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ValType::Double | ValType::Integer | ValType::Long)
    }
}

impl fmt::Display for ValType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Val {
    pub fn string(s: impl Into<String>) -> Self {
        Val::String(s.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Val::Error(message.into())
    }

    pub fn val_type(&self) -> ValType {
        match self {
            Val::Boolean(_) => ValType::Boolean,
            Val::Double(_) => ValType::Double,
            Val::Integer(_) => ValType::Integer,
            Val::Long(_) => ValType::Long,
            Val::String(_) => ValType::String,
            Val::Null => ValType::Null,
            Val::Error(_) => ValType::Error,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Val::Null)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Val::Error(_))
    }

    /// Double, Integer or Long
    pub fn is_numeric(&self) -> bool {
        self.val_type().is_numeric()
    }

    /// Anything other than Null or Error
    pub fn is_value(&self) -> bool {
        !matches!(self, Val::Null | Val::Error(_))
    }

    /// Numeric view of the value.
    ///
    /// Booleans become 1/0 and strings are parsed when they hold a plain
    /// decimal number. Null, Error and non-numeric text have no numeric view.
    pub fn to_double(&self) -> Option<f64> {
        match self {
            Val::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Val::Double(d) => Some(*d),
            Val::Integer(i) => Some(f64::from(*i)),
            Val::Long(l) => Some(*l as f64),
            Val::String(s) => parse_number(s),
            Val::Null | Val::Error(_) => None,
        }
    }

    /// Integral view of the value; doubles truncate toward zero.
    pub fn to_long(&self) -> Option<i64> {
        match self {
            Val::Boolean(b) => Some(i64::from(*b)),
            Val::Integer(i) => Some(i64::from(*i)),
            Val::Long(l) => Some(*l),
            Val::Double(d) => double_to_long(*d),
            Val::String(s) => match s.trim().parse::<i64>() {
                Ok(l) => Some(l),
                Err(_) => parse_number(s).and_then(double_to_long),
            },
            Val::Null | Val::Error(_) => None,
        }
    }

    pub fn to_integer(&self) -> Option<i32> {
        self.to_long().and_then(|l| i32::try_from(l).ok())
    }

    /// Boolean view: booleans, the strings `true`/`false` (any case), and
    /// numbers (non-zero is true).
    pub fn to_boolean(&self) -> Option<bool> {
        match self {
            Val::Boolean(b) => Some(*b),
            Val::String(s) => {
                let s = s.trim();
                if s.eq_ignore_ascii_case("true") {
                    Some(true)
                } else if s.eq_ignore_ascii_case("false") {
                    Some(false)
                } else {
                    None
                }
            }
            Val::Double(d) => Some(*d != 0.0),
            Val::Integer(i) => Some(*i != 0),
            Val::Long(l) => Some(*l != 0),
            Val::Null | Val::Error(_) => None,
        }
    }

    /// Text used when the value is concatenated into a string.
    ///
    /// Identical to the `Display` form except that Null contributes nothing.
    pub fn to_text(&self) -> String {
        match self {
            Val::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// The error message, if this is an error.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Val::Error(message) => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Boolean(b) => write!(f, "{}", b),
            Val::Double(d) => f.write_str(&format_double(*d)),
            Val::Integer(i) => write!(f, "{}", i),
            Val::Long(l) => write!(f, "{}", l),
            Val::String(s) => f.write_str(s),
            Val::Null => f.write_str("null"),
            Val::Error(message) => write!(f, "Err: {}", message),
        }
    }
}

impl From<bool> for Val {
    fn from(b: bool) -> Self {
        Val::Boolean(b)
    }
}

impl From<f64> for Val {
    fn from(d: f64) -> Self {
        Val::Double(d)
    }
}

impl From<i32> for Val {
    fn from(i: i32) -> Self {
        Val::Integer(i)
    }
}

impl From<i64> for Val {
    fn from(l: i64) -> Self {
        Val::Long(l)
    }
}

impl From<&str> for Val {
    fn from(s: &str) -> Self {
        Val::String(s.to_string())
    }
}

impl From<String> for Val {
    fn from(s: String) -> Self {
        Val::String(s)
    }
}

/// Render a double the way results are displayed: integral values drop the
/// fraction (`300`, not `300.0`), everything else uses the shortest form that
/// round-trips.
pub fn format_double(d: f64) -> String {
    if d.is_finite() && d.fract() == 0.0 && d.abs() < 1e15 {
        // -0.0 renders as 0
        format!("{}", d as i64)
    } else {
        d.to_string()
    }
}

/// Parse text holding a plain decimal number (`12`, `-3.5`, `1e3`).
///
/// Words that `f64::from_str` would accept, such as `inf` or `NaN`, are not
/// numbers here.
pub fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty()
        || !s.bytes().any(|b| b.is_ascii_digit())
        || !s
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
    {
        return None;
    }
    s.parse::<f64>().ok()
}

fn double_to_long(d: f64) -> Option<i64> {
    if d.is_finite() && d.abs() < 9.2e18 {
        Some(d.trunc() as i64)
    } else {
        None
    }
}
