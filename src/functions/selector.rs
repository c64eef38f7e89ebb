//! Selection across the child groups of a group.

use super::{Category, FunctionDef, Signature, arg, number, text};
use crate::value::Val;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectorKind {
    Any,
    First,
    Last,
    Nth,
    Top,
    Bottom,
}

/// Options read from the constant arguments of `nth`, `top` and `bottom`.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorOptions {
    /// 1-based position for `nth`
    pub position: usize,
    pub delimiter: String,
    pub limit: usize,
}

impl Default for SelectorOptions {
    fn default() -> Self {
        SelectorOptions {
            position: 1,
            delimiter: ", ".to_string(),
            limit: 10,
        }
    }
}

impl SelectorKind {
    /// Pick from the values of the child groups, in the order supplied.
    ///
    /// `nth` past the end and selection from no children give Null.
    pub fn select(&self, values: &[Val], options: &SelectorOptions) -> Val {
        match self {
            SelectorKind::Any | SelectorKind::First => values.first().cloned().unwrap_or(Val::Null),
            SelectorKind::Last => values.last().cloned().unwrap_or(Val::Null),
            SelectorKind::Nth => options
                .position
                .checked_sub(1)
                .and_then(|i| values.get(i))
                .cloned()
                .unwrap_or(Val::Null),
            SelectorKind::Top => join(values.iter().take(options.limit), &options.delimiter),
            SelectorKind::Bottom => {
                let skip = values.len().saturating_sub(options.limit);
                join(values.iter().skip(skip), &options.delimiter)
            }
        }
    }
}

fn join<'a>(values: impl Iterator<Item = &'a Val>, delimiter: &str) -> Val {
    let mut out = String::new();
    for (i, val) in values.enumerate() {
        if let Val::Error(m) = val {
            return Val::Error(m.clone());
        }
        if i > 0 {
            out.push_str(delimiter);
        }
        out.push_str(&val.to_text());
    }
    Val::String(out)
}

pub(crate) fn definitions() -> Vec<FunctionDef> {
    vec![
        FunctionDef::new("any", Category::Selection).signature(Signature::selector(
            vec![arg("value")],
            "any",
            "Value of any child group, in practice the first",
            SelectorKind::Any,
        )),
        FunctionDef::new("first", Category::Selection).signature(Signature::selector(
            vec![arg("value")],
            "any",
            "Value of the first child group",
            SelectorKind::First,
        )),
        FunctionDef::new("last", Category::Selection).signature(Signature::selector(
            vec![arg("value")],
            "any",
            "Value of the last child group",
            SelectorKind::Last,
        )),
        FunctionDef::new("nth", Category::Selection).signature(Signature::selector(
            vec![arg("value"), number("position").constant()],
            "any",
            "Value of the child group at a 1-based position, null past the end",
            SelectorKind::Nth,
        )),
        FunctionDef::new("top", Category::Selection).signature(Signature::selector(
            vec![
                arg("value"),
                text("delimiter").constant(),
                number("limit").constant(),
            ],
            "string",
            "Values of the first child groups joined by the delimiter",
            SelectorKind::Top,
        )),
        FunctionDef::new("bottom", Category::Selection).signature(Signature::selector(
            vec![
                arg("value"),
                text("delimiter").constant(),
                number("limit").constant(),
            ],
            "string",
            "Values of the last child groups joined by the delimiter",
            SelectorKind::Bottom,
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> Vec<Val> {
        (1..=10).map(|i| Val::Double(f64::from(i))).collect()
    }

    #[test]
    fn test_top_and_bottom() {
        let options = SelectorOptions {
            delimiter: ",".to_string(),
            limit: 3,
            ..SelectorOptions::default()
        };
        assert_eq!(SelectorKind::Top.select(&seeded(), &options), Val::from("1,2,3"));
        assert_eq!(SelectorKind::Bottom.select(&seeded(), &options), Val::from("8,9,10"));
        assert_eq!(SelectorKind::Top.select(&seeded()[..2], &options), Val::from("1,2"));
    }

    #[test]
    fn test_nth_out_of_range() {
        let options = SelectorOptions {
            position: 11,
            ..SelectorOptions::default()
        };
        assert_eq!(SelectorKind::Nth.select(&seeded(), &options), Val::Null);
        let options = SelectorOptions {
            position: 0,
            ..SelectorOptions::default()
        };
        assert_eq!(SelectorKind::Nth.select(&seeded(), &options), Val::Null);
    }

    #[test]
    fn test_empty_children() {
        let options = SelectorOptions::default();
        assert_eq!(SelectorKind::First.select(&[], &options), Val::Null);
        assert_eq!(SelectorKind::Top.select(&[], &options), Val::from(""));
    }
}
