//! Aggregate functions.
//!
//! With a single argument these fold every row of a group into an
//! [`Accumulator`]. `sum`, `min`, `max`, `average`, `stDev` and `variance`
//! also accept several arguments, in which case they are scalar and fold the
//! arguments of the current row instead.

use super::{Category, FunctionDef, Signature, arg, number, text};
use crate::{
    generator::{AggregateOptions, Accumulator},
    value::Val,
};

/// Which accumulator an aggregate signature uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateKind {
    Count,
    CountGroups,
    CountUnique,
    Sum,
    Min,
    Max,
    Average,
    StDev,
    Variance,
    Distinct,
    Joining,
}

impl AggregateKind {
    /// Options used when the call does not supply them.
    pub fn default_options(&self) -> AggregateOptions {
        match self {
            AggregateKind::Distinct => AggregateOptions {
                delimiter: ", ".to_string(),
                limit: 10,
            },
            _ => AggregateOptions {
                delimiter: String::new(),
                limit: 10,
            },
        }
    }
}

/// Fold a row's arguments with an accumulator, for the scalar overloads.
pub fn fold(kind: AggregateKind, args: &[Val]) -> Val {
    let options = kind.default_options();
    let mut acc = Accumulator::new(kind);
    for val in args {
        acc.add(val, &options);
    }
    acc.value(kind, &options)
}

fn numeric_pair(
    name: &'static str,
    description: &'static str,
    scalar_description: &'static str,
    kind: AggregateKind,
    scalar: super::ScalarFn,
) -> FunctionDef {
    FunctionDef::new(name, Category::Aggregate)
        .signature(Signature::aggregate(vec![number("value")], "double", description, kind))
        .signature(
            Signature::scalar(vec![number("a"), number("b")], "double", scalar_description, scalar)
                .variadic(number("more")),
        )
}

fn listing(name: &'static str, description: &'static str, kind: AggregateKind) -> FunctionDef {
    FunctionDef::new(name, Category::Aggregate)
        .signature(Signature::aggregate(vec![arg("value")], "string", description, kind))
        .signature(Signature::aggregate(
            vec![arg("value"), text("delimiter").constant()],
            "string",
            description,
            kind,
        ))
        .signature(Signature::aggregate(
            vec![
                arg("value"),
                text("delimiter").constant(),
                number("limit").constant(),
            ],
            "string",
            description,
            kind,
        ))
}

pub(crate) fn definitions() -> Vec<FunctionDef> {
    vec![
        FunctionDef::new("count", Category::Aggregate).signature(Signature::aggregate(
            vec![],
            "long",
            "Number of rows in the group",
            AggregateKind::Count,
        )),
        FunctionDef::new("countGroups", Category::Aggregate).signature(Signature::aggregate(
            vec![],
            "long",
            "Number of child groups below the group",
            AggregateKind::CountGroups,
        )),
        FunctionDef::new("countUnique", Category::Aggregate).signature(Signature::aggregate(
            vec![arg("value")],
            "integer",
            "Number of distinct non-null values in the group",
            AggregateKind::CountUnique,
        )),
        numeric_pair(
            "sum",
            "Total of the values in the group",
            "Total of the arguments",
            AggregateKind::Sum,
            |args, _| fold(AggregateKind::Sum, args),
        ),
        FunctionDef::new("min", Category::Aggregate)
            .signature(Signature::aggregate(
                vec![arg("value")],
                "any",
                "Smallest value in the group",
                AggregateKind::Min,
            ))
            .signature(
                Signature::scalar(vec![arg("a"), arg("b")], "any", "Smallest of the arguments", |args, _| {
                    fold(AggregateKind::Min, args)
                })
                .variadic(arg("more")),
            ),
        FunctionDef::new("max", Category::Aggregate)
            .signature(Signature::aggregate(
                vec![arg("value")],
                "any",
                "Largest value in the group",
                AggregateKind::Max,
            ))
            .signature(
                Signature::scalar(vec![arg("a"), arg("b")], "any", "Largest of the arguments", |args, _| {
                    fold(AggregateKind::Max, args)
                })
                .variadic(arg("more")),
            ),
        numeric_pair(
            "average",
            "Mean of the values in the group",
            "Mean of the arguments",
            AggregateKind::Average,
            |args, _| fold(AggregateKind::Average, args),
        )
        .aliases(&["mean"]),
        numeric_pair(
            "stDev",
            "Population standard deviation of the values in the group",
            "Population standard deviation of the arguments",
            AggregateKind::StDev,
            |args, _| fold(AggregateKind::StDev, args),
        ),
        numeric_pair(
            "variance",
            "Population variance of the values in the group",
            "Population variance of the arguments",
            AggregateKind::Variance,
            |args, _| fold(AggregateKind::Variance, args),
        ),
        listing(
            "distinct",
            "Distinct values of the group in sorted order, joined by the delimiter (default ', ') up to the limit (default 10)",
            AggregateKind::Distinct,
        ),
        listing(
            "joining",
            "Lowest values of the group in sorted order, duplicates kept, joined by the delimiter (default '') up to the limit (default 10)",
            AggregateKind::Joining,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_forms() {
        let args = [Val::Double(4.0), Val::Long(2)];
        assert_eq!(fold(AggregateKind::Sum, &args), Val::Double(6.0));
        assert_eq!(fold(AggregateKind::Average, &args), Val::Double(3.0));
        assert_eq!(fold(AggregateKind::Min, &args), Val::Long(2));
        assert_eq!(fold(AggregateKind::Max, &args), Val::Double(4.0));
    }

    #[test]
    fn test_population_variance() {
        let args: Vec<Val> = [600.0, 470.0, 170.0, 430.0, 300.0]
            .into_iter()
            .map(Val::Double)
            .collect();
        let Val::Double(variance) = fold(AggregateKind::Variance, &args) else {
            panic!("expected a double");
        };
        assert!((variance - 21704.0).abs() < 1e-9);
        let Val::Double(st_dev) = fold(AggregateKind::StDev, &args) else {
            panic!("expected a double");
        };
        assert_eq!(st_dev.round(), 147.0);
    }
}
