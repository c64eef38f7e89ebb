//! Built-in function catalogue.
//!
//! Every function is described by a [`FunctionDef`]: its name, aliases,
//! documentation category and one or more [`Signature`]s. A signature pairs
//! an argument shape with its implementation, so overloads can differ in
//! kind: `min(${v})` aggregates across rows while `min(${v}, 10)` is a
//! per-row scalar.
//!
//! The parser resolves calls through [`registry()`]; the CLI renders help
//! pages from the same metadata.

mod aggregate;
mod cast;
mod date;
mod hash;
pub mod logical;
pub mod math;
mod param;
mod selector;
mod string;
mod type_check;
mod uri;

use std::{collections::BTreeMap, collections::HashMap, fmt};

use once_cell::sync::Lazy;
use tracing::warn;

use crate::{context::ExpressionContext, value::Val};

pub use aggregate::{AggregateKind, fold};
pub use selector::{SelectorKind, SelectorOptions};

/// Everything a scalar function may consult besides its arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalEnv {
    /// Values for `param('key')`, set through
    /// [`Expression::set_static_mapped_values`](crate::Expression::set_static_mapped_values)
    pub params: BTreeMap<String, String>,
    pub context: ExpressionContext,
}

/// Per-row implementation of a scalar function.
pub type ScalarFn = fn(&[Val], &EvalEnv) -> Val;

/// How a signature is evaluated.
#[derive(Debug, Clone, Copy)]
pub enum Impl {
    Scalar(ScalarFn),
    Aggregate(AggregateKind),
    Selector(SelectorKind),
}

/// Evaluation class of a function signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// Pure function of its arguments for the current row
    Scalar,
    /// Folds every row into an accumulator; mergeable across partial groups
    Aggregate,
    /// Chooses among the generators of sibling groups
    Selector,
}

/// Documentation grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Aggregate,
    Cast,
    Date,
    Logical,
    Mathematics,
    Param,
    Selection,
    String,
    TypeChecking,
    Uri,
    Value,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::Aggregate,
        Category::Cast,
        Category::Date,
        Category::Logical,
        Category::Mathematics,
        Category::Param,
        Category::Selection,
        Category::String,
        Category::TypeChecking,
        Category::Uri,
        Category::Value,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Aggregate => "aggregate",
            Category::Cast => "cast",
            Category::Date => "date",
            Category::Logical => "logical",
            Category::Mathematics => "mathematics",
            Category::Param => "param",
            Category::Selection => "selection",
            Category::String => "string",
            Category::TypeChecking => "type-checking",
            Category::Uri => "uri",
            Category::Value => "value",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Category::Aggregate => "Fold every row of a group into one value",
            Category::Cast => "Convert a value to another type",
            Category::Date => "Parse, format and round epoch-millisecond dates",
            Category::Logical => "Conditions, comparisons and boolean logic",
            Category::Mathematics => "Arithmetic and rounding",
            Category::Param => "Values supplied by the caller at evaluation time",
            Category::Selection => "Pick values from the child groups of a group",
            Category::String => "Text manipulation and inspection",
            Category::TypeChecking => "Inspect the type of a value",
            Category::Uri => "Extract the parts of a URI",
            Category::Value => "Constant values",
        }
    }

    /// Parse category name, accepting a few common spellings
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "aggregate" | "aggregates" => Some(Category::Aggregate),
            "cast" | "casts" => Some(Category::Cast),
            "date" | "dates" | "date-time" => Some(Category::Date),
            "logical" | "logic" => Some(Category::Logical),
            "mathematics" | "math" | "maths" => Some(Category::Mathematics),
            "param" | "params" => Some(Category::Param),
            "selection" | "selector" | "selectors" => Some(Category::Selection),
            "string" | "strings" => Some(Category::String),
            "type-checking" | "types" | "type" => Some(Category::TypeChecking),
            "uri" | "url" => Some(Category::Uri),
            "value" | "values" => Some(Category::Value),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type an argument must have when it is given as a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Any,
    Number,
    Text,
    Boolean,
}

impl ArgKind {
    pub fn name(&self) -> &'static str {
        match self {
            ArgKind::Any => "any value",
            ArgKind::Number => "a number",
            ArgKind::Text => "text",
            ArgKind::Boolean => "a boolean",
        }
    }

    /// Whether a literal of this value satisfies the kind.
    pub fn accepts(&self, val: &Val) -> bool {
        match self {
            ArgKind::Any | ArgKind::Text => true,
            ArgKind::Number => val.to_double().is_some(),
            ArgKind::Boolean => val.to_boolean().is_some(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Arg {
    pub name: &'static str,
    pub kind: ArgKind,
    /// Must be a literal, read once when the generator is built
    pub constant: bool,
}

pub(crate) fn arg(name: &'static str) -> Arg {
    Arg {
        name,
        kind: ArgKind::Any,
        constant: false,
    }
}

pub(crate) fn number(name: &'static str) -> Arg {
    Arg {
        kind: ArgKind::Number,
        ..arg(name)
    }
}

pub(crate) fn text(name: &'static str) -> Arg {
    Arg {
        kind: ArgKind::Text,
        ..arg(name)
    }
}

pub(crate) fn boolean(name: &'static str) -> Arg {
    Arg {
        kind: ArgKind::Boolean,
        ..arg(name)
    }
}

impl Arg {
    pub(crate) fn constant(self) -> Self {
        Arg {
            constant: true,
            ..self
        }
    }
}

/// One accepted argument shape of a function.
#[derive(Debug, Clone)]
pub struct Signature {
    pub args: Vec<Arg>,
    /// Repeatable trailing argument
    pub variadic: Option<Arg>,
    pub returns: &'static str,
    pub description: &'static str,
    pub imp: Impl,
}

impl Signature {
    pub(crate) fn scalar(
        args: Vec<Arg>,
        returns: &'static str,
        description: &'static str,
        f: ScalarFn,
    ) -> Self {
        Signature {
            args,
            variadic: None,
            returns,
            description,
            imp: Impl::Scalar(f),
        }
    }

    pub(crate) fn aggregate(
        args: Vec<Arg>,
        returns: &'static str,
        description: &'static str,
        kind: AggregateKind,
    ) -> Self {
        Signature {
            imp: Impl::Aggregate(kind),
            ..Signature::scalar(args, returns, description, |_, _| Val::Null)
        }
    }

    pub(crate) fn selector(
        args: Vec<Arg>,
        returns: &'static str,
        description: &'static str,
        kind: SelectorKind,
    ) -> Self {
        Signature {
            imp: Impl::Selector(kind),
            ..Signature::scalar(args, returns, description, |_, _| Val::Null)
        }
    }

    pub(crate) fn variadic(mut self, arg: Arg) -> Self {
        self.variadic = Some(arg);
        self
    }

    pub fn kind(&self) -> FunctionKind {
        match self.imp {
            Impl::Scalar(_) => FunctionKind::Scalar,
            Impl::Aggregate(_) => FunctionKind::Aggregate,
            Impl::Selector(_) => FunctionKind::Selector,
        }
    }

    pub fn accepts_count(&self, count: usize) -> bool {
        if self.variadic.is_some() {
            count >= self.args.len()
        } else {
            count == self.args.len()
        }
    }

    /// Declared argument at `index`, following the variadic tail.
    pub fn arg(&self, index: usize) -> Option<&Arg> {
        self.args.get(index).or(self.variadic.as_ref())
    }

    /// Usage line, e.g. `round(value, places)`.
    pub fn usage(&self, name: &str) -> String {
        let mut parts: Vec<String> = self.args.iter().map(|a| a.name.to_string()).collect();
        if let Some(v) = &self.variadic {
            parts.push(format!("{}...", v.name));
        }
        format!("{}({})", name, parts.join(", "))
    }
}

/// Static description of a built-in function.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub category: Category,
    /// Tried in order; the first that fits the call is used
    pub signatures: Vec<Signature>,
    /// Receives Error arguments instead of short-circuiting to the first one
    pub lenient: bool,
}

impl FunctionDef {
    pub(crate) fn new(name: &'static str, category: Category) -> Self {
        FunctionDef {
            name,
            aliases: &[],
            category,
            signatures: Vec::new(),
            lenient: false,
        }
    }

    pub(crate) fn aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    pub(crate) fn signature(mut self, signature: Signature) -> Self {
        self.signatures.push(signature);
        self
    }

    pub(crate) fn lenient(mut self) -> Self {
        self.lenient = true;
        self
    }
}

/// Name-indexed function catalogue.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    defs: Vec<FunctionDef>,
    /// Lower-cased name or alias to position in `defs`
    by_name: HashMap<String, usize>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a function. Names and aliases are case-insensitive; a name that is
    /// already taken keeps its first registration.
    pub fn register(&mut self, def: FunctionDef) {
        let pos = self.defs.len();
        for name in std::iter::once(def.name).chain(def.aliases.iter().copied()) {
            let key = name.to_lowercase();
            if self.by_name.contains_key(&key) {
                warn!(name, "function name already registered");
                continue;
            }
            self.by_name.insert(key, pos);
        }
        self.defs.push(def);
    }

    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.by_name
            .get(&name.to_lowercase())
            .map(|pos| &self.defs[*pos])
    }

    /// Function and index of its first signature taking `arg_count` arguments.
    pub fn resolve(&self, name: &str, arg_count: usize) -> Option<(&FunctionDef, usize)> {
        let def = self.get(name)?;
        def.signatures
            .iter()
            .position(|s| s.accepts_count(arg_count))
            .map(|i| (def, i))
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDef> {
        self.defs.iter()
    }

    pub fn by_category(&self, category: Category) -> Vec<&FunctionDef> {
        let mut defs: Vec<&FunctionDef> = self.defs.iter().filter(|d| d.category == category).collect();
        defs.sort_by_key(|d| d.name.to_lowercase());
        defs
    }
}

static REGISTRY: Lazy<FunctionRegistry> = Lazy::new(|| {
    let mut registry = FunctionRegistry::new();
    for def in aggregate::definitions()
        .into_iter()
        .chain(selector::definitions())
        .chain(math::definitions())
        .chain(string::definitions())
        .chain(hash::definitions())
        .chain(date::definitions())
        .chain(logical::definitions())
        .chain(type_check::definitions())
        .chain(cast::definitions())
        .chain(uri::definitions())
        .chain(param::definitions())
    {
        registry.register(def);
    }
    registry
});

/// The built-in catalogue.
pub fn registry() -> &'static FunctionRegistry {
    &REGISTRY
}

/// Text argument, or `None` for Null.
pub(crate) fn text_arg(args: &[Val], index: usize) -> Option<String> {
    match args.get(index) {
        None | Some(Val::Null) => None,
        Some(v) => Some(v.to_text()),
    }
}

/// Numeric argument; Null gives `Ok(None)` and non-numeric values an error.
pub(crate) fn number_arg(args: &[Val], index: usize) -> Result<Option<f64>, Val> {
    match args.get(index) {
        None | Some(Val::Null) => Ok(None),
        Some(Val::Error(m)) => Err(Val::Error(m.clone())),
        Some(v) => v
            .to_double()
            .map(Some)
            .ok_or_else(|| Val::error(format!("Expected a number but found '{}'", v))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = registry();
        assert_eq!(registry.get("UPPERCASE").map(|d| d.name), Some("upperCase"));
        assert_eq!(registry.get("mean").map(|d| d.name), Some("average"));
        assert!(registry.get("noSuchFunction").is_none());
    }

    #[test]
    fn test_resolve_selects_signature_by_arity() {
        let (def, i) = registry().resolve("min", 1).unwrap();
        assert_eq!(def.signatures[i].kind(), FunctionKind::Aggregate);
        let (def, i) = registry().resolve("min", 3).unwrap();
        assert_eq!(def.signatures[i].kind(), FunctionKind::Scalar);
        assert!(registry().resolve("upperCase", 2).is_none());
    }

    #[test]
    fn test_every_category_has_functions() {
        for category in Category::ALL {
            assert!(
                !registry().by_category(category).is_empty(),
                "no functions in {}",
                category
            );
        }
    }

    #[test]
    fn test_usage() {
        let def = registry().get("concat").unwrap();
        assert_eq!(def.signatures[0].usage(def.name), "concat(value, value...)");
    }
}
