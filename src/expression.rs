use std::{collections::BTreeMap, fmt, sync::Arc};

use crate::{
    ast::Node,
    context::ExpressionContext,
    functions::EvalEnv,
    generator::Generator,
};

/// A parsed expression, ready to create generators.
///
/// `Display` renders the canonical text, which parses back to an equal tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    root: Node,
    params: BTreeMap<String, String>,
    context: ExpressionContext,
}

impl Expression {
    pub(crate) fn new(root: Node, context: ExpressionContext) -> Self {
        Expression {
            root,
            params: BTreeMap::new(),
            context,
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn context(&self) -> &ExpressionContext {
        &self.context
    }

    /// Values returned by `param('key')` and `params()` in generators
    /// created after this call.
    pub fn set_static_mapped_values(&mut self, values: BTreeMap<String, String>) {
        self.params = values;
    }

    /// A fresh generator for one group of rows.
    pub fn create_generator(&self) -> Generator {
        let env = EvalEnv {
            params: self.params.clone(),
            context: self.context.clone(),
        };
        Generator::new(&self.root, Arc::new(env))
    }

    /// Whether any function folds rows together.
    pub fn has_aggregate(&self) -> bool {
        self.root.has_aggregate()
    }

    /// Whether any function selects across child groups.
    pub fn has_selector(&self) -> bool {
        self.root.has_selector()
    }

    /// Row slots the expression reads, in order of first use.
    pub fn required_fields(&self) -> Vec<usize> {
        let mut fields = Vec::new();
        self.root.field_indexes(&mut fields);
        fields
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)
    }
}
