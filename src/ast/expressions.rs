use std::fmt;

use crate::{
    ast::BinOp,
    functions::{FunctionDef, FunctionKind, Signature},
    value::{Val, format_double},
};

/// A parsed expression tree. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Constant value
    ///
    /// # Examples
    /// ```text
    /// 42
    /// -1.5
    /// 'it''s'
    /// ```
    Literal(Val),

    /// Field reference resolved to its row slot
    ///
    /// # Examples
    /// ```text
    /// ${val1}
    /// ```
    Field { name: String, index: usize },

    /// Unary minus applied to a non-literal operand
    ///
    /// # Examples
    /// ```text
    /// -${val1}
    /// -(1+2)
    /// ```
    Negate(Box<Node>),

    /// Parenthesised sub-expression, kept so the text renders back as written
    Brackets(Box<Node>),

    /// Infix operation
    Binary {
        op: BinOp,
        left: Box<Node>,
        right: Box<Node>,
    },

    /// Function call
    ///
    /// # Examples
    /// ```text
    /// round(average(${val1}), 2)
    /// count()
    /// ```
    Call(Call),
}

/// A resolved function call.
#[derive(Debug, Clone)]
pub struct Call {
    /// Name as written in the source
    pub name: String,
    pub def: &'static FunctionDef,
    /// Index of the chosen signature within `def.signatures`
    pub signature: usize,
    pub args: Vec<Node>,
}

impl Call {
    pub fn signature(&self) -> &'static Signature {
        &self.def.signatures[self.signature]
    }

    pub fn kind(&self) -> FunctionKind {
        self.signature().kind()
    }
}

impl PartialEq for Call {
    fn eq(&self, other: &Self) -> bool {
        self.def.name == other.def.name && self.signature == other.signature && self.args == other.args
    }
}

impl Node {
    /// The constant value of a literal, looking through brackets.
    pub fn as_literal(&self) -> Option<&Val> {
        match self {
            Node::Literal(val) => Some(val),
            Node::Brackets(inner) => inner.as_literal(),
            _ => None,
        }
    }

    /// Whether any part of the tree aggregates across rows.
    pub fn has_aggregate(&self) -> bool {
        match self {
            Node::Literal(_) | Node::Field { .. } => false,
            Node::Negate(inner) | Node::Brackets(inner) => inner.has_aggregate(),
            Node::Binary { left, right, .. } => left.has_aggregate() || right.has_aggregate(),
            Node::Call(call) => {
                call.kind() == FunctionKind::Aggregate || call.args.iter().any(Node::has_aggregate)
            }
        }
    }

    /// Whether any part of the tree selects among sibling groups.
    pub fn has_selector(&self) -> bool {
        match self {
            Node::Literal(_) | Node::Field { .. } => false,
            Node::Negate(inner) | Node::Brackets(inner) => inner.has_selector(),
            Node::Binary { left, right, .. } => left.has_selector() || right.has_selector(),
            Node::Call(call) => {
                call.kind() == FunctionKind::Selector || call.args.iter().any(Node::has_selector)
            }
        }
    }

    /// Row slots referenced by the tree, in first-use order.
    pub fn field_indexes(&self, out: &mut Vec<usize>) {
        match self {
            Node::Literal(_) => {}
            Node::Field { index, .. } => {
                if !out.contains(index) {
                    out.push(*index);
                }
            }
            Node::Negate(inner) | Node::Brackets(inner) => inner.field_indexes(out),
            Node::Binary { left, right, .. } => {
                left.field_indexes(out);
                right.field_indexes(out);
            }
            Node::Call(call) => call.args.iter().for_each(|a| a.field_indexes(out)),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Literal(val) => write_literal(f, val),
            Node::Field { name, .. } => write!(f, "${{{}}}", name),
            Node::Negate(inner) => write!(f, "-{}", inner),
            Node::Brackets(inner) => write!(f, "({})", inner),
            Node::Binary { op, left, right } => write!(f, "{}{}{}", left, op, right),
            Node::Call(call) => {
                write!(f, "{}(", call.name)?;
                for (i, arg) in call.args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}

fn write_literal(f: &mut fmt::Formatter<'_>, val: &Val) -> fmt::Result {
    match val {
        Val::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
        Val::Double(d) => f.write_str(&format_double(*d)),
        Val::Integer(i) => write!(f, "{}", i),
        Val::Long(l) => write!(f, "{}", l),
        Val::Boolean(b) => write!(f, "{}()", b),
        Val::Null => f.write_str("null()"),
        Val::Error(_) => f.write_str("err()"),
    }
}
