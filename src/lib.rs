//! stroomql: a small expression language for dashboard queries.
//!
//! Expressions such as `round(average(${duration}) / 1000, 2)` are parsed
//! against a [`FieldIndex`] into an [`Expression`]. Each group of rows gets
//! its own [`Generator`], which is fed rows with [`Generator::set`] and
//! produces a [`Val`] with [`Generator::eval`]. Partial generators built over
//! different rows can be merged, or serialized and merged elsewhere.

pub mod ast;
pub mod cli;
pub mod compare;
pub mod context;
pub mod error;
pub mod expression;
pub mod field_index;
pub mod functions;
pub mod generator;
pub mod lexer;
pub mod parser;
pub mod value;

pub use context::ExpressionContext;
pub use error::{ParseError, StateError, TokenError};
pub use expression::Expression;
pub use field_index::FieldIndex;
pub use generator::{ChildData, Generator, Selector};
pub use lexer::tokenize;
pub use parser::Parser;
pub use value::{Val, ValType};

/// Parse with the default [`ExpressionContext`].
pub fn parse(fields: &FieldIndex, input: &str) -> Result<Expression, ParseError> {
    Parser::default().parse(fields, input)
}
