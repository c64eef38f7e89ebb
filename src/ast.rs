//! # Abstract Syntax Tree
//!
//! Types produced by the tokenizer and the parser.
//!
//! - **[tokens]** - Lexical tokens and the nested token structure
//! - **[expressions]** - Expression nodes (literals, fields, operations, calls)
//! - **[operators]** - Infix operators with precedence and evaluation
//!
//! ## Quick Start
//!
//! ```text
//! round(average(${val1}), 2) >= 10 and ${host} != 'web-01'
//! ```
//!
//! ## Precedence
//!
//! From tightest to loosest:
//!
//! 1. Unary minus and function calls
//! 2. `^`
//! 3. `*`, `/`, `%`
//! 4. `+`, `-`
//! 5. `=`, `!=`, `<`, `<=`, `>`, `>=`
//! 6. `and`
//! 7. `or`
//!
//! Parentheses reset precedence and are kept in the tree so that an
//! expression renders back as it was written.

pub mod expressions;
pub mod operators;
pub mod tokens;

pub use expressions::{Call, Node};
pub use operators::BinOp;
pub use tokens::{GroupKind, Token, TokenGroup, TokenKind, TokenTree};
