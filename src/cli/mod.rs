//! CLI support for stroomql
//!
//! The binary is a thin clap front end over these functions, so other tools
//! can evaluate expressions and render help the same way.

mod check;
mod convert;
mod docs;

pub use check::{CheckOptions, CheckResult, execute_check};
pub use convert::{json_to_val, val_to_json};
pub use docs::{get_doc_category, get_docs_overview};

use std::io;

use thiserror::Error;

/// Errors that can occur during CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Parse error: {0}")]
    Parse(#[from] crate::ParseError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Generator state error: {0}")]
    State(#[from] crate::StateError),

    #[error("Unknown category: '{0}'\nRun 'stroomql docs' to see available categories.")]
    UnknownCategory(String),

    #[error("Invalid rows: {0}")]
    InvalidRows(String),
}
