//! Error types for tokenizing, parsing and generator state encoding.
//!
//! Evaluation never fails through these types: a failed computation is a
//! [`Val::Error`](crate::Val::Error) flowing through the expression tree.

use thiserror::Error;

/// Structural failure found while tokenizing an expression.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} at position {position}")]
pub struct TokenError {
    /// Human-readable reason
    pub message: String,
    /// Text of the offending token, when one can be isolated
    pub token: Option<String>,
    /// Byte offset of the offending token in the input
    pub position: usize,
}

impl TokenError {
    pub fn new(message: impl Into<String>, token: Option<String>, position: usize) -> Self {
        TokenError {
            message: message.into(),
            token,
            position,
        }
    }
}

/// Errors raised while turning expression text into an [`Expression`](crate::Expression).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("Empty expression")]
    EmptyExpression,

    #[error("Unknown function '{name}' at position {position}")]
    UnknownFunction { name: String, position: usize },

    #[error("Function '{name}' does not accept {count} argument(s) at position {position}")]
    WrongArgumentCount {
        name: String,
        count: usize,
        position: usize,
    },

    #[error("Function '{name}' argument {index} expects {expected} but got '{found}' at position {position}")]
    WrongArgumentType {
        name: String,
        index: usize,
        expected: String,
        found: String,
        position: usize,
    },

    #[error("Function '{name}' argument {index} must be a static value at position {position}")]
    NonStaticArgument {
        name: String,
        index: usize,
        position: usize,
    },

    #[error("Unresolved field reference '{name}' at position {position}")]
    UnresolvedField { name: String, position: usize },

    #[error("Malformed literal '{text}' at position {position}")]
    MalformedLiteral { text: String, position: usize },

    #[error("Unexpected token '{token}' at position {position}")]
    UnexpectedToken { token: String, position: usize },

    #[error("Unexpected comma at position {position}")]
    UnexpectedComma { position: usize },

    #[error("Unexpected leading operator '{token}' at position {position}")]
    LeadingOperator { token: String, position: usize },

    #[error("Unexpected trailing operator '{token}' at position {position}")]
    TrailingOperator { token: String, position: usize },
}

impl ParseError {
    /// Byte offset of the offending token, if the error has one.
    pub fn position(&self) -> Option<usize> {
        match self {
            ParseError::Token(e) => Some(e.position),
            ParseError::EmptyExpression => None,
            ParseError::UnknownFunction { position, .. }
            | ParseError::WrongArgumentCount { position, .. }
            | ParseError::WrongArgumentType { position, .. }
            | ParseError::NonStaticArgument { position, .. }
            | ParseError::UnresolvedField { position, .. }
            | ParseError::MalformedLiteral { position, .. }
            | ParseError::UnexpectedToken { position, .. }
            | ParseError::UnexpectedComma { position }
            | ParseError::LeadingOperator { position, .. }
            | ParseError::TrailingOperator { position, .. } => Some(*position),
        }
    }
}

/// Errors raised while merging generators or reading and writing their state.
#[derive(Error, Debug)]
pub enum StateError {
    #[error("Unsupported generator state version {found}, expected {expected}")]
    UnsupportedVersion { found: u8, expected: u8 },

    #[error("Generator state truncated: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("Generator state of {0} bytes exceeds the length prefix")]
    TooLarge(usize),

    #[error("Generator state does not match the expression shape: {0}")]
    ShapeMismatch(String),

    #[error("Generator state encoding error: {0}")]
    Bincode(#[from] bincode::Error),
}

pub type ParseResult<T> = Result<T, ParseError>;
