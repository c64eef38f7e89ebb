use std::fmt;

use crate::{
    ast::TokenKind,
    compare,
    functions::{logical, math},
    value::Val,
};

/// Infix operators, highest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    // Power
    Power,

    // Multiplicative
    Multiply,
    Divide,
    Modulus,

    // Additive
    Add,
    Subtract,

    // Comparison (non-associative)
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,

    // Logical
    And,
    Or,
}

impl BinOp {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        Some(match kind {
            TokenKind::Power => BinOp::Power,
            TokenKind::Multiply => BinOp::Multiply,
            TokenKind::Divide => BinOp::Divide,
            TokenKind::Modulus => BinOp::Modulus,
            TokenKind::Plus => BinOp::Add,
            TokenKind::Minus => BinOp::Subtract,
            TokenKind::Equals => BinOp::Equals,
            TokenKind::NotEquals => BinOp::NotEquals,
            TokenKind::LessThan => BinOp::LessThan,
            TokenKind::LessThanOrEqualTo => BinOp::LessThanOrEqualTo,
            TokenKind::GreaterThan => BinOp::GreaterThan,
            TokenKind::GreaterThanOrEqualTo => BinOp::GreaterThanOrEqualTo,
            TokenKind::And => BinOp::And,
            TokenKind::Or => BinOp::Or,
            _ => return None,
        })
    }

    /// Binding strength; larger binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            BinOp::Or => 1,
            BinOp::And => 2,
            BinOp::Equals
            | BinOp::NotEquals
            | BinOp::LessThan
            | BinOp::LessThanOrEqualTo
            | BinOp::GreaterThan
            | BinOp::GreaterThanOrEqualTo => 3,
            BinOp::Add | BinOp::Subtract => 4,
            BinOp::Multiply | BinOp::Divide | BinOp::Modulus => 5,
            BinOp::Power => 6,
        }
    }

    pub fn is_comparison(&self) -> bool {
        self.precedence() == 3
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Power => "^",
            BinOp::Multiply => "*",
            BinOp::Divide => "/",
            BinOp::Modulus => "%",
            BinOp::Add => "+",
            BinOp::Subtract => "-",
            BinOp::Equals => "=",
            BinOp::NotEquals => "!=",
            BinOp::LessThan => "<",
            BinOp::LessThanOrEqualTo => "<=",
            BinOp::GreaterThan => ">",
            BinOp::GreaterThanOrEqualTo => ">=",
            BinOp::And => "and",
            BinOp::Or => "or",
        }
    }

    /// Evaluate the operator on two operands.
    pub fn apply(&self, left: &Val, right: &Val) -> Val {
        match self {
            BinOp::Power => math::power(left, right),
            BinOp::Multiply => math::multiply(left, right),
            BinOp::Divide => math::divide(left, right),
            BinOp::Modulus => math::modulus(left, right),
            BinOp::Add => math::add(left, right),
            BinOp::Subtract => math::subtract(left, right),
            BinOp::Equals => compare::equals(left, right),
            BinOp::NotEquals => compare::compare_with(left, right, |o| o.is_ne()),
            BinOp::LessThan => compare::compare_with(left, right, |o| o.is_lt()),
            BinOp::LessThanOrEqualTo => compare::compare_with(left, right, |o| o.is_le()),
            BinOp::GreaterThan => compare::compare_with(left, right, |o| o.is_gt()),
            BinOp::GreaterThanOrEqualTo => compare::compare_with(left, right, |o| o.is_ge()),
            BinOp::And => logical::and(&[left.clone(), right.clone()]),
            BinOp::Or => logical::or(&[left.clone(), right.clone()]),
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinOp::And | BinOp::Or => write!(f, " {} ", self.symbol()),
            _ => f.write_str(self.symbol()),
        }
    }
}
