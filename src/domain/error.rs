//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent business logic violations.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid expression: {message}")]
    InvalidExpression { expression: String, message: String },

    #[error("invalid configuration tree: {0}")]
    InvalidTree(String),
}
