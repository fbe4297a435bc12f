//! Errors the engine can surface to callers.
//!
//! Storage failures pass through as [`EngineError::Database`]; everything
//! else is a domain error with a human-readable message.

use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The group id does not resolve, or the caller is not a member of it.
    /// The two cases are deliberately indistinguishable.
    #[error("group not found: {0}")]
    GroupNotFound(String),
    #[error("\"{0}\" not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid split: {0}")]
    InvalidSplit(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::GroupNotFound(a), Self::GroupNotFound(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidSplit(a), Self::InvalidSplit(b)) => a == b,
            (Self::InvalidArgument(a), Self::InvalidArgument(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
