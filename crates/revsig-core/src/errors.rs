//! Error types for revsig-core.
//!
//! Rule violations found while validating a document are *findings* and go into
//! the [`ValidationReport`](crate::report::ValidationReport). The errors defined
//! here cover everything else: containers that cannot be read, API misuse, and
//! broken invariants of the in-memory object graph.

use thiserror::Error;

/// Result alias used across the crate.
pub type RevsigResult<T> = Result<T, RevsigError>;

/// Errors produced by revsig-core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RevsigError {
    /// A revision list or snapshot could not be materialized.
    #[error("io failure: {0}")]
    Io(String),

    /// Caller supplied an invalid argument or configuration.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An internal invariant of the object graph does not hold.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// Encoding or decoding of a container record failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl RevsigError {
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Returns true for failures of the container layer.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for RevsigError {
    fn from(err: serde_json::Error) -> Self {
        RevsigError::Serialization(err.to_string())
    }
}
