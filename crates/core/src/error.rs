//! Errors shared by the domain crates.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A field was rejected before anything was written.
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// An identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Optimistic concurrency: the stored revision moved on.
    #[error("stale revision: expected {expected}, found {actual}")]
    StaleRevision { expected: u64, actual: u64 },
}

impl DomainError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_field() {
        let err = DomainError::invalid("title", "cannot be empty");
        assert_eq!(err.to_string(), "invalid title: cannot be empty");
    }
}
