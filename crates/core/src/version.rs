//! Optimistic concurrency expectations for persisted entities.

use crate::error::{DomainError, DomainResult};

/// Optimistic concurrency expectation for a save.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (first insert, administrative repair).
    Any,
    /// Require the stored row to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn check(self, actual: u64) -> DomainResult<()> {
        match self {
            ExpectedVersion::Exact(expected) if expected != actual => {
                Err(DomainError::StaleRevision { expected, actual })
            }
            _ => Ok(()),
        }
    }
}
