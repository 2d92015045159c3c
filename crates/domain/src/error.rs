//! Domain error types.

use store::{CapacityError, StoreError};
use thiserror::Error;

use crate::ticketing::TicketingError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the store.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A ticketing business rule was violated.
    #[error(transparent)]
    Ticketing(#[from] TicketingError),

    /// A capacity invariant would be violated.
    #[error(transparent)]
    Capacity(#[from] CapacityError),

    /// A referenced record does not exist.
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    /// The caller lacks the role required for the operation.
    #[error("forbidden: {reason}")]
    Forbidden { reason: &'static str },
}

pub(crate) fn not_found(what: &'static str, id: impl ToString) -> DomainError {
    DomainError::NotFound {
        what,
        id: id.to_string(),
    }
}
