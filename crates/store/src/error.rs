use common::ChurchCode;
use thiserror::Error;

use crate::model::{CapacityError, InvalidEnumValue};

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A church code is already taken. Recovered by the registry's bounded
    /// retry; fatal once the retries are exhausted.
    #[error("church code {0} is already taken")]
    DuplicateCode(ChurchCode),

    /// A church title is already taken.
    #[error("church title {0:?} is already taken")]
    DuplicateTitle(String),

    /// A ticket type name is already taken for this content.
    #[error("ticket type {0:?} already exists for this event")]
    DuplicateName(String),

    /// A phone number is already registered.
    #[error("phone number {0:?} is already registered")]
    DuplicatePhone(String),

    /// A write targeted a row that does not exist.
    #[error("{what} not found: {id}")]
    RowNotFound { what: &'static str, id: String },

    /// A write would violate a capacity invariant.
    #[error(transparent)]
    Capacity(#[from] CapacityError),

    /// A stored value could not be decoded.
    #[error(transparent)]
    InvalidValue(#[from] InvalidEnumValue),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
