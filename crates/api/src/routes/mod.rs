//! HTTP route handlers.

pub mod churches;
pub mod contents;
pub mod health;
pub mod orders;

use std::str::FromStr;

use crate::error::ApiError;

/// Parses a path/body identifier, turning parse failures into 400s.
pub(crate) fn parse_id<T>(value: &str, what: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid {what}: {e}")))
}
