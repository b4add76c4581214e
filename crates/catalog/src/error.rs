//! Catalog Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Lookups that match nothing are not
//! errors (they return `None`); only writes that were expected to touch a row
//! surface [`ErrorKind::BookNotFound`].

use derive_more::{Display, Error};

/// A catalog error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A round trip to the store was rejected (constraint violation,
    /// connectivity, ...). The `sqlx` error is kept as the child frame.
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    /// An update or delete matched no row.
    #[display("book not found: {_0}")]
    BookNotFound(#[error(not(source))] i64),
    /// Stored data could not be mapped onto the model.
    #[display("invalid catalog data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
    #[display("rating out of range (0-5): {_0}")]
    InvalidRating(#[error(not(source))] i64),
    #[display("could not serialize catalog data")]
    Serialization,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Nothing at this layer retries; a busy or unreachable database is the
    /// only case where trying again could change the outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database)
    }
}
