//! Error types for the query layer.

use std::fmt;

use crate::db::DbError;

/// Errors produced by the query components.
///
/// The split matters to callers: `InvalidInput` is the client's fault and is
/// safe to echo back, `Store` is ours and its detail stays server-side.
#[derive(Debug)]
pub enum QueryError {
    /// A request parameter was missing, empty, or malformed.
    InvalidInput(String),
    /// The store or connection pool failed.
    Store(DbError),
}

impl QueryError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Self::Store(e) => write!(f, "Store error: {}", e),
        }
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            Self::InvalidInput(_) => None,
        }
    }
}

impl From<DbError> for QueryError {
    fn from(e: DbError) -> Self {
        Self::Store(e)
    }
}

impl From<rusqlite::Error> for QueryError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Store(DbError::Sqlite(e))
    }
}
