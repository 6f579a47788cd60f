//! Storage collaborator seam
//!
//! The session loop never talks to a database directly. It opens one
//! [`Cursor`] per authenticated session through a [`Backend`] and hands it
//! SQL text; everything about storage, locking and durability is the
//! backend's business.

pub mod sqlite;

use auto_impl::auto_impl;

pub use sqlite::SqliteBackend;

/// Column names and stringified rows produced by a read query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Any failure reported by a backend
///
/// The message is what the client sees; the driver error is kept as the source.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct BackendError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A shared store that hands out one cursor per session
#[auto_impl(&, Box, Arc)]
pub trait Backend: Send + Sync {
    type Cursor: Cursor;

    fn open(&self) -> Result<Self::Cursor, BackendError>;
}

/// A session's private handle on the store
pub trait Cursor: Send {
    /// Run a read query and collect every row
    fn query(&mut self, sql: &str) -> Result<ResultSet, BackendError>;

    /// Run a write statement and commit it
    fn execute(&mut self, sql: &str) -> Result<(), BackendError>;

    fn close(self)
    where
        Self: Sized;
}

/// Owns a cursor for the rest of a session and closes it exactly once on drop
pub struct CursorGuard<C: Cursor> {
    cursor: Option<C>,
}

impl<C: Cursor> CursorGuard<C> {
    pub fn new(cursor: C) -> Self {
        Self {
            cursor: Some(cursor),
        }
    }

    pub fn query(&mut self, sql: &str) -> Result<ResultSet, BackendError> {
        self.cursor_mut()?.query(sql)
    }

    pub fn execute(&mut self, sql: &str) -> Result<(), BackendError> {
        self.cursor_mut()?.execute(sql)
    }

    fn cursor_mut(&mut self) -> Result<&mut C, BackendError> {
        self.cursor
            .as_mut()
            .ok_or_else(|| BackendError::new("cursor already closed"))
    }
}

impl<C: Cursor> Drop for CursorGuard<C> {
    fn drop(&mut self) {
        if let Some(cursor) = self.cursor.take() {
            cursor.close();
            tracing::debug!("cursor closed");
        }
    }
}
