use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::types::ValueRef;
use tracing::instrument;

use super::{Backend, BackendError, Cursor, ResultSet};

/// How long a session waits for another session's write lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite database file shared by every session
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    path: PathBuf,
}

impl SqliteBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Backend for SqliteBackend {
    type Cursor = SqliteCursor;

    fn open(&self) -> Result<SqliteCursor, BackendError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        tracing::debug!(path = %self.path.display(), "sqlite connection opened");
        Ok(SqliteCursor { conn })
    }
}

/// One `rusqlite` connection, owned by a single session
#[derive(Debug)]
pub struct SqliteCursor {
    conn: Connection,
}

impl Cursor for SqliteCursor {
    #[instrument(skip(self))]
    fn query(&mut self, sql: &str) -> Result<ResultSet, BackendError> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = Vec::new();
        let mut cursor = stmt.query(())?;
        while let Some(row) = cursor.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                values.push(value_to_text(row.get_ref(i)?));
            }
            rows.push(values);
        }

        Ok(ResultSet { columns, rows })
    }

    #[instrument(skip(self))]
    fn execute(&mut self, sql: &str) -> Result<(), BackendError> {
        self.conn.execute_batch(sql)?;
        // a BEGIN without a matching COMMIT would hold the write lock for the whole session
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    fn close(self) {
        if let Err((_, err)) = self.conn.close() {
            tracing::warn!(error = %err, "failed to close sqlite connection");
        }
    }
}

/// Text form of a column value as sent in a row packet
fn value_to_text(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => real_to_text(f),
        ValueRef::Text(s) | ValueRef::Blob(s) => String::from_utf8_lossy(s).into_owned(),
    }
}

/// Shortest round-trip form of a REAL
///
/// Integral values keep their `.0`. Magnitudes outside `1e-4..1e16` use an
/// exponent with an explicit sign and at least two digits, e.g. `1e+300`.
fn real_to_text(f: f64) -> String {
    let debug = format!("{f:?}");
    let Some((mantissa, exponent)) = debug.split_once('e') else {
        return debug;
    };
    match exponent.strip_prefix('-') {
        Some(digits) => format!("{mantissa}e-{digits:0>2}"),
        None => format!("{mantissa}e+{exponent:0>2}"),
    }
}

impl From<rusqlite::Error> for BackendError {
    fn from(err: rusqlite::Error) -> Self {
        BackendError::with_source(err)
    }
}
