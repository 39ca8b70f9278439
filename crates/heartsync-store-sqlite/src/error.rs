//! Mapping between database-layer failures and [`heartsync_core::Error`].
//!
//! Domain errors raised inside a `conn.call` closure travel out through
//! [`tokio_rusqlite::Error::Other`] and are unwrapped on the async side.
//! `SQLITE_BUSY`/`SQLITE_LOCKED` become `Error::Conflict` so the engine
//! knows the attempt is retryable.

use heartsync_core::Error;

/// Wrap a domain error so it can cross the `conn.call` boundary.
pub(crate) fn domain(e: Error) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e))
}

/// Unwrap a `conn.call` failure back into a domain error.
pub(crate) fn from_call(e: tokio_rusqlite::Error) -> Error {
  match e {
    tokio_rusqlite::Error::Other(inner) => match inner.downcast::<Error>() {
      Ok(core) => *core,
      Err(other) => Error::Storage(other.to_string()),
    },
    tokio_rusqlite::Error::Rusqlite(db) => from_db(db),
    other => Error::Storage(other.to_string()),
  }
}

/// Classify a raw rusqlite error.
pub(crate) fn from_db(e: rusqlite::Error) -> Error {
  use rusqlite::ErrorCode;
  match &e {
    rusqlite::Error::SqliteFailure(f, _)
      if matches!(
        f.code,
        ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
      ) =>
    {
      Error::Conflict(e.to_string())
    }
    _ => Error::Storage(e.to_string()),
  }
}
