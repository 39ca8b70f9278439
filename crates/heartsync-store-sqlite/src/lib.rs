//! SQLite backend for the Heartsync crush store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Each reconciled submission
//! executes as one SQLite transaction, which is what gives `submit` the
//! serializable behaviour the reconciliation protocol requires.

mod encode;
mod error;
mod schema;
mod store;

pub use store::SqliteStore;
