//! Core types and trait definitions for the Heartsync matcher.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod engine;
pub mod error;
pub mod identity;
pub mod matching;
pub mod profile;
pub mod reconcile;
pub mod season;
pub mod store;
pub mod submission;

pub use error::{Error, Result};
