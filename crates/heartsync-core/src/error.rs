//! Error types for `heartsync-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::identity::Identity;

#[derive(Debug, Error)]
pub enum Error {
  /// The raw handle normalized to the empty string.
  #[error("handle normalizes to an empty identity: {0:?}")]
  EmptyIdentity(String),

  #[error("cannot submit a crush on yourself ({0})")]
  SelfCrush(Identity),

  #[error("season not found: {0}")]
  SeasonNotFound(String),

  #[error("season {0} is not active")]
  SeasonClosed(String),

  #[error("season id already taken: {0}")]
  SeasonExists(String),

  #[error("submission not found: {0}")]
  SubmissionNotFound(Uuid),

  /// Transient contention on the atomic reconcile transaction. Retried by
  /// the engine a bounded number of times before surfacing.
  #[error("storage conflict: {0}")]
  Conflict(String),

  #[error("storage error: {0}")]
  Storage(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// True for contention errors that may succeed on retry.
  pub fn is_transient(&self) -> bool { matches!(self, Self::Conflict(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
