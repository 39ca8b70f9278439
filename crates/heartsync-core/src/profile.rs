//! The submitting user as known to the external account layer.

use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// A minimal user profile. Registration and authentication live outside the
/// core; this is the slice of account state the matcher needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
  /// Opaque reference into the external auth system.
  pub user_id:      String,
  /// The user's own normalized handle.
  pub identity:     Identity,
  pub display_name: String,
}

impl UserProfile {
  /// Build a profile from a raw (un-normalized) handle.
  pub fn new(
    user_id: impl Into<String>,
    raw_handle: &str,
    display_name: impl Into<String>,
  ) -> Self {
    Self {
      user_id:      user_id.into(),
      identity:     Identity::normalize(raw_handle),
      display_name: display_name.into(),
    }
  }
}
