//! Identity — the normalized handle used as the matching key.
//!
//! Matching is keyed by normalized social handles, not by account ids, so
//! two users can match even if one submitted before the other registered.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A normalized handle-like identifier.
///
/// Two raw inputs that normalize to the same key refer to the same
/// participant for matching purposes. `Identity` is `Ord` so an unordered
/// pair of identities canonicalises lexicographically.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
  /// Canonicalize a raw handle: trim whitespace, strip exactly one leading
  /// `@`, lowercase.
  ///
  /// Total and pure — defined for any input string. The empty string
  /// normalizes to the empty identity; callers must reject empty identities
  /// before submission.
  pub fn normalize(raw: &str) -> Self {
    let trimmed = raw.trim();
    let stripped = trimmed.strip_prefix('@').unwrap_or(trimmed);
    Identity(stripped.trim().to_lowercase())
  }

  pub fn as_str(&self) -> &str { &self.0 }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl fmt::Display for Identity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn strips_at_and_lowercases() {
    assert_eq!(Identity::normalize("@Bob ").as_str(), "bob");
    assert_eq!(Identity::normalize("ALICE").as_str(), "alice");
    assert_eq!(Identity::normalize("  @carol.d  ").as_str(), "carol.d");
  }

  #[test]
  fn strips_only_a_leading_at() {
    // An `@` elsewhere in the handle is preserved.
    assert_eq!(Identity::normalize("a@b").as_str(), "a@b");
  }

  #[test]
  fn empty_input_is_empty_identity() {
    assert!(Identity::normalize("").is_empty());
    assert!(Identity::normalize("   ").is_empty());
    assert!(Identity::normalize("@").is_empty());
  }

  #[test]
  fn normalize_is_idempotent() {
    for raw in ["@Bob ", "alice", "  CAROL", "a@b", "dave.99"] {
      let once = Identity::normalize(raw);
      let twice = Identity::normalize(once.as_str());
      assert_eq!(once, twice, "not idempotent for {raw:?}");
    }
  }

  #[test]
  fn equal_keys_after_normalization() {
    assert_eq!(Identity::normalize("@Bob"), Identity::normalize("bob"));
    assert_ne!(Identity::normalize("bob"), Identity::normalize("bobby"));
  }
}
