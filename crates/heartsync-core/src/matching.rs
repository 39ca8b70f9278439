//! Match records and the canonical unordered pair key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// The canonical unordered pair of identities: lexicographically smaller
/// first, regardless of who triggered the match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairKey {
  a: Identity,
  b: Identity,
}

impl PairKey {
  pub fn new(x: Identity, y: Identity) -> Self {
    if x <= y { Self { a: x, b: y } } else { Self { a: y, b: x } }
  }

  pub fn a(&self) -> &Identity { &self.a }

  pub fn b(&self) -> &Identity { &self.b }

  /// The deterministic match id: `"{season}_{a}_{b}"`.
  ///
  /// Both halves of a mutual pair derive the same id, which is what makes
  /// match creation naturally idempotent under concurrent submission.
  pub fn match_id(&self, season_id: &str) -> String {
    format!("{season_id}_{}_{}", self.a, self.b)
  }
}

/// One realized mutual pair within one season. Created once, never mutated
/// or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
  pub id:              String,
  pub season_id:       String,
  /// Lexicographically smaller identity of the pair.
  pub user_a_identity: Identity,
  pub user_b_identity: Identity,
  pub user_a_name:     String,
  pub user_b_name:     String,
  pub created_at:      DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pair_key_orders_lexicographically() {
    let ab = PairKey::new(
      Identity::normalize("bob"),
      Identity::normalize("alice"),
    );
    assert_eq!(ab.a().as_str(), "alice");
    assert_eq!(ab.b().as_str(), "bob");
  }

  #[test]
  fn match_id_is_order_independent() {
    let x = Identity::normalize("@Bob ");
    let y = Identity::normalize("alice");
    let forward = PairKey::new(x.clone(), y.clone()).match_id("s1");
    let reverse = PairKey::new(y, x).match_id("s1");
    assert_eq!(forward, "s1_alice_bob");
    assert_eq!(forward, reverse);
  }
}
