//! The reconciliation decision procedure.
//!
//! [`plan`] is pure: given the three reads a backend performs inside its
//! transaction — the same-direction submission (idempotency), the mirror
//! submission (reciprocity), and any match record under the derived id — it
//! computes exactly which writes to apply. Storage backends execute the
//! returned [`Plan`] atomically; the correctness argument lives here, the
//! isolation argument lives in the backend.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  identity::Identity,
  matching::{Match, PairKey},
  profile::UserProfile,
  submission::{CrushStatus, CrushSubmission, VisibilityMode},
};

/// A validated submission request. Identities are already normalized and
/// checked (non-empty, not a self-crush) by the engine.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
  pub submitter:           UserProfile,
  pub target_identity:     Identity,
  pub target_display_name: String,
  pub season_id:           String,
  /// `None` falls back to the season's default visibility.
  pub visibility:          Option<VisibilityMode>,
}

impl SubmitRequest {
  /// The canonical unordered pair this request belongs to.
  pub fn pair_key(&self) -> PairKey {
    PairKey::new(
      self.submitter.identity.clone(),
      self.target_identity.clone(),
    )
  }

  /// The deterministic id of the match this request would close.
  pub fn match_id(&self) -> String {
    self.pair_key().match_id(&self.season_id)
  }
}

/// The writes to apply for one submission.
#[derive(Debug, Clone)]
pub enum Plan {
  /// An identical non-withdrawn submission already exists. Write nothing;
  /// return the prior record unchanged.
  Duplicate { existing: CrushSubmission },

  /// No mirror entry yet. Insert the submission as pending.
  Pending { submission: CrushSubmission },

  /// Mirror entry found. Insert the submission as matched, mark the mirror
  /// matched too, and create the match record — unless a concurrent
  /// submission already created it, in which case the stored record is
  /// left untouched.
  Matched {
    submission:        CrushSubmission,
    reciprocal_id:     Uuid,
    match_record:      Match,
    match_preexisting: bool,
  },
}

/// Decide the writes for `req` from the transaction's reads.
///
/// `visibility` is the resolved mode (request value or season default);
/// `id` and `now` are assigned by the store so the function stays pure.
pub fn plan(
  req: &SubmitRequest,
  visibility: VisibilityMode,
  existing: Option<CrushSubmission>,
  reciprocal: Option<CrushSubmission>,
  existing_match: Option<Match>,
  id: Uuid,
  now: DateTime<Utc>,
) -> Plan {
  // At-most-once submission per (season, submitter, target).
  if let Some(existing) = existing {
    return Plan::Duplicate { existing };
  }

  let mutual = reciprocal.is_some();
  let submission = CrushSubmission {
    id,
    season_id: req.season_id.clone(),
    submitter_user_id: req.submitter.user_id.clone(),
    submitter_identity: req.submitter.identity.clone(),
    submitter_display_name: req.submitter.display_name.clone(),
    target_identity: req.target_identity.clone(),
    target_display_name: req.target_display_name.clone(),
    visibility,
    status: if mutual { CrushStatus::Matched } else { CrushStatus::Pending },
    is_mutual: mutual,
    withdrawn: false,
    created_at: now,
  };

  let Some(mirror) = reciprocal else {
    return Plan::Pending { submission };
  };

  let match_preexisting = existing_match.is_some();
  let match_record = existing_match
    .unwrap_or_else(|| build_match(req, &mirror, now));

  Plan::Matched {
    submission,
    reciprocal_id: mirror.id,
    match_record,
    match_preexisting,
  }
}

/// Assemble the canonical match record for `req` and its mirror entry.
///
/// The submitter's own display name comes from the current request; the
/// other side's from the reciprocal record.
fn build_match(
  req: &SubmitRequest,
  mirror: &CrushSubmission,
  now: DateTime<Utc>,
) -> Match {
  let key = req.pair_key();
  let name_of = |identity: &Identity| -> String {
    if *identity == req.submitter.identity {
      req.submitter.display_name.clone()
    } else {
      mirror.submitter_display_name.clone()
    }
  };

  Match {
    id:              key.match_id(&req.season_id),
    season_id:       req.season_id.clone(),
    user_a_name:     name_of(key.a()),
    user_b_name:     name_of(key.b()),
    user_a_identity: key.a().clone(),
    user_b_identity: key.b().clone(),
    created_at:      now,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn request(submitter: &str, target: &str) -> SubmitRequest {
    SubmitRequest {
      submitter:           UserProfile::new(
        format!("uid-{submitter}"),
        submitter,
        submitter.to_uppercase(),
      ),
      target_identity:     Identity::normalize(target),
      target_display_name: target.to_uppercase(),
      season_id:           "s1".to_string(),
      visibility:          Some(VisibilityMode::MutualOnly),
    }
  }

  fn submission_for(req: &SubmitRequest) -> CrushSubmission {
    match plan(
      req,
      VisibilityMode::MutualOnly,
      None,
      None,
      None,
      Uuid::new_v4(),
      Utc::now(),
    ) {
      Plan::Pending { submission } => submission,
      other => panic!("expected pending, got {other:?}"),
    }
  }

  #[test]
  fn duplicate_short_circuits_all_writes() {
    let req = request("alice", "bob");
    let prior = submission_for(&req);

    let result = plan(
      &req,
      VisibilityMode::MutualOnly,
      Some(prior.clone()),
      // Even with a mirror present, a duplicate returns the prior record.
      Some(submission_for(&request("bob", "alice"))),
      None,
      Uuid::new_v4(),
      Utc::now(),
    );

    match result {
      Plan::Duplicate { existing } => assert_eq!(existing.id, prior.id),
      other => panic!("expected duplicate, got {other:?}"),
    }
  }

  #[test]
  fn no_mirror_yields_pending() {
    let req = request("alice", "bob");
    let submission = submission_for(&req);
    assert_eq!(submission.status, CrushStatus::Pending);
    assert!(!submission.is_mutual);
    assert!(!submission.withdrawn);
    assert_eq!(submission.submitter_identity.as_str(), "alice");
    assert_eq!(submission.target_identity.as_str(), "bob");
  }

  #[test]
  fn mirror_yields_matched_with_canonical_names() {
    let req = request("bob", "alice");
    let mirror = submission_for(&request("alice", "bob"));

    let result = plan(
      &req,
      VisibilityMode::MutualOnly,
      None,
      Some(mirror.clone()),
      None,
      Uuid::new_v4(),
      Utc::now(),
    );

    let Plan::Matched { submission, reciprocal_id, match_record, match_preexisting } =
      result
    else {
      panic!("expected matched");
    };

    assert_eq!(submission.status, CrushStatus::Matched);
    assert!(submission.is_mutual);
    assert_eq!(reciprocal_id, mirror.id);
    assert!(!match_preexisting);

    // Canonical order is alphabetical, independent of submission order.
    assert_eq!(match_record.id, "s1_alice_bob");
    assert_eq!(match_record.user_a_identity.as_str(), "alice");
    assert_eq!(match_record.user_b_identity.as_str(), "bob");
    // alice's name comes from the mirror record, bob's from the request.
    assert_eq!(match_record.user_a_name, "ALICE");
    assert_eq!(match_record.user_b_name, "BOB");
  }

  #[test]
  fn preexisting_match_is_left_untouched() {
    let req = request("bob", "alice");
    let mirror = submission_for(&request("alice", "bob"));
    let stored = build_match(&req, &mirror, Utc::now());

    let result = plan(
      &req,
      VisibilityMode::MutualOnly,
      None,
      Some(mirror),
      Some(stored.clone()),
      Uuid::new_v4(),
      Utc::now(),
    );

    let Plan::Matched { match_record, match_preexisting, .. } = result else {
      panic!("expected matched");
    };
    assert!(match_preexisting);
    assert_eq!(match_record.created_at, stored.created_at);
  }
}
