//! The `Matchmaker` — validation and bounded retry around the store's
//! atomic reconcile.
//!
//! Each `submit_crush` call is an independent unit of work; there is no
//! global lock. Correctness under concurrency comes from the store's
//! transaction, not from anything here — the engine only normalizes input,
//! rejects invalid requests before any write, and retries transient
//! contention with backoff.

use std::{sync::Arc, time::Duration};

use crate::{
  Error, Result,
  identity::Identity,
  profile::UserProfile,
  reconcile::SubmitRequest,
  store::{CrushStore, SubmitReceipt},
  submission::VisibilityMode,
};

/// Bounds on the transparent retry of [`Error::Conflict`].
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
  /// Total attempts, including the first.
  pub max_attempts: u32,
  /// Base delay; attempt `n` waits `backoff * n`.
  pub backoff:      Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self { max_attempts: 3, backoff: Duration::from_millis(25) }
  }
}

/// The reconciliation engine. Cloning is cheap; the store is shared.
#[derive(Clone)]
pub struct Matchmaker<S> {
  store: Arc<S>,
  retry: RetryPolicy,
}

impl<S: CrushStore> Matchmaker<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self { store, retry: RetryPolicy::default() }
  }

  pub fn with_retry(store: Arc<S>, retry: RetryPolicy) -> Self {
    Self { store, retry }
  }

  /// Submit one crush and reconcile it against the ledger.
  ///
  /// Validation failures (`EmptyIdentity`, `SelfCrush`) are surfaced
  /// immediately and write nothing. `Conflict` is retried up to the policy
  /// bound, then surfaced so the caller can offer "try again" rather than
  /// "fix your input".
  pub async fn submit_crush(
    &self,
    submitter: UserProfile,
    target_display_name: &str,
    target_raw: &str,
    season_id: &str,
    visibility: Option<VisibilityMode>,
  ) -> Result<SubmitReceipt> {
    if submitter.identity.is_empty() {
      return Err(Error::EmptyIdentity(submitter.user_id));
    }

    let target = Identity::normalize(target_raw);
    if target.is_empty() {
      return Err(Error::EmptyIdentity(target_raw.to_owned()));
    }
    if target == submitter.identity {
      return Err(Error::SelfCrush(target));
    }

    let display = target_display_name.trim();
    let target_display_name = if display.is_empty() {
      target.as_str().to_owned()
    } else {
      display.to_owned()
    };

    let req = SubmitRequest {
      submitter,
      target_identity: target,
      target_display_name,
      season_id: season_id.to_owned(),
      visibility,
    };

    let mut attempt: u32 = 1;
    loop {
      match self.store.submit(&req).await {
        Ok(receipt) => {
          if receipt.matched {
            tracing::info!(
              season = %req.season_id,
              match_id = %req.match_id(),
              "mutual crush reconciled",
            );
          }
          return Ok(receipt);
        }
        Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
          tracing::warn!(attempt, error = %e, "transient conflict, retrying");
          tokio::time::sleep(self.retry.backoff * attempt).await;
          attempt += 1;
        }
        Err(e) => return Err(e),
      }
    }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }
}
