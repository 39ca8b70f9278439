//! The `CrushStore` trait and supporting read-model types.
//!
//! The trait is implemented by storage backends (e.g.
//! `heartsync-store-sqlite`). Higher layers (`heartsync-api`, the engine)
//! depend on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Result,
  identity::Identity,
  matching::Match,
  profile::UserProfile,
  reconcile::SubmitRequest,
  season::Season,
  submission::CrushSubmission,
};

// ─── Read-model types ────────────────────────────────────────────────────────

/// The result of one reconciled submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitReceipt {
  pub submission: CrushSubmission,
  /// A reciprocal entry exists and the pair is matched.
  pub matched:    bool,
  /// The request replayed an existing submission; nothing was written.
  pub duplicate:  bool,
}

/// One entry of a season's most-targeted leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetCount {
  pub identity: Identity,
  pub count:    u64,
}

/// Submission volume for one calendar day (UTC).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyCount {
  pub date:  NaiveDate,
  pub count: u64,
}

/// Per-season derived statistics. Totals come from the incremental
/// counters and may briefly drift from the ledger; the leaderboard and
/// daily series are computed from the ledger directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonStats {
  pub season_id:     String,
  pub total_crushes: u64,
  pub total_matches: u64,
  /// At most the top ten most-targeted identities.
  pub top_targets:   Vec<TargetCount>,
  pub daily_counts:  Vec<DailyCount>,
}

/// Store-wide totals; exposed only behind the admin credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalStats {
  pub total_users:   u64,
  pub total_crushes: u64,
  pub total_matches: u64,
  /// Submissions recorded in the trailing seven days — the activity proxy
  /// shown on the admin dashboard.
  pub activity_7d:   u64,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Heartsync storage backend.
///
/// [`CrushStore::submit`] is the one compound operation: its reads
/// (idempotency record, mirror record, match record) and writes must execute
/// as a single atomic transaction so two reciprocal submissions can never
/// both conclude "no reciprocal yet". Contention surfaces as
/// [`Error::Conflict`](crate::Error::Conflict) and is retried by the engine.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait CrushStore: Send + Sync {
  // ── Seasons ───────────────────────────────────────────────────────────

  /// Persist a new season. When `season.active` is true, all other seasons
  /// are deactivated in the same write. Fails with `SeasonExists` if the id
  /// is taken.
  fn create_season(
    &self,
    season: Season,
  ) -> impl Future<Output = Result<Season>> + Send + '_;

  fn get_season<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<Season>>> + Send + 'a;

  /// The currently active season, if any.
  fn active_season(
    &self,
  ) -> impl Future<Output = Result<Option<Season>>> + Send + '_;

  /// Deactivate a season. Fails with `SeasonNotFound` if unknown.
  fn end_season<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Season>> + Send + 'a;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Record (or refresh) a user profile, keyed by `user_id`.
  fn upsert_user<'a>(
    &'a self,
    profile: &'a UserProfile,
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  // ── Ledger ────────────────────────────────────────────────────────────

  /// Atomically reconcile one validated submission: idempotency lookup,
  /// mirror lookup, match-id check, and all resulting writes in a single
  /// transaction. Validates that the season exists and is active.
  fn submit<'a>(
    &'a self,
    req: &'a SubmitRequest,
  ) -> impl Future<Output = Result<SubmitReceipt>> + Send + 'a;

  /// The non-withdrawn submission for (season, submitter, target), if any.
  fn find_active_submission<'a>(
    &'a self,
    season_id: &'a str,
    submitter: &'a Identity,
    target: &'a Identity,
  ) -> impl Future<Output = Result<Option<CrushSubmission>>> + Send + 'a;

  /// A submitter's non-withdrawn submissions in a season, newest first.
  fn list_submissions<'a>(
    &'a self,
    season_id: &'a str,
    submitter: &'a Identity,
  ) -> impl Future<Output = Result<Vec<CrushSubmission>>> + Send + 'a;

  /// Soft-delete a submission owned by `owner`. Idempotent: withdrawing an
  /// already-withdrawn submission returns it unchanged. Match records are
  /// never deleted, even when a matched submission is withdrawn.
  fn withdraw<'a>(
    &'a self,
    submission_id: Uuid,
    owner: &'a Identity,
  ) -> impl Future<Output = Result<CrushSubmission>> + Send + 'a;

  // ── Matches ───────────────────────────────────────────────────────────

  fn get_match<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<Match>>> + Send + 'a;

  /// All matches in a season in which `identity` participates.
  fn matches_for<'a>(
    &'a self,
    season_id: &'a str,
    identity: &'a Identity,
  ) -> impl Future<Output = Result<Vec<Match>>> + Send + 'a;

  // ── Aggregates ────────────────────────────────────────────────────────

  /// Number of non-withdrawn submissions targeting `target` in a season.
  /// Deliberately a bare count: submitter identities are never disclosed
  /// through this query.
  fn admirer_count<'a>(
    &'a self,
    season_id: &'a str,
    target: &'a Identity,
  ) -> impl Future<Output = Result<u64>> + Send + 'a;

  fn season_stats<'a>(
    &'a self,
    season_id: &'a str,
  ) -> impl Future<Output = Result<SeasonStats>> + Send + 'a;

  fn global_stats(
    &self,
  ) -> impl Future<Output = Result<GlobalStats>> + Send + '_;

  /// Rebuild every incremental counter from the ledger and match tables,
  /// overwriting the stored aggregates. Idempotent: running it twice with
  /// no intervening writes produces identical output.
  fn recompute_aggregates(
    &self,
  ) -> impl Future<Output = Result<()>> + Send + '_;
}
