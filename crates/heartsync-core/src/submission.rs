//! Crush submissions — one-directional declarations of interest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::identity::Identity;

/// What the submitter allows the system to disclose about this submission.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum VisibilityMode {
  /// Only ever counted anonymously.
  AnonCount,
  /// Revealed only if the crush turns out to be mutual.
  MutualOnly,
  /// Revealed when the season ends, mutual or not.
  RevealAfterPeriod,
}

/// Lifecycle status of a submission. `Matched` is terminal.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CrushStatus {
  Pending,
  Matched,
}

/// One submitted crush.
///
/// Key fields (season, submitter, target) are immutable once set. The only
/// mutations ever applied are flipping `status`/`is_mutual` on match and
/// setting the `withdrawn` soft-delete flag. Rows are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrushSubmission {
  pub id:                     Uuid,
  pub season_id:              String,
  pub submitter_user_id:      String,
  pub submitter_identity:     Identity,
  pub submitter_display_name: String,
  pub target_identity:        Identity,
  pub target_display_name:    String,
  pub visibility:             VisibilityMode,
  pub status:                 CrushStatus,
  /// Monotonic: once true, never reverts while `withdrawn` is false.
  pub is_mutual:              bool,
  pub withdrawn:              bool,
  /// Store-assigned; immutable once set.
  pub created_at:             DateTime<Utc>,
}

impl CrushSubmission {
  pub fn is_matched(&self) -> bool {
    matches!(self.status, CrushStatus::Matched)
  }
}
