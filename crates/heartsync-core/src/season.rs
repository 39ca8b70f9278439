//! Season — the administrator-defined time window scoping all crushes and
//! matches.
//!
//! Seasons are explicit entities, not ambient configuration: every core
//! operation takes a `season_id` rather than reading a process-wide
//! "current season". Cross-season matching never occurs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::submission::VisibilityMode;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Season {
  /// Admin-chosen slug, e.g. `"spring-fling-2026"`. Part of every match id.
  pub id:                    String,
  pub name:                  String,
  pub start_at:              DateTime<Utc>,
  pub end_at:                DateTime<Utc>,
  /// At most one season is active at a time in the intended design; this is
  /// maintained on create/end, not enforced against concurrent admin edits.
  pub active:                bool,
  /// Applied when a submission does not name a visibility mode.
  pub default_visibility:    VisibilityMode,
  pub mutual_reveal_enabled: bool,
}
