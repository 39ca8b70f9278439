//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings,
//! and closed enums their `strum` text encodings.

use chrono::{DateTime, Utc};
use heartsync_core::{
  Error, Result,
  identity::Identity,
  matching::Match,
  season::Season,
  submission::{CrushStatus, CrushSubmission, VisibilityMode},
};
use uuid::Uuid;

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> {
  Uuid::parse_str(s).map_err(|e| Error::Storage(format!("bad uuid {s:?}: {e}")))
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Storage(format!("bad timestamp {s:?}: {e}")))
}

pub fn decode_visibility(s: &str) -> Result<VisibilityMode> {
  s.parse()
    .map_err(|_| Error::Storage(format!("unknown visibility mode: {s:?}")))
}

pub fn decode_status(s: &str) -> Result<CrushStatus> {
  s.parse()
    .map_err(|_| Error::Storage(format!("unknown crush status: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `seasons` row.
pub struct RawSeason {
  pub season_id:             String,
  pub name:                  String,
  pub start_at:              String,
  pub end_at:                String,
  pub active:                bool,
  pub default_visibility:    String,
  pub mutual_reveal_enabled: bool,
}

impl RawSeason {
  pub const COLUMNS: &'static str = "season_id, name, start_at, end_at, \
     active, default_visibility, mutual_reveal_enabled";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      season_id:             row.get(0)?,
      name:                  row.get(1)?,
      start_at:              row.get(2)?,
      end_at:                row.get(3)?,
      active:                row.get(4)?,
      default_visibility:    row.get(5)?,
      mutual_reveal_enabled: row.get(6)?,
    })
  }

  pub fn into_season(self) -> Result<Season> {
    Ok(Season {
      id:                    self.season_id,
      name:                  self.name,
      start_at:              decode_dt(&self.start_at)?,
      end_at:                decode_dt(&self.end_at)?,
      active:                self.active,
      default_visibility:    decode_visibility(&self.default_visibility)?,
      mutual_reveal_enabled: self.mutual_reveal_enabled,
    })
  }
}

/// Raw values read directly from a `crushes` row.
pub struct RawCrush {
  pub crush_id:               String,
  pub season_id:              String,
  pub submitter_user_id:      String,
  pub submitter_identity:     String,
  pub submitter_display_name: String,
  pub target_identity:        String,
  pub target_display_name:    String,
  pub visibility:             String,
  pub status:                 String,
  pub is_mutual:              bool,
  pub withdrawn:              bool,
  pub created_at:             String,
}

impl RawCrush {
  pub const COLUMNS: &'static str = "crush_id, season_id, \
     submitter_user_id, submitter_identity, submitter_display_name, \
     target_identity, target_display_name, visibility, status, is_mutual, \
     withdrawn, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      crush_id:               row.get(0)?,
      season_id:              row.get(1)?,
      submitter_user_id:      row.get(2)?,
      submitter_identity:     row.get(3)?,
      submitter_display_name: row.get(4)?,
      target_identity:        row.get(5)?,
      target_display_name:    row.get(6)?,
      visibility:             row.get(7)?,
      status:                 row.get(8)?,
      is_mutual:              row.get(9)?,
      withdrawn:              row.get(10)?,
      created_at:             row.get(11)?,
    })
  }

  pub fn into_submission(self) -> Result<CrushSubmission> {
    Ok(CrushSubmission {
      id:                     decode_uuid(&self.crush_id)?,
      season_id:              self.season_id,
      submitter_user_id:      self.submitter_user_id,
      submitter_identity:     Identity::normalize(&self.submitter_identity),
      submitter_display_name: self.submitter_display_name,
      target_identity:        Identity::normalize(&self.target_identity),
      target_display_name:    self.target_display_name,
      visibility:             decode_visibility(&self.visibility)?,
      status:                 decode_status(&self.status)?,
      is_mutual:              self.is_mutual,
      withdrawn:              self.withdrawn,
      created_at:             decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `matches` row.
pub struct RawMatch {
  pub match_id:        String,
  pub season_id:       String,
  pub user_a_identity: String,
  pub user_b_identity: String,
  pub user_a_name:     String,
  pub user_b_name:     String,
  pub created_at:      String,
}

impl RawMatch {
  pub const COLUMNS: &'static str = "match_id, season_id, user_a_identity, \
     user_b_identity, user_a_name, user_b_name, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      match_id:        row.get(0)?,
      season_id:       row.get(1)?,
      user_a_identity: row.get(2)?,
      user_b_identity: row.get(3)?,
      user_a_name:     row.get(4)?,
      user_b_name:     row.get(5)?,
      created_at:      row.get(6)?,
    })
  }

  pub fn into_match(self) -> Result<Match> {
    Ok(Match {
      id:              self.match_id,
      season_id:       self.season_id,
      user_a_identity: Identity::normalize(&self.user_a_identity),
      user_b_identity: Identity::normalize(&self.user_b_identity),
      user_a_name:     self.user_a_name,
      user_b_name:     self.user_b_name,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}
