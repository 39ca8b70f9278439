//! [`SqliteStore`] — the SQLite implementation of [`CrushStore`].

use std::path::Path;

use chrono::{Duration, NaiveDate, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use heartsync_core::{
  Error, Result,
  identity::Identity,
  matching::Match,
  profile::UserProfile,
  reconcile::{self, Plan, SubmitRequest},
  season::Season,
  store::{
    CrushStore, DailyCount, GlobalStats, SeasonStats, SubmitReceipt,
    TargetCount,
  },
  submission::CrushSubmission,
};

use crate::{
  encode::{RawCrush, RawMatch, RawSeason, decode_visibility, encode_dt, encode_uuid},
  error::{domain, from_call},
  schema::SCHEMA,
};

type CallResult<T> = std::result::Result<T, tokio_rusqlite::Error>;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Heartsync store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All
/// statements run on one connection worker thread, so write transactions
/// are serialized; `SQLITE_BUSY` from a second process surfaces as
/// [`Error::Conflict`] and is retried by the engine.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path)
      .await
      .map_err(from_call)?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory()
      .await
      .map_err(from_call)?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await
      .map_err(from_call)
  }
}

// ─── Row helpers (run on the connection thread) ──────────────────────────────

fn season_by_id(
  conn: &rusqlite::Connection,
  id: &str,
) -> CallResult<Option<RawSeason>> {
  let sql =
    format!("SELECT {} FROM seasons WHERE season_id = ?1", RawSeason::COLUMNS);
  Ok(
    conn
      .query_row(&sql, rusqlite::params![id], |row| RawSeason::from_row(row))
      .optional()?,
  )
}

/// The non-withdrawn submission for (season, submitter, target), if any.
fn live_crush(
  conn: &rusqlite::Connection,
  season_id: &str,
  submitter: &str,
  target: &str,
) -> CallResult<Option<RawCrush>> {
  let sql = format!(
    "SELECT {} FROM crushes
     WHERE season_id = ?1 AND submitter_identity = ?2
       AND target_identity = ?3 AND withdrawn = 0",
    RawCrush::COLUMNS
  );
  Ok(
    conn
      .query_row(&sql, rusqlite::params![season_id, submitter, target], |row| {
        RawCrush::from_row(row)
      })
      .optional()?,
  )
}

fn match_by_id(
  conn: &rusqlite::Connection,
  id: &str,
) -> CallResult<Option<RawMatch>> {
  let sql =
    format!("SELECT {} FROM matches WHERE match_id = ?1", RawMatch::COLUMNS);
  Ok(
    conn
      .query_row(&sql, rusqlite::params![id], |row| RawMatch::from_row(row))
      .optional()?,
  )
}

fn insert_crush(
  conn: &rusqlite::Connection,
  c: &CrushSubmission,
) -> CallResult<()> {
  conn.execute(
    "INSERT INTO crushes (
       crush_id, season_id, submitter_user_id, submitter_identity,
       submitter_display_name, target_identity, target_display_name,
       visibility, status, is_mutual, withdrawn, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    rusqlite::params![
      encode_uuid(c.id),
      c.season_id,
      c.submitter_user_id,
      c.submitter_identity.as_str(),
      c.submitter_display_name,
      c.target_identity.as_str(),
      c.target_display_name,
      c.visibility.to_string(),
      c.status.to_string(),
      c.is_mutual,
      c.withdrawn,
      encode_dt(c.created_at),
    ],
  )?;
  Ok(())
}

fn mark_matched(conn: &rusqlite::Connection, id: Uuid) -> CallResult<()> {
  conn.execute(
    "UPDATE crushes SET status = 'matched', is_mutual = 1
     WHERE crush_id = ?1",
    rusqlite::params![encode_uuid(id)],
  )?;
  Ok(())
}

fn insert_match(conn: &rusqlite::Connection, m: &Match) -> CallResult<()> {
  conn.execute(
    "INSERT INTO matches (
       match_id, season_id, user_a_identity, user_b_identity,
       user_a_name, user_b_name, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    rusqlite::params![
      m.id,
      m.season_id,
      m.user_a_identity.as_str(),
      m.user_b_identity.as_str(),
      m.user_a_name,
      m.user_b_name,
      encode_dt(m.created_at),
    ],
  )?;
  Ok(())
}

fn season_scope(season_id: &str) -> String { format!("season:{season_id}") }

/// Adjust an incremental counter. Counters never go below zero even if the
/// increment path drifted.
fn bump(
  conn: &rusqlite::Connection,
  scope: &str,
  metric: &str,
  delta: i64,
) -> CallResult<()> {
  conn.execute(
    "INSERT INTO aggregates (scope, metric, value)
     VALUES (?1, ?2, MAX(0, ?3))
     ON CONFLICT (scope, metric) DO UPDATE SET value = MAX(0, value + ?3)",
    rusqlite::params![scope, metric, delta],
  )?;
  Ok(())
}

fn counter(
  conn: &rusqlite::Connection,
  scope: &str,
  metric: &str,
) -> CallResult<u64> {
  let value: Option<i64> = conn
    .query_row(
      "SELECT value FROM aggregates WHERE scope = ?1 AND metric = ?2",
      rusqlite::params![scope, metric],
      |row| row.get(0),
    )
    .optional()?;
  Ok(value.unwrap_or(0).max(0) as u64)
}

// ─── The atomic reconcile ────────────────────────────────────────────────────

/// Execute the reconciliation protocol for one submission. Must be called
/// inside an open transaction: the idempotency read, the mirror read, the
/// match-id read, and every resulting write commit or roll back together.
fn submit_in_tx(
  conn: &rusqlite::Connection,
  req: &SubmitRequest,
) -> CallResult<SubmitReceipt> {
  let season = season_by_id(conn, &req.season_id)?
    .ok_or_else(|| domain(Error::SeasonNotFound(req.season_id.clone())))?;
  if !season.active {
    return Err(domain(Error::SeasonClosed(req.season_id.clone())));
  }
  let visibility = match req.visibility {
    Some(v) => v,
    None => decode_visibility(&season.default_visibility).map_err(domain)?,
  };

  let existing = live_crush(
    conn,
    &req.season_id,
    req.submitter.identity.as_str(),
    req.target_identity.as_str(),
  )?
  .map(RawCrush::into_submission)
  .transpose()
  .map_err(domain)?;

  let reciprocal = live_crush(
    conn,
    &req.season_id,
    req.target_identity.as_str(),
    req.submitter.identity.as_str(),
  )?
  .map(RawCrush::into_submission)
  .transpose()
  .map_err(domain)?;

  let prior_match = match_by_id(conn, &req.match_id())?
    .map(RawMatch::into_match)
    .transpose()
    .map_err(domain)?;

  let plan = reconcile::plan(
    req,
    visibility,
    existing,
    reciprocal,
    prior_match,
    Uuid::new_v4(),
    Utc::now(),
  );

  match plan {
    Plan::Duplicate { existing } => {
      let matched = existing.is_mutual;
      Ok(SubmitReceipt { submission: existing, matched, duplicate: true })
    }

    Plan::Pending { submission } => {
      insert_crush(conn, &submission)?;
      bump(conn, "global", "crushes", 1)?;
      bump(conn, &season_scope(&req.season_id), "crushes", 1)?;
      Ok(SubmitReceipt { submission, matched: false, duplicate: false })
    }

    Plan::Matched {
      submission,
      reciprocal_id,
      match_record,
      match_preexisting,
    } => {
      insert_crush(conn, &submission)?;
      mark_matched(conn, reciprocal_id)?;
      bump(conn, "global", "crushes", 1)?;
      bump(conn, &season_scope(&req.season_id), "crushes", 1)?;
      if !match_preexisting {
        insert_match(conn, &match_record)?;
        bump(conn, "global", "matches", 1)?;
        bump(conn, &season_scope(&req.season_id), "matches", 1)?;
      }
      Ok(SubmitReceipt { submission, matched: true, duplicate: false })
    }
  }
}

// ─── CrushStore impl ─────────────────────────────────────────────────────────

impl CrushStore for SqliteStore {
  // ── Seasons ───────────────────────────────────────────────────────────────

  async fn create_season(&self, season: Season) -> Result<Season> {
    let stored = season.clone();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let taken: bool = tx
          .query_row(
            "SELECT 1 FROM seasons WHERE season_id = ?1",
            rusqlite::params![season.id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Err(domain(Error::SeasonExists(season.id.clone())));
        }
        if season.active {
          // Single-active-season: activating one deactivates the rest.
          tx.execute("UPDATE seasons SET active = 0 WHERE active = 1", [])?;
        }
        tx.execute(
          "INSERT INTO seasons (
             season_id, name, start_at, end_at, active,
             default_visibility, mutual_reveal_enabled
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            season.id,
            season.name,
            encode_dt(season.start_at),
            encode_dt(season.end_at),
            season.active,
            season.default_visibility.to_string(),
            season.mutual_reveal_enabled,
          ],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await
      .map_err(from_call)?;
    Ok(stored)
  }

  async fn get_season(&self, id: &str) -> Result<Option<Season>> {
    let id = id.to_owned();
    let raw = self
      .conn
      .call(move |conn| season_by_id(conn, &id))
      .await
      .map_err(from_call)?;
    raw.map(RawSeason::into_season).transpose()
  }

  async fn active_season(&self) -> Result<Option<Season>> {
    let sql = format!(
      "SELECT {} FROM seasons WHERE active = 1 LIMIT 1",
      RawSeason::COLUMNS
    );
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, [], |row| RawSeason::from_row(row))
            .optional()?,
        )
      })
      .await
      .map_err(from_call)?;
    raw.map(RawSeason::into_season).transpose()
  }

  async fn end_season(&self, id: &str) -> Result<Season> {
    let id = id.to_owned();
    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let raw = season_by_id(&tx, &id)?
          .ok_or_else(|| domain(Error::SeasonNotFound(id.clone())))?;
        tx.execute(
          "UPDATE seasons SET active = 0 WHERE season_id = ?1",
          rusqlite::params![id],
        )?;
        tx.commit()?;
        Ok(raw)
      })
      .await
      .map_err(from_call)?;
    let mut season = raw.into_season()?;
    season.active = false;
    Ok(season)
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn upsert_user(&self, profile: &UserProfile) -> Result<()> {
    let p = profile.clone();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let known: bool = tx
          .query_row(
            "SELECT 1 FROM users WHERE user_id = ?1",
            rusqlite::params![p.user_id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if known {
          tx.execute(
            "UPDATE users SET identity = ?2, display_name = ?3
             WHERE user_id = ?1",
            rusqlite::params![p.user_id, p.identity.as_str(), p.display_name],
          )?;
        } else {
          tx.execute(
            "INSERT INTO users (user_id, identity, display_name, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
              p.user_id,
              p.identity.as_str(),
              p.display_name,
              encode_dt(Utc::now()),
            ],
          )?;
          bump(&tx, "global", "users", 1)?;
        }
        tx.commit()?;
        Ok(())
      })
      .await
      .map_err(from_call)
  }

  // ── Ledger ────────────────────────────────────────────────────────────────

  async fn submit(&self, req: &SubmitRequest) -> Result<SubmitReceipt> {
    let req = req.clone();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let receipt = submit_in_tx(&tx, &req)?;
        tx.commit()?;
        Ok(receipt)
      })
      .await
      .map_err(from_call)
  }

  async fn find_active_submission(
    &self,
    season_id: &str,
    submitter: &Identity,
    target: &Identity,
  ) -> Result<Option<CrushSubmission>> {
    let season_id = season_id.to_owned();
    let submitter = submitter.as_str().to_owned();
    let target = target.as_str().to_owned();
    let raw = self
      .conn
      .call(move |conn| live_crush(conn, &season_id, &submitter, &target))
      .await
      .map_err(from_call)?;
    raw.map(RawCrush::into_submission).transpose()
  }

  async fn list_submissions(
    &self,
    season_id: &str,
    submitter: &Identity,
  ) -> Result<Vec<CrushSubmission>> {
    let season_id = season_id.to_owned();
    let submitter = submitter.as_str().to_owned();
    let raws: Vec<RawCrush> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM crushes
           WHERE season_id = ?1 AND submitter_identity = ?2 AND withdrawn = 0
           ORDER BY created_at DESC",
          RawCrush::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![season_id, submitter], |row| {
            RawCrush::from_row(row)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(from_call)?;
    raws.into_iter().map(RawCrush::into_submission).collect()
  }

  async fn withdraw(
    &self,
    submission_id: Uuid,
    owner: &Identity,
  ) -> Result<CrushSubmission> {
    let owner = owner.as_str().to_owned();
    let id_str = encode_uuid(submission_id);
    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let sql = format!(
          "SELECT {} FROM crushes WHERE crush_id = ?1",
          RawCrush::COLUMNS
        );
        let raw = tx
          .query_row(&sql, rusqlite::params![id_str], |row| {
            RawCrush::from_row(row)
          })
          .optional()?
          .ok_or_else(|| domain(Error::SubmissionNotFound(submission_id)))?;
        // Not distinguishing "someone else's submission" from "no such
        // submission" keeps the ledger non-enumerable.
        if raw.submitter_identity != owner {
          return Err(domain(Error::SubmissionNotFound(submission_id)));
        }
        if !raw.withdrawn {
          tx.execute(
            "UPDATE crushes SET withdrawn = 1 WHERE crush_id = ?1",
            rusqlite::params![id_str],
          )?;
          bump(&tx, "global", "crushes", -1)?;
          bump(&tx, &season_scope(&raw.season_id), "crushes", -1)?;
        }
        tx.commit()?;
        Ok(raw)
      })
      .await
      .map_err(from_call)?;
    let mut submission = raw.into_submission()?;
    submission.withdrawn = true;
    Ok(submission)
  }

  // ── Matches ───────────────────────────────────────────────────────────────

  async fn get_match(&self, id: &str) -> Result<Option<Match>> {
    let id = id.to_owned();
    let raw = self
      .conn
      .call(move |conn| match_by_id(conn, &id))
      .await
      .map_err(from_call)?;
    raw.map(RawMatch::into_match).transpose()
  }

  async fn matches_for(
    &self,
    season_id: &str,
    identity: &Identity,
  ) -> Result<Vec<Match>> {
    let season_id = season_id.to_owned();
    let identity = identity.as_str().to_owned();
    let raws: Vec<RawMatch> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM matches
           WHERE season_id = ?1
             AND (user_a_identity = ?2 OR user_b_identity = ?2)
           ORDER BY created_at DESC",
          RawMatch::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![season_id, identity], |row| {
            RawMatch::from_row(row)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(from_call)?;
    raws.into_iter().map(RawMatch::into_match).collect()
  }

  // ── Aggregates ────────────────────────────────────────────────────────────

  async fn admirer_count(
    &self,
    season_id: &str,
    target: &Identity,
  ) -> Result<u64> {
    let season_id = season_id.to_owned();
    let target = target.as_str().to_owned();
    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM crushes
           WHERE season_id = ?1 AND target_identity = ?2 AND withdrawn = 0",
          rusqlite::params![season_id, target],
          |row| row.get(0),
        )?)
      })
      .await
      .map_err(from_call)?;
    Ok(count.max(0) as u64)
  }

  async fn season_stats(&self, season_id: &str) -> Result<SeasonStats> {
    let sid = season_id.to_owned();
    let (total_crushes, total_matches, tops, days) = self
      .conn
      .call(move |conn| {
        let scope = season_scope(&sid);
        let total_crushes = counter(conn, &scope, "crushes")?;
        let total_matches = counter(conn, &scope, "matches")?;

        let mut stmt = conn.prepare(
          "SELECT target_identity, COUNT(*) AS n FROM crushes
           WHERE season_id = ?1 AND withdrawn = 0
           GROUP BY target_identity
           ORDER BY n DESC, target_identity ASC
           LIMIT 10",
        )?;
        let tops = stmt
          .query_map(rusqlite::params![sid], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
          "SELECT date(created_at) AS day, COUNT(*) FROM crushes
           WHERE season_id = ?1 AND withdrawn = 0
           GROUP BY day
           ORDER BY day ASC",
        )?;
        let days = stmt
          .query_map(rusqlite::params![sid], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((total_crushes, total_matches, tops, days))
      })
      .await
      .map_err(from_call)?;

    let top_targets = tops
      .into_iter()
      .map(|(identity, count)| TargetCount {
        identity: Identity::normalize(&identity),
        count:    count.max(0) as u64,
      })
      .collect();

    let daily_counts = days
      .into_iter()
      .map(|(day, count)| {
        let date = NaiveDate::parse_from_str(&day, "%Y-%m-%d")
          .map_err(|e| Error::Storage(format!("bad day bucket {day:?}: {e}")))?;
        Ok(DailyCount { date, count: count.max(0) as u64 })
      })
      .collect::<Result<Vec<_>>>()?;

    Ok(SeasonStats {
      season_id: season_id.to_owned(),
      total_crushes,
      total_matches,
      top_targets,
      daily_counts,
    })
  }

  async fn global_stats(&self) -> Result<GlobalStats> {
    let cutoff = encode_dt(Utc::now() - Duration::days(7));
    self
      .conn
      .call(move |conn| {
        let total_users = counter(conn, "global", "users")?;
        let total_crushes = counter(conn, "global", "crushes")?;
        let total_matches = counter(conn, "global", "matches")?;
        let activity: i64 = conn.query_row(
          "SELECT COUNT(*) FROM crushes WHERE created_at >= ?1",
          rusqlite::params![cutoff],
          |row| row.get(0),
        )?;
        Ok(GlobalStats {
          total_users,
          total_crushes,
          total_matches,
          activity_7d: activity.max(0) as u64,
        })
      })
      .await
      .map_err(from_call)
  }

  async fn recompute_aggregates(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        tx.execute_batch(
          "DELETE FROM aggregates;
           INSERT INTO aggregates (scope, metric, value) VALUES
             ('global', 'users',   (SELECT COUNT(*) FROM users)),
             ('global', 'crushes',
                (SELECT COUNT(*) FROM crushes WHERE withdrawn = 0)),
             ('global', 'matches', (SELECT COUNT(*) FROM matches));
           INSERT INTO aggregates (scope, metric, value)
             SELECT 'season:' || season_id, 'crushes', COUNT(*)
             FROM crushes WHERE withdrawn = 0 GROUP BY season_id;
           INSERT INTO aggregates (scope, metric, value)
             SELECT 'season:' || season_id, 'matches', COUNT(*)
             FROM matches GROUP BY season_id;",
        )?;
        tx.commit()?;
        Ok(())
      })
      .await
      .map_err(from_call)
  }
}
