//! Handlers for admirer counts and aggregated statistics.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
};
use heartsync_core::{
  identity::Identity,
  store::{CrushStore, GlobalStats, SeasonStats},
};
use serde::{Deserialize, Serialize};

use crate::{
  AppState,
  auth::{AdminAuthenticated, verify_admin},
  error::ApiError,
};

// ─── Admirer count ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AdmirerParams {
  pub season_id: String,
}

#[derive(Debug, Serialize)]
pub struct AdmirerResponse {
  pub season_id: String,
  pub identity:  Identity,
  pub count:     u64,
}

/// `GET /admirers/:handle?season_id=<id>`
///
/// The count is all a caller ever learns; submitter identities are not
/// reachable through this endpoint.
pub async fn admirers<S>(
  State(state): State<AppState<S>>,
  Path(handle): Path<String>,
  Query(params): Query<AdmirerParams>,
) -> Result<Json<AdmirerResponse>, ApiError>
where
  S: CrushStore + Clone + Send + Sync + 'static,
{
  let identity = Identity::normalize(&handle);
  if identity.is_empty() {
    return Err(ApiError::BadRequest("handle is empty".into()));
  }
  let count = state
    .engine
    .store()
    .admirer_count(&params.season_id, &identity)
    .await?;
  Ok(Json(AdmirerResponse {
    season_id: params.season_id,
    identity,
    count,
  }))
}

// ─── Season statistics ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct StatsResponse {
  #[serde(flatten)]
  pub season: SeasonStats,
  /// Present only when the request carried a valid admin credential.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub global: Option<GlobalStats>,
}

/// `GET /stats/:season_id`
///
/// Public per-season aggregates; an admin credential extends the response
/// with the store-wide totals.
pub async fn season<S>(
  State(state): State<AppState<S>>,
  Path(season_id): Path<String>,
  headers: HeaderMap,
) -> Result<Json<StatsResponse>, ApiError>
where
  S: CrushStore + Clone + Send + Sync + 'static,
{
  let store = state.engine.store();
  store
    .get_season(&season_id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("season {season_id} not found")))?;

  let season = store.season_stats(&season_id).await?;
  let global = if verify_admin(&headers, &state.auth).is_ok() {
    Some(store.global_stats().await?)
  } else {
    None
  };
  Ok(Json(StatsResponse { season, global }))
}

/// `POST /stats/recompute` (admin) — rebuild the counters from the ledger.
pub async fn recompute<S>(
  _: AdminAuthenticated,
  State(state): State<AppState<S>>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CrushStore + Clone + Send + Sync + 'static,
{
  state.engine.store().recompute_aggregates().await?;
  tracing::info!("aggregates recomputed from the ledger");
  Ok(StatusCode::NO_CONTENT)
}
