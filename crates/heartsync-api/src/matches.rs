//! Handler for `/matches`.

use axum::{
  Json,
  extract::{Query, State},
};
use heartsync_core::{identity::Identity, matching::Match, store::CrushStore};
use serde::Deserialize;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub season_id: String,
  pub identity:  String,
}

/// `GET /matches?season_id=<id>&identity=<handle>` — the caller's matches.
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Match>>, ApiError>
where
  S: CrushStore + Clone + Send + Sync + 'static,
{
  let identity = Identity::normalize(&params.identity);
  if identity.is_empty() {
    return Err(ApiError::BadRequest("identity handle is empty".into()));
  }
  let matches = state
    .engine
    .store()
    .matches_for(&params.season_id, &identity)
    .await?;
  Ok(Json(matches))
}
