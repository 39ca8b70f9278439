//! Handlers for the `/seasons` endpoints. Creation and ending are
//! admin-only; the active-season lookup is public.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use heartsync_core::{
  season::Season, store::CrushStore, submission::VisibilityMode,
};
use serde::Deserialize;

use crate::{AppState, auth::AdminAuthenticated, error::ApiError};

/// `GET /seasons/active`
pub async fn active<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Season>, ApiError>
where
  S: CrushStore + Clone + Send + Sync + 'static,
{
  let season = state
    .engine
    .store()
    .active_season()
    .await?
    .ok_or_else(|| ApiError::NotFound("no active season".into()))?;
  Ok(Json(season))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub id:                    String,
  pub name:                  String,
  pub start_at:              DateTime<Utc>,
  pub end_at:                DateTime<Utc>,
  #[serde(default = "default_true")]
  pub active:                bool,
  #[serde(default = "default_visibility")]
  pub default_visibility:    VisibilityMode,
  #[serde(default = "default_true")]
  pub mutual_reveal_enabled: bool,
}

fn default_true() -> bool { true }

fn default_visibility() -> VisibilityMode { VisibilityMode::AnonCount }

/// `POST /seasons` (admin)
pub async fn create<S>(
  _: AdminAuthenticated,
  State(state): State<AppState<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CrushStore + Clone + Send + Sync + 'static,
{
  if body.id.trim().is_empty() {
    return Err(ApiError::BadRequest("season id is empty".into()));
  }
  let season = state
    .engine
    .store()
    .create_season(Season {
      id:                    body.id,
      name:                  body.name,
      start_at:              body.start_at,
      end_at:                body.end_at,
      active:                body.active,
      default_visibility:    body.default_visibility,
      mutual_reveal_enabled: body.mutual_reveal_enabled,
    })
    .await?;
  tracing::info!(season = %season.id, active = season.active, "season created");
  Ok((StatusCode::CREATED, Json(season)))
}

/// `POST /seasons/:id/end` (admin)
pub async fn end<S>(
  _: AdminAuthenticated,
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<Season>, ApiError>
where
  S: CrushStore + Clone + Send + Sync + 'static,
{
  let season = state.engine.store().end_season(&id).await?;
  tracing::info!(season = %season.id, "season ended");
  Ok(Json(season))
}
