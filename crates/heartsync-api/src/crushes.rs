//! Handlers for the `/crushes` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/crushes` | Submit; 201 on new entry, 200 on idempotent replay |
//! | `GET`  | `/crushes` | `?season_id=&submitter=` — the caller's own entries |
//! | `POST` | `/crushes/:id/withdraw` | Body: `{"submitter":"@handle"}` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use heartsync_core::{
  identity::Identity,
  profile::UserProfile,
  store::{CrushStore, SubmitReceipt},
  submission::{CrushSubmission, VisibilityMode},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

// ─── Submit ──────────────────────────────────────────────────────────────────

/// The aliases keep requests from pre-rename clients working; new clients
/// use the snake_case names.
#[derive(Debug, Deserialize)]
pub struct SubmitBody {
  pub submitter_user_id: String,
  #[serde(alias = "submitterInstagram")]
  pub submitter_handle:  String,
  #[serde(default)]
  pub submitter_name:    Option<String>,
  #[serde(alias = "targetInstagram")]
  pub target_handle:     String,
  #[serde(default)]
  pub target_name:       Option<String>,
  pub season_id:         String,
  #[serde(default)]
  pub visibility:        Option<VisibilityMode>,
}

/// `POST /crushes`
pub async fn submit<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<SubmitBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CrushStore + Clone + Send + Sync + 'static,
{
  let submitter_name = body
    .submitter_name
    .unwrap_or_else(|| body.submitter_handle.trim().to_owned());
  let submitter = UserProfile::new(
    body.submitter_user_id,
    &body.submitter_handle,
    submitter_name,
  );

  let receipt: SubmitReceipt = state
    .engine
    .submit_crush(
      submitter.clone(),
      body.target_name.as_deref().unwrap_or(""),
      &body.target_handle,
      &body.season_id,
      body.visibility,
    )
    .await?;

  // Refresh the profile record only once the submission was accepted.
  state.engine.store().upsert_user(&submitter).await?;

  let status =
    if receipt.duplicate { StatusCode::OK } else { StatusCode::CREATED };
  Ok((status, Json(receipt)))
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub season_id: String,
  pub submitter: String,
}

/// `GET /crushes?season_id=<id>&submitter=<handle>`
///
/// Listing is scoped to the submitter named in the query; the caller's
/// identity is taken on trust, as authentication of end users lives outside
/// this service.
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<CrushSubmission>>, ApiError>
where
  S: CrushStore + Clone + Send + Sync + 'static,
{
  let submitter = Identity::normalize(&params.submitter);
  if submitter.is_empty() {
    return Err(ApiError::BadRequest("submitter handle is empty".into()));
  }
  let entries = state
    .engine
    .store()
    .list_submissions(&params.season_id, &submitter)
    .await?;
  Ok(Json(entries))
}

// ─── Withdraw ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct WithdrawBody {
  pub submitter: String,
}

/// `POST /crushes/:id/withdraw`
pub async fn withdraw<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<WithdrawBody>,
) -> Result<Json<CrushSubmission>, ApiError>
where
  S: CrushStore + Clone + Send + Sync + 'static,
{
  let owner = Identity::normalize(&body.submitter);
  if owner.is_empty() {
    return Err(ApiError::BadRequest("submitter handle is empty".into()));
  }
  let withdrawn = state.engine.store().withdraw(id, &owner).await?;
  Ok(Json(withdrawn))
}
