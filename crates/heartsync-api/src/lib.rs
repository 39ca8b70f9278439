//! JSON HTTP API for Heartsync.
//!
//! Exposes an axum [`Router`] backed by any
//! [`heartsync_core::store::CrushStore`]. Submission traffic is public (end
//! user authentication lives with the account provider in front of this
//! service); season administration and store-wide statistics sit behind
//! HTTP Basic auth with an argon2-hashed credential.

pub mod auth;
pub mod crushes;
pub mod error;
pub mod matches;
pub mod seasons;
pub mod stats;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use heartsync_core::{engine::Matchmaker, store::CrushStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::AdminAuth;
pub use error::ApiError;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  pub store_path:          PathBuf,
  pub admin_username:      String,
  pub admin_password_hash: String,
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: CrushStore> {
  pub engine: Matchmaker<S>,
  pub config: Arc<ServerConfig>,
  pub auth:   Arc<AdminAuth>,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the Heartsync API.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: CrushStore + Clone + Send + Sync + 'static,
{
  Router::new()
    // Ledger
    .route("/crushes", post(crushes::submit::<S>).get(crushes::list::<S>))
    .route("/crushes/{id}/withdraw", post(crushes::withdraw::<S>))
    // Matches and counts
    .route("/matches", get(matches::list::<S>))
    .route("/admirers/{handle}", get(stats::admirers::<S>))
    // Seasons
    .route("/seasons", post(seasons::create::<S>))
    .route("/seasons/active", get(seasons::active::<S>))
    .route("/seasons/{id}/end", post(seasons::end::<S>))
    // Statistics
    .route("/stats/recompute", post(stats::recompute::<S>))
    .route("/stats/{season_id}", get(stats::season::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use base64::Engine as _;
  use base64::engine::general_purpose::STANDARD as B64;
  use chrono::{Duration, Utc};
  use heartsync_core::{
    season::Season, store::CrushStore as _, submission::VisibilityMode,
  };
  use heartsync_store_sqlite::SqliteStore;
  use rand_core::OsRng;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  use super::*;

  async fn make_state(password: &str) -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let now = Utc::now();
    store
      .create_season(Season {
        id:                    "s1".to_string(),
        name:                  "Season One".to_string(),
        start_at:              now - Duration::days(1),
        end_at:                now + Duration::days(13),
        active:                true,
        default_visibility:    VisibilityMode::AnonCount,
        mutual_reveal_enabled: true,
      })
      .await
      .unwrap();

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string();

    AppState {
      engine: Matchmaker::new(Arc::new(store)),
      config: Arc::new(ServerConfig {
        host:                "127.0.0.1".to_string(),
        port:                8400,
        store_path:          PathBuf::from(":memory:"),
        admin_username:      "admin".to_string(),
        admin_password_hash: hash.clone(),
      }),
      auth:   Arc::new(AdminAuth {
        username:      "admin".to_string(),
        password_hash: hash,
      }),
    }
  }

  fn auth_header(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  async fn call(
    state: AppState<SqliteStore>,
    method: &str,
    uri: &str,
    auth: Option<&str>,
    body: Option<Value>,
  ) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
      builder = builder.header(header::AUTHORIZATION, auth);
    }
    let req = match body {
      Some(v) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(v.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    router(state).oneshot(req).await.unwrap()
  }

  async fn json_body(resp: axum::response::Response) -> Value {
    let bytes =
      axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  fn submit_body(submitter: &str, target: &str) -> Value {
    json!({
      "submitter_user_id": format!("uid-{submitter}"),
      "submitter_handle": submitter,
      "submitter_name": submitter.to_uppercase(),
      "target_handle": target,
      "season_id": "s1",
    })
  }

  // ── Submission ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn submit_returns_201_and_replay_returns_200() {
    let state = make_state("secret").await;

    let first = call(
      state.clone(),
      "POST",
      "/crushes",
      None,
      Some(submit_body("alice", "@bob")),
    )
    .await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let first = json_body(first).await;
    assert_eq!(first["duplicate"], json!(false));
    assert_eq!(first["matched"], json!(false));

    let replay = call(
      state,
      "POST",
      "/crushes",
      None,
      Some(submit_body("alice", "@bob")),
    )
    .await;
    assert_eq!(replay.status(), StatusCode::OK);
    let replay = json_body(replay).await;
    assert_eq!(replay["duplicate"], json!(true));
    assert_eq!(replay["submission"]["id"], first["submission"]["id"]);
  }

  #[tokio::test]
  async fn mutual_submission_closes_a_match() {
    let state = make_state("secret").await;

    call(
      state.clone(),
      "POST",
      "/crushes",
      None,
      Some(submit_body("alice", " @Bob ")),
    )
    .await;
    let second = call(
      state.clone(),
      "POST",
      "/crushes",
      None,
      Some(submit_body("bob", "ALICE")),
    )
    .await;
    assert_eq!(second.status(), StatusCode::CREATED);
    assert_eq!(json_body(second).await["matched"], json!(true));

    let matches = call(
      state,
      "GET",
      "/matches?season_id=s1&identity=alice",
      None,
      None,
    )
    .await;
    assert_eq!(matches.status(), StatusCode::OK);
    let matches = json_body(matches).await;
    assert_eq!(matches.as_array().unwrap().len(), 1);
    assert_eq!(matches[0]["id"], json!("s1_alice_bob"));
  }

  #[tokio::test]
  async fn legacy_field_names_still_accepted() {
    let state = make_state("secret").await;
    let resp = call(
      state,
      "POST",
      "/crushes",
      None,
      Some(json!({
        "submitter_user_id": "uid-alice",
        "submitterInstagram": "@alice",
        "targetInstagram": "@bob",
        "season_id": "s1",
      })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_body(resp).await;
    assert_eq!(body["submission"]["target_identity"], json!("bob"));
  }

  #[tokio::test]
  async fn self_crush_returns_400() {
    let state = make_state("secret").await;
    let resp = call(
      state,
      "POST",
      "/crushes",
      None,
      Some(submit_body("alice", " @ALICE ")),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn unknown_season_returns_404() {
    let state = make_state("secret").await;
    let mut body = submit_body("alice", "@bob");
    body["season_id"] = json!("nope");
    let resp = call(state, "POST", "/crushes", None, Some(body)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn ended_season_returns_409() {
    let state = make_state("secret").await;
    let auth = auth_header("admin", "secret");

    let ended =
      call(state.clone(), "POST", "/seasons/s1/end", Some(&auth), None).await;
    assert_eq!(ended.status(), StatusCode::OK);

    let resp = call(
      state,
      "POST",
      "/crushes",
      None,
      Some(submit_body("alice", "@bob")),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
  }

  // ── Withdraw and listing ────────────────────────────────────────────────

  #[tokio::test]
  async fn withdraw_removes_the_entry_from_listing() {
    let state = make_state("secret").await;

    let created = call(
      state.clone(),
      "POST",
      "/crushes",
      None,
      Some(submit_body("alice", "@bob")),
    )
    .await;
    let id = json_body(created).await["submission"]["id"]
      .as_str()
      .unwrap()
      .to_owned();

    let resp = call(
      state.clone(),
      "POST",
      &format!("/crushes/{id}/withdraw"),
      None,
      Some(json!({ "submitter": "@alice" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let listing = call(
      state,
      "GET",
      "/crushes?season_id=s1&submitter=alice",
      None,
      None,
    )
    .await;
    assert_eq!(json_body(listing).await.as_array().unwrap().len(), 0);
  }

  #[tokio::test]
  async fn withdraw_by_a_stranger_returns_404() {
    let state = make_state("secret").await;
    let created = call(
      state.clone(),
      "POST",
      "/crushes",
      None,
      Some(submit_body("alice", "@bob")),
    )
    .await;
    let id = json_body(created).await["submission"]["id"]
      .as_str()
      .unwrap()
      .to_owned();

    let resp = call(
      state,
      "POST",
      &format!("/crushes/{id}/withdraw"),
      None,
      Some(json!({ "submitter": "@mallory" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  // ── Admirer counts ──────────────────────────────────────────────────────

  #[tokio::test]
  async fn admirer_count_is_a_number_without_names() {
    let state = make_state("secret").await;
    for admirer in ["xavier", "zoe", "wendy"] {
      call(
        state.clone(),
        "POST",
        "/crushes",
        None,
        Some(submit_body(admirer, "@Yuki")),
      )
      .await;
    }

    let resp =
      call(state, "GET", "/admirers/yuki?season_id=s1", None, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["count"], json!(3));
    // Only the count crosses this boundary.
    let text = body.to_string();
    for admirer in ["xavier", "zoe", "wendy"] {
      assert!(!text.contains(admirer), "leaked {admirer}: {text}");
    }
  }

  // ── Seasons ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn season_creation_requires_the_admin_credential() {
    let state = make_state("secret").await;
    let body = json!({
      "id": "s2",
      "name": "Season Two",
      "start_at": Utc::now(),
      "end_at": Utc::now() + Duration::days(14),
    });

    let denied =
      call(state.clone(), "POST", "/seasons", None, Some(body.clone())).await;
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);
    assert!(denied.headers().contains_key(header::WWW_AUTHENTICATE));

    let auth = auth_header("admin", "secret");
    let created =
      call(state.clone(), "POST", "/seasons", Some(&auth), Some(body)).await;
    assert_eq!(created.status(), StatusCode::CREATED);

    // The new season became the single active one.
    let active = call(state, "GET", "/seasons/active", None, None).await;
    assert_eq!(json_body(active).await["id"], json!("s2"));
  }

  #[tokio::test]
  async fn duplicate_season_returns_409() {
    let state = make_state("secret").await;
    let auth = auth_header("admin", "secret");
    let body = json!({
      "id": "s1",
      "name": "Again",
      "start_at": Utc::now(),
      "end_at": Utc::now() + Duration::days(14),
    });
    let resp = call(state, "POST", "/seasons", Some(&auth), Some(body)).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
  }

  // ── Statistics ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn stats_hide_global_totals_from_the_public() {
    let state = make_state("secret").await;
    call(
      state.clone(),
      "POST",
      "/crushes",
      None,
      Some(submit_body("alice", "@bob")),
    )
    .await;
    call(
      state.clone(),
      "POST",
      "/crushes",
      None,
      Some(submit_body("bob", "@alice")),
    )
    .await;

    let public = call(state.clone(), "GET", "/stats/s1", None, None).await;
    assert_eq!(public.status(), StatusCode::OK);
    let public = json_body(public).await;
    assert_eq!(public["total_crushes"], json!(2));
    assert_eq!(public["total_matches"], json!(1));
    assert!(public.get("global").is_none());

    let auth = auth_header("admin", "secret");
    let admin = call(state, "GET", "/stats/s1", Some(&auth), None).await;
    let admin = json_body(admin).await;
    assert_eq!(admin["global"]["total_crushes"], json!(2));
    assert_eq!(admin["global"]["total_matches"], json!(1));
  }

  #[tokio::test]
  async fn stats_for_unknown_season_return_404() {
    let state = make_state("secret").await;
    let resp = call(state, "GET", "/stats/nope", None, None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn recompute_requires_the_admin_credential() {
    let state = make_state("secret").await;

    let denied =
      call(state.clone(), "POST", "/stats/recompute", None, None).await;
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

    let auth = auth_header("admin", "secret");
    let resp = call(state, "POST", "/stats/recompute", Some(&auth), None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
  }
}
