//! HTTP Basic-auth extractor guarding the admin endpoints.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, request::Parts},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use heartsync_core::store::CrushStore;

use crate::{AppState, error::ApiError};

/// The admin credential accepted by this server instance.
#[derive(Clone)]
pub struct AdminAuth {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Zero-size marker: present in the handler means the request carried a
/// valid admin credential.
pub struct AdminAuthenticated;

/// Verify the admin credential directly from headers — used where admin
/// access is optional rather than required.
pub fn verify_admin(
  headers: &HeaderMap,
  auth: &AdminAuth,
) -> Result<(), ApiError> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds =
    std::str::from_utf8(&decoded).map_err(|_| ApiError::Unauthorized)?;

  let (username, password) =
    creds.split_once(':').ok_or(ApiError::Unauthorized)?;

  if username != auth.username {
    return Err(ApiError::Unauthorized);
  }

  let parsed_hash = PasswordHash::new(&auth.password_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  Ok(())
}

impl<S> FromRequestParts<AppState<S>> for AdminAuthenticated
where
  S: CrushStore + Clone + Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    verify_admin(&parts.headers, &state.auth)?;
    Ok(AdminAuthenticated)
  }
}
