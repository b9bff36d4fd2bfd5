use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use tracing::info;

use crate::error::ApiError;
use crate::middleware::MaybeUser;
use crate::response::{ApiJson, found};
use crate::session::{removal_cookie, session_cookie};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Identity {
    pub username: Option<String>,
    pub exp: Option<i64>,
}

/// Drops the session cookie and goes back home.
pub async fn logout() -> Response {
    (CookieJar::new().add(removal_cookie()), found("/")).into_response()
}

/// Signs in as `username` without a provider. Only routed when enabled.
pub async fn dev_login(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Response, ApiError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ApiError::BadRequest("username is required".into()));
    }
    let (token, _) = state.sessions.issue(username).map_err(|e| ApiError::Internal(e.into()))?;

    info!("Dev login as {}", username);
    Ok((CookieJar::new().add(session_cookie(token)), found("/")).into_response())
}

pub async fn whoami(MaybeUser(claims): MaybeUser) -> impl IntoResponse {
    ApiJson::ok(Identity {
        exp: claims.as_ref().map(|c| c.exp),
        username: claims.map(|c| c.username),
    })
}

pub async fn health() -> impl IntoResponse {
    ApiJson::ok(serde_json::json!({ "status": "ok" }))
}
