use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::auth::AuthError;
use crate::error::AppError;
use crate::server::{bearer_key, AppState};

#[derive(Debug, Deserialize)]
pub struct BootstrapPayload {
    psk: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

/// POST /v1/auth: the PSK bootstrap handshake.
///
/// Credentials are optional: with none, the minted session is anonymous
/// (bootstrap-only); with both, they must verify and the session carries the
/// account. Every failure is the same opaque 401 and mints nothing.
pub async fn create_session(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(payload): Json<BootstrapPayload>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let user = match (&payload.username, &payload.password) {
        (Some(username), Some(password)) => {
            let Some(profile) = state.store.user_by_username(username)? else {
                return Err(AuthError::Failure.into());
            };
            if !state.passwords.verify(&profile.phash, password) {
                return Err(AuthError::Failure.into());
            }
            Some(profile.id)
        }
        (None, None) => None,
        // Half-presented credentials are malformed; same opaque failure.
        _ => return Err(AuthError::Failure.into()),
    };

    let token = state.auth.bootstrap(&payload.psk, &addr.ip().to_string(), user)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "ok",
            "info": "Session established.",
            "session_key": token.session_key(),
        })),
    ))
}

/// DELETE /v1/auth: explicit logout; evicts the presented session key.
pub async fn destroy_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let Some(key) = bearer_key(&headers) else {
        return Err(AuthError::Failure.into());
    };
    if !state.auth.store().evict(&key) {
        return Err(AuthError::Failure.into());
    }
    Ok((
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "info": "Session destroyed.",
        })),
    ))
}
