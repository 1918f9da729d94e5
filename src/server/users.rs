use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{Access, AuthError};
use crate::error::AppError;
use crate::server::{require_access, AppState};
use crate::storage::User;

#[derive(Debug, Deserialize)]
pub struct CreateUserPayload {
    username: String,
    email: String,
    password: String,
}

/// POST /v1/users: register an account. Requires an authenticated caller.
pub async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateUserPayload>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    require_access(&state, &headers, Access::Client)?;

    if state.store.user_by_email(&payload.email)?.is_some() {
        return Err(AppError::conflict("email_conflict", "Email address conflict."));
    }
    if state.store.user_by_username(&payload.username)?.is_some() {
        return Err(AppError::conflict("username_conflict", "Username conflict."));
    }

    let mut id = Uuid::new_v4();
    while state.store.user_by_id(id)?.is_some() {
        id = Uuid::new_v4();
    }

    let user = User {
        id,
        username: payload.username,
        email: payload.email,
        phash: state.passwords.hash(&payload.password)?,
    };
    state.store.set_user(&user)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "ok",
            "info": "User created.",
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ModifyUserPayload {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

/// PATCH /v1/users/{user}: partial profile update. Callers may only modify
/// their own profile; that ownership rule lives here, not in the gate.
pub async fn modify_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user): Path<String>,
    Json(payload): Json<ModifyUserPayload>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let token = require_access(&state, &headers, Access::Client)?;

    let mut profile = lookup_user(&state, &user)?;
    if token.user() != Some(profile.id) {
        return Err(AuthError::Forbidden.into());
    }

    if let Some(email) = payload.email {
        if !email.eq_ignore_ascii_case(&profile.email) {
            if state.store.user_by_email(&email)?.is_some() {
                return Err(AppError::conflict("email_conflict", "Email address conflict."));
            }
            profile.email = email;
        }
    }

    if let Some(username) = payload.username {
        if !username.eq_ignore_ascii_case(&profile.username) {
            if state.store.user_by_username(&username)?.is_some() {
                return Err(AppError::conflict("username_conflict", "Username conflict."));
            }
            profile.username = username;
        }
    }

    if let Some(password) = payload.password {
        profile.phash = state.passwords.hash(&password)?;
    }

    state.store.set_user(&profile)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "ok",
            "info": "User updated.",
        })),
    ))
}

/// DELETE /v1/users/{user}.
pub async fn delete_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user): Path<String>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    require_access(&state, &headers, Access::Client)?;

    let profile = lookup_user(&state, &user)?;
    state.store.delete_user(profile.id)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "ok",
            "info": "User deleted.",
        })),
    ))
}

/// Resolve a path parameter to a user profile; unparsable ids and unknown
/// ids are the same 404.
fn lookup_user(state: &AppState, raw_id: &str) -> Result<User, AppError> {
    let id = raw_id.parse::<Uuid>().ok();
    let profile = match id {
        Some(id) => state.store.user_by_id(id)?,
        None => None,
    };
    profile.ok_or_else(|| AppError::not_found("user_not_found", "User not found."))
}
