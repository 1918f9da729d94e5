use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde_json::json;

use crate::error::AppError;
use crate::server::{resolve_token, AppState};

/// GET /v1/config: the public global config document, plus the caller's
/// private config document when the session carries client permissions.
pub async fn get_config(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let mut response = json!({
        "status": "ok",
        "info": "Configs retrieved.",
        "global": state.store.global_config()?,
    });

    if let Some(token) = resolve_token(&state, &headers) {
        if token.has_client_perms() {
            state.gate.require_client(&token)?;
            if let Some(user) = token.user() {
                response["user"] = state.store.user_config(user)?;
            }
        }
    }

    Ok((StatusCode::OK, Json(response)))
}
