//!
//! rostrum HTTP server
//! -------------------
//! This module defines the Axum-based REST API for rostrum.
//!
//! Responsibilities:
//! - Session bootstrap and logout endpoints backed by the `auth` module.
//! - Bearer session-key resolution for every other endpoint.
//! - Article, user, tag, and config endpoints delegating to the document
//!   store, each consulting the authorization gate before any mutation.
//! - Uniform JSON response and error shapes.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::info;

pub mod articles;
pub mod config_api;
pub mod session;
pub mod users;

use crate::auth::{Access, AuthError, Authenticator, Gate, SessionToken, TokenStore};
use crate::config::Config;
use crate::error::AppError;
use crate::security::Passwords;
use crate::storage::DocStore;

/// Shared server state injected into all handlers.
///
/// Holds the document-store handle, the authenticator that owns the session
/// registry, the authorization gate, and the password hasher. All of it is
/// constructed once from the startup configuration.
#[derive(Clone)]
pub struct AppState {
    pub store: DocStore,
    pub auth: Arc<Authenticator>,
    pub gate: Gate,
    pub passwords: Passwords,
}

impl AppState {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store = DocStore::new(&config.db.root)
            .with_context(|| format!("while opening document store at: {}", config.db.root))?;
        let auth = Arc::new(Authenticator::new(config.net.psk.clone(), TokenStore::new(config.session_ttl())));
        let passwords = Passwords::new(config.auth.pepper.clone());
        Ok(Self { store, auth, gate: Gate, passwords })
    }
}

/// Start the rostrum HTTP server with the given configuration.
pub async fn run_with_config(config: Config) -> anyhow::Result<()> {
    let state = AppState::from_config(&config)?;
    let app = router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.net.port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

/// Mount all HTTP routes onto the shared state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "rostrum ok" }))
        .route("/v1/auth", post(session::create_session).delete(session::destroy_session))
        .route("/v1/config", get(config_api::get_config))
        .route("/v1/articles", get(articles::list_articles).post(articles::create_article))
        .route(
            "/v1/articles/{article}",
            get(articles::get_article)
                .patch(articles::modify_article)
                .delete(articles::delete_article),
        )
        .route("/v1/tags", get(articles::list_tags))
        .route("/v1/users", post(users::create_user))
        .route("/v1/users/{user}", patch(users::modify_user).delete(users::delete_user))
        .with_state(state)
}

/// Pull the bearer session key out of the Authorization header, if any.
fn bearer_key(headers: &HeaderMap) -> Option<String> {
    let value = headers.get("authorization").or_else(|| headers.get("Authorization"))?;
    let raw = value.to_str().ok()?;
    let (scheme, key) = raw.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let key = key.trim();
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

/// Resolve the caller's session token, if a valid one was presented.
///
/// A token's very first use is the one-shot bootstrap signal; surface it in
/// the audit log here so it is consumed no matter which endpoint sees the
/// token first.
pub(crate) fn resolve_token(state: &AppState, headers: &HeaderMap) -> Option<Arc<SessionToken>> {
    let key = bearer_key(headers)?;
    let token = state.auth.authenticate(&key).ok()?;
    if token.check_freshness() {
        info!(
            client_addr = token.client_addr(),
            authenticated = token.user().is_some(),
            "session established"
        );
    }
    Some(token)
}

/// Resolve the caller's session and demand a permission level in one step.
pub(crate) fn require_access(
    state: &AppState,
    headers: &HeaderMap,
    access: Access,
) -> Result<Arc<SessionToken>, AppError> {
    let Some(token) = resolve_token(state, headers) else {
        return Err(AuthError::Failure.into());
    };
    state.gate.require(&token, access)?;
    Ok(token)
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(json!({
            "status": "error",
            "code": self.code_str(),
            "message": self.message(),
        }));
        (status, body).into_response()
    }
}
