//! Web server module for the Paddock exporter.
//!
//! Serves the Prometheus exposition endpoint and the two OAuth2
//! browser endpoints that drive the authorization-code flow.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthError, OAuthClient};
use crate::poller::PollingSupervisor;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<OAuthClient>,
    pub supervisor: Arc<PollingSupervisor>,
    pub registry: prometheus::Registry,
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/oauth.auth", get(auth_handler))
        .route("/oauth.redirect", get(redirect_handler))
        .route("/healthz", get(healthz_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Prometheus text exposition of all registered gauges.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let families = state.registry.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buffer) {
        tracing::error!(error = %e, "metric encoding failed");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    ([(header::CONTENT_TYPE, encoder.format_type().to_string())], buffer).into_response()
}

/// Entry point of the authorization flow: redirect to the provider
/// unless a token is already present.
async fn auth_handler(State(state): State<AppState>) -> Response {
    if state.auth.authorized().await {
        "Authorized".into_response()
    } else {
        let url = state.auth.authorization_url().await;
        Redirect::temporary(&url).into_response()
    }
}

/// Provider redirect target: exchange the code, start polling, and
/// land on /metrics.
async fn redirect_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    match state.auth.fetch_token(&params).await {
        Ok(()) => {
            if !state.supervisor.running().await {
                state.supervisor.start().await;
            }
            Redirect::to("/metrics").into_response()
        }
        Err(e @ (AuthError::StateMismatch | AuthError::MissingCode)) => {
            tracing::warn!(error = %e, "rejected token exchange");
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "token exchange failed");
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}
