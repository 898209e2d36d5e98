//! HTTP surface
//!
//! The routes a presentation layer calls. Error bodies share one shape:
//! `{"error": {"type": ..., "message": ..., "request_id": "check_..."}}`.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use tracing::{info, warn};

use clio_auth::{AuthSession, SessionState};
use conflict_rules::NewClientQuery;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::metrics;
use crate::service::{ConflictReport, ConflictService};

/// Shared application state accessible from all handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ConflictService>,
    pub session: Arc<AuthSession>,
    pub prometheus: PrometheusHandle,
}

/// Build the axum router with all routes and shared state.
///
/// Applies a concurrency limit layer based on `max_connections` to bound
/// simultaneous requests.
pub fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/auth/authorize", post(authorize_handler))
        .route("/auth/callback", get(callback_handler))
        .route("/check", post(check_handler))
        .route("/corpus/refresh", post(refresh_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

fn request_id() -> String {
    format!("check_{}", uuid::Uuid::new_v4().as_simple())
}

/// JSON error response: {"error":{"type":...,"message":...,"request_id":"check_..."}}
fn error_response(
    status: StatusCode,
    error_type: &str,
    message: &str,
    request_id: &str,
) -> Response {
    let body = serde_json::json!({
        "error": {
            "type": error_type,
            "message": message,
            "request_id": request_id,
        }
    });
    (
        status,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
        .into_response()
}

/// Map a fetch/auth failure onto the error body contract.
fn api_error_response(err: clio_api::Error, request_id: &str) -> Response {
    match err {
        clio_api::Error::Auth(clio_auth::Error::ReauthorizationRequired(reason)) => error_response(
            StatusCode::UNAUTHORIZED,
            "reauthorization_required",
            &format!("authorization with Clio has lapsed: {reason}"),
            request_id,
        ),
        clio_api::Error::Api { status, body } => error_response(
            StatusCode::BAD_GATEWAY,
            "upstream_error",
            &format!("clio returned {status}: {body}"),
            request_id,
        ),
        other => error_response(
            StatusCode::BAD_GATEWAY,
            "fetch_failed",
            &other.to_string(),
            request_id,
        ),
    }
}

/// Start an authorization flow and hand back the URL to visit.
async fn authorize_handler(State(state): State<AppState>) -> impl IntoResponse {
    let url = state.session.begin_authorization().await;
    axum::Json(serde_json::json!({ "authorization_url": url }))
}

#[derive(Deserialize)]
struct CallbackParams {
    code: String,
    state: String,
}

/// Complete an authorization flow from the provider's redirect.
async fn callback_handler(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let request_id = request_id();
    match state
        .session
        .complete_authorization(&params.code, &params.state)
        .await
    {
        Ok(()) => {
            info!("authorization callback completed");
            axum::Json(serde_json::json!({ "status": "authorized" })).into_response()
        }
        Err(err @ clio_auth::Error::StateMismatch(_)) => {
            warn!(error = %err, "authorization callback rejected");
            error_response(
                StatusCode::FORBIDDEN,
                "state_mismatch",
                &err.to_string(),
                &request_id,
            )
        }
        Err(clio_auth::Error::ExchangeFailed { status, body }) => error_response(
            StatusCode::BAD_GATEWAY,
            "exchange_failed",
            &format!("token endpoint returned {status}: {body}"),
            &request_id,
        ),
        Err(err) => error_response(
            StatusCode::BAD_GATEWAY,
            "exchange_failed",
            &err.to_string(),
            &request_id,
        ),
    }
}

/// Run a conflict check for the submitted prospective client.
async fn check_handler(
    State(state): State<AppState>,
    axum::Json(query): axum::Json<NewClientQuery>,
) -> Response {
    let request_id = request_id();
    let started = Instant::now();

    match state.service.check(&query).await {
        Ok(report) => {
            metrics::record_check(check_outcome(&report), started.elapsed().as_secs_f64());
            axum::Json(report).into_response()
        }
        Err(err) => {
            metrics::record_check("error", started.elapsed().as_secs_f64());
            api_error_response(err, &request_id)
        }
    }
}

fn check_outcome(report: &ConflictReport) -> &'static str {
    if report.findings.is_empty() {
        "clear"
    } else {
        "conflicts"
    }
}

/// Invalidate the corpus cache and refetch.
async fn refresh_handler(State(state): State<AppState>) -> Response {
    let request_id = request_id();
    match state.service.refresh_corpus().await {
        Ok(summary) => axum::Json(summary).into_response(),
        Err(err) => api_error_response(err, &request_id),
    }
}

/// Health endpoint: 200 while a credential is on hand (even one inside
/// the refresh margin, since the next check can still self-heal), 503
/// once only a fresh authorization can recover.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session_state = state.session.state().await;
    let corpus = state.service.corpus_stats().await;

    let credential_present = matches!(
        session_state,
        SessionState::Authorized | SessionState::Expired
    );
    let (status_code, status) = if credential_present {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "needs_authorization")
    };

    let body = serde_json::json!({
        "status": status,
        "auth": session_state.label(),
        "uptime_seconds": state.service.uptime_seconds(),
        "checks_served": state.service.checks_served(),
        "corpus": corpus,
    });

    (
        status_code,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus metrics endpoint in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}
