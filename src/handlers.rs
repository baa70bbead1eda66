// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the proposal screening gateway.
//!
//! `POST /api/evaluate` runs one request through identity resolution, the
//! anonymous rate limit, input sanitizing and a single evaluation call, and
//! maps the first failure to its response. Anonymous responses always carry
//! the caller's quota headers, whatever the outcome.

use crate::config::Config;
use crate::error::GatewayError;
use crate::evaluation::Evaluation;
use crate::evaluator::EvaluationRequester;
use crate::identity::{extract_credential, ClientIdentity, Identity, IdentityResolver};
use crate::limiter::{RateLimit, RateLimitResult};
use crate::metrics::{Metrics, Outcome};
use crate::sanitizer::{InputSanitizer, ValidationError};
use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, DefaultBodyLimit, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";

/// Shared application state.
pub struct AppState {
    pub identity: IdentityResolver,
    pub limiter: Arc<dyn RateLimit>,
    pub sanitizer: InputSanitizer,
    pub evaluator: EvaluationRequester,
    pub metrics: Metrics,
    pub config: Config,
}

impl AppState {
    pub fn new(
        config: Config,
        identity: IdentityResolver,
        limiter: Arc<dyn RateLimit>,
        evaluator: EvaluationRequester,
        metrics: Metrics,
    ) -> Self {
        Self {
            identity,
            limiter,
            sanitizer: InputSanitizer::new(config.input.clone()),
            evaluator,
            metrics,
            config,
        }
    }
}

/// Raw request body. Fields stay untyped so the sanitizer can tell a
/// missing field from one of the wrong type.
#[derive(Debug, Default)]
pub struct ProposalPayload {
    pub title: Option<Value>,
    pub content: Option<Value>,
}

impl From<Map<String, Value>> for ProposalPayload {
    fn from(mut body: Map<String, Value>) -> Self {
        Self {
            title: body.remove("title"),
            content: body.remove("content"),
        }
    }
}

/// Successful screening response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningResponse {
    pub evaluation: Evaluation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authenticated_as: Option<String>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let server = &state.config.server;

    let mut app = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route(
            "/api/evaluate",
            post(evaluate_proposal).fallback(method_not_allowed),
        );

    if state.config.metrics.enabled {
        app = app.route(&state.config.metrics.path, get(metrics));
    }

    app.layer(DefaultBodyLimit::max(server.max_body_bytes))
        .layer(cors_layer(&server.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([
            HeaderName::from_static(X_RATELIMIT_LIMIT),
            HeaderName::from_static(X_RATELIMIT_REMAINING),
            HeaderName::from_static(X_RATELIMIT_RESET),
            header::RETRY_AFTER,
        ])
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "proposal-screening-gateway",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Prometheus exposition endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Any method other than POST on the evaluation route.
pub async fn method_not_allowed(State(state): State<Arc<AppState>>, method: Method) -> Response {
    debug!(%method, "Rejected non-POST request");
    state.metrics.record_outcome(Outcome::MethodNotAllowed, false);
    GatewayError::MethodNotAllowed.into_response()
}

/// Screen a proposal.
pub async fn evaluate_proposal(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Response {
    let identity = state.identity.resolve(extract_credential(&headers)).await;
    let client = ClientIdentity::for_request(
        &identity,
        &headers,
        connect_info.map(|ConnectInfo(addr)| addr),
    );

    // Authenticated callers bypass the limiter entirely.
    let quota = match identity {
        Identity::Authenticated { .. } => None,
        Identity::Anonymous => Some(state.limiter.check(&client.to_string()).await),
    };

    let result = screen(&state, &identity, &client, quota.as_ref(), payload).await;

    let outcome = match &result {
        Ok(_) => Outcome::Evaluated,
        Err(GatewayError::RateLimited { .. }) => Outcome::RateLimited,
        Err(GatewayError::Validation(_)) => Outcome::InvalidInput,
        Err(GatewayError::Evaluation(_)) => Outcome::EvaluationFailed,
        Err(GatewayError::MethodNotAllowed) => Outcome::MethodNotAllowed,
    };
    state
        .metrics
        .record_outcome(outcome, identity.is_authenticated());

    let mut response = match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => err.into_response(),
    };

    if let Some(decision) = &quota {
        attach_quota_headers(response.headers_mut(), state.limiter.limit(), decision);
    }
    response
}

async fn screen(
    state: &AppState,
    identity: &Identity,
    client: &ClientIdentity,
    quota: Option<&RateLimitResult>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<ScreeningResponse, GatewayError> {
    if let Some(RateLimitResult::Limited { retry_after }) = quota {
        let retry_after_secs = retry_after_secs(*retry_after);
        info!(client = %client, retry_after_secs, "Request rate limited");
        return Err(GatewayError::RateLimited { retry_after_secs });
    }

    let Json(body) = payload.map_err(|rejection| {
        info!(client = %client, error = %rejection.body_text(), "Unreadable request body");
        ValidationError::MalformedBody(rejection.body_text())
    })?;
    let payload = ProposalPayload::from(body);

    let proposal = state
        .sanitizer
        .sanitize(payload.title.as_ref(), payload.content.as_ref())
        .map_err(|err| {
            info!(client = %client, error = %err, "Validation failed");
            err
        })?;

    let started = Instant::now();
    let result = state.evaluator.evaluate(&proposal).await;
    state
        .metrics
        .observe_evaluator(started.elapsed().as_secs_f64());

    let evaluation = result.map_err(|err| {
        error!(
            client = %client,
            kind = err.kind(),
            error = %err,
            "Evaluation request failed"
        );
        err
    })?;

    debug!(
        client = %client,
        overall_pass = evaluation.overall_pass,
        "Proposal screened"
    );

    Ok(ScreeningResponse {
        evaluation,
        authenticated_as: identity.account_id().map(str::to_string),
    })
}

/// Whole seconds until the window resets, rounded up, never zero.
fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}

fn attach_quota_headers(headers: &mut HeaderMap, limit: u32, decision: &RateLimitResult) {
    let reset_at = chrono::Utc::now()
        + chrono::Duration::from_std(decision.reset_in()).unwrap_or_else(|_| chrono::Duration::zero());

    for (name, value) in [
        (X_RATELIMIT_LIMIT, limit.to_string()),
        (X_RATELIMIT_REMAINING, decision.remaining().to_string()),
        (X_RATELIMIT_RESET, reset_at.timestamp().to_string()),
    ] {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(HeaderName::from_static(name), value);
        }
    }
}
