// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Proposal Screening Gateway Service
//!
//! Accepts `POST /api/evaluate` with `{title, content}` and returns the
//! evaluator's rubric verdict.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (and `.env`):
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `RATE_LIMIT_MAX_REQUESTS`: Anonymous requests per window (default: 5)
//! - `RATE_LIMIT_WINDOW_SECS`: Window length (default: 900)
//! - `RATE_LIMIT_SWEEP_SECS`: Expired record sweep interval (default: 60)
//! - `MAX_TITLE_CHARS` / `MAX_CONTENT_CHARS`: Input bounds (default: 200 / 50000)
//! - `MAX_BODY_BYTES`: Request body cap (default: 262144)
//! - `EVALUATOR_API_URL`, `EVALUATOR_API_KEY`, `EVALUATOR_MODEL`,
//!   `EVALUATOR_MAX_TOKENS`, `EVALUATOR_TIMEOUT_SECS`: Evaluation service
//! - `IDENTITY_VERIFY_URL`, `IDENTITY_TIMEOUT_SECS`: Identity provider
//! - `METRICS_ENABLED`: Expose `/metrics` (default: true)
//! - `ALLOWED_ORIGINS`: Comma-separated CORS origins

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use proposal_screening_gateway::{
    config::Config,
    evaluator::{EvaluationRequester, HttpEvaluationService},
    handlers::{router, AppState},
    identity::IdentityResolver,
    limiter::InMemoryRateLimiter,
    metrics::Metrics,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        bind_addr = %config.server.bind_addr,
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        evaluator_model = %config.evaluator.model,
        evaluator_timeout_secs = config.evaluator.timeout_secs,
        identity_provider = config.identity.verify_url.is_some(),
        "Starting proposal screening gateway"
    );
    if config.evaluator.api_key.is_none() {
        warn!("EVALUATOR_API_KEY is not set; every evaluation will fail");
    }

    // Create application state
    let metrics = Metrics::new()?;
    let limiter = Arc::new(InMemoryRateLimiter::new(config.rate_limit.clone()));
    let identity = IdentityResolver::from_config(&config.identity)?;
    let service = HttpEvaluationService::new(&config.evaluator)?;
    let evaluator = EvaluationRequester::new(Arc::new(service), config.evaluator.timeout());

    // Spawn sweep task
    let sweep_metrics = metrics.clone();
    let _sweeper = limiter.spawn_sweeper(move |tracked| sweep_metrics.set_tracked_clients(tracked));

    let state = Arc::new(AppState::new(
        config.clone(),
        identity,
        limiter,
        evaluator,
        metrics,
    ));

    let app = router(state);

    // Start server
    let addr: SocketAddr = config.server.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
