// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for the screening gateway.
//!
//! Builds a router wired to stub collaborators and drives it in-process
//! with `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

pub mod generators;
pub mod stubs;

use axum::{
    body::{to_bytes, Body},
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use proposal_screening_gateway::{
    config::Config,
    evaluator::EvaluationRequester,
    handlers::{router, AppState},
    identity::IdentityResolver,
    limiter::InMemoryRateLimiter,
    metrics::Metrics,
};
use serde_json::Value;
use std::sync::Arc;
use stubs::{CountingLimiter, StubEvaluator, StubIdentityProvider};
use tower::ServiceExt;

/// A router plus handles on its stub collaborators.
pub struct TestApp {
    pub router: Router,
    pub evaluator: Arc<StubEvaluator>,
    pub limiter: Arc<CountingLimiter>,
    pub metrics: Metrics,
}

/// Response parts used by assertions.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn remaining(&self) -> Option<u32> {
        self.header("x-ratelimit-remaining").and_then(|v| v.parse().ok())
    }
}

impl TestApp {
    pub fn new(evaluator: StubEvaluator) -> Self {
        Self::build(Config::default(), evaluator, IdentityResolver::anonymous_only())
    }

    pub fn with_identity(evaluator: StubEvaluator, provider: StubIdentityProvider) -> Self {
        Self::build(
            Config::default(),
            evaluator,
            IdentityResolver::new(Arc::new(provider)),
        )
    }

    pub fn build(config: Config, evaluator: StubEvaluator, identity: IdentityResolver) -> Self {
        let evaluator = Arc::new(evaluator);
        let limiter = Arc::new(CountingLimiter::new(InMemoryRateLimiter::new(
            config.rate_limit.clone(),
        )));
        let metrics = Metrics::new().expect("metrics registry");
        let requester = EvaluationRequester::new(evaluator.clone(), config.evaluator.timeout());

        let state = Arc::new(AppState::new(
            config,
            identity,
            limiter.clone(),
            requester,
            metrics.clone(),
        ));

        Self {
            router: router(state),
            evaluator,
            limiter,
            metrics,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// POST a `{title, content}` proposal from the given origin.
    pub async fn submit(&self, title: &str, content: &str, origin: &str) -> TestResponse {
        self.send(json_request(
            serde_json::json!({"title": title, "content": content}),
            &[("x-forwarded-for", origin)],
        ))
        .await
    }
}

/// `POST /api/evaluate` with a JSON body and extra headers.
pub fn json_request(body: Value, headers: &[(&str, &str)]) -> Request<Body> {
    raw_request("POST", body.to_string(), headers)
}

/// Request to the evaluation route with an arbitrary method and body.
pub fn raw_request(method: &str, body: String, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri("/api/evaluate")
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::from(body)).expect("valid request")
}
