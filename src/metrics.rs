// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for the screening gateway.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

/// Terminal outcome of one screening request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Evaluated,
    RateLimited,
    InvalidInput,
    EvaluationFailed,
    MethodNotAllowed,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Evaluated => "evaluated",
            Outcome::RateLimited => "rate_limited",
            Outcome::InvalidInput => "invalid_input",
            Outcome::EvaluationFailed => "evaluation_failed",
            Outcome::MethodNotAllowed => "method_not_allowed",
        }
    }
}

/// Metric handles registered on a private registry.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    requests: IntCounterVec,
    evaluator_seconds: Histogram,
    rate_limit_clients: IntGauge,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new(
                "screening_requests_total",
                "Screening requests by terminal outcome and caller kind",
            ),
            &["outcome", "caller"],
        )?;
        let evaluator_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "screening_evaluator_seconds",
                "Latency of evaluation service calls",
            )
            .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0]),
        )?;
        let rate_limit_clients = IntGauge::new(
            "screening_rate_limit_clients",
            "Anonymous clients tracked by the rate limiter after the last sweep",
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(evaluator_seconds.clone()))?;
        registry.register(Box::new(rate_limit_clients.clone()))?;

        Ok(Self {
            registry,
            requests,
            evaluator_seconds,
            rate_limit_clients,
        })
    }

    pub fn record_outcome(&self, outcome: Outcome, authenticated: bool) {
        let caller = if authenticated { "authenticated" } else { "anonymous" };
        self.requests
            .with_label_values(&[outcome.as_str(), caller])
            .inc();
    }

    pub fn observe_evaluator(&self, seconds: f64) {
        self.evaluator_seconds.observe(seconds);
    }

    pub fn set_tracked_clients(&self, count: usize) {
        self.rate_limit_clients.set(count as i64);
    }

    pub fn outcome_count(&self, outcome: Outcome, authenticated: bool) -> u64 {
        let caller = if authenticated { "authenticated" } else { "anonymous" };
        self.requests
            .with_label_values(&[outcome.as_str(), caller])
            .get()
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
