// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Stub collaborators for gateway tests.

use async_trait::async_trait;
use proposal_screening_gateway::{
    evaluator::{EvaluationError, EvaluationService},
    identity::{AuthError, IdentityProvider},
    limiter::{InMemoryRateLimiter, RateLimit, RateLimitResult},
    rubric::Prompt,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A well-formed evaluator reply where every quality criterion passes.
pub fn passing_verdict() -> Value {
    json!({
        "complete": {"pass": true, "reason": "All required sections present."},
        "legible": {"pass": true, "reason": "Clear headings."},
        "consistent": {"pass": true, "reason": "Figures agree."},
        "compliant": {"pass": true, "reason": "Within governance scope."},
        "justified": {"pass": true, "reason": "Rationale given."},
        "measurable": {"pass": true, "reason": "Milestones defined."},
        "relevant": {"score": "high", "reason": "Affects all holders."},
        "material": {"score": "medium", "reason": "Moderate budget."},
        "summary": "Ready for a vote."
    })
}

enum Reply {
    Text(String),
    Error(fn() -> EvaluationError),
}

/// Evaluation service returning a canned reply and recording prompts.
pub struct StubEvaluator {
    reply: Reply,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<Prompt>>,
}

impl StubEvaluator {
    pub fn replying(reply: Value) -> Self {
        Self::replying_text(reply.to_string())
    }

    pub fn replying_text(reply: impl Into<String>) -> Self {
        Self {
            reply: Reply::Text(reply.into()),
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn passing() -> Self {
        Self::replying(passing_verdict())
    }

    pub fn failing(error: fn() -> EvaluationError) -> Self {
        Self {
            reply: Reply::Error(error),
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<Prompt> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl EvaluationService for StubEvaluator {
    async fn complete(&self, prompt: &Prompt) -> Result<String, EvaluationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Error(make) => Err(make()),
        }
    }
}

/// Identity provider that accepts a fixed set of tokens.
#[derive(Default)]
pub struct StubIdentityProvider {
    accounts: HashMap<String, String>,
    calls: AtomicUsize,
}

impl StubIdentityProvider {
    pub fn accepting(token: &str, account_id: &str) -> Self {
        let mut accounts = HashMap::new();
        accounts.insert(token.to_string(), account_id.to_string());
        Self {
            accounts,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn rejecting_all() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityProvider for StubIdentityProvider {
    async fn verify(&self, credential: &str) -> Result<String, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.accounts
            .get(credential)
            .cloned()
            .ok_or(AuthError::Rejected(401))
    }
}

/// Identity provider whose backend is down.
pub struct UnreachableIdentityProvider;

#[async_trait]
impl IdentityProvider for UnreachableIdentityProvider {
    async fn verify(&self, _credential: &str) -> Result<String, AuthError> {
        Err(AuthError::Transport("connection refused".to_string()))
    }
}

/// Rate limiter wrapper that counts how often it is consulted.
pub struct CountingLimiter {
    inner: InMemoryRateLimiter,
    checks: AtomicUsize,
}

impl CountingLimiter {
    pub fn new(inner: InMemoryRateLimiter) -> Self {
        Self {
            inner,
            checks: AtomicUsize::new(0),
        }
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateLimit for CountingLimiter {
    async fn check(&self, client: &str) -> RateLimitResult {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.inner.check(client).await
    }

    fn limit(&self) -> u32 {
        self.inner.limit()
    }
}
