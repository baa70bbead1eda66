// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Evaluation requester.
//!
//! One call to [`EvaluationRequester::evaluate`] makes exactly one call to the
//! external evaluation service, bounded by a timeout. There is no retry and
//! no cache; the caller owns retry policy. The reply is schema-validated and
//! its aggregates recomputed before anything is returned.

use crate::config::EvaluatorConfig;
use crate::evaluation::{parse_evaluation, Evaluation};
use crate::rubric::{build_prompt, Prompt};
use crate::sanitizer::SanitizedProposal;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error};

/// Upstream response bodies are cut to this many characters in errors.
pub const MAX_LOGGED_BODY_CHARS: usize = 512;

/// Evaluation failures. Details are for logs; callers get a generic message.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("Evaluation service timed out after {0:?}")]
    Timeout(Duration),

    #[error("Evaluation service returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("Evaluation service unreachable: {0}")]
    Transport(String),

    #[error("Evaluation service returned a malformed response: {0}")]
    MalformedResponse(String),

    #[error("Evaluation service is not configured: {0}")]
    NotConfigured(&'static str),
}

impl EvaluationError {
    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            EvaluationError::Timeout(_) => "timeout",
            EvaluationError::UpstreamStatus { .. } => "upstream_status",
            EvaluationError::Transport(_) => "transport",
            EvaluationError::MalformedResponse(_) => "malformed_response",
            EvaluationError::NotConfigured(_) => "not_configured",
        }
    }
}

/// External reasoning service: one prompt in, one reply text out.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EvaluationService: Send + Sync {
    async fn complete(&self, prompt: &Prompt) -> Result<String, EvaluationError>;
}

/// Truncate an upstream body for logging.
pub fn truncate_body(body: &str) -> String {
    if body.chars().count() <= MAX_LOGGED_BODY_CHARS {
        return body.to_string();
    }
    let cut: String = body.chars().take(MAX_LOGGED_BODY_CHARS).collect();
    format!("{cut}…")
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// OpenAI-compatible chat completions client.
pub struct HttpEvaluationService {
    api_url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpEvaluationService {
    pub fn new(config: &EvaluatorConfig) -> Result<Self, EvaluationError> {
        let timeout = config.timeout();
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10).min(timeout))
            .timeout(timeout)
            .build()
            .map_err(|e| EvaluationError::Transport(e.to_string()))?;

        Ok(Self {
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            timeout,
            client,
        })
    }

    fn request_error(&self, err: reqwest::Error) -> EvaluationError {
        if err.is_timeout() {
            EvaluationError::Timeout(self.timeout)
        } else {
            EvaluationError::Transport(err.to_string())
        }
    }

    fn request_body<'a>(&'a self, prompt: &'a Prompt) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            temperature: 0.0,
            max_tokens: self.max_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
        }
    }
}

/// Pull the reply text out of a chat completions response body.
fn extract_reply(body: &str) -> Result<String, EvaluationError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| EvaluationError::MalformedResponse(format!("completion envelope: {e}")))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| EvaluationError::MalformedResponse("no reply content".to_string()))
}

#[async_trait]
impl EvaluationService for HttpEvaluationService {
    async fn complete(&self, prompt: &Prompt) -> Result<String, EvaluationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(EvaluationError::NotConfigured("EVALUATOR_API_KEY is not set"))?;

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.request_error(e))?;

        if !status.is_success() {
            return Err(EvaluationError::UpstreamStatus {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        extract_reply(&body)
    }
}

/// Builds the prompt, calls the service once and validates the reply.
#[derive(Clone)]
pub struct EvaluationRequester {
    service: Arc<dyn EvaluationService>,
    timeout: Duration,
}

impl EvaluationRequester {
    pub fn new(service: Arc<dyn EvaluationService>, timeout: Duration) -> Self {
        Self { service, timeout }
    }

    /// Evaluate a sanitized proposal.
    #[tracing::instrument(skip(self, proposal), fields(title_chars = proposal.title.chars().count()))]
    pub async fn evaluate(
        &self,
        proposal: &SanitizedProposal,
    ) -> Result<Evaluation, EvaluationError> {
        let prompt = build_prompt(proposal);
        let started = Instant::now();

        let reply = tokio::time::timeout(self.timeout, self.service.complete(&prompt))
            .await
            .map_err(|_| EvaluationError::Timeout(self.timeout))??;

        let evaluation = parse_evaluation(&reply).map_err(|e| {
            error!(
                error = %e,
                reply = %truncate_body(&reply),
                "Evaluator reply failed schema validation"
            );
            EvaluationError::MalformedResponse(e.to_string())
        })?;

        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            quality_score = evaluation.quality_score,
            attention_score = evaluation.attention_score,
            overall_pass = evaluation.overall_pass,
            "Proposal evaluated"
        );
        Ok(evaluation)
    }
}
