// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Gateway error taxonomy and its HTTP mapping.
//!
//! Validation and rate limit errors are caller-actionable and carry detail.
//! Evaluation errors are logged in full by the handler and reach the caller
//! only as a generic message.

use crate::evaluator::EvaluationError;
use crate::sanitizer::ValidationError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Message returned for every evaluation failure.
pub const EVALUATION_FAILED_MESSAGE: &str = "Evaluation failed. Please try again later.";

/// Terminal request failures.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Evaluation(EvaluationError::NotConfigured(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Evaluation(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::MethodNotAllowed => {
                let mut response = (
                    status,
                    Json(json!({ "error": "Method not allowed. Use POST." })),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::ALLOW, HeaderValue::from_static("POST"));
                response
            }
            Self::Validation(err) => (status, Json(json!({ "error": err.to_string() }))).into_response(),
            Self::RateLimited { retry_after_secs } => (
                status,
                [(header::RETRY_AFTER, retry_after_secs.to_string())],
                Json(json!({
                    "error": "Rate limit exceeded",
                    "message": format!(
                        "Anonymous screening is limited. Try again in {retry_after_secs} seconds, or sign in to remove the limit."
                    ),
                    "retryAfter": retry_after_secs,
                })),
            )
                .into_response(),
            Self::Evaluation(_) => {
                (status, Json(json!({ "error": EVALUATION_FAILED_MESSAGE }))).into_response()
            }
        }
    }
}
