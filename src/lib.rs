// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Proposal Screening Gateway
//!
//! Screens governance proposal text against a fixed rubric using an
//! external AI evaluator and returns a structured pass/fail verdict:
//!
//! - Optional bearer credential; verified callers skip the rate limit
//! - Fixed-window limit for anonymous callers (5 per 15 minutes default)
//! - Title/content validation and whitespace normalization
//! - Exactly one evaluator call per request, bounded by a timeout
//! - Strict parsing of the evaluator's reply with recomputed scores

pub mod config;
pub mod error;
pub mod evaluation;
pub mod evaluator;
pub mod handlers;
pub mod identity;
pub mod limiter;
pub mod metrics;
pub mod rubric;
pub mod sanitizer;

pub use config::Config;
pub use error::GatewayError;
pub use evaluation::Evaluation;
pub use evaluator::{EvaluationError, EvaluationRequester, EvaluationService};
pub use identity::{IdentityProvider, IdentityResolver};
pub use limiter::{InMemoryRateLimiter, RateLimit, RateLimitResult};
pub use sanitizer::{InputSanitizer, SanitizedProposal, ValidationError};
