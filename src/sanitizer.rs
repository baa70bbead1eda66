// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Proposal input sanitizer.
//!
//! Validates and normalizes the raw `title` and `content` fields before they
//! reach the evaluator:
//! - Presence and type (both must be JSON strings)
//! - Non-empty after trimming
//! - Maximum length, measured in characters after normalization
//! - Whitespace normalization that keeps markdown structure intact
//!
//! Sanitizing already sanitized input is a no-op.

use crate::config::InputConfig;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Validation error types. All of them are caller-actionable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Field {0} must be a string")]
    NotAString(&'static str),

    #[error("Field {0} must not be empty")]
    Empty(&'static str),

    #[error("Field {field} exceeds maximum length of {max} characters (got {actual})")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("Request body must be a JSON object with title and content: {0}")]
    MalformedBody(String),
}

/// A proposal that passed validation and normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedProposal {
    pub title: String,
    pub content: String,
}

/// Proposal input sanitizer.
#[derive(Debug, Clone)]
pub struct InputSanitizer {
    config: InputConfig,
}

impl InputSanitizer {
    /// Create a new sanitizer with the given bounds.
    pub fn new(config: InputConfig) -> Self {
        Self { config }
    }

    /// Validate and normalize raw JSON fields.
    pub fn sanitize(
        &self,
        title: Option<&Value>,
        content: Option<&Value>,
    ) -> Result<SanitizedProposal, ValidationError> {
        let title = require_string("title", title)?;
        let content = require_string("content", content)?;
        self.sanitize_text(title, content)
    }

    /// Validate and normalize fields that are already known to be strings.
    pub fn sanitize_text(
        &self,
        title: &str,
        content: &str,
    ) -> Result<SanitizedProposal, ValidationError> {
        let title = normalize_title(title);
        check_field("title", &title, self.config.max_title_chars)?;

        let content = normalize_content(content);
        check_field("content", &content, self.config.max_content_chars)?;

        debug!(
            title_chars = title.chars().count(),
            content_chars = content.chars().count(),
            "Proposal input sanitized"
        );
        Ok(SanitizedProposal { title, content })
    }
}

fn require_string<'a>(
    field: &'static str,
    value: Option<&'a Value>,
) -> Result<&'a str, ValidationError> {
    match value {
        None | Some(Value::Null) => Err(ValidationError::MissingField(field)),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(ValidationError::NotAString(field)),
    }
}

fn check_field(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.is_empty() {
        debug!(field, "Empty field");
        return Err(ValidationError::Empty(field));
    }

    let actual = value.chars().count();
    if actual > max {
        debug!(field, actual, max, "Field too long");
        return Err(ValidationError::TooLong { field, max, actual });
    }

    Ok(())
}

/// Drop control characters other than newline and tab, after folding
/// CRLF and lone CR into LF.
fn strip_controls(input: &str) -> String {
    input
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// Collapse runs of spaces and tabs into a single space.
fn collapse_inline(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_run = false;
    for c in line.chars() {
        if c == ' ' || c == '\t' {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

/// Titles are single-line: every whitespace run becomes one space.
fn normalize_title(raw: &str) -> String {
    strip_controls(raw)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Content keeps its line structure. Leading indentation is preserved so
/// nested lists and indented code blocks survive; everything after it is
/// collapsed, trailing whitespace is dropped and blank-line runs shrink to
/// a single blank line.
fn normalize_content(raw: &str) -> String {
    let cleaned = strip_controls(raw);
    let mut lines: Vec<String> = Vec::new();
    let mut previous_blank = false;

    for line in cleaned.split('\n') {
        let body_start = line
            .find(|c: char| c != ' ' && c != '\t')
            .unwrap_or(line.len());
        let (indent, body) = line.split_at(body_start);
        let body = collapse_inline(body);
        let body = body.trim_end();

        if body.is_empty() {
            if !previous_blank {
                lines.push(String::new());
            }
            previous_blank = true;
            continue;
        }

        lines.push(format!("{indent}{body}"));
        previous_blank = false;
    }

    lines.join("\n").trim().to_string()
}
