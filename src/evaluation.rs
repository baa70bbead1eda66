// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Evaluation verdict model.
//!
//! The evaluator's reply is untrusted. It is parsed into [`EvaluatorVerdict`],
//! a strict schema with one field per rubric criterion, and any aggregate
//! values it reports (`qualityScore`, `attentionScore`, `overallPass`) are
//! discarded. [`Evaluation`] recomputes them from the criteria, so the
//! aggregates always agree with the per-criterion fields.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Boolean rubric check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityCriterion {
    pub pass: bool,
    pub reason: String,
}

/// Ordinal attention level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttentionLevel {
    High,
    Medium,
    Low,
}

impl AttentionLevel {
    /// Numeric weight: high=1, medium=0.5, low=0.
    pub fn weight(self) -> f64 {
        match self {
            AttentionLevel::High => 1.0,
            AttentionLevel::Medium => 0.5,
            AttentionLevel::Low => 0.0,
        }
    }
}

impl fmt::Display for AttentionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttentionLevel::High => write!(f, "high"),
            AttentionLevel::Medium => write!(f, "medium"),
            AttentionLevel::Low => write!(f, "low"),
        }
    }
}

/// Ordinal rubric check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttentionCriterion {
    pub score: AttentionLevel,
    pub reason: String,
}

/// The evaluator's reply, as far as it is trusted.
///
/// Unknown fields (including self-reported aggregates) are ignored; every
/// listed field is required and must have the exact type.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EvaluatorVerdict {
    pub complete: QualityCriterion,
    pub legible: QualityCriterion,
    pub consistent: QualityCriterion,
    pub compliant: QualityCriterion,
    pub justified: QualityCriterion,
    pub measurable: QualityCriterion,
    pub relevant: AttentionCriterion,
    pub material: AttentionCriterion,
    pub summary: String,
}

impl EvaluatorVerdict {
    /// Quality criteria in rubric order.
    pub fn quality_criteria(&self) -> [(&'static str, &QualityCriterion); 6] {
        [
            ("complete", &self.complete),
            ("legible", &self.legible),
            ("consistent", &self.consistent),
            ("compliant", &self.compliant),
            ("justified", &self.justified),
            ("measurable", &self.measurable),
        ]
    }

    /// Attention criteria in rubric order.
    pub fn attention_criteria(&self) -> [(&'static str, &AttentionCriterion); 2] {
        [("relevant", &self.relevant), ("material", &self.material)]
    }
}

/// Structured verdict returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub complete: QualityCriterion,
    pub legible: QualityCriterion,
    pub consistent: QualityCriterion,
    pub compliant: QualityCriterion,
    pub justified: QualityCriterion,
    pub measurable: QualityCriterion,
    pub relevant: AttentionCriterion,
    pub material: AttentionCriterion,
    pub quality_score: f64,
    pub attention_score: f64,
    pub overall_pass: bool,
    pub summary: String,
}

impl From<EvaluatorVerdict> for Evaluation {
    fn from(verdict: EvaluatorVerdict) -> Self {
        let quality = verdict.quality_criteria();
        let passed = quality.iter().filter(|(_, c)| c.pass).count();
        let quality_score = passed as f64 / quality.len() as f64;
        let overall_pass = passed == quality.len();

        let attention = verdict.attention_criteria();
        let attention_score =
            attention.iter().map(|(_, c)| c.score.weight()).sum::<f64>() / attention.len() as f64;

        Self {
            complete: verdict.complete,
            legible: verdict.legible,
            consistent: verdict.consistent,
            compliant: verdict.compliant,
            justified: verdict.justified,
            measurable: verdict.measurable,
            relevant: verdict.relevant,
            material: verdict.material,
            quality_score,
            attention_score,
            overall_pass,
            summary: verdict.summary.trim().to_string(),
        }
    }
}

/// Strip an optional markdown code fence around a JSON reply.
///
/// Chat models sometimes wrap JSON in ```json ... ``` even when asked not
/// to. Anything else is returned trimmed and unchanged.
pub fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    match body.split_once('\n') {
        Some((info, inner)) if !info.trim().contains(char::is_whitespace) => inner.trim(),
        _ => body.trim(),
    }
}

/// Parse an evaluator reply into a normalized [`Evaluation`].
pub fn parse_evaluation(reply: &str) -> Result<Evaluation, serde_json::Error> {
    let verdict: EvaluatorVerdict = serde_json::from_str(strip_code_fence(reply))?;
    Ok(verdict.into())
}
