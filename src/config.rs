// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the proposal screening gateway.
//!
//! Every field has a serde default so a partial document (or an empty
//! environment) still yields a runnable service. Anonymous quota defaults
//! are 5 requests per 15 minute window.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Configuration for the screening gateway service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Anonymous rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Proposal input bounds
    #[serde(default)]
    pub input: InputConfig,

    /// External evaluation service
    #[serde(default)]
    pub evaluator: EvaluatorConfig,

    /// External identity provider
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Origins allowed by CORS (default: https://localhost)
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Maximum accepted request body in bytes (default: 256 KiB)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Fixed-window rate limiting for anonymous callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests admitted per client per window (default: 5)
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds (default: 900)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Interval between sweeps of expired records in seconds (default: 60)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

/// Bounds applied by the input sanitizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Maximum title length in characters (default: 200)
    #[serde(default = "default_max_title_chars")]
    pub max_title_chars: usize,

    /// Maximum content length in characters (default: 50000)
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
}

/// External evaluation service (OpenAI-compatible chat completions).
#[derive(Clone, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// Chat completions endpoint
    #[serde(default = "default_evaluator_url")]
    pub api_url: String,

    /// Bearer API key. Never serialized.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Model identifier sent with every request
    #[serde(default = "default_evaluator_model")]
    pub model: String,

    /// Completion token cap (default: 2048)
    #[serde(default = "default_evaluator_max_tokens")]
    pub max_tokens: u32,

    /// Hard timeout around one evaluation call in seconds (default: 60)
    #[serde(default = "default_evaluator_timeout_secs")]
    pub timeout_secs: u64,
}

/// External identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Credential verification endpoint. Unset means every credential
    /// degrades to anonymous.
    #[serde(default)]
    pub verify_url: Option<String>,

    /// Timeout for one verification call in seconds (default: 5)
    #[serde(default = "default_identity_timeout_secs")]
    pub timeout_secs: u64,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec!["https://localhost".to_string()]
}

fn default_max_body_bytes() -> usize {
    256 * 1024
}

fn default_max_requests() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    15 * 60
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_max_title_chars() -> usize {
    200
}

fn default_max_content_chars() -> usize {
    50_000
}

fn default_evaluator_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_evaluator_model() -> String {
    "gpt-4o".to_string()
}

fn default_evaluator_max_tokens() -> u32 {
    2048
}

fn default_evaluator_timeout_secs() -> u64 {
    60
}

fn default_identity_timeout_secs() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            rate_limit: RateLimitConfig::default(),
            input: InputConfig::default(),
            evaluator: EvaluatorConfig::default(),
            identity: IdentityConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            allowed_origins: default_allowed_origins(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            max_title_chars: default_max_title_chars(),
            max_content_chars: default_max_content_chars(),
        }
    }
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            api_url: default_evaluator_url(),
            api_key: None,
            model: default_evaluator_model(),
            max_tokens: default_evaluator_max_tokens(),
            timeout_secs: default_evaluator_timeout_secs(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            verify_url: None,
            timeout_secs: default_identity_timeout_secs(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl fmt::Debug for EvaluatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluatorConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl RateLimitConfig {
    /// Get the rate window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Get the sweep interval
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl EvaluatorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl IdentityConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is read first if present.
    /// Unparseable numeric values fall back to their defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();
        let config = Config {
            server: ServerConfig {
                bind_addr: env_string("BIND_ADDR").unwrap_or(defaults.server.bind_addr),
                allowed_origins: env_string("ALLOWED_ORIGINS")
                    .map(|v| {
                        v.split(',')
                            .map(|o| o.trim().to_string())
                            .filter(|o| !o.is_empty())
                            .collect()
                    })
                    .unwrap_or(defaults.server.allowed_origins),
                max_body_bytes: env_parse("MAX_BODY_BYTES")
                    .unwrap_or(defaults.server.max_body_bytes),
            },
            rate_limit: RateLimitConfig {
                max_requests: env_parse("RATE_LIMIT_MAX_REQUESTS")
                    .unwrap_or(defaults.rate_limit.max_requests),
                window_secs: env_parse("RATE_LIMIT_WINDOW_SECS")
                    .unwrap_or(defaults.rate_limit.window_secs),
                sweep_interval_secs: env_parse("RATE_LIMIT_SWEEP_SECS")
                    .unwrap_or(defaults.rate_limit.sweep_interval_secs),
            },
            input: InputConfig {
                max_title_chars: env_parse("MAX_TITLE_CHARS")
                    .unwrap_or(defaults.input.max_title_chars),
                max_content_chars: env_parse("MAX_CONTENT_CHARS")
                    .unwrap_or(defaults.input.max_content_chars),
            },
            evaluator: EvaluatorConfig {
                api_url: env_string("EVALUATOR_API_URL").unwrap_or(defaults.evaluator.api_url),
                api_key: env_string("EVALUATOR_API_KEY"),
                model: env_string("EVALUATOR_MODEL").unwrap_or(defaults.evaluator.model),
                max_tokens: env_parse("EVALUATOR_MAX_TOKENS")
                    .unwrap_or(defaults.evaluator.max_tokens),
                timeout_secs: env_parse("EVALUATOR_TIMEOUT_SECS")
                    .unwrap_or(defaults.evaluator.timeout_secs),
            },
            identity: IdentityConfig {
                verify_url: env_string("IDENTITY_VERIFY_URL"),
                timeout_secs: env_parse("IDENTITY_TIMEOUT_SECS")
                    .unwrap_or(defaults.identity.timeout_secs),
            },
            metrics: MetricsConfig {
                enabled: env_parse("METRICS_ENABLED").unwrap_or(defaults.metrics.enabled),
                ..defaults.metrics
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the service cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        url::Url::parse(&self.evaluator.api_url)
            .map_err(|e| anyhow::anyhow!("invalid EVALUATOR_API_URL: {e}"))?;
        if let Some(verify_url) = &self.identity.verify_url {
            url::Url::parse(verify_url)
                .map_err(|e| anyhow::anyhow!("invalid IDENTITY_VERIFY_URL: {e}"))?;
        }
        if self.rate_limit.window_secs == 0 {
            anyhow::bail!("RATE_LIMIT_WINDOW_SECS must be greater than zero");
        }
        if self.input.max_title_chars == 0 || self.input.max_content_chars == 0 {
            anyhow::bail!("input length bounds must be greater than zero");
        }
        if self.evaluator.timeout_secs == 0 {
            anyhow::bail!("EVALUATOR_TIMEOUT_SECS must be greater than zero");
        }
        if self.identity.timeout_secs == 0 {
            anyhow::bail!("IDENTITY_TIMEOUT_SECS must be greater than zero");
        }
        Ok(())
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
