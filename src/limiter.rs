// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Fixed-window rate limiter for anonymous screening requests.
//!
//! Each client identity gets a counter and a reset time. The first request
//! of a window arms `reset_at = now + window`; requests are admitted until
//! the counter reaches the cap, then denied until `now > reset_at`, at which
//! point the record is replaced by a fresh one.
//!
//! Because windows are fixed rather than sliding, a client can land up to
//! `2 * max_requests` requests around a window boundary. That is a known
//! property of the scheme and is accepted.
//!
//! Records live in a sharded map. Check-and-increment for one key happens
//! under that key's shard lock, so concurrent requests from the same client
//! cannot both take the last slot, and unrelated clients do not contend on
//! a single lock. Expired records are only ever removed by [`InMemoryRateLimiter::sweep`].

use crate::config::RateLimitConfig;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed
    Allowed {
        /// Remaining requests in current window
        remaining: u32,
        /// Time until window resets
        reset_in: Duration,
    },
    /// Request is rate limited
    Limited {
        /// Time until the current window resets
        retry_after: Duration,
    },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }

    /// Requests left in the window; zero once limited.
    pub fn remaining(&self) -> u32 {
        match self {
            RateLimitResult::Allowed { remaining, .. } => *remaining,
            RateLimitResult::Limited { .. } => 0,
        }
    }

    /// Time until the window that produced this result resets.
    pub fn reset_in(&self) -> Duration {
        match self {
            RateLimitResult::Allowed { reset_in, .. } => *reset_in,
            RateLimitResult::Limited { retry_after } => *retry_after,
        }
    }
}

/// Rate limit backend seen by the gateway handler.
///
/// The in-memory implementation is process-local; a shared store can
/// implement this trait without changes to the handler.
#[async_trait]
pub trait RateLimit: Send + Sync {
    /// Count one request for `client` and decide whether it is admitted.
    async fn check(&self, client: &str) -> RateLimitResult;

    /// Requests admitted per window.
    fn limit(&self) -> u32;
}

/// Per-client fixed-window record.
#[derive(Debug, Clone, Copy)]
struct RateLimitRecord {
    count: u32,
    reset_at: Instant,
}

impl RateLimitRecord {
    fn fresh(now: Instant, window: Duration) -> Self {
        Self {
            count: 1,
            reset_at: now + window,
        }
    }

    fn expired(&self, now: Instant) -> bool {
        now > self.reset_at
    }
}

/// Process-local fixed-window rate limiter.
pub struct InMemoryRateLimiter {
    config: RateLimitConfig,
    records: DashMap<String, RateLimitRecord>,
}

impl InMemoryRateLimiter {
    /// Create a new rate limiter with the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            records: DashMap::new(),
        }
    }

    /// Check and count one request from `client`.
    pub fn check_now(&self, client: &str) -> RateLimitResult {
        let now = Instant::now();
        let window = self.config.window_duration();
        let max = self.config.max_requests;

        if max == 0 {
            return RateLimitResult::Limited {
                retry_after: window,
            };
        }

        match self.records.entry(client.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(RateLimitRecord::fresh(now, window));
                RateLimitResult::Allowed {
                    remaining: max - 1,
                    reset_in: window,
                }
            }
            Entry::Occupied(mut slot) => {
                let record = slot.get_mut();
                if record.expired(now) {
                    *record = RateLimitRecord::fresh(now, window);
                    return RateLimitResult::Allowed {
                        remaining: max - 1,
                        reset_in: window,
                    };
                }

                let reset_in = record.reset_at.saturating_duration_since(now);
                if record.count >= max {
                    debug!(client, ?reset_in, "Client rate limit exceeded");
                    return RateLimitResult::Limited {
                        retry_after: reset_in,
                    };
                }

                record.count += 1;
                RateLimitResult::Allowed {
                    remaining: max - record.count,
                    reset_in,
                }
            }
        }
    }

    /// Remove every record whose window has elapsed. Returns how many
    /// records were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.records.len();
        self.records.retain(|_, record| !record.expired(now));
        let removed = before.saturating_sub(self.records.len());
        if removed > 0 {
            debug!(removed, tracked = self.records.len(), "Swept expired rate limit records");
        }
        removed
    }

    /// Number of client records currently held.
    pub fn tracked_clients(&self) -> usize {
        self.records.len()
    }

    /// Start the periodic sweep on the current runtime.
    ///
    /// `on_sweep` receives the number of records still tracked after each
    /// pass. The task runs until the returned handle is aborted.
    pub fn spawn_sweeper<F>(self: &Arc<Self>, on_sweep: F) -> JoinHandle<()>
    where
        F: Fn(usize) + Send + 'static,
    {
        let limiter = Arc::clone(self);
        let every = self.config.sweep_interval();
        info!(interval_secs = every.as_secs(), "Starting rate limit sweeper");

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                limiter.sweep();
                on_sweep(limiter.tracked_clients());
            }
        })
    }
}

#[async_trait]
impl RateLimit for InMemoryRateLimiter {
    async fn check(&self, client: &str) -> RateLimitResult {
        self.check_now(client)
    }

    fn limit(&self) -> u32 {
        self.config.max_requests
    }
}
