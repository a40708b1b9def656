//! Per-key token-bucket admission control.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;

use crate::config::RateLimitConfig;

/// Outcome of a single admission check.
///
/// Exhaustion is a result, never an error: callers branch on `ok` and use
/// `reset_at` to tell the client when capacity returns.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitInfo {
    /// Whether the request may proceed.
    pub ok: bool,
    /// Configured point budget per window.
    pub limit: u32,
    /// Points left in the current window after this check.
    pub remaining: u32,
    /// Best-effort time at which capacity becomes available again.
    pub reset_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct Bucket {
    consumed: u32,
    window_start: DateTime<Utc>,
    blocked_until: Option<DateTime<Utc>>,
}

/// In-memory token-bucket limiter keyed by client identifier.
///
/// One shared bucket per key, safe under concurrent `check` calls from many
/// simultaneous ingestion requests. State lives in this process only; a
/// distributed deployment swaps this for a shared counter store behind the
/// same `check`/`reset` surface.
pub struct RateLimiter {
    buckets: DashMap<String, Bucket>,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Creates a limiter with the given budget, window and block settings.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: DashMap::new(),
            config,
        }
    }

    /// Consumes one point from the key's bucket.
    ///
    /// Buckets are created lazily on first use. The per-key DashMap entry
    /// lock is what keeps concurrent checks for the same key consistent.
    pub fn check(&self, key: &str) -> RateLimitInfo {
        let now = Utc::now();
        let window = to_chrono(self.config.window_secs);

        let mut entry = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| Bucket {
                consumed: 0,
                window_start: now,
                blocked_until: None,
            });
        let bucket = entry.value_mut();

        if let Some(until) = bucket.blocked_until {
            if now < until {
                return RateLimitInfo {
                    ok: false,
                    limit: self.config.points,
                    remaining: 0,
                    reset_at: until,
                };
            }
            // Block elapsed: start a fresh window.
            bucket.blocked_until = None;
            bucket.consumed = 0;
            bucket.window_start = now;
        }

        if now - bucket.window_start >= window {
            bucket.consumed = 0;
            bucket.window_start = now;
        }

        if bucket.consumed < self.config.points {
            bucket.consumed += 1;
            RateLimitInfo {
                ok: true,
                limit: self.config.points,
                remaining: self.config.points - bucket.consumed,
                reset_at: bucket.window_start + window,
            }
        } else {
            let reset_at = if self.config.block_secs.is_zero() {
                bucket.window_start + window
            } else {
                let until = now + to_chrono(self.config.block_secs);
                bucket.blocked_until = Some(until);
                until
            };
            tracing::warn!(key = %key, limit = self.config.points, "rate limit exceeded");
            RateLimitInfo {
                ok: false,
                limit: self.config.points,
                remaining: 0,
                reset_at,
            }
        }
    }

    /// Clears one key's bucket, or replaces the whole limiter state when no
    /// key is given. Full resets exist for test isolation, not steady-state
    /// operation.
    pub fn reset(&self, key: Option<&str>) {
        match key {
            Some(key) => {
                self.buckets.remove(key);
            }
            None => self.buckets.clear(),
        }
    }
}

fn to_chrono(duration: std::time::Duration) -> ChronoDuration {
    ChronoDuration::from_std(duration).unwrap_or(ChronoDuration::MAX)
}
