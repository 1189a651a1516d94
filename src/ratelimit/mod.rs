//! Fixed-window per-client request throttle.
//!
//! State is process-local: counters reset when the process restarts.

use axum::http::HeaderMap;
use dashmap::DashMap;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Headers consulted for the client address, in order of precedence
const CLIENT_IP_HEADERS: &[&str] = &["x-forwarded-for", "x-real-ip", "cf-connecting-ip"];

const UNKNOWN_CLIENT: &str = "unknown";

fn default_enabled() -> bool {
    true
}
fn default_window_ms() -> u64 {
    60_000
}
fn default_max_requests() -> u32 {
    10
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            window_ms: default_window_ms(),
            max_requests: default_max_requests(),
        }
    }
}

/// Outcome of a single rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// Time left in the client's current window
    pub reset_in: Duration,
}

impl RateLimitDecision {
    /// Seconds until the window resets, rounded up
    pub fn reset_in_secs(&self) -> u64 {
        self.reset_in.as_millis().div_ceil(1000) as u64
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    expires_at: Instant,
}

/// Fixed-window rate limiter keyed by client identifier.
///
/// Each key's read-check-increment runs under that key's map shard lock, so
/// concurrent requests from one client cannot both slip past the cap while
/// unrelated clients mostly land on other shards.
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    windows: DashMap<String, Window>,
    /// Reference point for `earliest_expiry`
    epoch: Instant,
    /// Earliest live expiry seen, in ms since `epoch`; gates the full purge
    earliest_expiry: AtomicU64,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            window: Duration::from_millis(config.window_ms),
            max_requests: config.max_requests,
            windows: DashMap::new(),
            epoch: Instant::now(),
            earliest_expiry: AtomicU64::new(u64::MAX),
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Number of clients with a live window
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Instant::now())
    }

    /// Count a request from `key` at time `now`
    pub fn check_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        self.purge_expired(now);

        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            expires_at: now,
        });
        let window = entry.value_mut();

        if window.count == 0 || now >= window.expires_at {
            *window = Window {
                count: 1,
                expires_at: now + self.window,
            };
            self.earliest_expiry
                .fetch_min(self.millis_since_epoch(window.expires_at), Ordering::Relaxed);
            return RateLimitDecision {
                allowed: true,
                remaining: self.max_requests.saturating_sub(1),
                reset_in: self.window,
            };
        }

        let reset_in = window.expires_at.saturating_duration_since(now);
        if window.count >= self.max_requests {
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_in,
            };
        }

        window.count += 1;
        RateLimitDecision {
            allowed: true,
            remaining: self.max_requests - window.count,
            reset_in,
        }
    }

    /// Drop windows that have elapsed.
    ///
    /// Skips the full sweep until the earliest known window could have expired.
    fn purge_expired(&self, now: Instant) {
        if self.millis_since_epoch(now) < self.earliest_expiry.load(Ordering::Relaxed) {
            return;
        }

        let mut earliest = u64::MAX;
        self.windows.retain(|_, window| {
            let live = now < window.expires_at;
            if live {
                earliest = earliest.min(self.millis_since_epoch(window.expires_at));
            }
            live
        });
        self.earliest_expiry.store(earliest, Ordering::Relaxed);
    }

    // Rounds down, so the stored bound never lies after a real expiry
    fn millis_since_epoch(&self, at: Instant) -> u64 {
        at.saturating_duration_since(self.epoch).as_millis() as u64
    }
}

/// Identify the caller from proxy headers.
///
/// Uses the first populated header of `X-Forwarded-For` (first hop only),
/// `X-Real-IP`, `CF-Connecting-IP`, falling back to `"unknown"`.
pub fn client_key(headers: &HeaderMap) -> String {
    CLIENT_IP_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(',').next())
        .map(str::trim)
        .find(|ip| !ip.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}
