//! Rate Limiter - Per-Identifier Fixed Windows
//!
//! Counts requests per identifier (session, user) inside a fixed window.
//!
//! # Algorithm
//!
//! - First request, or first request after the window closed: the entry is
//!   replaced with `count = 1` and a fresh window.
//! - Window full: denied, entry left untouched so the count stays bounded.
//! - Otherwise: count incremented, allowed.
//!
//! Windows are fixed, not sliding: a burst straddling a boundary can admit
//! up to twice the limit in a short span.
//!
//! Abandoned identifiers are removed by [`RateLimiter::sweep`], which the
//! server runs on a timer independently of [`RateLimiter::check`].

use crate::clock::{Clock, SystemClock};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Per-identifier window state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    /// Epoch millis at which the window closes.
    pub reset_time: i64,
}

/// Outcome of a single [`RateLimiter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_time: i64,
}

/// In-memory fixed-window rate limiter.
pub struct RateLimiter {
    entries: Mutex<HashMap<String, RateLimitEntry>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Limiter backed by the wall clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Record a request for `identifier` and report whether it is admitted.
    ///
    /// The whole read-modify-write happens under one lock with no I/O.
    pub fn check(&self, identifier: &str, max_requests: u32, window_ms: u64) -> RateLimitDecision {
        let max_requests = max_requests.max(1);
        let window_ms = i64::try_from(window_ms.max(1)).unwrap_or(i64::MAX);
        let now = self.clock.now_millis();

        let mut entries = self.lock();

        if let Some(entry) = entries.get_mut(identifier) {
            if now <= entry.reset_time {
                if entry.count >= max_requests {
                    return RateLimitDecision {
                        allowed: false,
                        remaining: 0,
                        reset_time: entry.reset_time,
                    };
                }
                entry.count += 1;
                return RateLimitDecision {
                    allowed: true,
                    remaining: max_requests - entry.count,
                    reset_time: entry.reset_time,
                };
            }
        }

        let entry = RateLimitEntry {
            count: 1,
            reset_time: now.saturating_add(window_ms),
        };
        entries.insert(identifier.to_string(), entry);
        RateLimitDecision {
            allowed: true,
            remaining: max_requests - 1,
            reset_time: entry.reset_time,
        }
    }

    /// Drop every entry whose window has closed. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_millis();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| now <= entry.reset_time);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, remaining = entries.len(), "Swept expired rate limit entries");
        }
        removed
    }

    /// Current entry for an identifier, if any.
    pub fn entry(&self, identifier: &str) -> Option<RateLimitEntry> {
        self.lock().get(identifier).copied()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Entries are plain data, so a poisoned lock still holds a usable map.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, RateLimitEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("entries", &self.len())
            .finish()
    }
}
