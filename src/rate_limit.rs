// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-identity, per-action request rate limiting.
//!
//! A fixed-window counter keyed by `(identity, action)` held in a bounded
//! LRU map. Counters evicted under memory pressure simply start over.

use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use lru::LruCache;

/// Rate-limited actions.
pub const ACTION_LAUNCH_CREATE: &str = "launch-create";
pub const ACTION_LAUNCH_LIST: &str = "launch-list";
pub const ACTION_LAUNCH_GET: &str = "launch-get";
pub const ACTION_LAUNCH_EVENTS: &str = "launch-events";
pub const ACTION_LAUNCH_RETRY: &str = "launch-retry";

/// Number of tracked `(identity, action)` windows.
const DEFAULT_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allow,
    Deny,
}

pub trait RateLimiter: Send + Sync {
    fn check(&self, identity: &str, action: &str) -> RateDecision;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

pub struct FixedWindowLimiter {
    limit: u32,
    window: Duration,
    windows: Mutex<LruCache<String, Window>>,
}

impl FixedWindowLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: Mutex::new(LruCache::new(
                NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }

    /// `limit` requests per minute.
    pub fn per_minute(limit: u32) -> Self {
        Self::new(limit, Duration::from_secs(60))
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn check(&self, identity: &str, action: &str) -> RateDecision {
        let key = format!("{action}:{identity}");
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);

        let expired = windows
            .get(&key)
            .is_none_or(|window| now.duration_since(window.started) >= self.window);
        if expired {
            windows.put(key.clone(), Window { started: now, count: 0 });
        }
        let Some(window) = windows.get_mut(&key) else {
            return RateDecision::Allow;
        };

        if window.count >= self.limit {
            return RateDecision::Deny;
        }
        window.count += 1;
        RateDecision::Allow
    }
}
