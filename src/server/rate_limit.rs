//! Fixed-window request throttling, keyed by caller address. Counters live
//! in the same lock-over-map shape as the revocation table and are swept by
//! the background maintenance ticker.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub struct RateLimiter {
    max: u32,
    window: Duration,
    hits: Mutex<HashMap<String, (Instant, u32)>>,
}

impl RateLimiter {
    pub fn new(max: u32, window: Duration) -> Self {
        Self { max, window, hits: Mutex::new(HashMap::new()) }
    }

    /// Login attempts: 5 per 15 minutes per address.
    pub fn login() -> Self {
        Self::new(5, Duration::from_secs(15 * 60))
    }

    /// General API traffic: 100 per 15 minutes per address.
    pub fn api() -> Self {
        Self::new(100, Duration::from_secs(15 * 60))
    }

    /// Record a hit for `key` and report whether it is within the window
    /// budget. The first hit after a window lapses starts a fresh window.
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut hits = self.hits.lock();
        let entry = hits.entry(key.to_string()).or_insert((now, 0));
        if now.duration_since(entry.0) >= self.window {
            *entry = (now, 0);
        }
        entry.1 += 1;
        entry.1 <= self.max
    }

    /// Drop counters whose window has lapsed. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut hits = self.hits.lock();
        let before = hits.len();
        hits.retain(|_, (start, _)| now.duration_since(*start) < self.window);
        before - hits.len()
    }
}
