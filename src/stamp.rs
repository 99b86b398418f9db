//! Process-wide monotonic millisecond stamps.
//!
//! Fallback identifiers and audio cache-busters are both derived from the
//! wall clock. Two calls landing in the same millisecond must still differ,
//! so each stamp is `max(now_ms, previous + 1)`.

use std::sync::atomic::{AtomicU64, Ordering};

static LAST_STAMP: AtomicU64 = AtomicU64::new(0);

/// Returns a non-zero, strictly increasing millisecond timestamp.
pub fn next_stamp() -> u64 {
    let now = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0);
    let mut prev = LAST_STAMP.load(Ordering::Relaxed);
    loop {
        let next = now.max(prev + 1);
        match LAST_STAMP.compare_exchange_weak(prev, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => prev = actual,
        }
    }
}
