//! Injectable time source
//!
//! Retry intervals, jitter and the ad-throttling window all read time through
//! `Clock`, so tests can either drive a `ManualClock` or run `SystemClock` on
//! tokio's paused timeline.

use async_trait::async_trait;
use core::time::Duration;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::types::Timestamp;

// ----------------------------------------------------------------------------
// Clock Trait
// ----------------------------------------------------------------------------

/// Source of monotonic time and of delays
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current position on this clock's timeline
    fn now(&self) -> Timestamp;

    /// Suspend the calling unit of work for `duration`
    async fn sleep(&self, duration: Duration);
}

// ----------------------------------------------------------------------------
// System Clock
// ----------------------------------------------------------------------------

/// Wall-clock implementation backed by `tokio::time`
///
/// Timestamps count from the moment the clock was created. Because it uses
/// `tokio::time::Instant`, a runtime started with paused time drives it too.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: tokio::time::Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        // Offset by one so the first instant is never mistaken for "never".
        Timestamp::new(self.origin.elapsed().as_millis() as u64 + 1)
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

// ----------------------------------------------------------------------------
// Manual Clock
// ----------------------------------------------------------------------------

/// Deterministic clock whose `sleep` advances virtual time instantly
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<AtomicU64>,
    slept: Arc<AtomicU64>,
}

impl ManualClock {
    /// Start at the given millisecond offset
    pub fn new_at(start_millis: u64) -> Self {
        Self {
            current: Arc::new(AtomicU64::new(start_millis)),
            slept: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn new() -> Self {
        Self::new_at(1)
    }

    pub fn advance(&self, duration: Duration) {
        self.current
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, millis: u64) {
        self.current.store(millis, Ordering::SeqCst);
    }

    /// Total virtual time spent in `sleep`
    pub fn total_slept(&self) -> Duration {
        Duration::from_millis(self.slept.load(Ordering::SeqCst))
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.current.load(Ordering::SeqCst))
    }

    async fn sleep(&self, duration: Duration) {
        let millis = duration.as_millis() as u64;
        self.slept.fetch_add(millis, Ordering::SeqCst);
        self.current.fetch_add(millis, Ordering::SeqCst);
        tokio::task::yield_now().await;
    }
}
