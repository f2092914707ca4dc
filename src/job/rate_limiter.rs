use crate::properties::MigrationProperties;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Async token bucket without burst: the first permit is immediate, later
/// permits are spaced `1 / permits_per_second` apart. Waiters queue on the
/// next free slot, so concurrent callers share one rate.
#[derive(Debug)]
pub struct RateLimiter {
    name: &'static str,
    permits_per_second: u32,
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
    acquired: AtomicU64,
}

impl RateLimiter {
    pub fn new(name: &'static str, permits_per_second: u32) -> Self {
        let permits_per_second = permits_per_second.max(1);
        Self {
            name,
            permits_per_second,
            interval: Duration::from_secs(1) / permits_per_second,
            next_slot: Mutex::new(None),
            acquired: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn permits_per_second(&self) -> u32 {
        self.permits_per_second
    }

    /// Permits handed out so far.
    pub fn acquired(&self) -> u64 {
        self.acquired.load(Ordering::Relaxed)
    }

    /// Waits until a permit is available.
    pub async fn acquire(&self) {
        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next_slot {
                Some(reserved) if reserved > now => reserved,
                _ => now,
            };
            *next_slot = Some(slot + self.interval);
            slot
        };
        if slot > Instant::now() {
            tokio::time::sleep_until(slot).await;
        }
        self.acquired.fetch_add(1, Ordering::Relaxed);
    }
}

/// The three independent limiters a job throttles on.
#[derive(Debug)]
pub struct RateLimiters {
    pub origin_read: RateLimiter,
    pub target_read: RateLimiter,
    pub target_write: RateLimiter,
}

impl RateLimiters {
    pub fn from_properties(properties: &MigrationProperties) -> Self {
        Self {
            origin_read: RateLimiter::new("origin-read", properties.rate_limit_origin_reads),
            target_read: RateLimiter::new("target-read", properties.rate_limit_target_reads),
            target_write: RateLimiter::new("target-write", properties.rate_limit_target_writes),
        }
    }
}
