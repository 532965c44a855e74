//! Identifier and time capabilities injected into the ledger
//!
//! Production uses UUIDv7 identifiers and the system clock; tests swap in the
//! sequential and fixed variants to keep runs reproducible.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Prefix for aid request identifiers
pub const REQUEST_PREFIX: &str = "req";

/// Prefix for donation identifiers
pub const DONATION_PREFIX: &str = "don";

/// Source of unique identifiers
pub trait IdGenerator: Send + Sync {
    /// Next identifier, e.g. `req-...`
    fn next_id(&self, prefix: &str) -> String;
}

/// UUIDv7 identifiers (time-ordered)
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, uuid::Uuid::now_v7())
    }
}

/// Deterministic counter-based identifiers
#[derive(Debug)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    /// Start counting at 1
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self, prefix: &str) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", prefix, n)
    }
}

/// Source of timestamps
pub trait Clock: Send + Sync {
    /// Current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    /// Clock frozen at `now`
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sequential_ids() {
        let ids = SequentialIdGenerator::new();
        assert_eq!(ids.next_id(REQUEST_PREFIX), "req-1");
        assert_eq!(ids.next_id(DONATION_PREFIX), "don-2");
    }

    #[test]
    fn test_uuid_ids_unique() {
        let ids = UuidIdGenerator;
        let a = ids.next_id(REQUEST_PREFIX);
        let b = ids.next_id(REQUEST_PREFIX);
        assert_ne!(a, b);
        assert!(a.starts_with("req-"));
    }

    #[test]
    fn test_fixed_clock_advance() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::seconds(90));
        assert_eq!(clock.now(), start + Duration::seconds(90));
    }
}
