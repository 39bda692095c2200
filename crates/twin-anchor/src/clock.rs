//! Injectable time sources

use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of submission timestamps
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock that never yields the same millisecond twice within a process.
///
/// Simulated transaction ids hash the submission time, so two submissions in
/// the same millisecond would otherwise collide.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last_millis: AtomicI64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> DateTime<Utc> {
        let wall = Utc::now().timestamp_millis();
        let mut prev = self.last_millis.load(Ordering::Relaxed);
        loop {
            let next = wall.max(prev + 1);
            match self.last_millis.compare_exchange_weak(
                prev,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return DateTime::from_timestamp_millis(next).unwrap_or_else(Utc::now),
                Err(actual) => prev = actual,
            }
        }
    }
}

/// Clock frozen at one instant (tests, replay)
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
