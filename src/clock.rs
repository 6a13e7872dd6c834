//! Wall-clock sources.
//!
//! Expiry is always decided by comparing wall-clock readings, never by
//! counting ticks, so a late or early tick cannot shift the fire time.

use chrono::{DateTime, FixedOffset, Local, TimeZone};
use std::sync::{Arc, Mutex, PoisonError};

pub trait Clock {
    type Tz: TimeZone;

    fn now(&self) -> DateTime<Self::Tz>;
}

/// Local time as reported by the OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Tz = Local;

    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock that only moves when told to. Clones share the same reading.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<FixedOffset>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<FixedOffset>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, to: DateTime<FixedOffset>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = to;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut guard = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = *guard + by;
    }
}

impl Clock for ManualClock {
    type Tz = FixedOffset;

    fn now(&self) -> DateTime<FixedOffset> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_clones_share_time() {
        let start = DateTime::parse_from_rfc3339("2026-03-01T10:00:00+00:00").unwrap();
        let clock = ManualClock::new(start);
        let other = clock.clone();
        other.advance(chrono::Duration::seconds(90));
        assert_eq!(
            clock.now(),
            DateTime::parse_from_rfc3339("2026-03-01T10:01:30+00:00").unwrap()
        );
    }
}
