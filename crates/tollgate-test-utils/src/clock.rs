// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Manually advanced clock for deterministic time-based tests.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeDelta, Utc};
use tollgate_core::Clock;

/// A clock that only moves when the test says so.
///
/// Clones share the same underlying instant, so a clone handed to a
/// controller observes every `advance`/`set` made by the test.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Create a clock frozen at an arbitrary fixed instant.
    pub fn fixed() -> Self {
        let start = DateTime::parse_from_rfc3339("2026-03-01T10:15:00.000Z")
            .expect("valid literal")
            .with_timezone(&Utc);
        Self::new(start)
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().expect("clock lock poisoned");
        *now += delta;
    }

    /// Jump the clock to an absolute instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock().expect("clock lock poisoned") = instant;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_moves_shared_instant() {
        let clock = ManualClock::fixed();
        let observer = clock.clone();
        let before = observer.now();
        clock.advance(TimeDelta::minutes(61));
        assert_eq!(observer.now() - before, TimeDelta::minutes(61));
    }
}
