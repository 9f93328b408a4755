// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-window arithmetic.
//!
//! Windows are aligned to wall-clock boundaries: each hour window starts at
//! `floor(now / 1h) * 1h` and each day window at `floor(now / 24h) * 24h`,
//! both in UTC. Fixed windows are deliberately simple; admission here gates
//! expensive human-scale classification calls, not high-frequency traffic,
//! so burst-at-boundary behavior is an accepted tradeoff.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};

const HOUR_MS: i64 = 3_600_000;
const DAY_MS: i64 = 86_400_000;

fn floor_to(now: DateTime<Utc>, window_ms: i64) -> DateTime<Utc> {
    let ms = now.timestamp_millis();
    Utc.timestamp_millis_opt(ms - ms.rem_euclid(window_ms))
        .single()
        // Unrepresentable only at the extreme edges of the chrono range.
        .unwrap_or(now)
}

/// Start of the hour window containing `now`.
pub fn hour_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    floor_to(now, HOUR_MS)
}

/// Start of the day window containing `now`.
pub fn day_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    floor_to(now, DAY_MS)
}

/// The instant the hour window containing `now` rolls over.
pub fn next_hour_reset(now: DateTime<Utc>) -> DateTime<Utc> {
    hour_window_start(now) + TimeDelta::hours(1)
}

/// The instant the day window containing `now` rolls over.
pub fn next_day_reset(now: DateTime<Utc>) -> DateTime<Utc> {
    day_window_start(now) + TimeDelta::days(1)
}
