// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Clock abstraction and timestamp formatting.
//!
//! All window arithmetic in the limiter and all expiry checks in the cache
//! are pure functions of a [`Clock`], so tests can drive time explicitly
//! instead of sleeping.

use chrono::{DateTime, Utc};

use crate::error::TollgateError;

/// Source of the current time for every component in the control plane.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Format a timestamp as ISO 8601 with millisecond precision.
///
/// This is the canonical persisted form; it sorts lexicographically in the
/// same order as the instants it encodes.
pub fn to_iso8601(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Parse a timestamp previously written by [`to_iso8601`].
pub fn parse_iso8601(s: &str) -> Result<DateTime<Utc>, TollgateError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TollgateError::Internal(format!("malformed timestamp {s:?}: {e}")))
}
