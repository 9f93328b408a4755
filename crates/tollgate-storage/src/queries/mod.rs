// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per control-plane table.

pub mod cache;
pub mod jobs;
pub mod quota;

use chrono::{DateTime, Utc};
use tollgate_core::clock;

/// Format a timestamp for storage.
pub(crate) fn fmt_ts(dt: &DateTime<Utc>) -> String {
    clock::to_iso8601(dt)
}

/// Format an optional timestamp for storage.
pub(crate) fn fmt_ts_opt(dt: &Option<DateTime<Utc>>) -> Option<String> {
    dt.as_ref().map(clock::to_iso8601)
}

/// Parse a stored timestamp, reporting malformed values as column
/// conversion failures so they surface through the normal rusqlite error
/// path.
pub(crate) fn parse_ts(idx: usize, value: String) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

/// Parse an optional stored timestamp.
pub(crate) fn parse_ts_opt(
    idx: usize,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, rusqlite::Error> {
    value.map(|v| parse_ts(idx, v)).transpose()
}
