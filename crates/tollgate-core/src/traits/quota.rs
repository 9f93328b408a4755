// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable keyed storage for rate-limit counters.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::TollgateError;
use crate::types::RateLimitRecord;

/// One record per identifier. The limiter holds a per-identifier lock
/// across every get/upsert pair, so implementations only need single-call
/// consistency, not multi-call transactions.
#[async_trait]
pub trait QuotaStore: Send + Sync + 'static {
    /// Fetch the record for `identifier`, if one exists.
    async fn get(&self, identifier: &str) -> Result<Option<RateLimitRecord>, TollgateError>;

    /// Insert or overwrite the record keyed by `record.identifier`.
    async fn upsert(&self, record: &RateLimitRecord) -> Result<(), TollgateError>;

    /// Delete records whose `last_request_at` is before `idle_before`.
    /// Returns the number removed.
    async fn delete_idle(&self, idle_before: DateTime<Utc>) -> Result<u64, TollgateError>;

    /// Zero `daily_count`/`daily_tokens` and realign the day window for
    /// records whose identifier starts with `identifier_prefix` (all
    /// records when `None`). Returns the number of records touched.
    async fn reset_daily(
        &self,
        identifier_prefix: Option<&str>,
        day_window_start: DateTime<Utc>,
    ) -> Result<u64, TollgateError>;
}
