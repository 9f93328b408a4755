// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-identifier admission control.
//!
//! `QuotaLimiter` combines a rolling hourly request cap with a daily token
//! budget, both over fixed windows aligned to clock boundaries. A denial is
//! a first-class return value; only storage failures use the error channel,
//! and callers must treat those as fail-closed (deny) so an outage never
//! bypasses quotas.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use tracing::{debug, info, warn};

use tollgate_core::types::{AdmissionDecision, DenialReason, QuotaPolicy, RateLimitRecord};
use tollgate_core::{Clock, KeyedMutex, QuotaStore, TollgateError};

use crate::window;

const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Admission controller over an injected [`QuotaStore`].
///
/// Every mutating operation on one identifier is an atomic
/// read-modify-write: a per-identifier lock is held from load to persist,
/// so two concurrent checks can never both observe "1 remaining" and both
/// admit.
pub struct QuotaLimiter {
    store: Arc<dyn QuotaStore>,
    clock: Arc<dyn Clock>,
    locks: KeyedMutex,
    io_timeout: Duration,
}

impl QuotaLimiter {
    /// Create a limiter with the default storage I/O timeout.
    pub fn new(store: Arc<dyn QuotaStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_io_timeout(store, clock, DEFAULT_IO_TIMEOUT)
    }

    /// Create a limiter with an explicit storage I/O timeout.
    pub fn with_io_timeout(
        store: Arc<dyn QuotaStore>,
        clock: Arc<dyn Clock>,
        io_timeout: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            locks: KeyedMutex::new(),
            io_timeout,
        }
    }

    async fn store_call<T, F>(&self, fut: F) -> Result<T, TollgateError>
    where
        F: Future<Output = Result<T, TollgateError>>,
    {
        match tokio::time::timeout(self.io_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(TollgateError::Timeout {
                duration: self.io_timeout,
            }),
        }
    }

    /// Decide whether one request costing `request_tokens` may proceed.
    ///
    /// A never-seen identifier gets a fresh record initialized by this
    /// request. Stale windows are rolled over lazily before the caps are
    /// checked. On denial nothing is counted except `last_request_at`.
    pub async fn check_and_admit(
        &self,
        identifier: &str,
        policy: QuotaPolicy,
        request_tokens: u64,
    ) -> Result<AdmissionDecision, TollgateError> {
        let _guard = self.locks.lock(identifier).await;
        let now = self.clock.now();
        let hour_start = window::hour_window_start(now);
        let day_start = window::day_window_start(now);

        let mut record = match self.store_call(self.store.get(identifier)).await? {
            Some(record) => record,
            None => RateLimitRecord {
                identifier: identifier.to_string(),
                hourly_count: 0,
                daily_count: 0,
                daily_tokens: 0,
                hour_window_start: hour_start,
                day_window_start: day_start,
                requests_per_hour_cap: policy.requests_per_hour,
                tokens_per_day_cap: policy.tokens_per_day,
                last_request_at: now,
            },
        };

        // Lazy window rollover; the hour and day windows roll independently.
        if record.hour_window_start < hour_start {
            record.hourly_count = 0;
            record.hour_window_start = hour_start;
        }
        if record.day_window_start < day_start {
            record.daily_count = 0;
            record.daily_tokens = 0;
            record.day_window_start = day_start;
        }

        // The caller's policy is authoritative; a reconfigured cap takes
        // effect on the next check.
        record.requests_per_hour_cap = policy.requests_per_hour;
        record.tokens_per_day_cap = policy.tokens_per_day;
        record.last_request_at = now;

        let denied_reason = if u64::from(record.hourly_count) + 1
            > u64::from(policy.requests_per_hour)
        {
            Some(DenialReason::HourlyLimit)
        } else if record.daily_tokens.saturating_add(request_tokens) > policy.tokens_per_day {
            Some(DenialReason::TokenLimit)
        } else {
            None
        };

        if denied_reason.is_none() {
            record.hourly_count += 1;
            record.daily_count += 1;
            record.daily_tokens += request_tokens;
        }
        self.store_call(self.store.upsert(&record)).await?;

        match denied_reason {
            Some(reason) => info!(
                identifier,
                reason = %reason,
                hourly_count = record.hourly_count,
                daily_tokens = record.daily_tokens,
                "admission denied"
            ),
            None => debug!(
                identifier,
                hourly_count = record.hourly_count,
                daily_tokens = record.daily_tokens,
                "admission granted"
            ),
        }

        Ok(AdmissionDecision {
            allowed: denied_reason.is_none(),
            hourly_remaining: record
                .requests_per_hour_cap
                .saturating_sub(record.hourly_count),
            daily_tokens_remaining: record
                .tokens_per_day_cap
                .saturating_sub(record.daily_tokens),
            reset_hour: window::next_hour_reset(now),
            reset_day: window::next_day_reset(now),
            denied_reason,
        })
    }

    /// Add tokens consumed beyond the admission-time estimate to the
    /// current day window, so the daily budget reflects actual usage.
    ///
    /// A missing record (e.g. swept between the call and this report) is
    /// logged and ignored; there is no budget left to correct.
    pub async fn record_usage(
        &self,
        identifier: &str,
        extra_tokens: u64,
    ) -> Result<(), TollgateError> {
        if extra_tokens == 0 {
            return Ok(());
        }
        let _guard = self.locks.lock(identifier).await;
        let now = self.clock.now();
        let day_start = window::day_window_start(now);

        let Some(mut record) = self.store_call(self.store.get(identifier)).await? else {
            warn!(identifier, extra_tokens, "usage reported for unknown identifier");
            return Ok(());
        };
        if record.day_window_start < day_start {
            record.daily_count = 0;
            record.daily_tokens = 0;
            record.day_window_start = day_start;
        }
        record.daily_tokens = record.daily_tokens.saturating_add(extra_tokens);
        self.store_call(self.store.upsert(&record)).await
    }

    /// Current counters for `identifier`, with stale windows normalized in
    /// the returned snapshot (the stored record is left untouched).
    pub async fn get_status(
        &self,
        identifier: &str,
    ) -> Result<Option<RateLimitRecord>, TollgateError> {
        let Some(mut record) = self.store_call(self.store.get(identifier)).await? else {
            return Ok(None);
        };
        let now = self.clock.now();
        let hour_start = window::hour_window_start(now);
        let day_start = window::day_window_start(now);
        if record.hour_window_start < hour_start {
            record.hourly_count = 0;
            record.hour_window_start = hour_start;
        }
        if record.day_window_start < day_start {
            record.daily_count = 0;
            record.daily_tokens = 0;
            record.day_window_start = day_start;
        }
        Ok(Some(record))
    }

    /// Zero the daily counters for identifiers matching `filter` (prefix
    /// match; `None` matches all). Returns the number of records touched.
    pub async fn reset_daily(&self, filter: Option<&str>) -> Result<u64, TollgateError> {
        let day_start = window::day_window_start(self.clock.now());
        let count = self
            .store_call(self.store.reset_daily(filter, day_start))
            .await?;
        info!(count, filter = filter.unwrap_or("*"), "daily counters reset");
        Ok(count)
    }

    /// Delete records idle for longer than `idle_for`. Returns the number
    /// removed. Externally triggered; the limiter owns no timer.
    pub async fn sweep_idle(&self, idle_for: TimeDelta) -> Result<u64, TollgateError> {
        let idle_before = self.clock.now() - idle_for;
        let removed = self.store_call(self.store.delete_idle(idle_before)).await?;
        if removed > 0 {
            info!(removed, "idle rate-limit records swept");
        }
        Ok(removed)
    }
}
