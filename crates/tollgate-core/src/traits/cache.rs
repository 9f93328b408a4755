// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable keyed storage for classification results.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::TollgateError;
use crate::types::CacheEntry;

/// One record per cache key. Expiry filtering is the cache controller's
/// responsibility; `get` returns whatever is physically stored.
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    /// Fetch the entry for `key`, expired or not.
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, TollgateError>;

    /// Insert or overwrite the entry keyed by `entry.key`.
    async fn put(&self, entry: &CacheEntry) -> Result<(), TollgateError>;

    /// Delete up to `batch_size` entries with `expires_at <= now`, oldest
    /// expiry first. Returns the number removed.
    async fn delete_expired(
        &self,
        now: DateTime<Utc>,
        batch_size: u32,
    ) -> Result<u64, TollgateError>;
}
