// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content-addressed memoization of classification results.
//!
//! `ResultCache` serves memoized results and records hits. An expired entry
//! is logically absent: lookups never return it, but deletion is a separate
//! batched sweep so lookups stay O(1) and side-effect-light. Hit counting is
//! folded into `lookup` itself so callers cannot forget to record a hit.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use tracing::{debug, info, warn};

use tollgate_core::types::{CacheEntry, ClassificationOutcome};
use tollgate_core::{CacheStore, Clock, KeyedMutex, TollgateError};

const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Memoization cache over an injected [`CacheStore`].
///
/// This is a cache, not a source of truth: `store` is last-writer-wins, and
/// a lost hit-count bump is tolerated rather than failing a successful
/// lookup.
pub struct ResultCache {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    locks: KeyedMutex,
    io_timeout: Duration,
}

impl ResultCache {
    /// Create a cache with the default storage I/O timeout.
    pub fn new(store: Arc<dyn CacheStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_io_timeout(store, clock, DEFAULT_IO_TIMEOUT)
    }

    /// Create a cache with an explicit storage I/O timeout.
    pub fn with_io_timeout(
        store: Arc<dyn CacheStore>,
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

    /// Fetch the live entry for `key`, recording a hit.
    ///
    /// Returns the snapshot as stored before this lookup's bump, so a
    /// freshly stored entry reads back with `hit_count == 0`. Expired
    /// entries and lookup timeouts are both misses; only hard storage
    /// errors propagate.
    pub async fn lookup(&self, key: &str) -> Result<Option<CacheEntry>, TollgateError> {
        let _guard = self.locks.lock(key).await;
        let now = self.clock.now();

        let entry = match self.store_call(self.store.get(key)).await {
            Ok(entry) => entry,
            Err(TollgateError::Timeout { duration }) => {
                warn!(key, ?duration, "cache lookup timed out, treating as miss");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        let Some(entry) = entry else {
            return Ok(None);
        };
        if entry.expires_at <= now {
            debug!(key, expires_at = %entry.expires_at, "expired entry treated as miss");
            return Ok(None);
        }

        let mut bumped = entry.clone();
        bumped.hit_count += 1;
        bumped.last_accessed_at = now;
        // Hit counting is observability; a failed bump must not turn a hit
        // into an error.
        if let Err(e) = self.store_call(self.store.put(&bumped)).await {
            warn!(key, error = %e, "failed to record cache hit");
        }

        Ok(Some(entry))
    }

    /// Upsert the result for `key` with the given time-to-live.
    ///
    /// Overwriting a live entry is allowed: last writer wins, the creation
    /// timestamps reset, and hit counting starts over.
    pub async fn store(
        &self,
        key: &str,
        outcome: ClassificationOutcome,
        ttl: TimeDelta,
    ) -> Result<CacheEntry, TollgateError> {
        let _guard = self.locks.lock(key).await;
        let now = self.clock.now();
        let entry = CacheEntry {
            key: key.to_string(),
            outcome,
            hit_count: 0,
            created_at: now,
            last_accessed_at: now,
            expires_at: now + ttl,
        };
        self.store_call(self.store.put(&entry)).await?;
        debug!(key, expires_at = %entry.expires_at, "classification result cached");
        Ok(entry)
    }

    /// Remove up to `batch_size` expired entries, oldest expiry first.
    ///
    /// Designed to be called repeatedly by an external scheduler until it
    /// returns 0; the batch bound keeps any single call cheap.
    pub async fn expire_sweep(&self, batch_size: u32) -> Result<u64, TollgateError> {
        let now = self.clock.now();
        let removed = self
            .store_call(self.store.delete_expired(now, batch_size))
            .await?;
        if removed > 0 {
            info!(removed, batch_size, "expired cache entries swept");
        }
        Ok(removed)
    }
}
