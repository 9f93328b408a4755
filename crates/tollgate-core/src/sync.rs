// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-key locking for atomic read-modify-write sequences.
//!
//! Each keyed record (rate-limit identifier, cache key, job id) is guarded
//! by its own async mutex so two concurrent mutations of the same record
//! serialize while unrelated keys proceed in parallel. Cross-key operations
//! are never atomic with each other.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A map of per-key async mutexes.
///
/// Lock entries are created on first use and retained for the lifetime of
/// the owning controller; the set of live keys is bounded by the set of
/// identifiers the process has touched.
#[derive(Default)]
pub struct KeyedMutex {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedMutex {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Acquire the lock for `key`, waiting if another task holds it.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(key.to_string())
            .or_default()
            .clone();
        lock.lock_owned().await
    }
}
