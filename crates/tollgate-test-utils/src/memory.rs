// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory store implementations.
//!
//! Functionally equivalent to the SQLite backend for single-process use,
//! which keeps controller tests free of filesystem setup. Each store has a
//! fault-injection switch so fail-closed paths can be exercised.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use tollgate_core::types::{CacheEntry, JobFilter, ProcessingJob, RateLimitRecord};
use tollgate_core::{CacheStore, JobStore, QuotaStore, TollgateError};

fn injected_failure() -> TollgateError {
    TollgateError::Storage {
        source: "injected storage failure".into(),
    }
}

/// In-memory [`QuotaStore`].
#[derive(Default)]
pub struct MemoryQuotaStore {
    records: Mutex<HashMap<String, RateLimitRecord>>,
    failing: AtomicBool,
}

impl MemoryQuotaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every operation returns a storage error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), TollgateError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(injected_failure());
        }
        Ok(())
    }
}

#[async_trait]
impl QuotaStore for MemoryQuotaStore {
    async fn get(&self, identifier: &str) -> Result<Option<RateLimitRecord>, TollgateError> {
        self.check()?;
        Ok(self.records.lock().await.get(identifier).cloned())
    }

    async fn upsert(&self, record: &RateLimitRecord) -> Result<(), TollgateError> {
        self.check()?;
        self.records
            .lock()
            .await
            .insert(record.identifier.clone(), record.clone());
        Ok(())
    }

    async fn delete_idle(&self, idle_before: DateTime<Utc>) -> Result<u64, TollgateError> {
        self.check()?;
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|_, r| r.last_request_at >= idle_before);
        Ok((before - records.len()) as u64)
    }

    async fn reset_daily(
        &self,
        identifier_prefix: Option<&str>,
        day_window_start: DateTime<Utc>,
    ) -> Result<u64, TollgateError> {
        self.check()?;
        let mut records = self.records.lock().await;
        let mut touched = 0;
        for record in records.values_mut() {
            if identifier_prefix.is_none_or(|p| record.identifier.starts_with(p)) {
                record.daily_count = 0;
                record.daily_tokens = 0;
                record.day_window_start = day_window_start;
                touched += 1;
            }
        }
        Ok(touched)
    }
}

/// In-memory [`CacheStore`].
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, CacheEntry>>,
    failing: AtomicBool,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every operation returns a storage error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of physically stored entries, expired or not.
    pub async fn physical_len(&self) -> usize {
        self.entries.lock().await.len()
    }

    fn check(&self) -> Result<(), TollgateError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(injected_failure());
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, TollgateError> {
        self.check()?;
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn put(&self, entry: &CacheEntry) -> Result<(), TollgateError> {
        self.check()?;
        self.entries
            .lock()
            .await
            .insert(entry.key.clone(), entry.clone());
        Ok(())
    }

    async fn delete_expired(
        &self,
        now: DateTime<Utc>,
        batch_size: u32,
    ) -> Result<u64, TollgateError> {
        self.check()?;
        let mut entries = self.entries.lock().await;
        let mut expired: Vec<(String, DateTime<Utc>)> = entries
            .values()
            .filter(|e| e.expires_at <= now)
            .map(|e| (e.key.clone(), e.expires_at))
            .collect();
        expired.sort_by_key(|(_, expires_at)| *expires_at);
        expired.truncate(batch_size as usize);
        for (key, _) in &expired {
            entries.remove(key);
        }
        Ok(expired.len() as u64)
    }
}

/// In-memory [`JobStore`].
///
/// Keeps insertion order so "most recent" queries are stable even when a
/// manual clock hands several jobs the same `created_at`.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<Vec<ProcessingJob>>,
    failing: AtomicBool,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every operation returns a storage error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), TollgateError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(injected_failure());
        }
        Ok(())
    }
}

fn matches_filter(job: &ProcessingJob, filter: &JobFilter) -> bool {
    filter
        .job_type
        .as_ref()
        .is_none_or(|t| &job.job_type == t)
        && filter.source_id.as_ref().is_none_or(|s| {
            job.source_id.as_ref() == Some(s)
        })
        && filter.status.is_none_or(|s| job.status == s)
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert(&self, job: &ProcessingJob) -> Result<(), TollgateError> {
        self.check()?;
        self.jobs.lock().await.push(job.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<ProcessingJob>, TollgateError> {
        self.check()?;
        Ok(self
            .jobs
            .lock()
            .await
            .iter()
            .find(|j| j.id == id)
            .cloned())
    }

    async fn update(&self, job: &ProcessingJob) -> Result<(), TollgateError> {
        self.check()?;
        let mut jobs = self.jobs.lock().await;
        match jobs.iter_mut().find(|j| j.id == job.id) {
            Some(slot) => {
                *slot = job.clone();
                Ok(())
            }
            None => Err(TollgateError::JobNotFound {
                job_id: job.id.clone(),
            }),
        }
    }

    async fn find_active(
        &self,
        job_type: &str,
        source_id: Option<&str>,
    ) -> Result<Option<ProcessingJob>, TollgateError> {
        self.check()?;
        Ok(self
            .jobs
            .lock()
            .await
            .iter()
            .rev()
            .find(|j| {
                j.job_type == job_type
                    && j.status.is_active()
                    && source_id.is_none_or(|s| j.source_id.as_deref() == Some(s))
            })
            .cloned())
    }

    async fn history(
        &self,
        filter: &JobFilter,
        limit: u32,
    ) -> Result<Vec<ProcessingJob>, TollgateError> {
        self.check()?;
        Ok(self
            .jobs
            .lock()
            .await
            .iter()
            .rev()
            .filter(|j| matches_filter(j, filter))
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
