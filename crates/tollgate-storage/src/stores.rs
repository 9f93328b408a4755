// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed implementations of the control-plane store traits.
//!
//! Each store is a thin shell over one query module and shares the same
//! `Database` handle, so every write funnels through the single background
//! connection.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tollgate_core::TollgateError;
use tollgate_core::traits::{CacheStore, JobStore, QuotaStore};
use tollgate_core::types::{CacheEntry, JobFilter, ProcessingJob, RateLimitRecord};

use crate::database::Database;
use crate::queries;

/// Rate-limit records in the `rate_limits` table.
pub struct SqliteQuotaStore {
    db: Arc<Database>,
}

impl SqliteQuotaStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl QuotaStore for SqliteQuotaStore {
    async fn get(&self, identifier: &str) -> Result<Option<RateLimitRecord>, TollgateError> {
        queries::quota::get(&self.db, identifier).await
    }

    async fn upsert(&self, record: &RateLimitRecord) -> Result<(), TollgateError> {
        queries::quota::upsert(&self.db, record).await
    }

    async fn delete_idle(&self, idle_before: DateTime<Utc>) -> Result<u64, TollgateError> {
        queries::quota::delete_idle(&self.db, idle_before).await
    }

    async fn reset_daily(
        &self,
        identifier_prefix: Option<&str>,
        day_window_start: DateTime<Utc>,
    ) -> Result<u64, TollgateError> {
        queries::quota::reset_daily(&self.db, identifier_prefix, day_window_start).await
    }
}

/// Classification results in the `classification_cache` table.
pub struct SqliteCacheStore {
    db: Arc<Database>,
}

impl SqliteCacheStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, TollgateError> {
        queries::cache::get(&self.db, key).await
    }

    async fn put(&self, entry: &CacheEntry) -> Result<(), TollgateError> {
        queries::cache::put(&self.db, entry).await
    }

    async fn delete_expired(
        &self,
        now: DateTime<Utc>,
        batch_size: u32,
    ) -> Result<u64, TollgateError> {
        queries::cache::delete_expired(&self.db, now, batch_size).await
    }
}

/// Processing jobs in the `processing_jobs` table.
pub struct SqliteJobStore {
    db: Arc<Database>,
}

impl SqliteJobStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn insert(&self, job: &ProcessingJob) -> Result<(), TollgateError> {
        queries::jobs::insert(&self.db, job).await
    }

    async fn get(&self, id: &str) -> Result<Option<ProcessingJob>, TollgateError> {
        queries::jobs::get(&self.db, id).await
    }

    async fn update(&self, job: &ProcessingJob) -> Result<(), TollgateError> {
        queries::jobs::update(&self.db, job).await
    }

    async fn find_active(
        &self,
        job_type: &str,
        source_id: Option<&str>,
    ) -> Result<Option<ProcessingJob>, TollgateError> {
        queries::jobs::find_active(&self.db, job_type, source_id).await
    }

    async fn history(
        &self,
        filter: &JobFilter,
        limit: u32,
    ) -> Result<Vec<ProcessingJob>, TollgateError> {
        queries::jobs::history(&self.db, filter, limit).await
    }
}
