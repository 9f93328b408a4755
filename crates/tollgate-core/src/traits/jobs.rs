// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable keyed storage for processing jobs.

use async_trait::async_trait;

use crate::error::TollgateError;
use crate::types::{JobFilter, ProcessingJob};

/// One record per job id. Jobs are never deleted here; purging old audit
/// records is an external collaborator's concern.
#[async_trait]
pub trait JobStore: Send + Sync + 'static {
    /// Persist a freshly created job.
    async fn insert(&self, job: &ProcessingJob) -> Result<(), TollgateError>;

    /// Fetch a job by id.
    async fn get(&self, id: &str) -> Result<Option<ProcessingJob>, TollgateError>;

    /// Overwrite the job keyed by `job.id`.
    async fn update(&self, job: &ProcessingJob) -> Result<(), TollgateError>;

    /// The most recently created `pending`/`running` job of `job_type`,
    /// optionally narrowed to one source.
    async fn find_active(
        &self,
        job_type: &str,
        source_id: Option<&str>,
    ) -> Result<Option<ProcessingJob>, TollgateError>;

    /// Jobs matching `filter`, newest first, at most `limit`.
    async fn history(
        &self,
        filter: &JobFilter,
        limit: u32,
    ) -> Result<Vec<ProcessingJob>, TollgateError>;
}
