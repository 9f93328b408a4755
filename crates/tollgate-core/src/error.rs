// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Tollgate control plane.
//!
//! Only infrastructure failures travel on this channel. Structural outcomes
//! that every caller must branch on -- a quota denial, a cache miss -- are
//! ordinary return values (`AdmissionDecision`, `Option<CacheEntry>`), never
//! errors.

use thiserror::Error;

use crate::types::JobStatus;

/// The primary error type used across all Tollgate crates.
#[derive(Debug, Error)]
pub enum TollgateError {
    /// Configuration errors (invalid TOML, out-of-range values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, corrupt row).
    ///
    /// Callers must treat these as fail-closed: deny admission, treat the
    /// cache as a miss, leave job state unchanged.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Call gateway errors (API failure, malformed classification payload).
    #[error("gateway error: {message}")]
    Gateway {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The referenced processing job does not exist.
    #[error("job not found: {job_id}")]
    JobNotFound { job_id: String },

    /// A state-machine transition was attempted that is not permitted from
    /// the job's current status.
    #[error("invalid transition: {event} on job {job_id} in status {from}")]
    InvalidTransition {
        job_id: String,
        from: JobStatus,
        event: &'static str,
    },

    /// `retry` was requested on a failed job whose retry budget is spent.
    /// The job remains `failed`.
    #[error("retry exhausted for job {job_id}: all {max_retries} retries used")]
    RetryExhausted { job_id: String, max_retries: u32 },

    /// A store operation did not complete within the caller-imposed timeout.
    #[error("storage operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
