// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical domain types shared across the Tollgate workspace.
//!
//! These are the strongly-typed records persisted by the store traits and
//! returned to callers. Every mutation goes through the owning controller;
//! values handed out of a read are immutable snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// --- Quota limiter ---

/// Configured caps for one admission check.
///
/// A cap of 0 means "deny all" for that budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaPolicy {
    /// Maximum admitted requests per fixed hour window.
    pub requests_per_hour: u32,
    /// Maximum tokens consumable per fixed day window.
    pub tokens_per_day: u64,
}

/// Which budget triggered a denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// The hourly request count would exceed `requests_per_hour`.
    HourlyLimit,
    /// The daily token budget would exceed `tokens_per_day`.
    TokenLimit,
}

/// Per-identifier rate limit counters, one record per `"{source}:{endpoint}"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitRecord {
    /// Unique key, canonically `"{source}:{endpoint}"`.
    pub identifier: String,
    /// Requests admitted in the current hour window.
    pub hourly_count: u32,
    /// Requests admitted in the current day window.
    pub daily_count: u32,
    /// Tokens consumed in the current day window.
    pub daily_tokens: u64,
    /// Start of the hour window the counts belong to.
    pub hour_window_start: DateTime<Utc>,
    /// Start of the day window the counts belong to.
    pub day_window_start: DateTime<Utc>,
    /// Configured hourly request cap as of the last check.
    pub requests_per_hour_cap: u32,
    /// Configured daily token cap as of the last check.
    pub tokens_per_day_cap: u64,
    /// Most recent admitted or denied attempt (observability only).
    pub last_request_at: DateTime<Utc>,
}

/// Outcome of one admission check. A denial is a first-class value, not an
/// error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdmissionDecision {
    /// Whether the request was admitted.
    pub allowed: bool,
    /// Requests remaining in the current hour window.
    pub hourly_remaining: u32,
    /// Tokens remaining in the current day window.
    pub daily_tokens_remaining: u64,
    /// When the hour window next rolls over (for caller backoff).
    pub reset_hour: DateTime<Utc>,
    /// When the day window next rolls over.
    pub reset_day: DateTime<Utc>,
    /// Set iff `allowed` is false.
    pub denied_reason: Option<DenialReason>,
}

// --- Result cache ---

/// The memoized payload of one classification call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationOutcome {
    /// The assigned label.
    pub classification: String,
    /// Confidence in the classification (0.0-1.0).
    pub confidence: f32,
    /// Model-supplied reasoning for the label.
    pub reasoning: String,
}

/// One content-addressed cache record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Content hash or caller-supplied semantic key. Unique.
    pub key: String,
    /// The memoized result.
    pub outcome: ClassificationOutcome,
    /// Successful lookups since creation. Creation itself is not a hit.
    pub hit_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    /// Entries with `expires_at <= now` are logically absent even while
    /// still physically stored.
    pub expires_at: DateTime<Utc>,
}

// --- Processing jobs ---

/// Lifecycle status of a processing job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Whether a job in this status still counts as active work.
    pub fn is_active(self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Running)
    }
}

/// A retryable, long-running work item wrapping a collection or
/// classification call. Retained indefinitely as an audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingJob {
    /// Unique identifier (UUID v4), assigned at creation.
    pub id: String,
    /// Caller-defined category, e.g. "classification" or "collection".
    pub job_type: String,
    pub status: JobStatus,
    /// Optional reference to the source the job operates on.
    pub source_id: Option<String>,
    /// Optional reference to a related entity.
    pub related_entity_id: Option<String>,
    /// Opaque input payload.
    pub parameters: serde_json::Value,
    /// Higher is scheduled first by external schedulers; the core only
    /// records it.
    pub priority: i32,
    /// Progress in [0, 1].
    pub progress: f32,
    pub retry_count: u32,
    pub max_retries: u32,
    /// Set only while status is `failed` or `cancelled`.
    pub error_message: Option<String>,
    /// Set only when status is `completed`.
    pub result: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
}

/// Input for creating a new processing job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub job_type: String,
    pub parameters: serde_json::Value,
    pub source_id: Option<String>,
    pub related_entity_id: Option<String>,
    pub priority: i32,
    /// Overrides the orchestrator's configured default when set.
    pub max_retries: Option<u32>,
}

impl NewJob {
    /// Create a job request with default priority and retry budget.
    pub fn new(job_type: impl Into<String>, parameters: serde_json::Value) -> Self {
        Self {
            job_type: job_type.into(),
            parameters,
            source_id: None,
            related_entity_id: None,
            priority: 0,
            max_retries: None,
        }
    }
}

/// Filters for the job history query. All fields are conjunctive; `None`
/// matches everything.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub job_type: Option<String>,
    pub source_id: Option<String>,
    pub status: Option<JobStatus>,
}

// --- Call gateway boundary ---

/// A request to the external call gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRequest {
    pub model: String,
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// The gateway's synchronous response. Transport retries are the gateway's
/// concern, not the control plane's.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub text: String,
    pub tokens_used: u64,
}
