// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Processing job lifecycle and retry policy.
//!
//! States: `pending | running | completed | failed | cancelled`. Jobs are
//! created `pending`; `completed` and `cancelled` are terminal; `failed` is
//! terminal unless the caller explicitly requests a retry and the retry
//! budget is not spent. The orchestrator records lifecycle, it does not
//! schedule: priorities are stored for external schedulers, and cancelling
//! an in-flight call is the gateway's concern.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use tollgate_core::types::{JobFilter, JobStatus, NewJob, ProcessingJob};
use tollgate_core::{Clock, JobStore, KeyedMutex, TollgateError};

const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Job lifecycle controller over an injected [`JobStore`].
pub struct JobOrchestrator {
    store: Arc<dyn JobStore>,
    clock: Arc<dyn Clock>,
    locks: KeyedMutex,
    io_timeout: Duration,
    default_max_retries: u32,
}

impl JobOrchestrator {
    /// Create an orchestrator with default I/O timeout and retry budget.
    pub fn new(store: Arc<dyn JobStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_options(store, clock, DEFAULT_IO_TIMEOUT, DEFAULT_MAX_RETRIES)
    }

    /// Create an orchestrator with explicit I/O timeout and default retry
    /// budget for jobs that do not specify their own.
    pub fn with_options(
        store: Arc<dyn JobStore>,
        clock: Arc<dyn Clock>,
        io_timeout: Duration,
        default_max_retries: u32,
    ) -> Self {
        Self {
            store,
            clock,
            locks: KeyedMutex::new(),
            io_timeout,
            default_max_retries,
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

    async fn load(&self, id: &str) -> Result<ProcessingJob, TollgateError> {
        self.store_call(self.store.get(id))
            .await?
            .ok_or_else(|| TollgateError::JobNotFound {
                job_id: id.to_string(),
            })
    }

    /// Create a new job in `pending`.
    pub async fn create(&self, new_job: NewJob) -> Result<ProcessingJob, TollgateError> {
        let now = self.clock.now();
        let job = ProcessingJob {
            id: uuid::Uuid::new_v4().to_string(),
            job_type: new_job.job_type,
            status: JobStatus::Pending,
            source_id: new_job.source_id,
            related_entity_id: new_job.related_entity_id,
            parameters: new_job.parameters,
            priority: new_job.priority,
            progress: 0.0,
            retry_count: 0,
            max_retries: new_job.max_retries.unwrap_or(self.default_max_retries),
            error_message: None,
            result: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            failed_at: None,
        };
        self.store_call(self.store.insert(&job)).await?;
        info!(job_id = %job.id, job_type = %job.job_type, "job created");
        Ok(job)
    }

    /// `pending -> running`, stamping `started_at`.
    pub async fn start(&self, id: &str) -> Result<ProcessingJob, TollgateError> {
        let _guard = self.locks.lock(id).await;
        let mut job = self.load(id).await?;
        if job.status != JobStatus::Pending {
            return Err(TollgateError::InvalidTransition {
                job_id: job.id,
                from: job.status,
                event: "start",
            });
        }
        let now = self.clock.now();
        job.status = JobStatus::Running;
        job.started_at = Some(now);
        job.updated_at = now;
        self.store_call(self.store.update(&job)).await?;
        debug!(job_id = %job.id, "job started");
        Ok(job)
    }

    /// Update progress on a running job. Values are clamped to [0, 1].
    pub async fn progress(&self, id: &str, progress: f32) -> Result<ProcessingJob, TollgateError> {
        let _guard = self.locks.lock(id).await;
        let mut job = self.load(id).await?;
        if job.status != JobStatus::Running {
            return Err(TollgateError::InvalidTransition {
                job_id: job.id,
                from: job.status,
                event: "progress",
            });
        }
        job.progress = progress.clamp(0.0, 1.0);
        job.updated_at = self.clock.now();
        self.store_call(self.store.update(&job)).await?;
        Ok(job)
    }

    /// `running -> completed`, recording the result. Terminal.
    pub async fn complete(
        &self,
        id: &str,
        result: serde_json::Value,
    ) -> Result<ProcessingJob, TollgateError> {
        let _guard = self.locks.lock(id).await;
        let mut job = self.load(id).await?;
        if job.status != JobStatus::Running {
            return Err(TollgateError::InvalidTransition {
                job_id: job.id,
                from: job.status,
                event: "complete",
            });
        }
        let now = self.clock.now();
        job.status = JobStatus::Completed;
        job.result = Some(result);
        job.progress = 1.0;
        job.completed_at = Some(now);
        job.updated_at = now;
        self.store_call(self.store.update(&job)).await?;
        info!(job_id = %job.id, "job completed");
        Ok(job)
    }

    /// `running -> failed`, recording the error. Retryable via [`retry`].
    ///
    /// [`retry`]: JobOrchestrator::retry
    pub async fn fail(
        &self,
        id: &str,
        error: impl Into<String>,
    ) -> Result<ProcessingJob, TollgateError> {
        let _guard = self.locks.lock(id).await;
        let mut job = self.load(id).await?;
        if job.status != JobStatus::Running {
            return Err(TollgateError::InvalidTransition {
                job_id: job.id,
                from: job.status,
                event: "fail",
            });
        }
        let now = self.clock.now();
        let error = error.into();
        job.status = JobStatus::Failed;
        job.error_message = Some(error.clone());
        job.failed_at = Some(now);
        job.updated_at = now;
        self.store_call(self.store.update(&job)).await?;
        info!(job_id = %job.id, error = %error, "job failed");
        Ok(job)
    }

    /// `pending|running -> cancelled`, recording the reason. Terminal:
    /// cancelled jobs cannot be retried.
    pub async fn cancel(
        &self,
        id: &str,
        reason: impl Into<String>,
    ) -> Result<ProcessingJob, TollgateError> {
        let _guard = self.locks.lock(id).await;
        let mut job = self.load(id).await?;
        if !job.status.is_active() {
            return Err(TollgateError::InvalidTransition {
                job_id: job.id,
                from: job.status,
                event: "cancel",
            });
        }
        let now = self.clock.now();
        job.status = JobStatus::Cancelled;
        job.error_message = Some(reason.into());
        job.failed_at = Some(now);
        job.updated_at = now;
        self.store_call(self.store.update(&job)).await?;
        info!(job_id = %job.id, "job cancelled");
        Ok(job)
    }

    /// `failed -> pending`, consuming one retry.
    ///
    /// Fails with `RetryExhausted` when the budget is spent, leaving the
    /// job `failed`. The retried job gets a clean slate: error, failure
    /// timestamp, and progress are cleared so the next run records its own
    /// lifecycle.
    pub async fn retry(&self, id: &str) -> Result<ProcessingJob, TollgateError> {
        let _guard = self.locks.lock(id).await;
        let mut job = self.load(id).await?;
        if job.status != JobStatus::Failed {
            return Err(TollgateError::InvalidTransition {
                job_id: job.id,
                from: job.status,
                event: "retry",
            });
        }
        if job.retry_count >= job.max_retries {
            return Err(TollgateError::RetryExhausted {
                job_id: job.id,
                max_retries: job.max_retries,
            });
        }
        job.retry_count += 1;
        job.status = JobStatus::Pending;
        job.error_message = None;
        job.failed_at = None;
        job.progress = 0.0;
        job.updated_at = self.clock.now();
        self.store_call(self.store.update(&job)).await?;
        info!(
            job_id = %job.id,
            retry_count = job.retry_count,
            max_retries = job.max_retries,
            "job queued for retry"
        );
        Ok(job)
    }

    /// The most recent `pending`/`running` job of `job_type`, optionally
    /// narrowed to one source. Used to prevent duplicate concurrent work.
    pub async fn get_active(
        &self,
        job_type: &str,
        source_id: Option<&str>,
    ) -> Result<Option<ProcessingJob>, TollgateError> {
        self.store_call(self.store.find_active(job_type, source_id))
            .await
    }

    /// Convenience form of [`get_active`].
    ///
    /// [`get_active`]: JobOrchestrator::get_active
    pub async fn has_active(
        &self,
        job_type: &str,
        source_id: Option<&str>,
    ) -> Result<bool, TollgateError> {
        Ok(self.get_active(job_type, source_id).await?.is_some())
    }

    /// Jobs matching `filter`, newest first, at most `limit`.
    pub async fn history(
        &self,
        filter: &JobFilter,
        limit: u32,
    ) -> Result<Vec<ProcessingJob>, TollgateError> {
        self.store_call(self.store.history(filter, limit)).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeDelta;
    use serde_json::json;
    use tollgate_test_utils::{ManualClock, MemoryJobStore};

    use super::*;

    fn orchestrator_with(
        store: Arc<MemoryJobStore>,
        clock: ManualClock,
    ) -> JobOrchestrator {
        JobOrchestrator::new(store, Arc::new(clock))
    }

    fn classification_job() -> NewJob {
        NewJob::new("classification", json!({"signal_id": "sig-1"}))
    }

    #[tokio::test]
    async fn create_yields_pending_job_with_defaults() {
        let store = Arc::new(MemoryJobStore::new());
        let jobs = orchestrator_with(store, ManualClock::fixed());

        let job = jobs.create(classification_job()).await.unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.retry_count, 0);
        assert_eq!(job.max_retries, 3);
        assert_eq!(job.progress, 0.0);
        assert!(job.started_at.is_none());
        assert_eq!(job.created_at, job.updated_at);
    }

    #[tokio::test]
    async fn only_start_is_legal_from_pending() {
        let store = Arc::new(MemoryJobStore::new());
        let jobs = orchestrator_with(store, ManualClock::fixed());
        let job = jobs.create(classification_job()).await.unwrap();

        let err = jobs.complete(&job.id, json!({})).await.unwrap_err();
        assert!(matches!(err, TollgateError::InvalidTransition { .. }));
        let err = jobs.fail(&job.id, "boom").await.unwrap_err();
        assert!(matches!(err, TollgateError::InvalidTransition { .. }));
        let err = jobs.progress(&job.id, 0.5).await.unwrap_err();
        assert!(matches!(err, TollgateError::InvalidTransition { .. }));

        // The job is untouched by the rejected transitions.
        let active = jobs.get_active("classification", None).await.unwrap().unwrap();
        assert_eq!(active.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn happy_path_stamps_each_timestamp_once() {
        let clock = ManualClock::fixed();
        let store = Arc::new(MemoryJobStore::new());
        let jobs = orchestrator_with(store, clock.clone());
        let job = jobs.create(classification_job()).await.unwrap();

        clock.advance(TimeDelta::seconds(1));
        let job = jobs.start(&job.id).await.unwrap();
        assert_eq!(job.status, JobStatus::Running);
        let started_at = job.started_at.unwrap();

        clock.advance(TimeDelta::seconds(5));
        let job = jobs.progress(&job.id, 0.5).await.unwrap();
        assert_eq!(job.progress, 0.5);
        assert_eq!(job.started_at, Some(started_at));

        clock.advance(TimeDelta::seconds(5));
        let job = jobs.complete(&job.id, json!({"label": "x"})).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 1.0);
        assert!(job.completed_at.unwrap() > started_at);
        assert!(job.failed_at.is_none());
        assert_eq!(job.result, Some(json!({"label": "x"})));
    }

    #[tokio::test]
    async fn progress_is_clamped_to_unit_interval() {
        let store = Arc::new(MemoryJobStore::new());
        let jobs = orchestrator_with(store, ManualClock::fixed());
        let job = jobs.create(classification_job()).await.unwrap();
        jobs.start(&job.id).await.unwrap();

        assert_eq!(jobs.progress(&job.id, 1.7).await.unwrap().progress, 1.0);
        assert_eq!(jobs.progress(&job.id, -0.3).await.unwrap().progress, 0.0);
    }

    #[tokio::test]
    async fn completed_is_terminal() {
        let store = Arc::new(MemoryJobStore::new());
        let jobs = orchestrator_with(store, ManualClock::fixed());
        let job = jobs.create(classification_job()).await.unwrap();
        jobs.start(&job.id).await.unwrap();
        jobs.complete(&job.id, json!({})).await.unwrap();

        for err in [
            jobs.start(&job.id).await.unwrap_err(),
            jobs.fail(&job.id, "late").await.unwrap_err(),
            jobs.cancel(&job.id, "late").await.unwrap_err(),
            jobs.retry(&job.id).await.unwrap_err(),
        ] {
            assert!(matches!(err, TollgateError::InvalidTransition { .. }));
        }
    }

    #[tokio::test]
    async fn cancel_works_from_pending_and_running_only() {
        let store = Arc::new(MemoryJobStore::new());
        let jobs = orchestrator_with(store, ManualClock::fixed());

        let pending = jobs.create(classification_job()).await.unwrap();
        let cancelled = jobs.cancel(&pending.id, "superseded").await.unwrap();
        assert_eq!(cancelled.status, JobStatus::Cancelled);
        assert_eq!(cancelled.error_message.as_deref(), Some("superseded"));
        assert!(cancelled.failed_at.is_some());

        let running = jobs.create(classification_job()).await.unwrap();
        jobs.start(&running.id).await.unwrap();
        jobs.cancel(&running.id, "shutdown").await.unwrap();

        // Cancelled jobs cannot be retried; a fresh lifecycle needs a
        // fresh job.
        let err = jobs.retry(&cancelled.id).await.unwrap_err();
        assert!(matches!(err, TollgateError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn retry_clears_failure_state() {
        let store = Arc::new(MemoryJobStore::new());
        let jobs = orchestrator_with(store, ManualClock::fixed());
        let job = jobs.create(classification_job()).await.unwrap();
        jobs.start(&job.id).await.unwrap();
        jobs.progress(&job.id, 0.8).await.unwrap();
        jobs.fail(&job.id, "rate limited upstream").await.unwrap();

        let retried = jobs.retry(&job.id).await.unwrap();
        assert_eq!(retried.status, JobStatus::Pending);
        assert_eq!(retried.retry_count, 1);
        assert!(retried.error_message.is_none());
        assert!(retried.failed_at.is_none());
        assert_eq!(retried.progress, 0.0);

        // And the retried job can run a full lifecycle again.
        jobs.start(&job.id).await.unwrap();
        jobs.complete(&job.id, json!({})).await.unwrap();
    }

    #[tokio::test]
    async fn retry_exhaustion_leaves_job_failed() {
        let store = Arc::new(MemoryJobStore::new());
        let jobs = orchestrator_with(store, ManualClock::fixed());
        let mut new_job = classification_job();
        new_job.max_retries = Some(2);
        let job = jobs.create(new_job).await.unwrap();

        for _ in 0..2 {
            jobs.start(&job.id).await.unwrap();
            jobs.fail(&job.id, "transient").await.unwrap();
            jobs.retry(&job.id).await.unwrap();
        }
        jobs.start(&job.id).await.unwrap();
        jobs.fail(&job.id, "still broken").await.unwrap();

        let err = jobs.retry(&job.id).await.unwrap_err();
        assert!(matches!(
            err,
            TollgateError::RetryExhausted { max_retries: 2, .. }
        ));

        let snapshot = jobs
            .history(&JobFilter::default(), 10)
            .await
            .unwrap()
            .into_iter()
            .find(|j| j.id == job.id)
            .unwrap();
        assert_eq!(snapshot.status, JobStatus::Failed);
        assert_eq!(snapshot.retry_count, 2);
        assert_eq!(snapshot.error_message.as_deref(), Some("still broken"));
    }

    #[tokio::test]
    async fn get_active_prefers_most_recent_and_respects_source() {
        let store = Arc::new(MemoryJobStore::new());
        let jobs = orchestrator_with(store, ManualClock::fixed());

        let mut a = classification_job();
        a.source_id = Some("src-a".to_string());
        let job_a = jobs.create(a).await.unwrap();

        let mut b = classification_job();
        b.source_id = Some("src-b".to_string());
        let job_b = jobs.create(b).await.unwrap();

        let newest = jobs.get_active("classification", None).await.unwrap().unwrap();
        assert_eq!(newest.id, job_b.id);

        let for_a = jobs
            .get_active("classification", Some("src-a"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(for_a.id, job_a.id);

        jobs.start(&job_a.id).await.unwrap();
        jobs.complete(&job_a.id, json!({})).await.unwrap();
        assert!(!jobs.has_active("classification", Some("src-a")).await.unwrap());
        assert!(jobs.has_active("classification", Some("src-b")).await.unwrap());
        assert!(!jobs.has_active("collection", None).await.unwrap());
    }

    #[tokio::test]
    async fn history_is_newest_first_filtered_and_limited() {
        let store = Arc::new(MemoryJobStore::new());
        let jobs = orchestrator_with(store, ManualClock::fixed());

        let first = jobs.create(classification_job()).await.unwrap();
        let second = jobs.create(classification_job()).await.unwrap();
        let third = jobs.create(NewJob::new("collection", json!({}))).await.unwrap();
        jobs.start(&first.id).await.unwrap();
        jobs.fail(&first.id, "x").await.unwrap();

        let all = jobs.history(&JobFilter::default(), 10).await.unwrap();
        assert_eq!(
            all.iter().map(|j| j.id.as_str()).collect::<Vec<_>>(),
            vec![third.id.as_str(), second.id.as_str(), first.id.as_str()]
        );

        let failed_only = jobs
            .history(
                &JobFilter {
                    status: Some(JobStatus::Failed),
                    ..Default::default()
                },
                10,
            )
            .await
            .unwrap();
        assert_eq!(failed_only.len(), 1);
        assert_eq!(failed_only[0].id, first.id);

        let limited = jobs.history(&JobFilter::default(), 2).await.unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[tokio::test]
    async fn unknown_job_id_is_not_found() {
        let store = Arc::new(MemoryJobStore::new());
        let jobs = orchestrator_with(store, ManualClock::fixed());
        let err = jobs.start("no-such-job").await.unwrap_err();
        assert!(matches!(err, TollgateError::JobNotFound { .. }));
    }

    #[tokio::test]
    async fn storage_failure_leaves_state_unchanged() {
        let store = Arc::new(MemoryJobStore::new());
        let jobs = orchestrator_with(store.clone(), ManualClock::fixed());
        let job = jobs.create(classification_job()).await.unwrap();

        store.set_failing(true);
        let err = jobs.start(&job.id).await.unwrap_err();
        assert!(matches!(err, TollgateError::Storage { .. }));

        store.set_failing(false);
        let snapshot = jobs.get_active("classification", None).await.unwrap().unwrap();
        assert_eq!(snapshot.status, JobStatus::Pending);
    }
}
