// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end classification flow.
//!
//! Composes the cache, the quota limiter, the job orchestrator, and the
//! call gateway into one entry point: cache lookup, then admission, then
//! the gateway call wrapped in a job, then result caching and usage
//! recording. A cache hit touches neither quota nor jobs; a denial is a
//! first-class outcome, not an error.

use std::sync::Arc;

use chrono::TimeDelta;
use serde_json::json;
use tracing::{debug, warn};

use tollgate_cache::ResultCache;
use tollgate_core::types::{
    AdmissionDecision, CacheEntry, ClassificationOutcome, GatewayRequest, NewJob, ProcessingJob,
    QuotaPolicy,
};
use tollgate_core::{CallGateway, TollgateError};
use tollgate_jobs::JobOrchestrator;
use tollgate_quota::QuotaLimiter;

/// One classification request entering the control plane.
#[derive(Debug, Clone)]
pub struct ClassificationRequest {
    /// Quota identifier, canonically `"{source}:{endpoint}"`.
    pub identifier: String,
    /// Cache key; see `tollgate_cache::key` for the two schemes.
    pub cache_key: String,
    /// Optional source reference recorded on the wrapping job.
    pub source_id: Option<String>,
    /// The outbound call to make on a cache miss.
    pub gateway: GatewayRequest,
    /// Token cost estimate counted at admission time. The day budget is
    /// topped up with the actual shortfall after the call returns.
    pub estimated_tokens: u64,
}

/// How one request through [`ClassificationPipeline::classify`] resolved.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// Served from the cache; no quota consumed, no job created.
    CacheHit(CacheEntry),
    /// Denied by the limiter before the gateway was invoked.
    Denied(AdmissionDecision),
    /// Freshly classified via the gateway.
    Classified {
        outcome: ClassificationOutcome,
        job: ProcessingJob,
        tokens_used: u64,
    },
}

/// Tunables for the pipeline, from configuration.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub policy: QuotaPolicy,
    pub cache_ttl: TimeDelta,
}

const JOB_TYPE: &str = "classification";

/// The composed control plane.
pub struct ClassificationPipeline {
    cache: ResultCache,
    limiter: QuotaLimiter,
    jobs: JobOrchestrator,
    gateway: Arc<dyn CallGateway>,
    settings: PipelineSettings,
}

impl ClassificationPipeline {
    pub fn new(
        cache: ResultCache,
        limiter: QuotaLimiter,
        jobs: JobOrchestrator,
        gateway: Arc<dyn CallGateway>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            cache,
            limiter,
            jobs,
            gateway,
            settings,
        }
    }

    /// Run one request through the full flow.
    ///
    /// Errors are infrastructure only: storage failures during admission
    /// propagate before the gateway is invoked, so an outage denies rather
    /// than bypasses quotas. Gateway failures fail the wrapping job and,
    /// when retry budget remains, queue it back to `pending` before the
    /// error is returned.
    pub async fn classify(
        &self,
        request: ClassificationRequest,
    ) -> Result<PipelineOutcome, TollgateError> {
        if let Some(entry) = self.cache.lookup(&request.cache_key).await? {
            debug!(
                key = %request.cache_key,
                hit_count = entry.hit_count,
                "classification served from cache"
            );
            return Ok(PipelineOutcome::CacheHit(entry));
        }

        let decision = self
            .limiter
            .check_and_admit(
                &request.identifier,
                self.settings.policy,
                request.estimated_tokens,
            )
            .await?;
        if !decision.allowed {
            return Ok(PipelineOutcome::Denied(decision));
        }

        let job = self
            .jobs
            .create(NewJob {
                job_type: JOB_TYPE.to_string(),
                parameters: json!({
                    "identifier": request.identifier.clone(),
                    "cache_key": request.cache_key.clone(),
                    "model": request.gateway.model.clone(),
                    "estimated_tokens": request.estimated_tokens,
                }),
                source_id: request.source_id.clone(),
                related_entity_id: None,
                priority: 0,
                max_retries: None,
            })
            .await?;
        let job = self.jobs.start(&job.id).await?;

        let response = match self.gateway.invoke(&request.gateway).await {
            Ok(response) => response,
            Err(e) => return Err(self.fail_and_requeue(&job.id, e).await),
        };

        let outcome: ClassificationOutcome = match serde_json::from_str(&response.text) {
            Ok(outcome) => outcome,
            Err(parse_err) => {
                let e = TollgateError::Gateway {
                    message: format!("malformed classification payload: {parse_err}"),
                    source: Some(Box::new(parse_err)),
                };
                return Err(self.fail_and_requeue(&job.id, e).await);
            }
        };

        // Bookkeeping after a successful, paid-for call must not destroy
        // the result; failures here are logged and the outcome returned.
        let extra = response.tokens_used.saturating_sub(request.estimated_tokens);
        if let Err(e) = self.limiter.record_usage(&request.identifier, extra).await {
            warn!(
                identifier = %request.identifier,
                extra_tokens = extra,
                error = %e,
                "failed to record actual token usage"
            );
        }
        if let Err(e) = self
            .cache
            .store(&request.cache_key, outcome.clone(), self.settings.cache_ttl)
            .await
        {
            warn!(key = %request.cache_key, error = %e, "failed to cache result");
        }

        let result = json!({
            "classification": outcome.classification,
            "confidence": outcome.confidence,
            "tokens_used": response.tokens_used,
        });
        let job = match self.jobs.complete(&job.id, result).await {
            Ok(job) => job,
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "failed to mark job completed");
                job
            }
        };

        Ok(PipelineOutcome::Classified {
            outcome,
            job,
            tokens_used: response.tokens_used,
        })
    }

    /// Fail `job_id` with the gateway error and queue a retry while budget
    /// remains. Returns the error to propagate.
    async fn fail_and_requeue(&self, job_id: &str, error: TollgateError) -> TollgateError {
        let message = error.to_string();
        match self.jobs.fail(job_id, message).await {
            Ok(failed) if failed.retry_count < failed.max_retries => {
                if let Err(e) = self.jobs.retry(job_id).await {
                    warn!(job_id, error = %e, "failed to queue job retry");
                }
            }
            Ok(_) => {}
            Err(e) => warn!(job_id, error = %e, "failed to record job failure"),
        }
        error
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tollgate_core::types::{JobFilter, JobStatus, RateLimitRecord};
    use tollgate_core::{JobStore, QuotaStore};
    use tollgate_test_utils::{
        ManualClock, MemoryCacheStore, MemoryJobStore, MemoryQuotaStore, MockGateway,
    };

    use super::*;

    struct Harness {
        pipeline: ClassificationPipeline,
        gateway: Arc<MockGateway>,
        quota_store: Arc<MemoryQuotaStore>,
        job_store: Arc<MemoryJobStore>,
    }

    fn harness(policy: QuotaPolicy) -> Harness {
        let clock: Arc<dyn tollgate_core::Clock> = Arc::new(ManualClock::fixed());
        let quota_store = Arc::new(MemoryQuotaStore::new());
        let cache_store = Arc::new(MemoryCacheStore::new());
        let job_store = Arc::new(MemoryJobStore::new());
        let gateway = Arc::new(MockGateway::new());
        let pipeline = ClassificationPipeline::new(
            ResultCache::new(cache_store, clock.clone()),
            QuotaLimiter::new(quota_store.clone(), clock.clone()),
            JobOrchestrator::new(job_store.clone(), clock),
            gateway.clone(),
            PipelineSettings {
                policy,
                cache_ttl: TimeDelta::hours(24),
            },
        );
        Harness {
            pipeline,
            gateway,
            quota_store,
            job_store,
        }
    }

    impl Harness {
        async fn quota_record(&self, identifier: &str) -> RateLimitRecord {
            self.quota_store
                .get(identifier)
                .await
                .unwrap()
                .expect("record exists")
        }

        async fn all_jobs(&self) -> Vec<ProcessingJob> {
            self.job_store
                .history(&JobFilter::default(), 100)
                .await
                .unwrap()
        }
    }

    fn default_policy() -> QuotaPolicy {
        QuotaPolicy {
            requests_per_hour: 10,
            tokens_per_day: 10_000,
        }
    }

    fn request(key: &str) -> ClassificationRequest {
        ClassificationRequest {
            identifier: "arxiv:classify".to_string(),
            cache_key: key.to_string(),
            source_id: Some("arxiv".to_string()),
            gateway: GatewayRequest {
                model: "sonnet".to_string(),
                prompt: "classify this".to_string(),
                system_prompt: None,
                temperature: None,
                max_tokens: None,
            },
            estimated_tokens: 100,
        }
    }

    fn outcome(label: &str) -> ClassificationOutcome {
        ClassificationOutcome {
            classification: label.to_string(),
            confidence: 0.9,
            reasoning: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn miss_invokes_gateway_and_completes_job() {
        let h = harness(default_policy());
        h.gateway.push_outcome(&outcome("emerging_tech"), 150).await;

        let result = h.pipeline.classify(request("sha256:k1")).await.unwrap();
        let PipelineOutcome::Classified {
            outcome: got,
            job,
            tokens_used,
        } = result
        else {
            panic!("expected Classified");
        };
        assert_eq!(got.classification, "emerging_tech");
        assert_eq!(tokens_used, 150);
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 1.0);
        assert_eq!(h.gateway.invocation_count(), 1);
    }

    #[tokio::test]
    async fn second_identical_request_is_a_cache_hit() {
        let h = harness(default_policy());
        h.gateway.push_outcome(&outcome("emerging_tech"), 150).await;

        h.pipeline.classify(request("sha256:k1")).await.unwrap();
        let result = h.pipeline.classify(request("sha256:k1")).await.unwrap();

        let PipelineOutcome::CacheHit(entry) = result else {
            panic!("expected CacheHit");
        };
        assert_eq!(entry.outcome.classification, "emerging_tech");
        // One gateway call total; the hit consumed no quota.
        assert_eq!(h.gateway.invocation_count(), 1);
        assert_eq!(h.quota_record("arxiv:classify").await.hourly_count, 1);
    }

    #[tokio::test]
    async fn denial_skips_gateway_and_jobs() {
        let h = harness(QuotaPolicy {
            requests_per_hour: 0,
            tokens_per_day: 10_000,
        });

        let result = h.pipeline.classify(request("sha256:k1")).await.unwrap();
        let PipelineOutcome::Denied(decision) = result else {
            panic!("expected Denied");
        };
        assert!(!decision.allowed);
        assert_eq!(h.gateway.invocation_count(), 0);
        assert!(h.all_jobs().await.is_empty());
    }

    #[tokio::test]
    async fn actual_usage_tops_up_the_day_budget() {
        let h = harness(default_policy());
        // Estimated 100, actual 600.
        h.gateway.push_outcome(&outcome("emerging_tech"), 600).await;

        h.pipeline.classify(request("sha256:k1")).await.unwrap();

        assert_eq!(h.quota_record("arxiv:classify").await.daily_tokens, 600);
    }

    #[tokio::test]
    async fn gateway_failure_fails_job_and_queues_retry() {
        let h = harness(default_policy());
        h.gateway.push_failure("upstream 503").await;

        let err = h.pipeline.classify(request("sha256:k1")).await.unwrap_err();
        assert!(matches!(err, TollgateError::Gateway { .. }));

        // The job went failed -> pending with one retry consumed.
        let jobs = h.all_jobs().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].status, JobStatus::Pending);
        assert_eq!(jobs[0].retry_count, 1);

        // The admitted request still counted.
        assert_eq!(h.quota_record("arxiv:classify").await.hourly_count, 1);
    }

    #[tokio::test]
    async fn malformed_gateway_payload_fails_the_job() {
        let h = harness(default_policy());
        h.gateway
            .push_response(tollgate_core::types::GatewayResponse {
                text: "not json".to_string(),
                tokens_used: 50,
            })
            .await;

        let err = h.pipeline.classify(request("sha256:k1")).await.unwrap_err();
        let TollgateError::Gateway { message, .. } = err else {
            panic!("expected Gateway error");
        };
        assert!(message.contains("malformed classification payload"));

        let jobs = h.all_jobs().await;
        assert_eq!(jobs[0].retry_count, 1);
    }

    #[tokio::test]
    async fn admission_storage_failure_propagates_before_gateway() {
        let h = harness(default_policy());
        h.quota_store.set_failing(true);

        let err = h.pipeline.classify(request("sha256:k1")).await.unwrap_err();
        assert!(matches!(err, TollgateError::Storage { .. }));
        assert_eq!(h.gateway.invocation_count(), 0);
        assert!(h.all_jobs().await.is_empty());
    }
}
