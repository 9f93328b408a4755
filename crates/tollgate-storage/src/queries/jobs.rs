// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Processing job operations.

use std::str::FromStr;

use rusqlite::params;

use tollgate_core::TollgateError;
use tollgate_core::types::{JobFilter, JobStatus, ProcessingJob};

use crate::database::Database;
use crate::queries::{fmt_ts, fmt_ts_opt, parse_ts, parse_ts_opt};

const COLUMNS: &str = "id, job_type, status, source_id, related_entity_id, parameters, \
                       priority, progress, retry_count, max_retries, error_message, \
                       result, created_at, updated_at, started_at, completed_at, failed_at";

fn conversion_failure(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

fn row_to_job(row: &rusqlite::Row<'_>) -> Result<ProcessingJob, rusqlite::Error> {
    let status: String = row.get(2)?;
    let parameters: String = row.get(5)?;
    let result: Option<String> = row.get(11)?;
    Ok(ProcessingJob {
        id: row.get(0)?,
        job_type: row.get(1)?,
        status: JobStatus::from_str(&status).map_err(|e| conversion_failure(2, e))?,
        source_id: row.get(3)?,
        related_entity_id: row.get(4)?,
        parameters: serde_json::from_str(&parameters).map_err(|e| conversion_failure(5, e))?,
        priority: row.get(6)?,
        progress: row.get(7)?,
        retry_count: row.get(8)?,
        max_retries: row.get(9)?,
        error_message: row.get(10)?,
        result: result
            .map(|r| serde_json::from_str(&r).map_err(|e| conversion_failure(11, e)))
            .transpose()?,
        created_at: parse_ts(12, row.get(12)?)?,
        updated_at: parse_ts(13, row.get(13)?)?,
        started_at: parse_ts_opt(14, row.get(14)?)?,
        completed_at: parse_ts_opt(15, row.get(15)?)?,
        failed_at: parse_ts_opt(16, row.get(16)?)?,
    })
}

/// Serialize the opaque JSON columns.
fn json_columns(job: &ProcessingJob) -> Result<(String, Option<String>), rusqlite::Error> {
    let parameters =
        serde_json::to_string(&job.parameters).map_err(|e| conversion_failure(5, e))?;
    let result = job
        .result
        .as_ref()
        .map(|r| serde_json::to_string(r).map_err(|e| conversion_failure(11, e)))
        .transpose()?;
    Ok((parameters, result))
}

/// Persist a freshly created job.
pub async fn insert(db: &Database, job: &ProcessingJob) -> Result<(), TollgateError> {
    let job = job.clone();
    db.connection()
        .call(move |conn| {
            let (parameters, result) = json_columns(&job)?;
            conn.execute(
                "INSERT INTO processing_jobs (id, job_type, status, source_id, \
                 related_entity_id, parameters, priority, progress, retry_count, \
                 max_retries, error_message, result, created_at, updated_at, \
                 started_at, completed_at, failed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, \
                 ?14, ?15, ?16, ?17)",
                params![
                    job.id,
                    job.job_type,
                    job.status.to_string(),
                    job.source_id,
                    job.related_entity_id,
                    parameters,
                    job.priority,
                    job.progress,
                    job.retry_count,
                    job.max_retries,
                    job.error_message,
                    result,
                    fmt_ts(&job.created_at),
                    fmt_ts(&job.updated_at),
                    fmt_ts_opt(&job.started_at),
                    fmt_ts_opt(&job.completed_at),
                    fmt_ts_opt(&job.failed_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err::<rusqlite::Error>)
}

/// Get a job by id.
pub async fn get(db: &Database, id: &str) -> Result<Option<ProcessingJob>, TollgateError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM processing_jobs WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], row_to_job);
            match result {
                Ok(job) => Ok(Some(job)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Overwrite the job keyed by `job.id`.
pub async fn update(db: &Database, job: &ProcessingJob) -> Result<(), TollgateError> {
    let job = job.clone();
    let updated = db
        .connection()
        .call(move |conn| {
            let (parameters, result) = json_columns(&job)?;
            let updated = conn.execute(
                "UPDATE processing_jobs SET job_type = ?2, status = ?3, source_id = ?4, \
                 related_entity_id = ?5, parameters = ?6, priority = ?7, progress = ?8, \
                 retry_count = ?9, max_retries = ?10, error_message = ?11, result = ?12, \
                 created_at = ?13, updated_at = ?14, started_at = ?15, \
                 completed_at = ?16, failed_at = ?17
                 WHERE id = ?1",
                params![
                    job.id,
                    job.job_type,
                    job.status.to_string(),
                    job.source_id,
                    job.related_entity_id,
                    parameters,
                    job.priority,
                    job.progress,
                    job.retry_count,
                    job.max_retries,
                    job.error_message,
                    result,
                    fmt_ts(&job.created_at),
                    fmt_ts(&job.updated_at),
                    fmt_ts_opt(&job.started_at),
                    fmt_ts_opt(&job.completed_at),
                    fmt_ts_opt(&job.failed_at),
                ],
            )?;
            Ok((updated, job.id.clone()))
        })
        .await
        .map_err(crate::database::map_tr_err::<rusqlite::Error>)?;

    match updated {
        (0, job_id) => Err(TollgateError::JobNotFound { job_id }),
        _ => Ok(()),
    }
}

/// The most recently created active job of `job_type`, optionally narrowed
/// to one source. Later-inserted wins among equal creation timestamps.
pub async fn find_active(
    db: &Database,
    job_type: &str,
    source_id: Option<&str>,
) -> Result<Option<ProcessingJob>, TollgateError> {
    let job_type = job_type.to_string();
    let source_id = source_id.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM processing_jobs
                 WHERE job_type = ?1
                   AND status IN ('pending', 'running')
                   AND (?2 IS NULL OR source_id = ?2)
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT 1"
            ))?;
            let result = stmt.query_row(params![job_type, source_id], row_to_job);
            match result {
                Ok(job) => Ok(Some(job)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Jobs matching `filter`, newest first, at most `limit`.
pub async fn history(
    db: &Database,
    filter: &JobFilter,
    limit: u32,
) -> Result<Vec<ProcessingJob>, TollgateError> {
    let filter = filter.clone();
    db.connection()
        .call(move |conn| {
            let mut sql = format!("SELECT {COLUMNS} FROM processing_jobs WHERE 1 = 1");
            let mut values: Vec<String> = Vec::new();
            if let Some(job_type) = &filter.job_type {
                values.push(job_type.clone());
                sql.push_str(&format!(" AND job_type = ?{}", values.len()));
            }
            if let Some(source_id) = &filter.source_id {
                values.push(source_id.clone());
                sql.push_str(&format!(" AND source_id = ?{}", values.len()));
            }
            if let Some(status) = filter.status {
                values.push(status.to_string());
                sql.push_str(&format!(" AND status = ?{}", values.len()));
            }
            sql.push_str(&format!(
                " ORDER BY created_at DESC, rowid DESC LIMIT {limit}"
            ));

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(values), row_to_job)?;
            let mut jobs = Vec::new();
            for row in rows {
                jobs.push(row?);
            }
            Ok(jobs)
        })
        .await
        .map_err(crate::database::map_tr_err::<rusqlite::Error>)
}
