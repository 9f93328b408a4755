// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rate-limit record operations.

use chrono::{DateTime, Utc};
use rusqlite::params;

use tollgate_core::TollgateError;
use tollgate_core::types::RateLimitRecord;

use crate::database::Database;
use crate::queries::{fmt_ts, parse_ts};

const COLUMNS: &str = "identifier, hourly_count, daily_count, daily_tokens, \
                       hour_window_start, day_window_start, requests_per_hour_cap, \
                       tokens_per_day_cap, last_request_at";

fn row_to_record(row: &rusqlite::Row<'_>) -> Result<RateLimitRecord, rusqlite::Error> {
    Ok(RateLimitRecord {
        identifier: row.get(0)?,
        hourly_count: row.get(1)?,
        daily_count: row.get(2)?,
        daily_tokens: row.get::<_, i64>(3)? as u64,
        hour_window_start: parse_ts(4, row.get(4)?)?,
        day_window_start: parse_ts(5, row.get(5)?)?,
        requests_per_hour_cap: row.get(6)?,
        tokens_per_day_cap: row.get::<_, i64>(7)? as u64,
        last_request_at: parse_ts(8, row.get(8)?)?,
    })
}

/// Get the record for an identifier.
pub async fn get(
    db: &Database,
    identifier: &str,
) -> Result<Option<RateLimitRecord>, TollgateError> {
    let identifier = identifier.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM rate_limits WHERE identifier = ?1"
            ))?;
            let result = stmt.query_row(params![identifier], row_to_record);
            match result {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert or overwrite the record keyed by its identifier.
pub async fn upsert(db: &Database, record: &RateLimitRecord) -> Result<(), TollgateError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO rate_limits (identifier, hourly_count, daily_count, \
                 daily_tokens, hour_window_start, day_window_start, \
                 requests_per_hour_cap, tokens_per_day_cap, last_request_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(identifier) DO UPDATE SET
                   hourly_count = excluded.hourly_count,
                   daily_count = excluded.daily_count,
                   daily_tokens = excluded.daily_tokens,
                   hour_window_start = excluded.hour_window_start,
                   day_window_start = excluded.day_window_start,
                   requests_per_hour_cap = excluded.requests_per_hour_cap,
                   tokens_per_day_cap = excluded.tokens_per_day_cap,
                   last_request_at = excluded.last_request_at",
                params![
                    record.identifier,
                    record.hourly_count,
                    record.daily_count,
                    record.daily_tokens as i64,
                    fmt_ts(&record.hour_window_start),
                    fmt_ts(&record.day_window_start),
                    record.requests_per_hour_cap,
                    record.tokens_per_day_cap as i64,
                    fmt_ts(&record.last_request_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err::<rusqlite::Error>)
}

/// Delete records idle since before `idle_before`. Returns the count removed.
pub async fn delete_idle(
    db: &Database,
    idle_before: DateTime<Utc>,
) -> Result<u64, TollgateError> {
    let cutoff = fmt_ts(&idle_before);
    db.connection()
        .call(move |conn| {
            let removed = conn.execute(
                "DELETE FROM rate_limits WHERE last_request_at < ?1",
                params![cutoff],
            )?;
            Ok(removed as u64)
        })
        .await
        .map_err(crate::database::map_tr_err::<rusqlite::Error>)
}

/// Zero the daily counters for identifiers starting with `prefix` (all
/// records when `None`) and realign the day window. Returns the count
/// touched.
pub async fn reset_daily(
    db: &Database,
    prefix: Option<&str>,
    day_window_start: DateTime<Utc>,
) -> Result<u64, TollgateError> {
    let prefix = prefix.map(|p| p.to_string());
    let day_start = fmt_ts(&day_window_start);
    db.connection()
        .call(move |conn| {
            // substr comparison instead of LIKE so `%`/`_` in identifiers
            // cannot widen the match.
            let touched = match prefix {
                Some(prefix) => conn.execute(
                    "UPDATE rate_limits SET daily_count = 0, daily_tokens = 0, \
                     day_window_start = ?2 \
                     WHERE substr(identifier, 1, length(?1)) = ?1",
                    params![prefix, day_start],
                )?,
                None => conn.execute(
                    "UPDATE rate_limits SET daily_count = 0, daily_tokens = 0, \
                     day_window_start = ?1",
                    params![day_start],
                )?,
            };
            Ok(touched as u64)
        })
        .await
        .map_err(crate::database::map_tr_err::<rusqlite::Error>)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tempfile::tempdir;

    use super::*;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn record(identifier: &str) -> RateLimitRecord {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 10, 15, 0).unwrap();
        RateLimitRecord {
            identifier: identifier.to_string(),
            hourly_count: 3,
            daily_count: 7,
            daily_tokens: 1500,
            hour_window_start: Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(),
            day_window_start: Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap(),
            requests_per_hour_cap: 60,
            tokens_per_day_cap: 200_000,
            last_request_at: now,
        }
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let (db, _dir) = setup_db().await;

        assert!(get(&db, "arxiv:search").await.unwrap().is_none());

        let rec = record("arxiv:search");
        upsert(&db, &rec).await.unwrap();
        let fetched = get(&db, "arxiv:search").await.unwrap().unwrap();
        assert_eq!(fetched, rec);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn upsert_overwrites_existing_record() {
        let (db, _dir) = setup_db().await;

        let mut rec = record("arxiv:search");
        upsert(&db, &rec).await.unwrap();

        rec.hourly_count = 4;
        rec.daily_tokens = 2000;
        upsert(&db, &rec).await.unwrap();

        let fetched = get(&db, "arxiv:search").await.unwrap().unwrap();
        assert_eq!(fetched.hourly_count, 4);
        assert_eq!(fetched.daily_tokens, 2000);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_idle_removes_only_stale_records() {
        let (db, _dir) = setup_db().await;

        let mut stale = record("arxiv:search");
        stale.last_request_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        upsert(&db, &stale).await.unwrap();
        upsert(&db, &record("github:repos")).await.unwrap();

        let cutoff = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let removed = delete_idle(&db, cutoff).await.unwrap();
        assert_eq!(removed, 1);

        assert!(get(&db, "arxiv:search").await.unwrap().is_none());
        assert!(get(&db, "github:repos").await.unwrap().is_some());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reset_daily_honors_prefix_without_wildcards() {
        let (db, _dir) = setup_db().await;

        upsert(&db, &record("arxiv:search")).await.unwrap();
        upsert(&db, &record("arxiv:fetch")).await.unwrap();
        // `%` in the identifier must not be matched by an unrelated prefix.
        upsert(&db, &record("a%:search")).await.unwrap();

        let day_start = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let touched = reset_daily(&db, Some("arxiv:"), day_start).await.unwrap();
        assert_eq!(touched, 2);

        let reset = get(&db, "arxiv:search").await.unwrap().unwrap();
        assert_eq!(reset.daily_count, 0);
        assert_eq!(reset.daily_tokens, 0);
        assert_eq!(reset.day_window_start, day_start);
        // Hourly counters survive a daily reset.
        assert_eq!(reset.hourly_count, 3);

        let untouched = get(&db, "a%:search").await.unwrap().unwrap();
        assert_eq!(untouched.daily_count, 7);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reset_daily_without_prefix_touches_everything() {
        let (db, _dir) = setup_db().await;

        upsert(&db, &record("arxiv:search")).await.unwrap();
        upsert(&db, &record("github:repos")).await.unwrap();

        let day_start = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let touched = reset_daily(&db, None, day_start).await.unwrap();
        assert_eq!(touched, 2);

        db.close().await.unwrap();
    }
}
