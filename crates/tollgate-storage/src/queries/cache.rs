// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classification cache entry operations.

use chrono::{DateTime, Utc};
use rusqlite::params;

use tollgate_core::TollgateError;
use tollgate_core::types::{CacheEntry, ClassificationOutcome};

use crate::database::Database;
use crate::queries::{fmt_ts, parse_ts};

const COLUMNS: &str = "key, classification, confidence, reasoning, hit_count, \
                       created_at, last_accessed_at, expires_at";

fn row_to_entry(row: &rusqlite::Row<'_>) -> Result<CacheEntry, rusqlite::Error> {
    Ok(CacheEntry {
        key: row.get(0)?,
        outcome: ClassificationOutcome {
            classification: row.get(1)?,
            confidence: row.get(2)?,
            reasoning: row.get(3)?,
        },
        hit_count: row.get::<_, i64>(4)? as u64,
        created_at: parse_ts(5, row.get(5)?)?,
        last_accessed_at: parse_ts(6, row.get(6)?)?,
        expires_at: parse_ts(7, row.get(7)?)?,
    })
}

/// Get the entry for a key, expired or not.
pub async fn get(db: &Database, key: &str) -> Result<Option<CacheEntry>, TollgateError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM classification_cache WHERE key = ?1"
            ))?;
            let result = stmt.query_row(params![key], row_to_entry);
            match result {
                Ok(entry) => Ok(Some(entry)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert or overwrite the entry keyed by `entry.key`.
pub async fn put(db: &Database, entry: &CacheEntry) -> Result<(), TollgateError> {
    let entry = entry.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO classification_cache (key, classification, confidence, \
                 reasoning, hit_count, created_at, last_accessed_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(key) DO UPDATE SET
                   classification = excluded.classification,
                   confidence = excluded.confidence,
                   reasoning = excluded.reasoning,
                   hit_count = excluded.hit_count,
                   created_at = excluded.created_at,
                   last_accessed_at = excluded.last_accessed_at,
                   expires_at = excluded.expires_at",
                params![
                    entry.key,
                    entry.outcome.classification,
                    entry.outcome.confidence,
                    entry.outcome.reasoning,
                    entry.hit_count as i64,
                    fmt_ts(&entry.created_at),
                    fmt_ts(&entry.last_accessed_at),
                    fmt_ts(&entry.expires_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err::<rusqlite::Error>)
}

/// Delete up to `batch_size` entries expired as of `now`, oldest expiry
/// first. Returns the count removed.
pub async fn delete_expired(
    db: &Database,
    now: DateTime<Utc>,
    batch_size: u32,
) -> Result<u64, TollgateError> {
    let cutoff = fmt_ts(&now);
    db.connection()
        .call(move |conn| {
            let removed = conn.execute(
                "DELETE FROM classification_cache WHERE key IN (
                   SELECT key FROM classification_cache
                   WHERE expires_at <= ?1
                   ORDER BY expires_at ASC
                   LIMIT ?2
                 )",
                params![cutoff, batch_size],
            )?;
            Ok(removed as u64)
        })
        .await
        .map_err(crate::database::map_tr_err::<rusqlite::Error>)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    use super::*;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn entry(key: &str, expires_at: DateTime<Utc>) -> CacheEntry {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 10, 15, 0).unwrap();
        CacheEntry {
            key: key.to_string(),
            outcome: ClassificationOutcome {
                classification: "emerging_tech".to_string(),
                confidence: 0.92,
                reasoning: "strong signal overlap".to_string(),
            },
            hit_count: 0,
            created_at: now,
            last_accessed_at: now,
            expires_at,
        }
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let (db, _dir) = setup_db().await;

        let expires = Utc.with_ymd_and_hms(2026, 3, 2, 10, 15, 0).unwrap();
        let stored = entry("sha256:abc", expires);
        put(&db, &stored).await.unwrap();

        let fetched = get(&db, "sha256:abc").await.unwrap().unwrap();
        assert_eq!(fetched, stored);
        assert!(get(&db, "sha256:other").await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_returns_expired_entries_untouched() {
        let (db, _dir) = setup_db().await;

        let expired = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        put(&db, &entry("sha256:old", expired)).await.unwrap();

        // Expiry is the controller's call; the store hands back what it has.
        let fetched = get(&db, "sha256:old").await.unwrap().unwrap();
        assert_eq!(fetched.expires_at, expired);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn put_overwrites_existing_key() {
        let (db, _dir) = setup_db().await;

        let expires = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let mut stored = entry("sha256:abc", expires);
        stored.hit_count = 5;
        put(&db, &stored).await.unwrap();

        stored.hit_count = 0;
        stored.outcome.classification = "incremental".to_string();
        put(&db, &stored).await.unwrap();

        let fetched = get(&db, "sha256:abc").await.unwrap().unwrap();
        assert_eq!(fetched.hit_count, 0);
        assert_eq!(fetched.outcome.classification, "incremental");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_expired_is_batched_oldest_first() {
        let (db, _dir) = setup_db().await;

        let base = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        for i in 0..5 {
            let key = format!("sha256:{i}");
            put(&db, &entry(&key, base + Duration::minutes(i))).await.unwrap();
        }
        put(&db, &entry("sha256:live", base + Duration::days(30)))
            .await
            .unwrap();

        let now = base + Duration::hours(1);
        let removed = delete_expired(&db, now, 3).await.unwrap();
        assert_eq!(removed, 3);

        // The three oldest expiries went first.
        assert!(get(&db, "sha256:0").await.unwrap().is_none());
        assert!(get(&db, "sha256:1").await.unwrap().is_none());
        assert!(get(&db, "sha256:2").await.unwrap().is_none());
        assert!(get(&db, "sha256:3").await.unwrap().is_some());

        let removed = delete_expired(&db, now, 100).await.unwrap();
        assert_eq!(removed, 2);
        assert!(get(&db, "sha256:live").await.unwrap().is_some());

        db.close().await.unwrap();
    }
}
