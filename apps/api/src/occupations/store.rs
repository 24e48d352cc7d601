//! Occupation cache store: TTL-aware key-value documents keyed by O*NET code.
//!
//! Expiry is application-level: every record carries `expires_at`, reads filter on it
//! and `sweep_expired` removes what has already lapsed. A `put` always replaces the
//! full document for its code, so concurrent writers are last-write-wins.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use sqlx::types::Json;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::debug;

use crate::clock::Clock;
use crate::db::StoreError;
use crate::occupations::models::{OccupationRecord, CACHE_VERSION};

#[async_trait]
pub trait OccupationStore: Send + Sync {
    /// Returns the live record for `code`, or `None` if absent or `expires_at <= now`.
    async fn get(&self, code: &str) -> Result<Option<OccupationRecord>, StoreError>;

    /// Upserts the full record, stamping `created_at = now` and `expires_at = now + ttl`.
    async fn put(&self, record: OccupationRecord) -> Result<OccupationRecord, StoreError>;

    /// Case-insensitive title substring match over live records. Order is unspecified.
    async fn search_by_title(&self, query: &str) -> Result<Vec<OccupationRecord>, StoreError>;

    /// Deletes every record with `expires_at <= now` and returns how many were removed.
    async fn sweep_expired(&self) -> Result<u64, StoreError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Postgres
// ────────────────────────────────────────────────────────────────────────────

pub struct PgOccupationStore {
    pool: PgPool,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl PgOccupationStore {
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { pool, clock, ttl }
    }
}

#[async_trait]
impl OccupationStore for PgOccupationStore {
    async fn get(&self, code: &str) -> Result<Option<OccupationRecord>, StoreError> {
        let row: Option<Json<OccupationRecord>> = sqlx::query_scalar(
            "SELECT record FROM occupation_cache WHERE code = $1 AND expires_at > $2",
        )
        .bind(code)
        .bind(self.clock.now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|Json(record)| record))
    }

    async fn put(&self, record: OccupationRecord) -> Result<OccupationRecord, StoreError> {
        let record = record.stamped(self.clock.now(), self.ttl);

        sqlx::query(
            r#"
            INSERT INTO occupation_cache (code, title, record, version, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (code) DO UPDATE SET
                title = EXCLUDED.title,
                record = EXCLUDED.record,
                version = EXCLUDED.version,
                created_at = EXCLUDED.created_at,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(&record.code)
        .bind(&record.title)
        .bind(Json(&record))
        .bind(&record.version)
        .bind(record.created_at)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await?;

        debug!("Cached occupation {} until {}", record.code, record.expires_at);
        Ok(record)
    }

    async fn search_by_title(&self, query: &str) -> Result<Vec<OccupationRecord>, StoreError> {
        let pattern = format!("%{}%", escape_like(query));
        let rows: Vec<Json<OccupationRecord>> = sqlx::query_scalar(
            r#"
            SELECT record FROM occupation_cache
            WHERE title ILIKE $1 ESCAPE '\' AND expires_at > $2 AND version = $3
            "#,
        )
        .bind(pattern)
        .bind(self.clock.now())
        .bind(CACHE_VERSION)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|Json(record)| record).collect())
    }

    async fn sweep_expired(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM occupation_cache WHERE expires_at <= $1")
            .bind(self.clock.now())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Escapes LIKE metacharacters so user queries match literally.
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory
// ────────────────────────────────────────────────────────────────────────────

/// In-process store used when no database is configured, and in tests.
pub struct MemoryOccupationStore {
    records: RwLock<HashMap<String, OccupationRecord>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl MemoryOccupationStore {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            clock,
            ttl,
        }
    }

    #[cfg(test)]
    pub async fn records_for_test(
        &self,
    ) -> tokio::sync::RwLockWriteGuard<'_, HashMap<String, OccupationRecord>> {
        self.records.write().await
    }
}

#[async_trait]
impl OccupationStore for MemoryOccupationStore {
    async fn get(&self, code: &str) -> Result<Option<OccupationRecord>, StoreError> {
        let now = self.clock.now();
        let records = self.records.read().await;
        Ok(records
            .get(code)
            .filter(|r| !r.is_expired_at(now))
            .cloned())
    }

    async fn put(&self, record: OccupationRecord) -> Result<OccupationRecord, StoreError> {
        let record = record.stamped(self.clock.now(), self.ttl);
        self.records
            .write()
            .await
            .insert(record.code.clone(), record.clone());
        Ok(record)
    }

    async fn search_by_title(&self, query: &str) -> Result<Vec<OccupationRecord>, StoreError> {
        let now = self.clock.now();
        let needle = query.to_lowercase();
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| {
                !r.is_expired_at(now)
                    && r.version == CACHE_VERSION
                    && r.title.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }

    async fn sweep_expired(&self) -> Result<u64, StoreError> {
        let now = self.clock.now();
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, r| !r.is_expired_at(now));
        Ok((before - records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::testing::ManualClock;
    use crate::occupations::models::Skill;
    use chrono::Utc;

    fn software_developers() -> OccupationRecord {
        let now = Utc::now();
        OccupationRecord {
            code: "15-1252.00".to_string(),
            title: "Software Developers".to_string(),
            description: None,
            skills: vec![Skill {
                name: "Programming".to_string(),
                code: "2.B.3.e".to_string(),
                importance: 85,
                level: 60,
                category: "technical".to_string(),
            }],
            knowledge: vec![],
            abilities: vec![],
            labor_market: None,
            version: String::new(),
            created_at: now,
            expires_at: now,
        }
    }

    fn store_with_clock() -> (MemoryOccupationStore, ManualClock) {
        let clock = ManualClock::new(Utc::now());
        let store = MemoryOccupationStore::new(Arc::new(clock.clone()), Duration::days(30));
        (store, clock)
    }

    #[tokio::test]
    async fn test_get_within_ttl_returns_record() {
        let (store, clock) = store_with_clock();
        store.put(software_developers()).await.unwrap();
        clock.advance(Duration::days(29));

        let record = store.get("15-1252.00").await.unwrap().unwrap();
        assert_eq!(record.title, "Software Developers");
        assert_eq!(record.skills[0].importance, 85);
        assert_eq!(record.version, CACHE_VERSION);
    }

    #[tokio::test]
    async fn test_expired_record_is_hidden_then_swept() {
        let (store, clock) = store_with_clock();
        store.put(software_developers()).await.unwrap();
        clock.advance(Duration::days(30) + Duration::milliseconds(1));

        assert!(store.get("15-1252.00").await.unwrap().is_none());
        let deleted = store.sweep_expired().await.unwrap();
        assert!(deleted >= 1);
        assert!(store.get("15-1252.00").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_returns_none_exactly_at_expiry() {
        // Visible strictly before expires_at, gone at and after it.
        for offset_ms in [-2_i64, -1, 0, 1, 2] {
            let (store, clock) = store_with_clock();
            let written = store.put(software_developers()).await.unwrap();
            clock.advance(Duration::days(30) + Duration::milliseconds(offset_ms));
            let visible = store.get("15-1252.00").await.unwrap().is_some();
            assert_eq!(
                visible,
                written.expires_at > clock.now(),
                "offset {offset_ms}ms"
            );
            assert_eq!(visible, offset_ms < 0);
        }
    }

    #[tokio::test]
    async fn test_put_twice_keeps_single_record_with_second_expiry() {
        let (store, clock) = store_with_clock();
        store.put(software_developers()).await.unwrap();
        clock.advance(Duration::days(10));
        let second = store.put(software_developers()).await.unwrap();

        assert_eq!(store.records.read().await.len(), 1);
        let live = store.get("15-1252.00").await.unwrap().unwrap();
        assert_eq!(live.expires_at, second.expires_at);
    }

    #[tokio::test]
    async fn test_put_replaces_full_record() {
        let (store, _clock) = store_with_clock();
        store.put(software_developers()).await.unwrap();

        let mut updated = software_developers();
        updated.skills.clear();
        store.put(updated).await.unwrap();

        let live = store.get("15-1252.00").await.unwrap().unwrap();
        assert!(live.skills.is_empty());
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_substring() {
        let (store, _clock) = store_with_clock();
        store.put(software_developers()).await.unwrap();

        let hits = store.search_by_title("SOFTWARE").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(store.search_by_title("nurse").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_skips_records_from_older_cache_versions() {
        let (store, _clock) = store_with_clock();
        let stored = store.put(software_developers()).await.unwrap();
        let mut stale = stored.clone();
        stale.code = "15-1253.00".to_string();
        stale.title = "Software Quality Assurance Analysts".to_string();
        stale.version = "v0".to_string();
        store
            .records_for_test()
            .await
            .insert(stale.code.clone(), stale);

        let hits = store.search_by_title("software").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].code, "15-1252.00");
    }

    #[tokio::test]
    async fn test_sweep_is_idempotent() {
        let (store, clock) = store_with_clock();
        store.put(software_developers()).await.unwrap();
        clock.advance(Duration::days(31));

        assert_eq!(store.sweep_expired().await.unwrap(), 1);
        assert_eq!(store.sweep_expired().await.unwrap(), 0);
    }

    #[test]
    fn test_escape_like_metacharacters() {
        assert_eq!(escape_like("100%_dev\\"), "100\\%\\_dev\\\\");
        assert_eq!(escape_like("software"), "software");
    }
}
