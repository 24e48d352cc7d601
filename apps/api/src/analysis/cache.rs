//! Content-hash analysis cache.
//!
//! Results are keyed by (subject, analysis kind, SHA-256 of normalized content) and
//! tagged with a schema version. Re-submitting unchanged content is a hit; any
//! substantive edit changes the hash and forces recomputation. Only the newest
//! `retention` entries per (subject, kind) are kept.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::analysis::fingerprint::{content_hash, normalize_text};
use crate::clock::Clock;
use crate::db::StoreError;

/// Bump when the shape of any cached result changes; older entries become misses.
pub const ANALYSIS_SCHEMA_VERSION: &str = "analysis-v1";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnalysisKey {
    pub subject_id: String,
    pub analysis_kind: String,
    pub content_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnalysisCacheEntry {
    pub subject_id: String,
    pub analysis_kind: String,
    pub content_hash: String,
    pub schema_version: String,
    pub result: serde_json::Value,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CachedAnalysis<T> {
    pub result: T,
    pub content_hash: String,
    pub cache_hit: bool,
    pub computed_at: DateTime<Utc>,
}

#[async_trait]
pub trait AnalysisStore: Send + Sync {
    async fn get(&self, key: &AnalysisKey) -> Result<Option<AnalysisCacheEntry>, StoreError>;

    /// Upsert on the full key.
    async fn put(&self, entry: AnalysisCacheEntry) -> Result<(), StoreError>;

    /// Keeps the `keep` most recent entries for (subject, kind); returns how many were deleted.
    /// The entry for `newest_hash` always survives, and equal timestamps are
    /// ordered by content hash.
    async fn prune(
        &self,
        subject_id: &str,
        analysis_kind: &str,
        newest_hash: &str,
        keep: usize,
    ) -> Result<u64, StoreError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Postgres
// ────────────────────────────────────────────────────────────────────────────

pub struct PgAnalysisStore {
    pool: PgPool,
}

impl PgAnalysisStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnalysisStore for PgAnalysisStore {
    async fn get(&self, key: &AnalysisKey) -> Result<Option<AnalysisCacheEntry>, StoreError> {
        let row = sqlx::query_as::<_, AnalysisCacheEntry>(
            r#"
            SELECT subject_id, analysis_kind, content_hash, schema_version, result, computed_at
            FROM analysis_cache
            WHERE subject_id = $1 AND analysis_kind = $2 AND content_hash = $3
            "#,
        )
        .bind(&key.subject_id)
        .bind(&key.analysis_kind)
        .bind(&key.content_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn put(&self, entry: AnalysisCacheEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO analysis_cache
                (id, subject_id, analysis_kind, content_hash, schema_version, result, computed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (subject_id, analysis_kind, content_hash) DO UPDATE SET
                schema_version = EXCLUDED.schema_version,
                result = EXCLUDED.result,
                computed_at = EXCLUDED.computed_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&entry.subject_id)
        .bind(&entry.analysis_kind)
        .bind(&entry.content_hash)
        .bind(&entry.schema_version)
        .bind(&entry.result)
        .bind(entry.computed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn prune(
        &self,
        subject_id: &str,
        analysis_kind: &str,
        newest_hash: &str,
        keep: usize,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM analysis_cache
            WHERE subject_id = $1 AND analysis_kind = $2 AND id NOT IN (
                SELECT id FROM analysis_cache
                WHERE subject_id = $1 AND analysis_kind = $2
                ORDER BY content_hash = $3 DESC, computed_at DESC, content_hash DESC
                LIMIT $4
            )
            "#,
        )
        .bind(subject_id)
        .bind(analysis_kind)
        .bind(newest_hash)
        .bind(keep as i64)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryAnalysisStore {
    entries: RwLock<HashMap<AnalysisKey, AnalysisCacheEntry>>,
}

impl MemoryAnalysisStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl AnalysisStore for MemoryAnalysisStore {
    async fn get(&self, key: &AnalysisKey) -> Result<Option<AnalysisCacheEntry>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, entry: AnalysisCacheEntry) -> Result<(), StoreError> {
        let key = AnalysisKey {
            subject_id: entry.subject_id.clone(),
            analysis_kind: entry.analysis_kind.clone(),
            content_hash: entry.content_hash.clone(),
        };
        self.entries.write().await.insert(key, entry);
        Ok(())
    }

    async fn prune(
        &self,
        subject_id: &str,
        analysis_kind: &str,
        newest_hash: &str,
        keep: usize,
    ) -> Result<u64, StoreError> {
        let mut entries = self.entries.write().await;
        let mut owned: Vec<(AnalysisKey, DateTime<Utc>)> = entries
            .iter()
            .filter(|(k, _)| k.subject_id == subject_id && k.analysis_kind == analysis_kind)
            .map(|(k, e)| (k.clone(), e.computed_at))
            .collect();
        // Same order as the Postgres prune, newest first.
        owned.sort_by(|a, b| {
            (b.0.content_hash == newest_hash)
                .cmp(&(a.0.content_hash == newest_hash))
                .then(b.1.cmp(&a.1))
                .then(b.0.content_hash.cmp(&a.0.content_hash))
        });

        let mut deleted = 0;
        for (key, _) in owned.into_iter().skip(keep) {
            entries.remove(&key);
            deleted += 1;
        }
        Ok(deleted)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Cache
// ────────────────────────────────────────────────────────────────────────────

pub struct ContentHashAnalysisCache {
    store: Arc<dyn AnalysisStore>,
    clock: Arc<dyn Clock>,
    retention: usize,
    inflight: Mutex<HashMap<AnalysisKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl ContentHashAnalysisCache {
    pub fn new(store: Arc<dyn AnalysisStore>, clock: Arc<dyn Clock>, retention: usize) -> Self {
        Self {
            store,
            clock,
            retention: retention.max(1),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached result for this content, or runs `compute` and stores it.
    ///
    /// Concurrent callers with the same key compute at most once. Store failures
    /// never fail the call: a broken read is a miss and a broken write is logged.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        subject_id: &str,
        analysis_kind: &str,
        content: &str,
        compute: F,
    ) -> Result<CachedAnalysis<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.get_or_compute_versioned(
            subject_id,
            analysis_kind,
            ANALYSIS_SCHEMA_VERSION,
            content,
            compute,
        )
        .await
    }

    /// Like `get_or_compute`, but entries only hit when stored under
    /// `schema_version`. Analyzers whose output depends on tunable settings pass a
    /// version that folds those settings in.
    pub async fn get_or_compute_versioned<T, E, F, Fut>(
        &self,
        subject_id: &str,
        analysis_kind: &str,
        schema_version: &str,
        content: &str,
        compute: F,
    ) -> Result<CachedAnalysis<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = AnalysisKey {
            subject_id: subject_id.to_string(),
            analysis_kind: analysis_kind.to_string(),
            content_hash: content_hash(&normalize_text(content)),
        };

        let slot = self.slot(&key);
        let outcome = {
            let _guard = slot.lock().await;
            self.lookup_or_compute(&key, schema_version, compute).await
        };
        self.release(&key, slot);
        outcome
    }

    async fn lookup_or_compute<T, E, F, Fut>(
        &self,
        key: &AnalysisKey,
        schema_version: &str,
        compute: F,
    ) -> Result<CachedAnalysis<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.store.get(key).await {
            Ok(Some(entry)) if entry.schema_version == schema_version => {
                match serde_json::from_value::<T>(entry.result) {
                    Ok(result) => {
                        debug!(
                            "Analysis cache hit: {}/{}",
                            key.analysis_kind, key.content_hash
                        );
                        return Ok(CachedAnalysis {
                            result,
                            content_hash: key.content_hash.clone(),
                            cache_hit: true,
                            computed_at: entry.computed_at,
                        });
                    }
                    Err(e) => warn!("Cached {} result unreadable, recomputing: {e}", key.analysis_kind),
                }
            }
            Ok(Some(entry)) => debug!(
                "Cached {} result has schema {}, recomputing",
                key.analysis_kind, entry.schema_version
            ),
            Ok(None) => {}
            Err(e) => warn!("Analysis cache read failed, treating as miss: {e}"),
        }

        let result = compute().await?;
        let computed_at = self.clock.now();
        self.persist(key, schema_version, &result, computed_at).await;

        Ok(CachedAnalysis {
            result,
            content_hash: key.content_hash.clone(),
            cache_hit: false,
            computed_at,
        })
    }

    async fn persist<T: Serialize>(
        &self,
        key: &AnalysisKey,
        schema_version: &str,
        result: &T,
        computed_at: DateTime<Utc>,
    ) {
        let value = match serde_json::to_value(result) {
            Ok(v) => v,
            Err(e) => {
                warn!("Could not serialize {} result for caching: {e}", key.analysis_kind);
                return;
            }
        };

        let entry = AnalysisCacheEntry {
            subject_id: key.subject_id.clone(),
            analysis_kind: key.analysis_kind.clone(),
            content_hash: key.content_hash.clone(),
            schema_version: schema_version.to_string(),
            result: value,
            computed_at,
        };
        if let Err(e) = self.store.put(entry).await {
            warn!("Analysis cache write failed: {e}");
            return;
        }

        match self
            .store
            .prune(&key.subject_id, &key.analysis_kind, &key.content_hash, self.retention)
            .await
        {
            Ok(0) => {}
            Ok(n) => debug!("Pruned {n} old {} entries for {}", key.analysis_kind, key.subject_id),
            Err(e) => warn!("Analysis cache prune failed: {e}"),
        }
    }

    fn slot(&self, key: &AnalysisKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut inflight = self.inflight.lock().unwrap_or_else(|p| p.into_inner());
        inflight.entry(key.clone()).or_default().clone()
    }

    fn release(&self, key: &AnalysisKey, slot: Arc<tokio::sync::Mutex<()>>) {
        let mut inflight = self.inflight.lock().unwrap_or_else(|p| p.into_inner());
        // Map + ours means nobody else is waiting on this key.
        let contended = Arc::strong_count(&slot) > 2;
        drop(slot);
        if !contended {
            inflight.remove(key);
        }
    }
}
