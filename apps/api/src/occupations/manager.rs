//! Occupation cache manager: cache-first read-through over the remote provider.
//!
//! Resolution order for a single code: cache → remote (write-through) → static
//! fallback. The manager never fails a lookup: when both the store and the remote
//! source are unavailable it serves mock data and marks the result `Fallback`.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db::StoreError;
use crate::occupations::client::{OccupationProvider, OnetError};
use crate::occupations::fallback::{first_success, Stage};
use crate::occupations::mock_data::{fallback_occupation, search_fallback};
use crate::occupations::models::{
    OccupationRecord, OccupationSource, OccupationSummary, ResolvedOccupation, CACHE_VERSION,
};
use crate::occupations::store::OccupationStore;

pub const DEFAULT_BATCH_SIZE: usize = 5;

const STAGE_CACHE: &str = "cache";
const STAGE_REMOTE: &str = "remote";
const STAGE_MOCK: &str = "mock";

#[derive(Debug, Error)]
enum ResolveError {
    #[error("not cached")]
    Miss,

    #[error("cached record has version '{0}'")]
    StaleVersion(String),

    #[error("store read failed: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Remote(#[from] OnetError),
}

fn mock_stage(code: &str) -> Stage<'_, OccupationRecord, ResolveError> {
    Stage::new(STAGE_MOCK, async move { Ok(fallback_occupation(code)) }.boxed())
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub results: Vec<OccupationSummary>,
    pub source: OccupationSource,
}

pub struct OccupationCacheManager {
    store: Arc<dyn OccupationStore>,
    provider: Arc<dyn OccupationProvider>,
    batch_size: usize,
}

impl OccupationCacheManager {
    pub fn new(store: Arc<dyn OccupationStore>, provider: Arc<dyn OccupationProvider>) -> Self {
        Self {
            store,
            provider,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Resolves one occupation: cache → remote → mock. Never fails.
    pub async fn get_occupation(&self, code: &str) -> ResolvedOccupation {
        let stages = vec![
            Stage::new(STAGE_CACHE, self.lookup_cached(code).boxed()),
            Stage::new(STAGE_REMOTE, self.fetch_and_store(code).boxed()),
            mock_stage(code),
        ];
        self.run_chain(code, stages).await
    }

    /// Skips the cache and re-fetches from the remote source, refreshing the TTL.
    pub async fn refresh_occupation(&self, code: &str) -> ResolvedOccupation {
        let stages = vec![
            Stage::new(STAGE_REMOTE, self.fetch_and_store(code).boxed()),
            Stage::new(STAGE_CACHE, self.lookup_cached(code).boxed()),
            mock_stage(code),
        ];
        self.run_chain(code, stages).await
    }

    /// Resolves many codes, preserving input order.
    ///
    /// Cache hits are served without touching the network. Misses are fetched in
    /// sequential batches of `batch_size`, concurrently within a batch; each request
    /// still waits on the provider's shared rate limiter.
    pub async fn get_occupations(&self, codes: &[String]) -> Vec<ResolvedOccupation> {
        let mut resolved: Vec<Option<ResolvedOccupation>> = Vec::with_capacity(codes.len());
        let mut misses: Vec<&str> = Vec::new();

        for code in codes {
            match self.lookup_cached(code).await {
                Ok(record) => resolved.push(Some(ResolvedOccupation {
                    record,
                    source: OccupationSource::Cache,
                })),
                Err(e) => {
                    debug!("Batch cache miss for {code}: {e}");
                    if !misses.contains(&code.as_str()) {
                        misses.push(code.as_str());
                    }
                    resolved.push(None);
                }
            }
        }

        let mut fetched: HashMap<&str, ResolvedOccupation> = HashMap::new();
        for batch in misses.chunks(self.batch_size) {
            let results = join_all(batch.iter().map(|code| self.resolve_miss(code))).await;
            fetched.extend(batch.iter().copied().zip(results));
        }

        info!(
            "Resolved {} occupations ({} cache hits, {} fetched)",
            codes.len(),
            codes.len() - resolved.iter().filter(|r| r.is_none()).count(),
            misses.len()
        );

        codes
            .iter()
            .zip(resolved)
            .map(|(code, hit)| match hit {
                Some(r) => r,
                None => fetched
                    .get(code.as_str())
                    .cloned()
                    .unwrap_or_else(|| ResolvedOccupation {
                        record: fallback_occupation(code),
                        source: OccupationSource::Fallback,
                    }),
            })
            .collect()
    }

    /// Cache-first title search. Remote results are returned but never persisted.
    pub async fn search_occupations(&self, query: &str) -> SearchResults {
        match self.store.search_by_title(query).await {
            Ok(hits) if !hits.is_empty() => {
                return SearchResults {
                    results: hits.iter().map(OccupationSummary::from).collect(),
                    source: OccupationSource::Cache,
                }
            }
            Ok(_) => debug!("No cached occupations match '{query}'"),
            Err(e) => warn!("Occupation cache search failed, treating as empty: {e}"),
        }

        match self.provider.search_occupations(query).await {
            Ok(results) => SearchResults {
                results,
                source: OccupationSource::Remote,
            },
            Err(e) => {
                warn!(degraded = true, "Remote occupation search failed: {e}");
                SearchResults {
                    results: search_fallback(query),
                    source: OccupationSource::Fallback,
                }
            }
        }
    }

    /// Complexity hint for a skill element, or `None` when the remote source is unavailable.
    pub async fn skill_complexity(&self, skill_code: &str) -> Option<f64> {
        match self.provider.fetch_skill_complexity(skill_code).await {
            Ok(c) => Some(c),
            Err(e) => {
                warn!("Skill complexity lookup for {skill_code} failed: {e}");
                None
            }
        }
    }

    pub async fn sweep_expired(&self) -> Result<u64, StoreError> {
        let deleted = self.store.sweep_expired().await?;
        info!("Swept {deleted} expired occupation records");
        Ok(deleted)
    }

    // ── stages ──────────────────────────────────────────────────────────────

    async fn lookup_cached(&self, code: &str) -> Result<OccupationRecord, ResolveError> {
        match self.store.get(code).await? {
            Some(record) if record.version == CACHE_VERSION => Ok(record),
            Some(record) => Err(ResolveError::StaleVersion(record.version)),
            None => Err(ResolveError::Miss),
        }
    }

    async fn fetch_and_store(&self, code: &str) -> Result<OccupationRecord, ResolveError> {
        let record = self.provider.fetch_occupation_by_code(code).await?;
        match self.store.put(record.clone()).await {
            Ok(stored) => Ok(stored),
            Err(e) => {
                warn!("Failed to cache occupation {code}, continuing uncached: {e}");
                Ok(record)
            }
        }
    }

    async fn resolve_miss(&self, code: &str) -> ResolvedOccupation {
        let stages = vec![
            Stage::new(STAGE_REMOTE, self.fetch_and_store(code).boxed()),
            mock_stage(code),
        ];
        self.run_chain(code, stages).await
    }

    async fn run_chain(
        &self,
        code: &str,
        stages: Vec<Stage<'_, OccupationRecord, ResolveError>>,
    ) -> ResolvedOccupation {
        match first_success(stages).await {
            Ok(outcome) => {
                let source = match outcome.stage {
                    STAGE_CACHE => OccupationSource::Cache,
                    STAGE_REMOTE => OccupationSource::Remote,
                    _ => OccupationSource::Fallback,
                };
                if source == OccupationSource::Fallback {
                    warn!(
                        degraded = true,
                        code,
                        failures = ?outcome.failures,
                        "Serving fallback occupation data"
                    );
                } else {
                    debug!("Occupation {code} resolved from {}", outcome.stage);
                }
                ResolvedOccupation {
                    record: outcome.value,
                    source,
                }
            }
            Err(exhausted) => {
                warn!(degraded = true, code, "{exhausted}");
                ResolvedOccupation {
                    record: fallback_occupation(code),
                    source: OccupationSource::Fallback,
                }
            }
        }
    }
}
