mod analysis;
mod clock;
mod config;
mod db;
mod errors;
mod gaps;
mod llm_client;
mod occupations;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::cache::{
    AnalysisStore, ContentHashAnalysisCache, MemoryAnalysisStore, PgAnalysisStore,
};
use crate::analysis::scorer::{MultiFactorScorer, ScoringConfig};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::db::{create_pool, ensure_schema};
use crate::gaps::config::GapEngineConfig;
use crate::gaps::engine::SkillGapEngine;
use crate::gaps::narrative::{LlmRoadmapNarrator, RoadmapNarrator, TemplateNarrator};
use crate::gaps::pipeline::SkillGapPipeline;
use crate::llm_client::LlmClient;
use crate::occupations::client::OnetClient;
use crate::occupations::manager::OccupationCacheManager;
use crate::occupations::store::{MemoryOccupationStore, OccupationStore, PgOccupationStore};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("skillpath_api={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting SkillPath API v{}", env!("CARGO_PKG_VERSION"));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (occupation_store, analysis_store) = build_stores(&config, clock.clone()).await?;

    // Occupation data: document cache in front of the rate-limited O*NET client
    let onet = OnetClient::new(config.onet_client_config())?;
    if config.onet_username.is_none() {
        warn!("ONET_USERNAME not set; occupation lookups will use fallback data");
    }
    let occupations = Arc::new(
        OccupationCacheManager::new(occupation_store, Arc::new(onet))
            .with_batch_size(config.onet_batch_size),
    );
    info!(
        "Occupation cache ready (ttl: {} days, min interval: {}ms)",
        config.occupation_cache_ttl_days, config.onet_min_interval_ms
    );

    let analysis_cache = Arc::new(ContentHashAnalysisCache::new(
        analysis_store,
        clock,
        config.analysis_cache_retention,
    ));

    let scorer = Arc::new(MultiFactorScorer::new(ScoringConfig::default())?);
    let engine = Arc::new(SkillGapEngine::new(GapEngineConfig::default())?);
    let narrator = build_narrator(&config);

    let skill_gaps = Arc::new(SkillGapPipeline::new(
        occupations.clone(),
        analysis_cache.clone(),
        scorer.clone(),
        engine,
        narrator,
    ));

    // Build app state
    let state = AppState {
        occupations,
        analysis_cache,
        scorer,
        skill_gaps,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict allowed origins once the web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Postgres-backed caches when `DATABASE_URL` is set, in-process ones otherwise.
async fn build_stores(
    config: &Config,
    clock: Arc<dyn Clock>,
) -> Result<(Arc<dyn OccupationStore>, Arc<dyn AnalysisStore>)> {
    let ttl = config.occupation_cache_ttl();
    let Some(database_url) = &config.database_url else {
        warn!("DATABASE_URL not set; caches are in-memory and lost on restart");
        let occupations: Arc<dyn OccupationStore> = Arc::new(MemoryOccupationStore::new(clock, ttl));
        let analyses: Arc<dyn AnalysisStore> = Arc::new(MemoryAnalysisStore::new());
        return Ok((occupations, analyses));
    };

    let db = create_pool(database_url).await?;
    ensure_schema(&db).await?;
    let occupations: Arc<dyn OccupationStore> =
        Arc::new(PgOccupationStore::new(db.clone(), clock, ttl));
    let analyses: Arc<dyn AnalysisStore> = Arc::new(PgAnalysisStore::new(db));
    Ok((occupations, analyses))
}

/// LLM narration when an API key is configured, template narration otherwise.
fn build_narrator(config: &Config) -> Arc<dyn RoadmapNarrator> {
    let Some(key) = config.anthropic_api_key.clone() else {
        info!("ANTHROPIC_API_KEY not set; roadmap narration uses templates");
        return Arc::new(TemplateNarrator);
    };

    match LlmClient::new(key) {
        Ok(client) => {
            info!("LLM client initialized (model: {})", llm_client::MODEL);
            Arc::new(LlmRoadmapNarrator(client))
        }
        Err(e) => {
            warn!("LLM client unavailable, using template narration: {e}");
            Arc::new(TemplateNarrator)
        }
    }
}
