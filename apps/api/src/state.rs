use std::sync::Arc;

use crate::analysis::cache::ContentHashAnalysisCache;
use crate::analysis::scorer::MultiFactorScorer;
use crate::gaps::pipeline::SkillGapPipeline;
use crate::occupations::manager::OccupationCacheManager;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub occupations: Arc<OccupationCacheManager>,
    pub analysis_cache: Arc<ContentHashAnalysisCache>,
    pub scorer: Arc<MultiFactorScorer>,
    /// Shares the components above; the narrator inside is pluggable
    /// (LLM when an API key is configured, template otherwise).
    pub skill_gaps: Arc<SkillGapPipeline>,
}
