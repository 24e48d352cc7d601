//! Axum route handlers for occupation lookups.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::occupations::manager::SearchResults;
use crate::occupations::models::{OccupationRecord, OccupationSource, ResolvedOccupation};
use crate::state::AppState;

const MAX_BATCH_CODES: usize = 50;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LookupQuery {
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub codes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct OccupationResponse {
    pub record: OccupationRecord,
    pub source: OccupationSource,
    pub degraded: bool,
}

impl From<ResolvedOccupation> for OccupationResponse {
    fn from(resolved: ResolvedOccupation) -> Self {
        Self {
            degraded: resolved.is_degraded(),
            record: resolved.record,
            source: resolved.source,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ComplexityResponse {
    pub skill_code: String,
    pub complexity: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SweepResponse {
    pub deleted: u64,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/occupations/search?q=
pub async fn handle_search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResults>, AppError> {
    let q = query.q.trim();
    if q.is_empty() {
        return Err(AppError::Validation("q cannot be empty".to_string()));
    }
    Ok(Json(state.occupations.search_occupations(q).await))
}

/// GET /api/v1/occupations/:code
///
/// `?refresh=true` bypasses the cache and re-fetches from O*NET.
pub async fn handle_get_occupation(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<OccupationResponse>, AppError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(AppError::Validation("occupation code cannot be empty".to_string()));
    }

    let resolved = if query.refresh {
        state.occupations.refresh_occupation(code).await
    } else {
        state.occupations.get_occupation(code).await
    };
    Ok(Json(resolved.into()))
}

/// POST /api/v1/occupations/batch
pub async fn handle_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<Vec<OccupationResponse>>, AppError> {
    if request.codes.is_empty() {
        return Err(AppError::Validation("codes cannot be empty".to_string()));
    }
    if request.codes.len() > MAX_BATCH_CODES {
        return Err(AppError::Validation(format!(
            "at most {MAX_BATCH_CODES} codes per batch"
        )));
    }

    let resolved = state.occupations.get_occupations(&request.codes).await;
    Ok(Json(resolved.into_iter().map(Into::into).collect()))
}

/// GET /api/v1/skills/:code/complexity
pub async fn handle_skill_complexity(
    State(state): State<AppState>,
    Path(skill_code): Path<String>,
) -> Json<ComplexityResponse> {
    let complexity = state.occupations.skill_complexity(&skill_code).await;
    Json(ComplexityResponse {
        skill_code,
        complexity,
    })
}

/// POST /api/v1/occupations/cache/sweep
pub async fn handle_sweep(State(state): State<AppState>) -> Result<Json<SweepResponse>, AppError> {
    let deleted = state.occupations.sweep_expired().await?;
    Ok(Json(SweepResponse { deleted }))
}
