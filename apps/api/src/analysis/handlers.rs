//! Axum route handlers for résumé scoring.

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::Value;

use crate::analysis::cache::CachedAnalysis;
use crate::analysis::content::ResumeContent;
use crate::analysis::score_resume;
use crate::analysis::scorer::ResumeScore;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ScoreResumeRequest {
    pub subject_id: String,
    pub content: Value,
}

/// POST /api/v1/resumes/score
///
/// Scores structured résumé content. Unchanged content for the same subject is
/// served from the analysis cache.
pub async fn handle_score_resume(
    State(state): State<AppState>,
    Json(request): Json<ScoreResumeRequest>,
) -> Result<Json<CachedAnalysis<ResumeScore>>, AppError> {
    if request.subject_id.trim().is_empty() {
        return Err(AppError::Validation("subject_id cannot be empty".to_string()));
    }

    let content = ResumeContent::from_value(request.content)?;
    let scored = score_resume(
        &state.analysis_cache,
        &state.scorer,
        &request.subject_id,
        &content,
    )
    .await?;

    Ok(Json(scored))
}
