use axum::{extract::State, Json};

use crate::errors::AppError;
use crate::gaps::pipeline::{SkillGapReport, SkillGapRequest};
use crate::state::AppState;

/// POST /api/v1/analysis/skill-gap
///
/// Compares a résumé (or an explicit skill list) against an occupation's
/// requirements. Degrades to fallback occupation data and template narrative
/// rather than failing; only malformed input is rejected.
pub async fn handle_skill_gap(
    State(state): State<AppState>,
    Json(request): Json<SkillGapRequest>,
) -> Result<Json<SkillGapReport>, AppError> {
    if request.subject_id.trim().is_empty() {
        return Err(AppError::Validation("subject_id cannot be empty".to_string()));
    }
    if request.occupation_code.trim().is_empty() {
        return Err(AppError::Validation("occupation_code cannot be empty".to_string()));
    }

    let report = state.skill_gaps.run(request).await?;
    Ok(Json(report))
}
