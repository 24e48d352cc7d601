pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::analysis::handlers as analysis;
use crate::gaps::handlers as gaps;
use crate::occupations::handlers as occupations;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Occupations
        .route("/api/v1/occupations/search", get(occupations::handle_search))
        .route("/api/v1/occupations/batch", post(occupations::handle_batch))
        .route(
            "/api/v1/occupations/cache/sweep",
            post(occupations::handle_sweep),
        )
        .route(
            "/api/v1/occupations/:code",
            get(occupations::handle_get_occupation),
        )
        .route(
            "/api/v1/skills/:code/complexity",
            get(occupations::handle_skill_complexity),
        )
        // Analysis
        .route("/api/v1/resumes/score", post(analysis::handle_score_resume))
        .route("/api/v1/analysis/skill-gap", post(gaps::handle_skill_gap))
        .with_state(state)
}
