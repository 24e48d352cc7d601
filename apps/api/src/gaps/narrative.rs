//! Roadmap narrative: pluggable, trait-based prose over a finished gap analysis.
//!
//! `LlmRoadmapNarrator` asks Claude for a summary and per-phase notes;
//! `TemplateNarrator` is the deterministic fallback used when no API key is
//! configured or the LLM call fails. The pipeline never fails on narration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::gaps::models::GapAnalysis;
use crate::gaps::prompts::{build_roadmap_prompt, roadmap_system};
use crate::llm_client::{LlmClient, LlmError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseNote {
    pub phase: u8,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapNarrative {
    pub summary: String,
    #[serde(default)]
    pub phase_notes: Vec<PhaseNote>,
    /// "llm" or "template".
    #[serde(default)]
    pub source: String,
}

#[async_trait]
pub trait RoadmapNarrator: Send + Sync {
    async fn narrate(&self, analysis: &GapAnalysis) -> Result<RoadmapNarrative, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// TemplateNarrator
// ────────────────────────────────────────────────────────────────────────────

pub struct TemplateNarrator;

#[async_trait]
impl RoadmapNarrator for TemplateNarrator {
    async fn narrate(&self, analysis: &GapAnalysis) -> Result<RoadmapNarrative, LlmError> {
        Ok(template_narrative(analysis))
    }
}

pub fn template_narrative(analysis: &GapAnalysis) -> RoadmapNarrative {
    let summary = match analysis.gaps.first() {
        None => format!(
            "Your current skills already cover the requirements for {}.",
            analysis.occupation_title
        ),
        Some(top) => {
            let quick_wins = analysis.gaps.iter().filter(|g| g.quick_win).count();
            format!(
                "{} skill gaps for {} totalling about {} hours. Start with {} (priority {}){}.",
                analysis.gaps.len(),
                analysis.occupation_title,
                analysis.total_hours,
                top.skill,
                top.priority_score,
                match quick_wins {
                    0 => String::new(),
                    1 => "; there is 1 quick win along the way".to_string(),
                    n => format!("; there are {n} quick wins along the way"),
                }
            )
        }
    };

    let phase_notes = analysis
        .phases
        .iter()
        .map(|p| PhaseNote {
            phase: p.phase,
            note: format!(
                "{} ({}): {} over roughly {} weeks.",
                p.name,
                p.timeframe,
                p.skills.join(", "),
                p.milestone.estimated_weeks
            ),
        })
        .collect();

    RoadmapNarrative {
        summary,
        phase_notes,
        source: "template".to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LlmRoadmapNarrator
// ────────────────────────────────────────────────────────────────────────────

pub struct LlmRoadmapNarrator(pub LlmClient);

#[async_trait]
impl RoadmapNarrator for LlmRoadmapNarrator {
    async fn narrate(&self, analysis: &GapAnalysis) -> Result<RoadmapNarrative, LlmError> {
        let prompt = build_roadmap_prompt(analysis);
        let mut narrative: RoadmapNarrative = self.0.call_json(&prompt, &roadmap_system()).await?;

        // Keep only notes for phases that exist.
        narrative
            .phase_notes
            .retain(|n| analysis.phases.iter().any(|p| p.phase == n.phase));
        narrative.source = "llm".to_string();
        Ok(narrative)
    }
}

/// Narrates with `narrator`, falling back to the template on any failure.
pub async fn narrate_or_fallback(
    narrator: &dyn RoadmapNarrator,
    analysis: &GapAnalysis,
) -> RoadmapNarrative {
    match narrator.narrate(analysis).await {
        Ok(narrative) => narrative,
        Err(e) => {
            warn!("Roadmap narration failed, using template: {e}");
            template_narrative(analysis)
        }
    }
}
