// LLM prompt constants for roadmap narration.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::gaps::models::GapAnalysis;
use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, NO_INVENTION_INSTRUCTION};

/// Role line prepended to the shared JSON-only system prompt.
pub const ROADMAP_ROLE: &str = "You are a career coach who writes short, concrete learning plans.";

pub fn roadmap_system() -> String {
    format!("{ROADMAP_ROLE} {JSON_ONLY_SYSTEM}")
}

/// Roadmap narration prompt. Replace `{occupation}`, `{gaps}` and `{phases}` before sending.
pub const ROADMAP_PROMPT_TEMPLATE: &str = r#"Write a learning roadmap narrative for someone targeting the occupation "{occupation}".

Skill gaps, highest priority first (name | criticality | current -> target | estimate):
{gaps}

Roadmap phases (phase | timeframe | skills | total hours):
{phases}

Return a JSON object with this EXACT schema (no extra fields):
{
  "summary": "Two or three sentences on where to focus first and why.",
  "phase_notes": [
    {"phase": 1, "note": "One or two sentences of practical advice for this phase."}
  ]
}

Write exactly one phase_notes entry per phase listed above, using the same phase numbers.
"#;

pub fn build_roadmap_prompt(analysis: &GapAnalysis) -> String {
    let gaps = analysis
        .gaps
        .iter()
        .map(|g| {
            format!(
                "- {} | {:?} | {} -> {} | {}",
                g.skill, g.criticality, g.current_level, g.target_level, g.time_estimate.label
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let phases = analysis
        .phases
        .iter()
        .map(|p| {
            format!(
                "- {} | {} | {} | {}",
                p.phase,
                p.timeframe,
                p.skills.join(", "),
                p.milestone.total_hours
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{}\n\n{NO_INVENTION_INSTRUCTION}",
        ROADMAP_PROMPT_TEMPLATE
            .replace("{occupation}", &analysis.occupation_title)
            .replace("{gaps}", &gaps)
            .replace("{phases}", &phases)
    )
}
