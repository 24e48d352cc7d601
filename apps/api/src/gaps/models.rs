use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analysis::content::ContentError;
use crate::occupations::models::OccupationRecord;

/// A skill the subject already has, with an estimated proficiency 0–100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentSkill {
    pub name: String,
    pub level: u8,
}

#[derive(Debug, Deserialize)]
struct RawCurrentSkill {
    name: String,
    level: f64,
}

impl CurrentSkill {
    /// Strict parse of a caller-supplied skill list: an array of
    /// `{name: non-empty string, level: number in 0..=100}`.
    pub fn parse_list(value: Value) -> Result<Vec<CurrentSkill>, ContentError> {
        let raw: Vec<RawCurrentSkill> = serde_json::from_value(value)
            .map_err(|e| ContentError::InvalidSkill(e.to_string()))?;

        raw.into_iter()
            .enumerate()
            .map(|(i, r)| {
                let name = r.name.trim();
                if name.is_empty() {
                    return Err(ContentError::InvalidSkill(format!("skill #{i} has an empty name")));
                }
                if !r.level.is_finite() || !(0.0..=100.0).contains(&r.level) {
                    return Err(ContentError::InvalidSkill(format!(
                        "skill '{name}' has level {} outside 0-100",
                        r.level
                    )));
                }
                Ok(CurrentSkill {
                    name: name.to_string(),
                    level: r.level.round() as u8,
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    Skill,
    Knowledge,
    Ability,
}

/// One occupational requirement, flattened from skills, knowledge areas and abilities.
#[derive(Debug, Clone, PartialEq)]
pub struct Requirement {
    pub name: String,
    /// O*NET element code; only skills carry one.
    pub code: Option<String>,
    pub kind: RequirementKind,
    pub importance: u8,
    pub target_level: u8,
}

impl Requirement {
    pub fn all_from(record: &OccupationRecord) -> Vec<Requirement> {
        let skills = record.skills.iter().map(|s| Requirement {
            name: s.name.clone(),
            code: Some(s.code.clone()),
            kind: RequirementKind::Skill,
            importance: s.importance,
            target_level: s.level,
        });
        let knowledge = record.knowledge.iter().map(|k| Requirement {
            name: k.name.clone(),
            code: None,
            kind: RequirementKind::Knowledge,
            importance: k.importance,
            target_level: k.level,
        });
        let abilities = record.abilities.iter().map(|a| Requirement {
            name: a.name.clone(),
            code: None,
            kind: RequirementKind::Ability,
            importance: a.importance,
            target_level: a.level,
        });
        skills.chain(knowledge).chain(abilities).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Criticality {
    #[serde(rename = "nice-to-have")]
    NiceToHave,
    #[serde(rename = "important")]
    Important,
    #[serde(rename = "critical")]
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityTier {
    Basic,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEstimate {
    /// Point estimate used for phasing.
    pub hours: u32,
    pub min_hours: u32,
    pub max_hours: u32,
    pub min_weeks: u32,
    pub max_weeks: u32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillGap {
    pub skill: String,
    pub kind: RequirementKind,
    pub importance: u8,
    pub current_level: u8,
    pub target_level: u8,
    pub gap: u8,
    pub criticality: Criticality,
    pub priority_score: u8,
    pub complexity: ComplexityTier,
    pub time_estimate: TimeEstimate,
    pub transferable_from: Vec<String>,
    pub market_demand: Option<u8>,
    pub quick_win: bool,
    pub phase: u8,
}

/// A requirement the subject already meets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferableSkill {
    pub skill: String,
    pub kind: RequirementKind,
    pub current_level: u8,
    pub target_level: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub title: String,
    pub total_hours: u32,
    pub estimated_weeks: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapPhase {
    pub phase: u8,
    pub name: String,
    pub timeframe: String,
    /// Gap skill names in priority order.
    pub skills: Vec<String>,
    pub quick_wins: Vec<String>,
    pub milestone: Milestone,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapAnalysis {
    pub occupation_code: String,
    pub occupation_title: String,
    /// Sorted by priority, highest first.
    pub gaps: Vec<SkillGap>,
    pub transferable_skills: Vec<TransferableSkill>,
    pub phases: Vec<RoadmapPhase>,
    pub total_hours: u32,
}
