use crate::gaps::models::{Milestone, RoadmapPhase, SkillGap};

const PHASES: &[(u8, &str, &str)] = &[
    (1, "Immediate focus", "0-3 months"),
    (2, "Short-term growth", "3-6 months"),
    (3, "Long-term development", "6-12 months"),
];

const TITLE_SKILLS: usize = 3;

/// Groups gaps (already in priority order) into phases. Empty phases are omitted.
pub fn build_roadmap(gaps: &[SkillGap], hours_per_week: f64) -> Vec<RoadmapPhase> {
    PHASES
        .iter()
        .filter_map(|&(phase, name, timeframe)| {
            let members: Vec<&SkillGap> = gaps.iter().filter(|g| g.phase == phase).collect();
            if members.is_empty() {
                return None;
            }

            let total_hours: u32 = members.iter().map(|g| g.time_estimate.hours).sum();
            let estimated_weeks = (total_hours as f64 / hours_per_week).ceil().max(1.0) as u32;

            Some(RoadmapPhase {
                phase,
                name: name.to_string(),
                timeframe: timeframe.to_string(),
                skills: members.iter().map(|g| g.skill.clone()).collect(),
                quick_wins: members
                    .iter()
                    .filter(|g| g.quick_win)
                    .map(|g| g.skill.clone())
                    .collect(),
                milestone: Milestone {
                    title: milestone_title(name, &members),
                    total_hours,
                    estimated_weeks,
                },
            })
        })
        .collect()
}

fn milestone_title(name: &str, members: &[&SkillGap]) -> String {
    let mut listed: Vec<String> = members
        .iter()
        .take(TITLE_SKILLS)
        .map(|g| g.skill.clone())
        .collect();
    let rest = members.len().saturating_sub(TITLE_SKILLS);
    if rest > 0 {
        listed.push(format!("+{rest} more"));
    }
    format!("{name}: {}", listed.join(", "))
}
