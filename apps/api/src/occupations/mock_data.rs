//! Static occupation data served when both the cache and the remote source fail.
//! Values are already on the normalized 0–100 scales.

use chrono::Utc;

use crate::occupations::models::{
    Ability, KnowledgeArea, LaborMarket, OccupationRecord, OccupationSummary, Skill,
    CACHE_VERSION,
};

/// (name, element id, importance, level, category)
type SkillRow = (&'static str, &'static str, u8, u8, &'static str);
/// (name, importance, level)
type AreaRow = (&'static str, u8, u8);

struct MockOccupation {
    code: &'static str,
    title: &'static str,
    skills: &'static [SkillRow],
    knowledge: &'static [AreaRow],
    abilities: &'static [AreaRow],
    projected_growth_pct: f64,
    bright_outlook: bool,
    in_demand: &'static [&'static str],
}

const MOCK_OCCUPATIONS: &[MockOccupation] = &[
    MockOccupation {
        code: "15-1252.00",
        title: "Software Developers",
        skills: &[
            ("Programming", "2.B.3.e", 85, 60, "technical"),
            ("Complex Problem Solving", "2.B.2.i", 78, 58, "cognitive"),
            ("Systems Analysis", "2.B.4.g", 72, 56, "technical"),
            ("Critical Thinking", "2.A.2.a", 75, 57, "cognitive"),
            ("Active Learning", "2.A.2.b", 65, 52, "cognitive"),
            ("Communication", "2.A.1.d", 60, 50, "interpersonal"),
        ],
        knowledge: &[
            ("Computers and Electronics", 90, 71),
            ("Mathematics", 68, 57),
            ("English Language", 55, 50),
        ],
        abilities: &[("Deductive Reasoning", 78, 57), ("Written Comprehension", 70, 55)],
        projected_growth_pct: 17.0,
        bright_outlook: true,
        in_demand: &["Python", "JavaScript", "SQL", "Git", "Amazon Web Services"],
    },
    MockOccupation {
        code: "15-2051.00",
        title: "Data Scientists",
        skills: &[
            ("Programming", "2.B.3.e", 80, 57, "technical"),
            ("Mathematics", "2.A.1.e", 85, 64, "technical"),
            ("Critical Thinking", "2.A.2.a", 78, 59, "cognitive"),
            ("Reading Comprehension", "2.A.1.a", 70, 57, "cognitive"),
            ("Communication", "2.A.1.d", 68, 54, "interpersonal"),
        ],
        knowledge: &[("Mathematics", 88, 70), ("Computers and Electronics", 80, 64)],
        abilities: &[("Inductive Reasoning", 80, 60), ("Mathematical Reasoning", 82, 62)],
        projected_growth_pct: 36.0,
        bright_outlook: true,
        in_demand: &["Python", "SQL", "R", "Tableau"],
    },
    MockOccupation {
        code: "13-1111.00",
        title: "Management Analysts",
        skills: &[
            ("Critical Thinking", "2.A.2.a", 80, 62, "cognitive"),
            ("Communication", "2.A.1.d", 82, 64, "interpersonal"),
            ("Judgment and Decision Making", "2.B.4.e", 75, 58, "cognitive"),
            ("Writing", "2.A.1.c", 72, 58, "interpersonal"),
        ],
        knowledge: &[
            ("Administration and Management", 78, 62),
            ("Customers and Personal Service", 60, 52),
        ],
        abilities: &[("Oral Expression", 75, 58)],
        projected_growth_pct: 10.0,
        bright_outlook: true,
        in_demand: &["Microsoft Excel", "SQL", "Tableau"],
    },
];

/// Foundational requirements for codes with no static entry.
const GENERIC_SKILLS: &[SkillRow] = &[
    ("Critical Thinking", "2.A.2.a", 70, 50, "cognitive"),
    ("Communication", "2.A.1.d", 65, 50, "interpersonal"),
    ("Active Learning", "2.A.2.b", 60, 45, "cognitive"),
    ("Time Management", "2.B.5.a", 55, 45, "organizational"),
];

fn build(
    code: &str,
    title: &str,
    skills: &[SkillRow],
    knowledge: &[AreaRow],
    abilities: &[AreaRow],
    labor_market: Option<LaborMarket>,
) -> OccupationRecord {
    let now = Utc::now();
    OccupationRecord {
        code: code.to_string(),
        title: title.to_string(),
        description: None,
        skills: skills
            .iter()
            .map(|&(name, id, importance, level, category)| Skill {
                name: name.to_string(),
                code: id.to_string(),
                importance,
                level,
                category: category.to_string(),
            })
            .collect(),
        knowledge: knowledge
            .iter()
            .map(|&(name, importance, level)| KnowledgeArea {
                name: name.to_string(),
                level,
                importance,
            })
            .collect(),
        abilities: abilities
            .iter()
            .map(|&(name, importance, level)| Ability {
                name: name.to_string(),
                level,
                importance,
            })
            .collect(),
        labor_market,
        version: CACHE_VERSION.to_string(),
        created_at: now,
        expires_at: now,
    }
}

/// Returns the static record for `code`, or a generic one synthesized for unknown codes.
pub fn fallback_occupation(code: &str) -> OccupationRecord {
    match MOCK_OCCUPATIONS.iter().find(|m| m.code == code) {
        Some(m) => build(
            m.code,
            m.title,
            m.skills,
            m.knowledge,
            m.abilities,
            Some(LaborMarket {
                median_annual_wage: None,
                projected_growth_pct: Some(m.projected_growth_pct),
                bright_outlook: m.bright_outlook,
                in_demand_skills: m.in_demand.iter().map(|s| s.to_string()).collect(),
            }),
        ),
        None => build(
            code,
            &format!("Unknown occupation {code}"),
            GENERIC_SKILLS,
            &[],
            &[],
            None,
        ),
    }
}

/// Title substring search over the static table.
pub fn search_fallback(query: &str) -> Vec<OccupationSummary> {
    let needle = query.to_lowercase();
    MOCK_OCCUPATIONS
        .iter()
        .filter(|m| m.title.to_lowercase().contains(&needle))
        .map(|m| OccupationSummary {
            code: m.code.to_string(),
            title: m.title.to_string(),
            relevance_score: None,
        })
        .collect()
}
