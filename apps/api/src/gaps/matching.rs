//! Skill name matching: normalization, synonym groups and skill families.

use std::collections::{BTreeSet, HashMap};

use crate::analysis::content::ResumeContent;
use crate::analysis::signals::contains_term;
use crate::gaps::models::CurrentSkill;

/// The first entry of each group is the canonical name.
const SYNONYMS: &[&[&str]] = &[
    &["javascript", "js", "ecmascript"],
    &["typescript", "ts"],
    &["python", "python3"],
    &["postgresql", "postgres"],
    &["kubernetes", "k8s"],
    &["golang", "go"],
    &["programming", "software development", "coding"],
    &["machine learning", "ml"],
    &["artificial intelligence", "ai"],
    &["amazon web services", "aws"],
    &["google cloud", "gcp", "google cloud platform"],
    &["critical thinking", "analytical thinking"],
    &["complex problem solving", "problem solving"],
    &["systems analysis", "system design", "systems design"],
    &["computers and electronics", "computer science"],
    &["speaking", "public speaking", "presenting"],
    &["writing", "technical writing"],
    &["mathematics", "math", "maths"],
    &["statistics", "statistical analysis"],
];

/// Skills in the same family transfer to each other. Names are canonical.
const FAMILIES: &[(&str, &[&str])] = &[
    (
        "programming",
        &[
            "programming", "python", "javascript", "typescript", "java", "rust", "golang",
            "c++", "c#", "scala", "ruby", "computers and electronics",
        ],
    ),
    (
        "data",
        &[
            "sql", "statistics", "mathematics", "machine learning", "data analysis",
            "pandas", "spark", "tableau", "excel", "postgresql",
        ],
    ),
    (
        "cloud",
        &["amazon web services", "azure", "google cloud", "kubernetes", "docker", "terraform", "devops"],
    ),
    (
        "communication",
        &[
            "speaking", "writing", "active listening", "communication", "negotiation",
            "english language", "persuasion",
        ],
    ),
    (
        "analysis",
        &[
            "critical thinking", "complex problem solving", "systems analysis",
            "judgment and decision making", "deductive reasoning", "inductive reasoning",
        ],
    ),
];

/// Lower-case, punctuation-insensitive form. `+` and `#` are kept for `c++` / `c#`.
pub fn normalize_skill_name(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || matches!(c, '+' | '#')))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn canonical_skill(name: &str) -> String {
    let normalized = normalize_skill_name(name);
    SYNONYMS
        .iter()
        .find(|group| group.contains(&normalized.as_str()))
        .map(|group| group[0].to_string())
        .unwrap_or(normalized)
}

pub fn family_of(name: &str) -> Option<&'static str> {
    let canonical = canonical_skill(name);
    FAMILIES
        .iter()
        .find(|(_, members)| members.contains(&canonical.as_str()))
        .map(|(family, _)| *family)
}

/// Current skills indexed by canonical name, keeping the highest level per name.
pub struct SkillIndex<'a> {
    by_name: HashMap<String, &'a CurrentSkill>,
}

impl<'a> SkillIndex<'a> {
    pub fn new(skills: &'a [CurrentSkill]) -> Self {
        let mut by_name: HashMap<String, &CurrentSkill> = HashMap::new();
        for skill in skills {
            let key = canonical_skill(&skill.name);
            match by_name.get(&key) {
                Some(existing) if existing.level >= skill.level => {}
                _ => {
                    by_name.insert(key, skill);
                }
            }
        }
        Self { by_name }
    }

    pub fn level_of(&self, requirement: &str) -> u8 {
        self.by_name
            .get(&canonical_skill(requirement))
            .map_or(0, |s| s.level)
    }

    /// Current skills (other than the requirement itself) in the requirement's family.
    pub fn family_members(&self, requirement: &str) -> Vec<String> {
        let Some(family) = family_of(requirement) else {
            return vec![];
        };
        let own = canonical_skill(requirement);
        let names: BTreeSet<String> = self
            .by_name
            .iter()
            .filter(|(key, skill)| {
                **key != own && skill.level > 0 && family_of(key) == Some(family)
            })
            .map(|(_, skill)| skill.name.clone())
            .collect();
        names.into_iter().collect()
    }
}

/// Estimates current skill levels from résumé content.
///
/// An explicit level wins; otherwise years of use, otherwise how often the skill is
/// evidenced in bullets, project descriptions and the summary.
pub fn derive_current_skills(content: &ResumeContent) -> Vec<CurrentSkill> {
    let mut evidence: Vec<String> = content.all_bullets().map(str::to_string).collect();
    for p in &content.projects {
        evidence.push(format!("{} {}", p.description, p.technologies.join(" ")));
    }
    if let Some(summary) = &content.summary {
        evidence.push(summary.clone());
    }

    content
        .skills
        .iter()
        .filter(|s| !s.name.trim().is_empty())
        .map(|s| {
            let level = match (s.level, s.years) {
                (Some(level), _) => level.min(100),
                (None, Some(years)) => (20.0 + 15.0 * years.max(0.0)).min(95.0).round() as u8,
                (None, None) => {
                    let mentions = evidence
                        .iter()
                        .filter(|text| contains_term(text, &s.name))
                        .count();
                    (30 + 10 * mentions).min(70) as u8
                }
            };
            CurrentSkill {
                name: s.name.trim().to_string(),
                level,
            }
        })
        .collect()
}
