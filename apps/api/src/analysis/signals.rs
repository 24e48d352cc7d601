//! Text signals for résumé bullets and vocabulary matching.

use serde::Serialize;

pub const ACTION_VERBS: &[&str] = &[
    "achieved", "architected", "automated", "built", "championed", "consolidated",
    "created", "cut", "delivered", "deployed", "designed", "developed", "drove",
    "eliminated", "engineered", "established", "expanded", "generated", "grew",
    "implemented", "increased", "launched", "led", "managed", "mentored", "migrated",
    "modernized", "negotiated", "optimized", "orchestrated", "owned", "pioneered",
    "reduced", "redesigned", "refactored", "resolved", "scaled", "shipped",
    "spearheaded", "streamlined", "trained", "transformed",
];

const VAGUE_VERBS: &[&str] = &[
    "improved",
    "enhanced",
    "helped",
    "worked on",
    "assisted",
    "supported",
    "participated",
    "involved",
    "responsible for",
];

const VAGUE_SCALE_WORDS: &[&str] = &[
    "significant",
    "major",
    "large",
    "huge",
    "massive",
    "substantial",
    "considerable",
    "great",
    "many",
    "numerous",
    "various",
    "several",
];

const FIRST_PERSON: &[&str] = &["i", "me", "my", "mine", "myself"];

pub const TECH_TERMS: &[&str] = &[
    "api", "aws", "azure", "c#", "c++", "ci/cd", "docker", "gcp", "git", "go", "graphql",
    "java", "javascript", "kafka", "kubernetes", "linux", "machine learning", "mongodb",
    "node", "pandas", "postgresql", "python", "pytorch", "react", "redis", "rest", "rust",
    "scala", "spark", "sql", "tableau", "tensorflow", "terraform", "typescript",
];

pub const SOFT_SKILLS: &[&str] = &[
    "communication", "collaboration", "leadership", "mentoring", "negotiation",
    "presentation", "problem solving", "stakeholder management", "teamwork",
    "time management",
];

pub const INDUSTRY_TERMS: &[&str] = &[
    "agile", "analytics", "b2b", "budget", "cloud", "compliance", "conversion",
    "customer", "data pipeline", "devops", "forecast", "kpi", "microservices",
    "observability", "p&l", "revenue", "roadmap", "saas", "scrum", "security",
    "sla", "stakeholder", "throughput", "uptime",
];

#[derive(Debug, Clone, Serialize)]
pub struct BulletSignals {
    pub quantified: bool,
    pub leading_action_verb: bool,
    pub vague_terms: Vec<&'static str>,
    pub first_person: bool,
    pub word_count: usize,
    pub decorative: bool,
}

/// Quantified means a digit, a percentage, a currency amount, a `~N` estimate or an
/// `Nx` multiplier. Vague wording only counts against bullets that are not quantified.
pub fn assess_bullet(text: &str) -> BulletSignals {
    let text_lower = text.to_lowercase();

    let has_digit = text.chars().any(|c| c.is_ascii_digit());
    let has_percent = text.contains('%');
    let has_currency = text.contains('$') || text.contains('€') || text.contains('£');
    let quantified = has_digit || has_percent || has_currency;

    let tokens = tokenize(&text_lower);
    let leading_action_verb = tokens
        .first()
        .is_some_and(|first| ACTION_VERBS.contains(&first.as_str()));

    let vague_terms = if quantified {
        vec![]
    } else {
        VAGUE_VERBS
            .iter()
            .chain(VAGUE_SCALE_WORDS)
            .filter(|w| contains_term(&text_lower, w))
            .copied()
            .collect()
    };

    let first_person = tokens.iter().any(|t| FIRST_PERSON.contains(&t.as_str()));
    let decorative = text
        .chars()
        .any(|c| matches!(c, '★' | '●' | '■' | '◆' | '✓' | '✔' | '→' | '|'));

    BulletSignals {
        quantified,
        leading_action_verb,
        vague_terms,
        first_person,
        word_count: text.split_whitespace().count(),
        decorative,
    }
}

/// Lowercase word tokens. `+`, `#`, `/` and `&` stay inside words so `c++`, `c#`,
/// `ci/cd` and `p&l` survive.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || matches!(c, '+' | '#' | '/' | '&')))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whole-word (or whole-phrase) containment, case-insensitive.
pub fn contains_term(text: &str, term: &str) -> bool {
    let needle = tokenize(term).join(" ");
    if needle.is_empty() {
        return false;
    }
    format!(" {} ", tokenize(text).join(" ")).contains(&format!(" {needle} "))
}

/// Distinct vocabulary terms present in `text`.
pub fn matched_terms<'a>(text: &str, vocabulary: &[&'a str]) -> Vec<&'a str> {
    let haystack = format!(" {} ", tokenize(text).join(" "));
    vocabulary
        .iter()
        .filter(|term| haystack.contains(&format!(" {} ", tokenize(term).join(" "))))
        .copied()
        .collect()
}
