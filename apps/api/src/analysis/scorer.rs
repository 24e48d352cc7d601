//! Multi-factor résumé scorer.
//!
//! Eight weighted categories, each the sum of independently capped sub-scores.
//! A category's score is `raw / max_raw * 100`; the overall score is the weighted
//! sum of category scores. Everything here is a pure function of the content, so
//! identical content always scores identically.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::cache::ANALYSIS_SCHEMA_VERSION;
use crate::analysis::content::{parse_date, DateField, ResumeContent};
use crate::analysis::fingerprint::content_hash;
use crate::analysis::signals::{
    assess_bullet, contains_term, matched_terms, BulletSignals, INDUSTRY_TERMS, SOFT_SKILLS,
    TECH_TERMS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    ContentQuality,
    StructuralIntegrity,
    ProfessionalPresentation,
    SkillsAlignment,
    ExperienceDepth,
    CareerProgression,
    AtsOptimization,
    IndustryRelevance,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::ContentQuality,
        Category::StructuralIntegrity,
        Category::ProfessionalPresentation,
        Category::SkillsAlignment,
        Category::ExperienceDepth,
        Category::CareerProgression,
        Category::AtsOptimization,
        Category::IndustryRelevance,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::ContentQuality => "content_quality",
            Category::StructuralIntegrity => "structural_integrity",
            Category::ProfessionalPresentation => "professional_presentation",
            Category::SkillsAlignment => "skills_alignment",
            Category::ExperienceDepth => "experience_depth",
            Category::CareerProgression => "career_progression",
            Category::AtsOptimization => "ats_optimization",
            Category::IndustryRelevance => "industry_relevance",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryWeights {
    pub content_quality: f64,
    pub structural_integrity: f64,
    pub professional_presentation: f64,
    pub skills_alignment: f64,
    pub experience_depth: f64,
    pub career_progression: f64,
    pub ats_optimization: f64,
    pub industry_relevance: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            content_quality: 0.20,
            structural_integrity: 0.15,
            professional_presentation: 0.15,
            skills_alignment: 0.15,
            experience_depth: 0.15,
            career_progression: 0.10,
            ats_optimization: 0.05,
            industry_relevance: 0.05,
        }
    }
}

impl CategoryWeights {
    pub fn weight(&self, category: Category) -> f64 {
        match category {
            Category::ContentQuality => self.content_quality,
            Category::StructuralIntegrity => self.structural_integrity,
            Category::ProfessionalPresentation => self.professional_presentation,
            Category::SkillsAlignment => self.skills_alignment,
            Category::ExperienceDepth => self.experience_depth,
            Category::CareerProgression => self.career_progression,
            Category::AtsOptimization => self.ats_optimization,
            Category::IndustryRelevance => self.industry_relevance,
        }
    }
}

/// Point caps per sub-score. A category's maximum raw score is the sum of its caps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscoreCaps {
    pub achievement_quantification: f64,
    pub action_verbs: f64,
    pub bullet_detail: f64,
    pub specificity: f64,
    pub summary: f64,
    pub core_sections: f64,
    pub bullet_density: f64,
    pub length: f64,
    pub contact_completeness: f64,
    pub date_consistency: f64,
    pub voice: f64,
    pub skills_breadth: f64,
    pub skills_evidenced: f64,
    pub skill_diversity: f64,
    pub total_years: f64,
    pub role_count: f64,
    pub role_detail: f64,
    pub seniority_trend: f64,
    pub tenure_stability: f64,
    pub keyword_density: f64,
    pub plain_formatting: f64,
    pub parseable_dates: f64,
    pub domain_terms: f64,
    pub certifications: f64,
    pub current_role: f64,
}

impl Default for SubscoreCaps {
    fn default() -> Self {
        Self {
            achievement_quantification: 15.0,
            action_verbs: 12.0,
            bullet_detail: 10.0,
            specificity: 8.0,
            summary: 5.0,
            core_sections: 20.0,
            bullet_density: 10.0,
            length: 10.0,
            contact_completeness: 12.0,
            date_consistency: 8.0,
            voice: 10.0,
            skills_breadth: 10.0,
            skills_evidenced: 15.0,
            skill_diversity: 5.0,
            total_years: 15.0,
            role_count: 8.0,
            role_detail: 7.0,
            seniority_trend: 12.0,
            tenure_stability: 8.0,
            keyword_density: 8.0,
            plain_formatting: 6.0,
            parseable_dates: 6.0,
            domain_terms: 10.0,
            certifications: 6.0,
            current_role: 4.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub weights: CategoryWeights,
    pub caps: SubscoreCaps,
    /// Inclusive bullet count per role that earns full density credit.
    pub ideal_bullets_per_role: (usize, usize),
    /// Inclusive total word count that earns full length credit.
    pub ideal_word_range: (usize, usize),
    /// Years of experience that earn full depth credit.
    pub full_credit_years: f64,
    /// Distinct technical keywords that earn full keyword-density credit.
    pub keyword_target: usize,
    /// Distinct industry terms that earn full domain credit.
    pub domain_term_target: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: CategoryWeights::default(),
            caps: SubscoreCaps::default(),
            ideal_bullets_per_role: (3, 6),
            ideal_word_range: (300, 900),
            full_credit_years: 8.0,
            keyword_target: 10,
            domain_term_target: 6,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ScoringConfigError {
    #[error("Category weights must sum to 1.0 (got {0})")]
    WeightSum(f64),

    #[error("Weight for {0} must be non-negative")]
    NegativeWeight(&'static str),
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ScoringConfigError> {
        let mut total = 0.0;
        for category in Category::ALL {
            let w = self.weights.weight(category);
            if w < 0.0 {
                return Err(ScoringConfigError::NegativeWeight(category.as_str()));
            }
            total += w;
        }
        if (total - 1.0).abs() > 1e-6 {
            return Err(ScoringConfigError::WeightSum(total));
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Output
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubScore {
    pub score: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    /// Normalized 0–100.
    pub score: f64,
    pub raw_score: f64,
    pub max_score: f64,
    pub weight: f64,
    pub subscores: BTreeMap<String, SubScore>,
    pub insights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeScore {
    pub overall: f64,
    pub categories: BTreeMap<String, CategoryScore>,
}

// ────────────────────────────────────────────────────────────────────────────
// Scorer
// ────────────────────────────────────────────────────────────────────────────

const SENIORITY_LADDER: &[(&str, u8)] = &[
    ("intern", 0),
    ("junior", 1),
    ("associate", 1),
    ("senior", 3),
    ("lead", 4),
    ("staff", 4),
    ("principal", 4),
    ("manager", 4),
    ("director", 5),
    ("head", 5),
    ("vp", 6),
    ("vice president", 6),
    ("chief", 6),
];

pub struct MultiFactorScorer {
    config: ScoringConfig,
    schema_version: String,
}

impl MultiFactorScorer {
    pub fn new(config: ScoringConfig) -> Result<Self, ScoringConfigError> {
        config.validate()?;
        let settings = serde_json::to_string(&config).unwrap_or_default();
        let digest = content_hash(&settings);
        let schema_version = format!("{ANALYSIS_SCHEMA_VERSION}+{}", &digest[..12]);
        Ok(Self {
            config,
            schema_version,
        })
    }

    /// Cache schema version for scores from this scorer. Changes whenever any
    /// weight, cap or target in the config changes.
    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    /// Scores the normalized form of `content`, so two payloads with the same
    /// content hash always score identically.
    pub fn score(&self, content: &ResumeContent) -> ResumeScore {
        let normalized = content.normalized();
        let facts = Facts::gather(&normalized);

        let mut categories = BTreeMap::new();
        let mut overall = 0.0;
        for category in Category::ALL {
            let weight = self.config.weights.weight(category);
            let builder = match category {
                Category::ContentQuality => self.content_quality(&facts),
                Category::StructuralIntegrity => self.structural_integrity(&facts),
                Category::ProfessionalPresentation => self.professional_presentation(&facts),
                Category::SkillsAlignment => self.skills_alignment(&facts),
                Category::ExperienceDepth => self.experience_depth(&facts),
                Category::CareerProgression => self.career_progression(&facts),
                Category::AtsOptimization => self.ats_optimization(&facts),
                Category::IndustryRelevance => self.industry_relevance(&facts),
            };
            let scored = builder.finish(weight);
            overall += scored.score * weight;
            categories.insert(category.as_str().to_string(), scored);
        }

        ResumeScore {
            overall: round2(overall.clamp(0.0, 100.0)),
            categories,
        }
    }

    fn content_quality(&self, f: &Facts) -> CategoryBuilder {
        let caps = &self.config.caps;
        let n = f.bullets.len();
        let quantified = f.bullets.iter().filter(|b| b.quantified).count();
        let led = f.bullets.iter().filter(|b| b.leading_action_verb).count();
        let detailed = f
            .bullets
            .iter()
            .filter(|b| (8..=30).contains(&b.word_count))
            .count();
        let vague = f.bullets.iter().filter(|b| !b.vague_terms.is_empty()).count();

        let summary_words = f
            .content
            .summary
            .as_deref()
            .map(|s| s.split_whitespace().count())
            .unwrap_or(0);
        let summary = match summary_words {
            0 => 0.0,
            1..=14 => 0.4,
            15..=80 => 1.0,
            _ => 0.6,
        };

        let mut b = CategoryBuilder::default();
        b.add("achievement_quantification", share(quantified, n), caps.achievement_quantification);
        b.add("action_verbs", share(led, n), caps.action_verbs);
        b.add("bullet_detail", share(detailed, n), caps.bullet_detail);
        b.add("specificity", share(n - vague, n), caps.specificity);
        b.add("summary", summary, caps.summary);

        if n == 0 {
            b.insight("No experience bullets to evaluate");
        } else if share(quantified, n) < 0.5 {
            b.insight(format!("Only {quantified} of {n} bullets include a measurable outcome"));
        }
        if vague > 0 {
            b.insight(format!("{vague} bullets rely on vague wording without metrics"));
        }
        if summary_words == 0 {
            b.insight("Add a short professional summary");
        }
        b
    }

    fn structural_integrity(&self, f: &Facts) -> CategoryBuilder {
        let caps = &self.config.caps;
        let c = f.content;

        let sections = [
            ("contact", c.contact.name.is_some() || c.contact.email.is_some()),
            ("experience", !c.experience.is_empty()),
            ("education", !c.education.is_empty()),
            ("skills", !c.skills.is_empty()),
        ];
        let present = sections.iter().filter(|(_, ok)| *ok).count();
        let missing: Vec<&str> = sections
            .iter()
            .filter(|(_, ok)| !ok)
            .map(|(name, _)| *name)
            .collect();

        let (lo, hi) = self.config.ideal_bullets_per_role;
        let well_sized = c
            .experience
            .iter()
            .filter(|e| (lo..=hi).contains(&e.bullets.len()))
            .count();

        let (min_words, max_words) = self.config.ideal_word_range;
        let length = if f.word_count == 0 {
            0.0
        } else if (min_words..=max_words).contains(&f.word_count) {
            1.0
        } else if f.word_count >= min_words / 2 && f.word_count <= max_words * 4 / 3 {
            0.6
        } else {
            0.3
        };

        let mut b = CategoryBuilder::default();
        b.add("core_sections", share(present, sections.len()), caps.core_sections);
        b.add("bullet_density", share(well_sized, c.experience.len()), caps.bullet_density);
        b.add("length", length, caps.length);

        if !missing.is_empty() {
            b.insight(format!("Missing sections: {}", missing.join(", ")));
        }
        if length < 1.0 && f.word_count > 0 {
            b.insight(format!(
                "{} words; aim for {min_words}-{max_words}",
                f.word_count
            ));
        }
        b
    }

    fn professional_presentation(&self, f: &Facts) -> CategoryBuilder {
        let caps = &self.config.caps;
        let contact = &f.content.contact;
        let has = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());

        let mut points = 0.0;
        if has(&contact.email) {
            points += 4.0;
        }
        if has(&contact.phone) {
            points += 3.0;
        }
        if has(&contact.location) {
            points += 2.0;
        }
        if has(&contact.linkedin) || has(&contact.website) {
            points += 3.0;
        }

        let dated = f.spans.iter().filter(|s| s.is_some()).count();
        let n = f.bullets.len();
        let third_person = f.bullets.iter().filter(|b| !b.first_person).count();

        let mut b = CategoryBuilder::default();
        b.add("contact_completeness", points / 12.0, caps.contact_completeness);
        b.add("date_consistency", share(dated, f.spans.len()), caps.date_consistency);
        b.add("voice", share(third_person, n), caps.voice);

        if !has(&contact.email) {
            b.insight("Add an email address to the contact section");
        }
        if dated < f.spans.len() {
            b.insight(format!(
                "{} roles have missing or unreadable dates",
                f.spans.len() - dated
            ));
        }
        if third_person < n {
            b.insight("Drop first-person pronouns from bullets");
        }
        b
    }

    fn skills_alignment(&self, f: &Facts) -> CategoryBuilder {
        let caps = &self.config.caps;
        let skills = &f.content.skills;
        let k = skills.len();

        let breadth = match k {
            0 => 0.0,
            1..=4 => 0.4,
            5..=15 => 1.0,
            _ => 0.7,
        };
        let evidenced = skills
            .iter()
            .filter(|s| contains_term(&f.evidence_text, &s.name))
            .count();

        let skill_names = skills
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let mut diversity = 0.0;
        if !matched_terms(&skill_names, TECH_TERMS).is_empty() {
            diversity += 0.6;
        }
        if !matched_terms(&f.full_text, SOFT_SKILLS).is_empty() {
            diversity += 0.4;
        }

        let mut b = CategoryBuilder::default();
        b.add("skills_breadth", breadth, caps.skills_breadth);
        b.add("skills_evidenced", share(evidenced, k), caps.skills_evidenced);
        b.add("skill_diversity", diversity, caps.skill_diversity);

        if k == 0 {
            b.insight("List your core skills");
        } else if evidenced < k {
            b.insight(format!(
                "{} listed skills never appear in experience or projects",
                k - evidenced
            ));
        }
        b
    }

    fn experience_depth(&self, f: &Facts) -> CategoryBuilder {
        let caps = &self.config.caps;
        let roles = f.content.experience.len();
        let years = f.total_months as f64 / 12.0;

        let role_count = match roles {
            0 => 0.0,
            1 => 0.4,
            2 => 0.65,
            _ => 1.0,
        };
        let avg_bullets = if roles == 0 {
            0.0
        } else {
            f.bullets.len() as f64 / roles as f64
        };

        let mut b = CategoryBuilder::default();
        b.add("total_years", years / self.config.full_credit_years, caps.total_years);
        b.add("role_count", role_count, caps.role_count);
        b.add("role_detail", avg_bullets / 4.0, caps.role_detail);

        if roles > 0 {
            b.insight(format!("{years:.1} years of dated experience across {roles} roles"));
        }
        b
    }

    fn career_progression(&self, f: &Facts) -> CategoryBuilder {
        let caps = &self.config.caps;

        let mut dated: Vec<((i32, i32), u8)> = f
            .content
            .experience
            .iter()
            .zip(&f.spans)
            .filter_map(|(e, span)| span.map(|s| (s, seniority_rank(&e.title))))
            .collect();
        dated.sort_by_key(|(span, _)| *span);

        let trend = match dated.len() {
            0 => 0.0,
            1 => 0.5,
            n => {
                let steps_up = dated.windows(2).filter(|w| w[1].1 >= w[0].1).count();
                let climbed = dated[n - 1].1 > dated[0].1;
                share(steps_up, n - 1) * (2.0 / 3.0) + if climbed { 1.0 / 3.0 } else { 0.0 }
            }
        };

        let tenure = if dated.is_empty() {
            0.0
        } else {
            let months: i32 = dated.iter().map(|((s, e), _)| e - s).sum();
            match months / dated.len() as i32 {
                m if m >= 24 => 1.0,
                m if m >= 18 => 0.75,
                m if m >= 12 => 0.5,
                m if m > 0 => 0.25,
                _ => 0.0,
            }
        };

        let mut b = CategoryBuilder::default();
        b.add("seniority_trend", trend, caps.seniority_trend);
        b.add("tenure_stability", tenure, caps.tenure_stability);

        if dated.len() >= 2 && trend < 0.5 {
            b.insight("Role titles do not show upward progression");
        }
        b
    }

    fn ats_optimization(&self, f: &Facts) -> CategoryBuilder {
        let caps = &self.config.caps;
        let keywords = matched_terms(&f.full_text, TECH_TERMS).len();
        let n = f.bullets.len();
        let plain = f.bullets.iter().filter(|b| !b.decorative).count();

        let c = f.content;
        let date_fields: Vec<&str> = c
            .experience
            .iter()
            .flat_map(|e| [e.start_date.as_deref(), e.end_date.as_deref()])
            .chain(c.education.iter().map(|e| e.graduation_year.as_deref()))
            .flatten()
            .collect();
        let readable = date_fields
            .iter()
            .filter(|d| parse_date(d) != DateField::Invalid)
            .count();

        let mut b = CategoryBuilder::default();
        b.add(
            "keyword_density",
            share(keywords, self.config.keyword_target),
            caps.keyword_density,
        );
        b.add("plain_formatting", share(plain, n), caps.plain_formatting);
        b.add("parseable_dates", share(readable, date_fields.len()), caps.parseable_dates);

        if plain < n {
            b.insight("Decorative symbols or table characters may confuse applicant tracking systems");
        }
        b
    }

    fn industry_relevance(&self, f: &Facts) -> CategoryBuilder {
        let caps = &self.config.caps;
        let terms = matched_terms(&f.full_text, INDUSTRY_TERMS).len();
        let certifications = match f.content.certifications.len() {
            0 => 0.0,
            1 => 0.67,
            _ => 1.0,
        };
        let current = f.content.experience.iter().any(|e| {
            e.start_date.is_some()
                && e.end_date
                    .as_deref()
                    .map_or(true, |d| parse_date(d) == DateField::Ongoing)
        });

        let mut b = CategoryBuilder::default();
        b.add(
            "domain_terms",
            share(terms, self.config.domain_term_target),
            caps.domain_terms,
        );
        b.add("certifications", certifications, caps.certifications);
        b.add("current_role", if current { 1.0 } else { 0.0 }, caps.current_role);
        b
    }
}

/// Derived once per score call.
struct Facts<'a> {
    content: &'a ResumeContent,
    bullets: Vec<BulletSignals>,
    spans: Vec<Option<(i32, i32)>>,
    total_months: i32,
    evidence_text: String,
    full_text: String,
    word_count: usize,
}

impl<'a> Facts<'a> {
    fn gather(content: &'a ResumeContent) -> Self {
        let spans = content.role_spans();
        let full_text = content.full_text();
        Self {
            bullets: content.all_bullets().map(assess_bullet).collect(),
            total_months: merged_months(&spans),
            evidence_text: content.evidence_text(),
            word_count: full_text.split_whitespace().count(),
            full_text,
            spans,
            content,
        }
    }
}

#[derive(Default)]
struct CategoryBuilder {
    subscores: BTreeMap<String, SubScore>,
    insights: Vec<String>,
}

impl CategoryBuilder {
    fn add(&mut self, name: &str, fraction: f64, cap: f64) {
        let score = round2(fraction.clamp(0.0, 1.0) * cap);
        self.subscores
            .insert(name.to_string(), SubScore { score, max: cap });
    }

    fn insight(&mut self, text: impl Into<String>) {
        self.insights.push(text.into());
    }

    fn finish(self, weight: f64) -> CategoryScore {
        let raw: f64 = self.subscores.values().map(|s| s.score).sum();
        let max: f64 = self.subscores.values().map(|s| s.max).sum();
        let score = if max > 0.0 { raw / max * 100.0 } else { 0.0 };
        CategoryScore {
            score: round2(score),
            raw_score: round2(raw),
            max_score: max,
            weight,
            subscores: self.subscores,
            insights: self.insights,
        }
    }
}

fn share(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (count as f64 / total as f64).min(1.0)
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn seniority_rank(title: &str) -> u8 {
    SENIORITY_LADDER
        .iter()
        .filter(|(term, _)| contains_term(title, term))
        .map(|(_, rank)| *rank)
        .max()
        .unwrap_or(2)
}

/// Months covered by the union of role spans, so overlapping roles count once.
fn merged_months(spans: &[Option<(i32, i32)>]) -> i32 {
    let mut sorted: Vec<(i32, i32)> = spans.iter().flatten().copied().collect();
    sorted.sort_unstable();

    let mut total = 0;
    let mut current: Option<(i32, i32)> = None;
    for (start, end) in sorted {
        current = match current {
            Some((s, e)) if start <= e => Some((s, e.max(end))),
            Some((s, e)) => {
                total += e - s;
                Some((start, end))
            }
            None => Some((start, end)),
        };
    }
    if let Some((s, e)) = current {
        total += e - s;
    }
    total
}
