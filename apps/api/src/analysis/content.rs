//! Structured résumé content as submitted by callers.
//!
//! Every field defaults when absent, so `{}` is valid (and scores low). Anything that
//! is not a JSON object of this shape is malformed and rejected outright.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::analysis::fingerprint::normalize_text;

const MIN_ONGOING_MONTHS: i32 = 12;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Malformed résumé content: {0}")]
    Malformed(String),

    #[error("Invalid skill entry: {0}")]
    InvalidSkill(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactInfo {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub linkedin: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceItem {
    pub title: String,
    pub company: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EducationItem {
    pub degree: String,
    pub institution: String,
    pub field: Option<String>,
    pub graduation_year: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeSkill {
    pub name: String,
    pub level: Option<u8>,
    pub years: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectItem {
    pub name: String,
    pub description: String,
    pub technologies: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeContent {
    pub contact: ContactInfo,
    pub summary: Option<String>,
    pub experience: Vec<ExperienceItem>,
    pub education: Vec<EducationItem>,
    pub skills: Vec<ResumeSkill>,
    pub certifications: Vec<String>,
    pub projects: Vec<ProjectItem>,
    /// Upload bookkeeping. Never affects analysis output or the content fingerprint.
    pub metadata: Option<Value>,
}

impl ResumeContent {
    pub fn from_value(value: Value) -> Result<Self, ContentError> {
        if !value.is_object() {
            return Err(ContentError::Malformed(
                "résumé content must be a JSON object".to_string(),
            ));
        }
        serde_json::from_value(value).map_err(|e| ContentError::Malformed(e.to_string()))
    }

    /// The content as the fingerprint sees it: every string passed through
    /// `normalize_text` and bookkeeping metadata dropped. Anything computed from
    /// this form is a function of the content hash alone.
    pub fn normalized(&self) -> Self {
        let text = |s: &String| normalize_text(s);
        let opt = |s: &Option<String>| s.as_deref().map(normalize_text);
        let list = |items: &Vec<String>| -> Vec<String> {
            items.iter().map(|s| normalize_text(s)).collect()
        };

        Self {
            contact: ContactInfo {
                name: opt(&self.contact.name),
                email: opt(&self.contact.email),
                phone: opt(&self.contact.phone),
                location: opt(&self.contact.location),
                linkedin: opt(&self.contact.linkedin),
                website: opt(&self.contact.website),
            },
            summary: opt(&self.summary),
            experience: self
                .experience
                .iter()
                .map(|e| ExperienceItem {
                    title: text(&e.title),
                    company: text(&e.company),
                    start_date: opt(&e.start_date),
                    end_date: opt(&e.end_date),
                    bullets: list(&e.bullets),
                })
                .collect(),
            education: self
                .education
                .iter()
                .map(|ed| EducationItem {
                    degree: text(&ed.degree),
                    institution: text(&ed.institution),
                    field: opt(&ed.field),
                    graduation_year: opt(&ed.graduation_year),
                })
                .collect(),
            skills: self
                .skills
                .iter()
                .map(|sk| ResumeSkill {
                    name: text(&sk.name),
                    level: sk.level,
                    years: sk.years,
                })
                .collect(),
            certifications: list(&self.certifications),
            projects: self
                .projects
                .iter()
                .map(|p| ProjectItem {
                    name: text(&p.name),
                    description: text(&p.description),
                    technologies: list(&p.technologies),
                })
                .collect(),
            metadata: None,
        }
    }

    pub fn all_bullets(&self) -> impl Iterator<Item = &str> {
        self.experience
            .iter()
            .flat_map(|e| e.bullets.iter().map(String::as_str))
    }

    /// Free text that can evidence skills: bullets, project descriptions, summary.
    pub fn evidence_text(&self) -> String {
        let mut parts: Vec<&str> = self.all_bullets().collect();
        parts.extend(self.experience.iter().map(|e| e.title.as_str()));
        for p in &self.projects {
            parts.push(&p.description);
            parts.extend(p.technologies.iter().map(String::as_str));
        }
        if let Some(summary) = &self.summary {
            parts.push(summary);
        }
        parts.join("\n")
    }

    /// Everything a reader would see, for length and vocabulary checks.
    pub fn full_text(&self) -> String {
        let mut text = self.evidence_text();
        for e in &self.experience {
            text.push('\n');
            text.push_str(&e.company);
        }
        for ed in &self.education {
            text.push('\n');
            text.push_str(&ed.degree);
            text.push(' ');
            text.push_str(&ed.institution);
            if let Some(field) = &ed.field {
                text.push(' ');
                text.push_str(field);
            }
        }
        for s in &self.skills {
            text.push('\n');
            text.push_str(&s.name);
        }
        for c in &self.certifications {
            text.push('\n');
            text.push_str(c);
        }
        text
    }

    /// Latest explicit month anywhere in the document. Ongoing roles end here (but
    /// never earlier than `MIN_ONGOING_MONTHS` after they start), which keeps
    /// scoring independent of the wall clock.
    pub fn reference_month(&self) -> Option<i32> {
        let experience = self.experience.iter().flat_map(|e| {
            [e.start_date.as_deref(), e.end_date.as_deref()]
                .into_iter()
                .flatten()
                .filter_map(|d| match parse_date(d) {
                    DateField::Month(m) => Some(m),
                    _ => None,
                })
        });
        let education = self
            .education
            .iter()
            .filter_map(|e| e.graduation_year.as_deref())
            .filter_map(|d| match parse_date(d) {
                DateField::Month(m) => Some(m),
                _ => None,
            });
        experience.chain(education).max()
    }

    /// Resolved (start, end) month indices per experience entry; `None` when the
    /// start date is missing or unparseable.
    pub fn role_spans(&self) -> Vec<Option<(i32, i32)>> {
        let reference = self.reference_month();
        self.experience
            .iter()
            .map(|e| {
                let start = match e.start_date.as_deref().map(parse_date) {
                    Some(DateField::Month(m)) => m,
                    _ => return None,
                };
                let end = match e.end_date.as_deref().map(parse_date) {
                    Some(DateField::Month(m)) => m,
                    Some(DateField::Ongoing) | None => {
                        reference.unwrap_or(start).max(start + MIN_ONGOING_MONTHS)
                    }
                    Some(DateField::Invalid) => return None,
                };
                Some((start, end.max(start)))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    /// Months since year 0: `year * 12 + (month - 1)`.
    Month(i32),
    Ongoing,
    Invalid,
}

/// Accepts `YYYY`, `YYYY-MM`, `YYYY-MM-DD`, `MM/YYYY` and present/current/now.
pub fn parse_date(raw: &str) -> DateField {
    let s = raw.trim().to_lowercase();
    if matches!(s.as_str(), "present" | "current" | "now" | "ongoing") {
        return DateField::Ongoing;
    }

    let (year, month) = if let Some((m, y)) = s.split_once('/') {
        (y.parse::<i32>().ok(), m.parse::<u32>().ok())
    } else {
        let mut parts = s.split('-');
        let year = parts.next().and_then(|y| y.parse::<i32>().ok());
        let month = match parts.next() {
            Some(m) => m.parse::<u32>().ok(),
            None => Some(1),
        };
        (year, month)
    };

    match (year, month) {
        (Some(y), Some(m)) if (1900..=2200).contains(&y) && (1..=12).contains(&m) => {
            DateField::Month(y * 12 + m as i32 - 1)
        }
        _ => DateField::Invalid,
    }
}
