use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Schema version written into every cached occupation record.
/// Records carrying any other version are treated as cache misses.
pub const CACHE_VERSION: &str = "onet-v2";

/// A single skill requirement, already normalized to 0–100 at the client boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    pub code: String,
    pub importance: u8,
    pub level: u8,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeArea {
    pub name: String,
    pub level: u8,
    pub importance: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    pub name: String,
    pub level: u8,
    pub importance: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaborMarket {
    pub median_annual_wage: Option<f64>,
    pub projected_growth_pct: Option<f64>,
    #[serde(default)]
    pub bright_outlook: bool,
    #[serde(default)]
    pub in_demand_skills: Vec<String>,
}

impl LaborMarket {
    /// True when the record carries no usable market signal at all.
    pub fn is_empty(&self) -> bool {
        self.median_annual_wage.is_none()
            && self.projected_growth_pct.is_none()
            && !self.bright_outlook
            && self.in_demand_skills.is_empty()
    }
}

/// Cached occupation document, keyed by O*NET code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupationRecord {
    pub code: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub knowledge: Vec<KnowledgeArea>,
    #[serde(default)]
    pub abilities: Vec<Ability>,
    #[serde(default)]
    pub labor_market: Option<LaborMarket>,
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl OccupationRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Re-stamps the record as freshly written at `now` with the given TTL.
    pub fn stamped(mut self, now: DateTime<Utc>, ttl: Duration) -> Self {
        self.version = CACHE_VERSION.to_string();
        self.created_at = now;
        self.expires_at = now + ttl;
        self
    }
}

/// Lightweight search hit. Search results are never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupationSummary {
    pub code: String,
    pub title: String,
    #[serde(default)]
    pub relevance_score: Option<u32>,
}

impl From<&OccupationRecord> for OccupationSummary {
    fn from(record: &OccupationRecord) -> Self {
        Self {
            code: record.code.clone(),
            title: record.title.clone(),
            relevance_score: None,
        }
    }
}

/// Where a resolved occupation came from. `Fallback` marks degraded data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupationSource {
    Cache,
    Remote,
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedOccupation {
    pub record: OccupationRecord,
    pub source: OccupationSource,
}

impl ResolvedOccupation {
    pub fn is_degraded(&self) -> bool {
        self.source == OccupationSource::Fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> OccupationRecord {
        let now = Utc::now();
        OccupationRecord {
            code: "15-1252.00".to_string(),
            title: "Software Developers".to_string(),
            description: None,
            skills: vec![],
            knowledge: vec![],
            abilities: vec![],
            labor_market: None,
            version: "old".to_string(),
            created_at: now,
            expires_at: now,
        }
    }

    #[test]
    fn test_stamped_sets_ttl_and_version() {
        let now = Utc::now();
        let r = record().stamped(now, Duration::days(30));
        assert_eq!(r.version, CACHE_VERSION);
        assert_eq!(r.expires_at, now + Duration::days(30));
        assert!(!r.is_expired_at(now));
        assert!(r.is_expired_at(now + Duration::days(30)));
    }

    #[test]
    fn test_source_serializes_snake_case() {
        let json = serde_json::to_string(&OccupationSource::Fallback).unwrap();
        assert_eq!(json, "\"fallback\"");
    }

    #[test]
    fn test_empty_labor_market() {
        assert!(LaborMarket::default().is_empty());
        let lm = LaborMarket {
            bright_outlook: true,
            ..Default::default()
        };
        assert!(!lm.is_empty());
    }
}
