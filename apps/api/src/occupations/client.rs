//! O*NET client: the single point of entry for remote occupational data.
//!
//! Every call, regardless of endpoint, goes through one shared `RateLimiter`.
//! Calls are never retried here: each returns a typed failure immediately and the
//! cache manager decides how to fall back.
//!
//! Source scales are normalized at this boundary (importance 1–5, level 0–7 → 0–100),
//! so nothing downstream ever sees raw O*NET values.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::occupations::models::{
    Ability, KnowledgeArea, LaborMarket, OccupationRecord, OccupationSummary, Skill,
    CACHE_VERSION,
};
use crate::occupations::rate_limit::RateLimiter;

pub const DEFAULT_BASE_URL: &str = "https://services.onetcenter.org/ws";
const IMPORTANCE_SCALE_MAX: f64 = 5.0;
const LEVEL_SCALE_MAX: f64 = 7.0;

#[derive(Debug, Error)]
pub enum OnetError {
    #[error("O*NET credentials are not configured")]
    MissingCredentials,

    #[error("Invalid occupation or element code: {0}")]
    InvalidCode(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("O*NET API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed O*NET response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone)]
pub struct OnetClientConfig {
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub min_interval: Duration,
    pub timeout: Duration,
}

impl Default for OnetClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            username: None,
            password: None,
            min_interval: Duration::from_millis(200),
            timeout: Duration::from_secs(10),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wire schemas
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawOccupationDetails {
    code: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    skills: Vec<RawElement>,
    #[serde(default)]
    knowledge: Vec<RawElement>,
    #[serde(default)]
    abilities: Vec<RawElement>,
    #[serde(default)]
    outlook: Option<RawOutlook>,
}

#[derive(Debug, Deserialize)]
struct RawElement {
    id: String,
    name: String,
    #[serde(default)]
    category: Option<String>,
    importance: f64,
    level: f64,
}

#[derive(Debug, Deserialize)]
struct RawOutlook {
    #[serde(default)]
    median_wage_annual: Option<f64>,
    #[serde(default)]
    projected_growth: Option<f64>,
    #[serde(default)]
    bright_outlook: bool,
    #[serde(default)]
    hot_technologies: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawSearchResponse {
    #[serde(default)]
    occupation: Vec<RawSearchHit>,
}

#[derive(Debug, Deserialize)]
struct RawSearchHit {
    code: String,
    title: String,
    #[serde(default)]
    relevance_score: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawSkillComplexity {
    average_level: f64,
}

// ────────────────────────────────────────────────────────────────────────────
// Normalization
// ────────────────────────────────────────────────────────────────────────────

/// Maps the 1–5 importance scale onto 0–100.
pub fn normalize_importance(value: f64) -> u8 {
    ((value / IMPORTANCE_SCALE_MAX) * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Maps the 0–7 level scale onto 0–100.
pub fn normalize_level(value: f64) -> u8 {
    ((value / LEVEL_SCALE_MAX) * 100.0).round().clamp(0.0, 100.0) as u8
}

fn check_scales(element: &RawElement) -> Result<(), OnetError> {
    if !(1.0..=IMPORTANCE_SCALE_MAX).contains(&element.importance) {
        return Err(OnetError::Malformed(format!(
            "importance {} for '{}' outside 1–5",
            element.importance, element.name
        )));
    }
    if !(0.0..=LEVEL_SCALE_MAX).contains(&element.level) {
        return Err(OnetError::Malformed(format!(
            "level {} for '{}' outside 0–7",
            element.level, element.name
        )));
    }
    Ok(())
}

impl RawOccupationDetails {
    fn into_record(self) -> Result<OccupationRecord, OnetError> {
        for element in self.skills.iter().chain(&self.knowledge).chain(&self.abilities) {
            check_scales(element)?;
        }

        let skills = self
            .skills
            .into_iter()
            .map(|e| Skill {
                importance: normalize_importance(e.importance),
                level: normalize_level(e.level),
                category: e.category.unwrap_or_else(|| "general".to_string()),
                code: e.id,
                name: e.name,
            })
            .collect();
        let knowledge = self
            .knowledge
            .into_iter()
            .map(|e| KnowledgeArea {
                importance: normalize_importance(e.importance),
                level: normalize_level(e.level),
                name: e.name,
            })
            .collect();
        let abilities = self
            .abilities
            .into_iter()
            .map(|e| Ability {
                importance: normalize_importance(e.importance),
                level: normalize_level(e.level),
                name: e.name,
            })
            .collect();
        let labor_market = self.outlook.map(|o| LaborMarket {
            median_annual_wage: o.median_wage_annual,
            projected_growth_pct: o.projected_growth,
            bright_outlook: o.bright_outlook,
            in_demand_skills: o.hot_technologies,
        });

        // Timestamps are placeholders; the store re-stamps on write.
        let now = Utc::now();
        Ok(OccupationRecord {
            code: self.code,
            title: self.title,
            description: self.description,
            skills,
            knowledge,
            abilities,
            labor_market,
            version: CACHE_VERSION.to_string(),
            created_at: now,
            expires_at: now,
        })
    }
}

/// Accepts O*NET-SOC codes (`15-1252.00`) and dotted element ids (`2.B.3.e`).
fn is_safe_code(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= 32
        && !code.contains("..")
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

// ────────────────────────────────────────────────────────────────────────────
// Provider trait
// ────────────────────────────────────────────────────────────────────────────

/// Remote occupational-data source. `OnetClient` is the production backend;
/// the cache manager only ever sees this trait.
#[async_trait]
pub trait OccupationProvider: Send + Sync {
    async fn fetch_occupation_by_code(&self, code: &str) -> Result<OccupationRecord, OnetError>;

    async fn search_occupations(&self, query: &str) -> Result<Vec<OccupationSummary>, OnetError>;

    async fn fetch_skill_complexity(&self, skill_code: &str) -> Result<f64, OnetError>;
}

#[async_trait]
impl OccupationProvider for OnetClient {
    async fn fetch_occupation_by_code(&self, code: &str) -> Result<OccupationRecord, OnetError> {
        OnetClient::fetch_occupation_by_code(self, code).await
    }

    async fn search_occupations(&self, query: &str) -> Result<Vec<OccupationSummary>, OnetError> {
        OnetClient::search_occupations(self, query).await
    }

    async fn fetch_skill_complexity(&self, skill_code: &str) -> Result<f64, OnetError> {
        OnetClient::fetch_skill_complexity(self, skill_code).await
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// Rate-limited O*NET Web Services client. Clone freely: clones share the limiter.
#[derive(Clone)]
pub struct OnetClient {
    http: Client,
    config: OnetClientConfig,
    limiter: RateLimiter,
}

impl OnetClient {
    pub fn new(config: OnetClientConfig) -> Result<Self, OnetError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        let limiter = RateLimiter::new(config.min_interval);
        Ok(Self {
            http,
            config,
            limiter,
        })
    }

    pub async fn fetch_occupation_by_code(&self, code: &str) -> Result<OccupationRecord, OnetError> {
        if !is_safe_code(code) {
            return Err(OnetError::InvalidCode(code.to_string()));
        }
        let raw: RawOccupationDetails = self
            .get_json(&format!("online/occupations/{code}/details"), &[])
            .await?;
        raw.into_record()
    }

    pub async fn search_occupations(&self, query: &str) -> Result<Vec<OccupationSummary>, OnetError> {
        let raw: RawSearchResponse = self
            .get_json("online/search", &[("keyword", query), ("end", "20")])
            .await?;
        Ok(raw
            .occupation
            .into_iter()
            .map(|hit| OccupationSummary {
                code: hit.code,
                title: hit.title,
                relevance_score: hit.relevance_score,
            })
            .collect())
    }

    /// Complexity in 0.0–1.0, derived from the element's average level across occupations.
    pub async fn fetch_skill_complexity(&self, skill_code: &str) -> Result<f64, OnetError> {
        if !is_safe_code(skill_code) {
            return Err(OnetError::InvalidCode(skill_code.to_string()));
        }
        let raw: RawSkillComplexity = self
            .get_json(&format!("online/skills/{skill_code}/complexity"), &[])
            .await?;
        if !(0.0..=LEVEL_SCALE_MAX).contains(&raw.average_level) {
            return Err(OnetError::Malformed(format!(
                "average_level {} outside 0–7",
                raw.average_level
            )));
        }
        Ok(raw.average_level / LEVEL_SCALE_MAX)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, OnetError> {
        let (username, password) = match (&self.config.username, &self.config.password) {
            (Some(u), Some(p)) if !u.is_empty() => (u, p),
            _ => return Err(OnetError::MissingCredentials),
        };

        self.limiter.acquire().await;

        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);
        debug!("O*NET GET {url}");

        let response = self
            .http
            .get(&url)
            .basic_auth(username, Some(password))
            .header("accept", "application/json")
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(OnetError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| OnetError::Malformed(e.to_string()))
    }
}
