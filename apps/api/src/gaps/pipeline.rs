//! Skill-gap pipeline: résumé + target occupation → ranked gaps and a phased roadmap.
//!
//! Flow: parse résumé → resolve occupation (cache → O*NET → mock) → score résumé
//! through the content-hash cache → current skills → optional complexity hints →
//! gap engine → narrative. Only invalid input fails; every external failure
//! degrades instead.

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::analysis::cache::{CachedAnalysis, ContentHashAnalysisCache};
use crate::analysis::content::{ContentError, ResumeContent};
use crate::analysis::score_resume;
use crate::analysis::scorer::{MultiFactorScorer, ResumeScore};
use crate::gaps::engine::{ComplexityHints, SkillGapEngine};
use crate::gaps::matching::{canonical_skill, derive_current_skills, SkillIndex};
use crate::gaps::models::{CurrentSkill, GapAnalysis, Requirement, RequirementKind};
use crate::gaps::narrative::{narrate_or_fallback, RoadmapNarrative, RoadmapNarrator};
use crate::occupations::manager::OccupationCacheManager;
use crate::occupations::models::{OccupationRecord, OccupationSource};

#[derive(Debug, Deserialize)]
pub struct SkillGapRequest {
    pub subject_id: String,
    pub occupation_code: String,
    pub resume: Value,
    /// Explicit `[{name, level}]`; derived from the résumé when absent.
    #[serde(default)]
    pub current_skills: Option<Value>,
    #[serde(default)]
    pub resolve_complexity: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillSource {
    Explicit,
    Derived,
}

#[derive(Debug, Clone, Serialize)]
pub struct OccupationRef {
    pub code: String,
    pub title: String,
    pub source: OccupationSource,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkillGapReport {
    pub subject_id: String,
    pub occupation: OccupationRef,
    /// True when the occupation requirements came from static fallback data.
    pub degraded: bool,
    pub resume_score: CachedAnalysis<ResumeScore>,
    pub current_skills: Vec<CurrentSkill>,
    pub current_skills_source: SkillSource,
    pub analysis: GapAnalysis,
    pub narrative: RoadmapNarrative,
}

pub struct SkillGapPipeline {
    occupations: Arc<OccupationCacheManager>,
    analysis_cache: Arc<ContentHashAnalysisCache>,
    scorer: Arc<MultiFactorScorer>,
    engine: Arc<SkillGapEngine>,
    narrator: Arc<dyn RoadmapNarrator>,
}

impl SkillGapPipeline {
    pub fn new(
        occupations: Arc<OccupationCacheManager>,
        analysis_cache: Arc<ContentHashAnalysisCache>,
        scorer: Arc<MultiFactorScorer>,
        engine: Arc<SkillGapEngine>,
        narrator: Arc<dyn RoadmapNarrator>,
    ) -> Self {
        Self {
            occupations,
            analysis_cache,
            scorer,
            engine,
            narrator,
        }
    }

    pub async fn run(&self, request: SkillGapRequest) -> Result<SkillGapReport, ContentError> {
        let content = ResumeContent::from_value(request.resume)?;
        let (current_skills, current_skills_source) = match request.current_skills {
            Some(explicit) => (CurrentSkill::parse_list(explicit)?, SkillSource::Explicit),
            None => (derive_current_skills(&content), SkillSource::Derived),
        };

        let resolved = self.occupations.get_occupation(&request.occupation_code).await;
        let degraded = resolved.is_degraded();

        let resume_score = score_resume(
            &self.analysis_cache,
            &self.scorer,
            &request.subject_id,
            &content,
        )
        .await?;

        let hints = if request.resolve_complexity && !degraded {
            self.complexity_hints(&resolved.record, &current_skills).await
        } else {
            ComplexityHints::new()
        };

        let analysis = self
            .engine
            .analyze(&current_skills, &resolved.record, &hints);
        let narrative = narrate_or_fallback(self.narrator.as_ref(), &analysis).await;

        info!(
            subject_id = %request.subject_id,
            occupation = %resolved.record.code,
            gaps = analysis.gaps.len(),
            degraded,
            "Skill-gap analysis complete"
        );

        Ok(SkillGapReport {
            subject_id: request.subject_id,
            occupation: OccupationRef {
                code: resolved.record.code.clone(),
                title: resolved.record.title.clone(),
                source: resolved.source,
            },
            degraded,
            resume_score,
            current_skills,
            current_skills_source,
            analysis,
            narrative,
        })
    }

    /// Looks up complexity for unmet critical skill requirements. Failed lookups
    /// are simply absent from the map.
    async fn complexity_hints(
        &self,
        record: &OccupationRecord,
        current: &[CurrentSkill],
    ) -> ComplexityHints {
        let index = SkillIndex::new(current);
        let critical = self.engine.config().critical_importance;

        let targets: Vec<(String, String)> = Requirement::all_from(record)
            .into_iter()
            .filter(|r| r.kind == RequirementKind::Skill && r.importance >= critical)
            .filter(|r| index.level_of(&r.name) < r.target_level)
            .filter_map(|r| r.code.map(|code| (canonical_skill(&r.name), code)))
            .collect();

        let lookups = targets.iter().map(|(name, code)| async move {
            (name.clone(), self.occupations.skill_complexity(code).await)
        });

        let hints: ComplexityHints = join_all(lookups)
            .await
            .into_iter()
            .filter_map(|(name, hint)| hint.map(|h| (name, h)))
            .collect();
        debug!("Resolved {} of {} complexity hints", hints.len(), targets.len());
        hints
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::cache::MemoryAnalysisStore;
    use crate::analysis::scorer::ScoringConfig;
    use crate::clock::SystemClock;
    use crate::gaps::config::GapEngineConfig;
    use crate::gaps::models::{ComplexityTier, Criticality};
    use crate::gaps::narrative::TemplateNarrator;
    use crate::occupations::client::{OccupationProvider, OnetError};
    use crate::occupations::models::{OccupationSummary, Skill};
    use crate::occupations::store::MemoryOccupationStore;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubProvider {
        record: Option<OccupationRecord>,
        complexity: Option<f64>,
        complexity_calls: AtomicUsize,
    }

    #[async_trait]
    impl OccupationProvider for StubProvider {
        async fn fetch_occupation_by_code(&self, _code: &str) -> Result<OccupationRecord, OnetError> {
            self.record.clone().ok_or(OnetError::MissingCredentials)
        }

        async fn search_occupations(&self, _query: &str) -> Result<Vec<OccupationSummary>, OnetError> {
            Err(OnetError::MissingCredentials)
        }

        async fn fetch_skill_complexity(&self, _skill_code: &str) -> Result<f64, OnetError> {
            self.complexity_calls.fetch_add(1, Ordering::SeqCst);
            self.complexity.ok_or(OnetError::MissingCredentials)
        }
    }

    fn python_developer() -> OccupationRecord {
        let now = Utc::now();
        OccupationRecord {
            code: "15-1252.00".to_string(),
            title: "Software Developers".to_string(),
            description: None,
            skills: vec![
                Skill {
                    name: "Python".to_string(),
                    code: "2.B.3.py".to_string(),
                    importance: 90,
                    level: 80,
                    category: "technical".to_string(),
                },
                Skill {
                    name: "Writing".to_string(),
                    code: "2.A.1.c".to_string(),
                    importance: 55,
                    level: 50,
                    category: "interpersonal".to_string(),
                },
            ],
            knowledge: vec![],
            abilities: vec![],
            labor_market: None,
            version: String::new(),
            created_at: now,
            expires_at: now,
        }
    }

    fn pipeline(provider: Arc<StubProvider>) -> SkillGapPipeline {
        let clock = Arc::new(SystemClock);
        let store = Arc::new(MemoryOccupationStore::new(clock.clone(), Duration::days(30)));
        SkillGapPipeline::new(
            Arc::new(OccupationCacheManager::new(store, provider)),
            Arc::new(ContentHashAnalysisCache::new(
                Arc::new(MemoryAnalysisStore::new()),
                clock,
                5,
            )),
            Arc::new(MultiFactorScorer::new(ScoringConfig::default()).unwrap()),
            Arc::new(SkillGapEngine::new(GapEngineConfig::default()).unwrap()),
            Arc::new(TemplateNarrator),
        )
    }

    fn request(current_skills: Option<Value>, resolve_complexity: bool) -> SkillGapRequest {
        SkillGapRequest {
            subject_id: "subject-1".to_string(),
            occupation_code: "15-1252.00".to_string(),
            resume: json!({
                "summary": "Analyst moving into software",
                "skills": [{"name": "Python", "level": 30}]
            }),
            current_skills,
            resolve_complexity,
        }
    }

    fn provider(record: Option<OccupationRecord>, complexity: Option<f64>) -> Arc<StubProvider> {
        Arc::new(StubProvider {
            record,
            complexity,
            complexity_calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_python_scenario_end_to_end() {
        let p = pipeline(provider(Some(python_developer()), None));
        let report = p.run(request(None, false)).await.unwrap();

        assert!(!report.degraded);
        assert_eq!(report.occupation.source, OccupationSource::Remote);
        assert_eq!(report.current_skills_source, SkillSource::Derived);

        let python = report
            .analysis
            .gaps
            .iter()
            .find(|g| g.skill == "Python")
            .unwrap();
        assert_eq!(python.criticality, Criticality::Critical);
        assert_eq!(python.gap, 50);
        assert_eq!(python.current_level, 30);
        assert_eq!(python.phase, 1);
        assert_eq!(report.narrative.source, "template");
    }

    #[tokio::test]
    async fn test_remote_outage_degrades_to_mock_occupation() {
        let p = pipeline(provider(None, None));
        let report = p.run(request(None, false)).await.unwrap();

        assert!(report.degraded);
        assert_eq!(report.occupation.source, OccupationSource::Fallback);
        assert!(!report.analysis.gaps.is_empty());
    }

    #[tokio::test]
    async fn test_second_run_hits_resume_cache() {
        let p = pipeline(provider(Some(python_developer()), None));
        let first = p.run(request(None, false)).await.unwrap();
        let second = p.run(request(None, false)).await.unwrap();

        assert!(!first.resume_score.cache_hit);
        assert!(second.resume_score.cache_hit);
        assert_eq!(second.occupation.source, OccupationSource::Cache);
    }

    #[tokio::test]
    async fn test_explicit_skills_override_resume() {
        let p = pipeline(provider(Some(python_developer()), None));
        let report = p
            .run(request(Some(json!([{"name": "Python", "level": 85}])), false))
            .await
            .unwrap();

        assert_eq!(report.current_skills_source, SkillSource::Explicit);
        assert!(report.analysis.gaps.iter().all(|g| g.skill != "Python"));
        assert_eq!(report.analysis.transferable_skills[0].skill, "Python");
    }

    #[tokio::test]
    async fn test_invalid_inputs_are_hard_failures() {
        let p = pipeline(provider(Some(python_developer()), None));

        let bad_skills = p
            .run(request(Some(json!([{"name": "Python", "level": 400}])), false))
            .await;
        assert!(matches!(bad_skills, Err(ContentError::InvalidSkill(_))));

        let mut bad_resume = request(None, false);
        bad_resume.resume = json!(["not", "an", "object"]);
        assert!(matches!(
            p.run(bad_resume).await,
            Err(ContentError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_complexity_hints_only_for_unmet_critical_skills() {
        let stub = provider(Some(python_developer()), Some(0.2));
        let p = pipeline(stub.clone());
        let report = p.run(request(None, true)).await.unwrap();

        // Python is critical and unmet; Writing is only important.
        assert_eq!(stub.complexity_calls.load(Ordering::SeqCst), 1);
        let python = report
            .analysis
            .gaps
            .iter()
            .find(|g| g.skill == "Python")
            .unwrap();
        assert_eq!(python.complexity, ComplexityTier::Basic);
    }

    #[tokio::test]
    async fn test_failed_complexity_lookup_leaves_level_derived_tier() {
        let stub = provider(Some(python_developer()), None);
        let p = pipeline(stub.clone());
        let report = p.run(request(None, true)).await.unwrap();

        let python = report
            .analysis
            .gaps
            .iter()
            .find(|g| g.skill == "Python")
            .unwrap();
        assert_eq!(python.complexity, ComplexityTier::Advanced);
    }
}
