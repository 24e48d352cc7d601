//! Résumé analysis: content schema, scoring and the content-hash result cache.

pub mod cache;
pub mod content;
pub mod fingerprint;
pub mod handlers;
pub mod scorer;
pub mod signals;

use crate::analysis::cache::{CachedAnalysis, ContentHashAnalysisCache};
use crate::analysis::content::{ContentError, ResumeContent};
use crate::analysis::fingerprint::canonical_content;
use crate::analysis::scorer::{MultiFactorScorer, ResumeScore};

pub const RESUME_SCORE_KIND: &str = "resume_score";

/// Scores `content` through the analysis cache. Only fields that feed the scorer
/// are fingerprinted, so re-uploads with new bookkeeping metadata are cache hits.
pub async fn score_resume(
    cache: &ContentHashAnalysisCache,
    scorer: &MultiFactorScorer,
    subject_id: &str,
    content: &ResumeContent,
) -> Result<CachedAnalysis<ResumeScore>, ContentError> {
    let canonical = serde_json::to_value(content)
        .map(|v| canonical_content(&v))
        .map_err(|e| ContentError::Malformed(e.to_string()))?;

    cache
        .get_or_compute_versioned(
            subject_id,
            RESUME_SCORE_KIND,
            scorer.schema_version(),
            &canonical,
            || async { Ok(scorer.score(content)) },
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::cache::MemoryAnalysisStore;
    use crate::analysis::scorer::ScoringConfig;
    use crate::clock::SystemClock;
    use serde_json::json;
    use std::sync::Arc;

    fn fixtures() -> (ContentHashAnalysisCache, MultiFactorScorer) {
        let cache = ContentHashAnalysisCache::new(
            Arc::new(MemoryAnalysisStore::new()),
            Arc::new(SystemClock),
            5,
        );
        let scorer = MultiFactorScorer::new(ScoringConfig::default()).unwrap();
        (cache, scorer)
    }

    #[tokio::test]
    async fn test_reupload_with_new_metadata_is_a_hit() {
        let (cache, scorer) = fixtures();
        let first = ResumeContent::from_value(json!({
            "summary": "Data engineer",
            "skills": [{"name": "SQL"}],
            "metadata": {"uploaded_at": "2024-01-01"}
        }))
        .unwrap();
        let mut second = first.clone();
        second.metadata = Some(json!({"uploaded_at": "2024-09-09"}));

        let a = score_resume(&cache, &scorer, "s1", &first).await.unwrap();
        let b = score_resume(&cache, &scorer, "s1", &second).await.unwrap();
        assert!(!a.cache_hit);
        assert!(b.cache_hit);
        assert_eq!(a.result, b.result);
    }

    #[tokio::test]
    async fn test_edit_forces_rescore() {
        let (cache, scorer) = fixtures();
        let first = ResumeContent::from_value(json!({"summary": "Data engineer"})).unwrap();
        let mut edited = first.clone();
        edited.skills.push(content::ResumeSkill {
            name: "Spark".to_string(),
            level: None,
            years: None,
        });

        score_resume(&cache, &scorer, "s1", &first).await.unwrap();
        let b = score_resume(&cache, &scorer, "s1", &edited).await.unwrap();
        assert!(!b.cache_hit);
    }

    #[tokio::test]
    async fn test_whitespace_only_variants_share_hash_and_score() {
        let (cache, scorer) = fixtures();
        let resume = |bullet: &str, title: &str| {
            ResumeContent::from_value(json!({
                "summary": "Backend engineer",
                "experience": [{
                    "title": title,
                    "company": "Acme",
                    "start_date": "01/2020",
                    "end_date": "Present",
                    "bullets": [bullet, "Led migration to Postgres"]
                }],
                "skills": [{"name": "Rust"}]
            }))
            .unwrap()
        };
        let spaced = resume("Built APIs serving 2M users", "Senior Engineer");
        let tabbed = resume("Built\tAPIs   serving\t\t2M users", "Senior\tEngineer");

        let first = score_resume(&cache, &scorer, "s1", &spaced).await.unwrap();
        let second = score_resume(&cache, &scorer, "s1", &tabbed).await.unwrap();

        assert!(second.cache_hit);
        assert_eq!(first.content_hash, second.content_hash);
        assert_eq!(second.result, scorer.score(&tabbed));
        assert_eq!(scorer.score(&spaced), scorer.score(&tabbed));
    }

    #[tokio::test]
    async fn test_changed_weights_do_not_reuse_scores() {
        let (cache, scorer) = fixtures();
        let content = ResumeContent::from_value(json!({"summary": "Data engineer"})).unwrap();
        score_resume(&cache, &scorer, "s1", &content).await.unwrap();

        let mut config = ScoringConfig::default();
        config.weights.content_quality += 0.05;
        config.weights.industry_relevance -= 0.05;
        let retuned = MultiFactorScorer::new(config).unwrap();
        assert_ne!(scorer.schema_version(), retuned.schema_version());

        let out = score_resume(&cache, &retuned, "s1", &content).await.unwrap();
        assert!(!out.cache_hit);
        assert_eq!(out.result, retuned.score(&content));
    }

    #[tokio::test]
    async fn test_subjects_do_not_share_entries() {
        let (cache, scorer) = fixtures();
        let content = ResumeContent::from_value(json!({"summary": "Data engineer"})).unwrap();

        score_resume(&cache, &scorer, "s1", &content).await.unwrap();
        let other = score_resume(&cache, &scorer, "s2", &content).await.unwrap();
        assert!(!other.cache_hit);
    }
}
