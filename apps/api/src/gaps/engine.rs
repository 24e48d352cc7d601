//! Skill-gap engine: classification, priority, time estimates and phasing.
//!
//! Pure and synchronous: the same current skills, occupation and hints always
//! produce the same analysis.

use std::collections::HashMap;

use crate::gaps::config::{GapConfigError, GapEngineConfig, PhaseGate};
use crate::gaps::matching::{canonical_skill, SkillIndex};
use crate::gaps::models::{
    ComplexityTier, Criticality, CurrentSkill, GapAnalysis, Requirement, SkillGap, TimeEstimate,
    TransferableSkill,
};
use crate::gaps::roadmap::build_roadmap;
use crate::occupations::models::{LaborMarket, OccupationRecord};

/// Complexity hints (0.0–1.0) keyed by canonical requirement name.
pub type ComplexityHints = HashMap<String, f64>;

pub struct SkillGapEngine {
    config: GapEngineConfig,
}

impl SkillGapEngine {
    pub fn new(config: GapEngineConfig) -> Result<Self, GapConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &GapEngineConfig {
        &self.config
    }

    pub fn analyze(
        &self,
        current: &[CurrentSkill],
        occupation: &OccupationRecord,
        hints: &ComplexityHints,
    ) -> GapAnalysis {
        let index = SkillIndex::new(current);
        let mut gaps = Vec::new();
        let mut transferable = Vec::new();

        for req in dedupe_requirements(Requirement::all_from(occupation)) {
            let current_level = index.level_of(&req.name);
            let gap = req.target_level.saturating_sub(current_level);

            if gap == 0 {
                if current_level > 0 {
                    transferable.push(TransferableSkill {
                        skill: req.name,
                        kind: req.kind,
                        current_level,
                        target_level: req.target_level,
                    });
                }
                continue;
            }

            let criticality = self.classify(req.importance);
            let market_demand = self.market_demand(occupation.labor_market.as_ref(), &req.name);
            let priority_score = self.priority_score(req.importance, gap, market_demand);
            let complexity = self.complexity_tier(
                req.target_level,
                hints.get(&canonical_skill(&req.name)).copied(),
            );
            let time_estimate = self.estimate_time(gap, complexity);
            let phase = self.assign_phase(priority_score, time_estimate.hours);
            let quick_win = self.is_quick_win(criticality, priority_score, time_estimate.hours);

            gaps.push(SkillGap {
                transferable_from: index.family_members(&req.name),
                skill: req.name,
                kind: req.kind,
                importance: req.importance,
                current_level,
                target_level: req.target_level,
                gap,
                criticality,
                priority_score,
                complexity,
                time_estimate,
                market_demand,
                quick_win,
                phase,
            });
        }

        gaps.sort_by(|a, b| {
            b.priority_score
                .cmp(&a.priority_score)
                .then(b.importance.cmp(&a.importance))
                .then_with(|| a.skill.cmp(&b.skill))
        });
        transferable.sort_by(|a, b| a.skill.cmp(&b.skill));

        let phases = build_roadmap(&gaps, self.config.hours_per_week);
        let total_hours = gaps.iter().map(|g| g.time_estimate.hours).sum();

        GapAnalysis {
            occupation_code: occupation.code.clone(),
            occupation_title: occupation.title.clone(),
            gaps,
            transferable_skills: transferable,
            phases,
            total_hours,
        }
    }

    pub fn classify(&self, importance: u8) -> Criticality {
        if importance >= self.config.critical_importance {
            Criticality::Critical
        } else if importance >= self.config.important_importance {
            Criticality::Important
        } else {
            Criticality::NiceToHave
        }
    }

    /// Weighted mean of importance, gap and (when known) market demand, 0–100.
    pub fn priority_score(&self, importance: u8, gap: u8, market_demand: Option<u8>) -> u8 {
        let w = &self.config.priority_weights;
        let mut total = w.importance * importance as f64 + w.gap * gap as f64;
        let mut weight = w.importance + w.gap;
        if let Some(demand) = market_demand {
            total += w.market_demand * demand as f64;
            weight += w.market_demand;
        }
        if weight <= 0.0 {
            return 0;
        }
        (total / weight).round().clamp(0.0, 100.0) as u8
    }

    pub fn complexity_tier(&self, target_level: u8, hint: Option<f64>) -> ComplexityTier {
        let (basic_below, intermediate_below) = self.config.hint_cutoffs;
        match hint {
            Some(h) if h < basic_below => ComplexityTier::Basic,
            Some(h) if h < intermediate_below => ComplexityTier::Intermediate,
            Some(_) => ComplexityTier::Advanced,
            None if target_level >= self.config.advanced_level => ComplexityTier::Advanced,
            None if target_level >= self.config.intermediate_level => ComplexityTier::Intermediate,
            None => ComplexityTier::Basic,
        }
    }

    pub fn estimate_time(&self, gap: u8, tier: ComplexityTier) -> TimeEstimate {
        let hours = gap as f64 * self.config.tier_hours.for_tier(tier);
        let spread = self.config.estimate_spread.clamp(0.0, 1.0);
        let min_hours = (hours * (1.0 - spread)).round() as u32;
        let max_hours = (hours * (1.0 + spread)).round() as u32;
        let per_week = self.config.hours_per_week;
        let min_weeks = ((min_hours as f64 / per_week).ceil() as u32).max(1);
        let max_weeks = ((max_hours as f64 / per_week).ceil() as u32).max(min_weeks);

        let label = if max_hours <= 40 {
            format!("{min_hours}-{max_hours} hours")
        } else {
            format!("{min_weeks}-{max_weeks} weeks")
        };

        TimeEstimate {
            hours: hours.round() as u32,
            min_hours,
            max_hours,
            min_weeks,
            max_weeks,
            label,
        }
    }

    pub fn assign_phase(&self, priority: u8, hours: u32) -> u8 {
        if passes(&self.config.phase_one, priority, hours) {
            1
        } else if passes(&self.config.phase_two, priority, hours) {
            2
        } else {
            3
        }
    }

    pub fn is_quick_win(&self, criticality: Criticality, priority: u8, hours: u32) -> bool {
        let gate = &self.config.quick_win;
        let low = &self.config.nice_to_have_quick_win;
        (priority >= gate.min_priority && hours <= gate.max_hours)
            || (criticality == Criticality::NiceToHave
                && priority >= low.min_priority
                && hours <= low.max_hours)
    }

    /// `None` when the occupation carries no labor-market data.
    pub fn market_demand(&self, labor: Option<&LaborMarket>, skill: &str) -> Option<u8> {
        let labor = labor.filter(|l| !l.is_empty())?;
        let m = &self.config.market;

        let mut demand = m.base + m.growth_multiplier * labor.projected_growth_pct.unwrap_or(0.0);
        if labor.bright_outlook {
            demand += m.bright_outlook_bonus;
        }
        let wanted = canonical_skill(skill);
        if labor
            .in_demand_skills
            .iter()
            .any(|s| canonical_skill(s) == wanted)
        {
            demand += m.in_demand_bonus;
        }
        Some(demand.round().clamp(0.0, 100.0) as u8)
    }
}

fn passes(gate: &PhaseGate, priority: u8, hours: u32) -> bool {
    priority >= gate.min_priority || hours <= gate.max_hours
}

/// One requirement per canonical name: the most important, then the most demanding.
fn dedupe_requirements(requirements: Vec<Requirement>) -> Vec<Requirement> {
    let mut order: Vec<String> = Vec::new();
    let mut best: HashMap<String, Requirement> = HashMap::new();
    for req in requirements {
        let key = canonical_skill(&req.name);
        match best.get(&key) {
            Some(existing)
                if (existing.importance, existing.target_level)
                    >= (req.importance, req.target_level) => {}
            Some(_) => {
                best.insert(key, req);
            }
            None => {
                order.push(key.clone());
                best.insert(key, req);
            }
        }
    }
    order.into_iter().filter_map(|k| best.remove(&k)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::occupations::models::{Ability, KnowledgeArea, Skill};
    use chrono::Utc;

    fn engine() -> SkillGapEngine {
        SkillGapEngine::new(GapEngineConfig::default()).unwrap()
    }

    fn occupation(skills: Vec<Skill>) -> OccupationRecord {
        let now = Utc::now();
        OccupationRecord {
            code: "15-1252.00".to_string(),
            title: "Software Developers".to_string(),
            description: None,
            skills,
            knowledge: vec![],
            abilities: vec![],
            labor_market: None,
            version: String::new(),
            created_at: now,
            expires_at: now,
        }
    }

    fn req(name: &str, importance: u8, level: u8) -> Skill {
        Skill {
            name: name.to_string(),
            code: format!("2.B.{name}"),
            importance,
            level,
            category: "technical".to_string(),
        }
    }

    fn current(name: &str, level: u8) -> CurrentSkill {
        CurrentSkill {
            name: name.to_string(),
            level,
        }
    }

    #[test]
    fn test_python_gap_is_critical_and_phase_one() {
        let analysis = engine().analyze(
            &[current("Python", 30)],
            &occupation(vec![req("Python", 90, 80)]),
            &ComplexityHints::new(),
        );

        let gap = &analysis.gaps[0];
        assert_eq!(gap.criticality, Criticality::Critical);
        assert_eq!(gap.gap, 50);
        assert_eq!(gap.current_level, 30);
        assert!(gap.priority_score >= 70, "priority {}", gap.priority_score);
        assert_eq!(gap.phase, 1);
    }

    #[test]
    fn test_empty_occupation_produces_empty_analysis() {
        let analysis = engine().analyze(
            &[current("Python", 30)],
            &occupation(vec![]),
            &ComplexityHints::new(),
        );
        assert!(analysis.gaps.is_empty());
        assert!(analysis.phases.is_empty());
        assert_eq!(analysis.total_hours, 0);
    }

    #[test]
    fn test_met_requirement_is_transferable_not_gap() {
        let analysis = engine().analyze(
            &[current("SQL", 80)],
            &occupation(vec![req("SQL", 70, 60), req("Rust", 60, 50)]),
            &ComplexityHints::new(),
        );
        assert_eq!(analysis.transferable_skills.len(), 1);
        assert_eq!(analysis.transferable_skills[0].skill, "SQL");
        assert!(analysis.gaps.iter().all(|g| g.skill != "SQL"));
        assert_eq!(analysis.gaps.len(), 1);
    }

    #[test]
    fn test_zero_target_with_no_skill_is_skipped() {
        let analysis = engine().analyze(
            &[],
            &occupation(vec![req("Sewing", 10, 0)]),
            &ComplexityHints::new(),
        );
        assert!(analysis.gaps.is_empty());
        assert!(analysis.transferable_skills.is_empty());
    }

    #[test]
    fn test_criticality_and_priority_monotonic_in_importance() {
        let e = engine();
        for gap in [1_u8, 25, 50, 100] {
            let mut last_priority = 0;
            let mut last_tier = Criticality::NiceToHave;
            for importance in 0..=100_u8 {
                let p = e.priority_score(importance, gap, None);
                let c = e.classify(importance);
                assert!(p >= last_priority, "importance {importance} gap {gap}");
                assert!(c >= last_tier);
                last_priority = p;
                last_tier = c;
            }
        }
    }

    #[test]
    fn test_priority_monotonic_in_gap_and_bounded() {
        let e = engine();
        for demand in [None, Some(0), Some(100)] {
            let mut last = 0;
            for gap in 0..=100_u8 {
                let p = e.priority_score(60, gap, demand);
                assert!(p >= last);
                assert!(p <= 100);
                last = p;
            }
        }
        assert_eq!(e.priority_score(100, 100, Some(100)), 100);
        assert_eq!(e.priority_score(0, 0, None), 0);
    }

    #[test]
    fn test_phase_thresholds() {
        let e = engine();
        assert_eq!(e.assign_phase(70, 500), 1);
        assert_eq!(e.assign_phase(10, 40), 1);
        assert_eq!(e.assign_phase(50, 500), 2);
        assert_eq!(e.assign_phase(10, 120), 2);
        assert_eq!(e.assign_phase(49, 121), 3);
    }

    #[test]
    fn test_quick_win_rules() {
        let e = engine();
        assert!(e.is_quick_win(Criticality::Critical, 75, 30));
        assert!(!e.is_quick_win(Criticality::Critical, 75, 60));
        assert!(e.is_quick_win(Criticality::NiceToHave, 45, 15));
        assert!(!e.is_quick_win(Criticality::Important, 45, 15));
    }

    #[test]
    fn test_time_estimate_scales_with_tier_and_gap() {
        let e = engine();
        let basic = e.estimate_time(20, ComplexityTier::Basic);
        let advanced = e.estimate_time(20, ComplexityTier::Advanced);
        assert_eq!(basic.hours, 20);
        assert_eq!(advanced.hours, 60);
        assert_eq!((basic.min_hours, basic.max_hours), (15, 25));
        assert_eq!(basic.label, "15-25 hours");
        assert_eq!((advanced.min_weeks, advanced.max_weeks), (5, 8));
        assert!(e.estimate_time(40, ComplexityTier::Basic).hours > basic.hours);
    }

    #[test]
    fn test_hint_overrides_level_derived_tier() {
        let e = engine();
        assert_eq!(e.complexity_tier(80, None), ComplexityTier::Advanced);
        assert_eq!(e.complexity_tier(50, None), ComplexityTier::Intermediate);
        assert_eq!(e.complexity_tier(30, None), ComplexityTier::Basic);
        assert_eq!(e.complexity_tier(80, Some(0.2)), ComplexityTier::Basic);
        assert_eq!(e.complexity_tier(10, Some(0.9)), ComplexityTier::Advanced);
    }

    #[test]
    fn test_market_demand_from_labor_data() {
        let e = engine();
        let labor = LaborMarket {
            median_annual_wage: Some(120_000.0),
            projected_growth_pct: Some(10.0),
            bright_outlook: true,
            in_demand_skills: vec!["Python".to_string()],
        };
        assert_eq!(e.market_demand(Some(&labor), "python"), Some(100));
        assert_eq!(e.market_demand(Some(&labor), "Writing"), Some(95));
        assert_eq!(e.market_demand(None, "Python"), None);
        assert_eq!(e.market_demand(Some(&LaborMarket::default()), "Python"), None);
    }

    #[test]
    fn test_every_gap_in_exactly_one_phase() {
        let skills = (0..12_u8)
            .map(|i| req(&format!("Skill{i}"), i * 8, 20 + i * 6))
            .collect();
        let analysis = engine().analyze(&[], &occupation(skills), &ComplexityHints::new());

        let mut seen: Vec<&str> = analysis
            .phases
            .iter()
            .flat_map(|p| p.skills.iter().map(String::as_str))
            .collect();
        seen.sort_unstable();
        let mut expected: Vec<&str> = analysis.gaps.iter().map(|g| g.skill.as_str()).collect();
        expected.sort_unstable();
        assert_eq!(seen, expected);

        for gap in &analysis.gaps {
            let phase = analysis.phases.iter().find(|p| p.phase == gap.phase).unwrap();
            assert!(phase.skills.contains(&gap.skill));
        }
    }

    #[test]
    fn test_gaps_sorted_by_priority() {
        let analysis = engine().analyze(
            &[],
            &occupation(vec![req("Low", 20, 40), req("High", 95, 90), req("Mid", 60, 60)]),
            &ComplexityHints::new(),
        );
        let names: Vec<&str> = analysis.gaps.iter().map(|g| g.skill.as_str()).collect();
        assert_eq!(names, vec!["High", "Mid", "Low"]);
    }

    #[test]
    fn test_knowledge_and_abilities_are_requirements() {
        let mut record = occupation(vec![]);
        record.knowledge.push(KnowledgeArea {
            name: "Mathematics".to_string(),
            level: 60,
            importance: 70,
        });
        record.abilities.push(Ability {
            name: "Deductive Reasoning".to_string(),
            level: 55,
            importance: 75,
        });

        let analysis = engine().analyze(&[current("Math", 30)], &record, &ComplexityHints::new());
        assert_eq!(analysis.gaps.len(), 2);
        let maths = analysis.gaps.iter().find(|g| g.skill == "Mathematics").unwrap();
        assert_eq!(maths.current_level, 30);
        assert_eq!(maths.kind, crate::gaps::models::RequirementKind::Knowledge);
    }

    #[test]
    fn test_duplicate_requirements_collapse_to_most_important() {
        let mut record = occupation(vec![req("Mathematics", 50, 40)]);
        record.knowledge.push(KnowledgeArea {
            name: "Mathematics".to_string(),
            level: 70,
            importance: 85,
        });
        let analysis = engine().analyze(&[], &record, &ComplexityHints::new());
        assert_eq!(analysis.gaps.len(), 1);
        assert_eq!(analysis.gaps[0].importance, 85);
    }

    #[test]
    fn test_transferable_from_lists_family_skills() {
        let analysis = engine().analyze(
            &[current("Python", 70), current("Writing", 60)],
            &occupation(vec![req("Programming", 85, 75), req("Java", 60, 50)]),
            &ComplexityHints::new(),
        );
        let programming = analysis.gaps.iter().find(|g| g.skill == "Programming").unwrap();
        assert_eq!(programming.transferable_from, vec!["Python"]);
    }
}
