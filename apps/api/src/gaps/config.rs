use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gaps::models::ComplexityTier;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityWeights {
    pub importance: f64,
    pub gap: f64,
    pub market_demand: f64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            importance: 0.5,
            gap: 0.35,
            market_demand: 0.15,
        }
    }
}

/// Learning hours per level point of gap, by complexity tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierHours {
    pub basic: f64,
    pub intermediate: f64,
    pub advanced: f64,
}

impl Default for TierHours {
    fn default() -> Self {
        Self {
            basic: 1.0,
            intermediate: 2.0,
            advanced: 3.0,
        }
    }
}

impl TierHours {
    pub fn for_tier(&self, tier: ComplexityTier) -> f64 {
        match tier {
            ComplexityTier::Basic => self.basic,
            ComplexityTier::Intermediate => self.intermediate,
            ComplexityTier::Advanced => self.advanced,
        }
    }
}

/// A gap lands in the phase when `priority >= min_priority || hours <= max_hours`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseGate {
    pub min_priority: u8,
    pub max_hours: u32,
}

/// Market-demand signal derived from labor-market data, 0–100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketDemandConfig {
    pub base: f64,
    /// Points per percent of projected employment growth.
    pub growth_multiplier: f64,
    pub bright_outlook_bonus: f64,
    pub in_demand_bonus: f64,
}

impl Default for MarketDemandConfig {
    fn default() -> Self {
        Self {
            base: 50.0,
            growth_multiplier: 3.0,
            bright_outlook_bonus: 15.0,
            in_demand_bonus: 25.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapEngineConfig {
    pub critical_importance: u8,
    pub important_importance: u8,
    pub priority_weights: PriorityWeights,
    pub tier_hours: TierHours,
    /// Estimate range is `hours * (1 ± spread)`.
    pub estimate_spread: f64,
    pub hours_per_week: f64,
    /// Target level at or above which a requirement is advanced (without a hint).
    pub advanced_level: u8,
    pub intermediate_level: u8,
    /// Complexity hint cut-offs: below the first is basic, below the second intermediate.
    pub hint_cutoffs: (f64, f64),
    pub phase_one: PhaseGate,
    pub phase_two: PhaseGate,
    pub quick_win: PhaseGate,
    pub nice_to_have_quick_win: PhaseGate,
    pub market: MarketDemandConfig,
}

impl Default for GapEngineConfig {
    fn default() -> Self {
        Self {
            critical_importance: 80,
            important_importance: 50,
            priority_weights: PriorityWeights::default(),
            tier_hours: TierHours::default(),
            estimate_spread: 0.25,
            hours_per_week: 10.0,
            advanced_level: 70,
            intermediate_level: 45,
            hint_cutoffs: (0.4, 0.7),
            phase_one: PhaseGate {
                min_priority: 70,
                max_hours: 40,
            },
            phase_two: PhaseGate {
                min_priority: 50,
                max_hours: 120,
            },
            quick_win: PhaseGate {
                min_priority: 70,
                max_hours: 40,
            },
            nice_to_have_quick_win: PhaseGate {
                min_priority: 40,
                max_hours: 20,
            },
            market: MarketDemandConfig::default(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum GapConfigError {
    #[error("critical threshold ({critical}) must not be below important threshold ({important})")]
    CriticalityOrder { critical: u8, important: u8 },

    #[error("priority weights must be non-negative and not all zero")]
    PriorityWeights,

    #[error("{0} must be positive")]
    NonPositive(&'static str),
}

impl GapEngineConfig {
    pub fn validate(&self) -> Result<(), GapConfigError> {
        if self.critical_importance < self.important_importance {
            return Err(GapConfigError::CriticalityOrder {
                critical: self.critical_importance,
                important: self.important_importance,
            });
        }

        let w = &self.priority_weights;
        if w.importance < 0.0 || w.gap < 0.0 || w.market_demand < 0.0 || w.importance + w.gap <= 0.0
        {
            return Err(GapConfigError::PriorityWeights);
        }

        if self.hours_per_week <= 0.0 {
            return Err(GapConfigError::NonPositive("hours_per_week"));
        }
        let t = &self.tier_hours;
        if t.basic <= 0.0 || t.intermediate <= 0.0 || t.advanced <= 0.0 {
            return Err(GapConfigError::NonPositive("tier_hours"));
        }
        Ok(())
    }
}
