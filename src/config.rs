//! Simulation configuration: batch sizes, horizons, reference tables and seeds.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};
use crate::risk::{SizingModel, ANCHOR_EQUITY, FULL_RISK_CEILING};

/// Fixed seed per sizing model.
///
/// The heavy-metrics chart reuses these on every call so the rendered
/// trajectories do not jitter between refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSeeds {
    pub power_decay: u32,
    pub cube_root: u32,
    pub fixed_fraction: u32,
    pub survival: u32,
}

impl Default for ModelSeeds {
    fn default() -> Self {
        Self {
            power_decay: 42,
            cube_root: 4_242,
            fixed_fraction: 424_242,
            survival: 87_500,
        }
    }
}

impl ModelSeeds {
    pub fn for_model(&self, model: SizingModel) -> u32 {
        match model {
            SizingModel::PowerDecay => self.power_decay,
            SizingModel::CubeRootDecay => self.cube_root,
            SizingModel::FixedFraction => self.fixed_fraction,
        }
    }
}

/// Configuration for both simulation engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === Trajectory batch ===
    /// Paths simulated per sizing model
    pub metrics_paths: usize,

    /// Trades per trajectory path
    pub metrics_steps: usize,

    /// Sample every n-th step for the trajectory bands
    pub band_stride: usize,

    // === Survival ===
    /// Independent short paths in the survival estimate
    pub survival_paths: usize,

    /// Maximum trades per survival path
    pub survival_steps: usize,

    /// Starting balance of every survival path
    pub survival_start_equity: f64,

    /// Balance counted as "survived"
    pub survival_target_equity: f64,

    // === Recovery ===
    /// Loss streak lengths to stress
    pub recovery_streaks: Vec<u32>,

    /// Share of pre-loss equity that counts as recovered (0.0 to 1.0)
    pub recovery_target_ratio: f64,

    /// Give up counting recovery wins after this many
    pub recovery_cap: u32,

    // === Analytic table ===
    /// Equity levels for the full-map table
    pub reference_equities: Vec<f64>,

    // === Milestones ===
    /// Ordered equity thresholds
    pub milestones: Vec<f64>,

    /// Paths per milestone batch
    pub milestone_paths: usize,

    /// Horizon of each milestone path
    pub milestone_steps: usize,

    /// Added to the caller's seed for the fixed-fraction comparison batch
    pub fixed_seed_offset: u32,

    /// Consecutive-win cap for the best-case count
    pub best_case_cap: u32,

    /// Crossing-time quartiles need strictly more crossings than this
    pub min_crossings_for_timing: usize,

    pub seeds: ModelSeeds,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            metrics_paths: 500,
            metrics_steps: 100,
            band_stride: 2,

            survival_paths: 2_000,
            survival_steps: 200,
            survival_start_equity: FULL_RISK_CEILING,
            survival_target_equity: ANCHOR_EQUITY,

            recovery_streaks: vec![3, 5],
            recovery_target_ratio: 0.999,
            recovery_cap: 500,

            reference_equities: vec![
                20_000.0,
                35_000.0,
                50_000.0,
                87_500.0,
                150_000.0,
                250_000.0,
                500_000.0,
                1_000_000.0,
                2_500_000.0,
                5_000_000.0,
                10_000_000.0,
            ],

            milestones: vec![
                100_000.0,
                250_000.0,
                500_000.0,
                1_000_000.0,
                2_500_000.0,
                5_000_000.0,
                10_000_000.0,
            ],
            milestone_paths: 500,
            milestone_steps: 400,
            fixed_seed_offset: 111,
            best_case_cap: 9_999,
            min_crossings_for_timing: 3,

            seeds: ModelSeeds::default(),
        }
    }
}

impl SimulationConfig {
    /// Parse a JSON document, filling omitted fields with defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| RiskError::invalid_config(format!("malformed config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot produce a result.
    pub fn validate(&self) -> Result<()> {
        let counts = [
            ("metrics_paths", self.metrics_paths),
            ("metrics_steps", self.metrics_steps),
            ("band_stride", self.band_stride),
            ("survival_paths", self.survival_paths),
            ("survival_steps", self.survival_steps),
            ("milestone_paths", self.milestone_paths),
            ("milestone_steps", self.milestone_steps),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(RiskError::invalid_config(format!("{name} must be non-zero")));
            }
        }

        if !(self.survival_start_equity > 0.0 && self.survival_target_equity > 0.0) {
            return Err(RiskError::invalid_config("survival equities must be positive"));
        }
        if !(self.recovery_target_ratio > 0.0 && self.recovery_target_ratio <= 1.0) {
            return Err(RiskError::invalid_config(
                "recovery_target_ratio must be in (0, 1]",
            ));
        }
        if self.milestones.is_empty() {
            return Err(RiskError::invalid_config("milestones must not be empty"));
        }
        if self.milestones.windows(2).any(|w| w[0] >= w[1]) {
            return Err(RiskError::invalid_config(
                "milestones must be strictly increasing",
            ));
        }
        if self
            .milestones
            .iter()
            .chain(&self.reference_equities)
            .any(|v| !v.is_finite() || *v <= 0.0)
        {
            return Err(RiskError::invalid_config(
                "equity levels must be finite and positive",
            ));
        }

        Ok(())
    }

    /// Seed of the fixed-fraction milestone batch for a given re-roll seed.
    pub fn fixed_milestone_seed(&self, seed: u32) -> u32 {
        seed.wrapping_add(self.fixed_seed_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.metrics_paths, 500);
        assert_eq!(config.milestones[0], 100_000.0);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            SimulationConfig::from_json_str(r#"{ "metrics_paths": 50, "seeds": { "survival": 9 } }"#)
                .unwrap();
        assert_eq!(config.metrics_paths, 50);
        assert_eq!(config.metrics_steps, 100);
        assert_eq!(config.seeds.survival, 9);
        assert_eq!(config.seeds.power_decay, ModelSeeds::default().power_decay);
    }

    #[test]
    fn test_rejects_bad_config() {
        assert!(SimulationConfig::from_json_str(r#"{ "band_stride": 0 }"#).is_err());
        assert!(SimulationConfig::from_json_str(r#"{ "milestones": [] }"#).is_err());
        assert!(SimulationConfig::from_json_str(r#"{ "milestones": [5.0, 1.0] }"#).is_err());
        assert!(SimulationConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_fixed_seed_offset_wraps() {
        let config = SimulationConfig::default();
        assert_eq!(config.fixed_milestone_seed(555), 666);
        assert_eq!(config.fixed_milestone_seed(u32::MAX), 110);
    }
}
