//! Caller-facing entry point bundling configuration with both engines.

use tracing::debug;

use crate::config::SimulationConfig;
use crate::error::Result;
use crate::inputs::{EquitySource, SettingsProvider};
use crate::models::MarketInputs;
use crate::sim::{compute_heavy_metrics, compute_milestones, CancelToken, MetricsResult, MilestoneResult};

/// Risk engine with a validated configuration.
///
/// Every call is self-contained: identical arguments return identical
/// results, so callers may memoize freely.
#[derive(Debug, Clone)]
pub struct RiskEngine {
    config: SimulationConfig,
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self {
            config: SimulationConfig::default(),
        }
    }
}

impl RiskEngine {
    /// Create an engine, rejecting unusable configuration up front.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        debug!(
            metrics_paths = config.metrics_paths,
            milestone_paths = config.milestone_paths,
            "Risk engine configured"
        );
        Ok(Self { config })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Trajectory, drawdown, survival and recovery metrics.
    pub fn heavy_metrics(
        &self,
        equity: f64,
        win_rate_percent: f64,
        reward_ratio: f64,
    ) -> Result<MetricsResult> {
        let inputs = MarketInputs::new(equity, win_rate_percent, reward_ratio)?;
        compute_heavy_metrics(&inputs, &self.config, &CancelToken::new())
    }

    /// Milestone projection for a re-roll seed.
    pub fn milestones(
        &self,
        equity: f64,
        win_rate_percent: f64,
        reward_ratio: f64,
        seed: u32,
    ) -> Result<Vec<MilestoneResult>> {
        let inputs = MarketInputs::new(equity, win_rate_percent, reward_ratio)?;
        compute_milestones(&inputs, seed, &self.config, &CancelToken::new())
    }

    /// Heavy metrics from the application's collaborators, cancellable.
    pub fn heavy_metrics_from(
        &self,
        settings: &dyn SettingsProvider,
        ledger: &dyn EquitySource,
        cancel: &CancelToken,
    ) -> Result<MetricsResult> {
        let inputs = MarketInputs::from_sources(settings, ledger)?;
        compute_heavy_metrics(&inputs, &self.config, cancel)
    }

    /// Milestones from the application's collaborators, cancellable.
    pub fn milestones_from(
        &self,
        settings: &dyn SettingsProvider,
        ledger: &dyn EquitySource,
        seed: u32,
        cancel: &CancelToken,
    ) -> Result<Vec<MilestoneResult>> {
        let inputs = MarketInputs::from_sources(settings, ledger)?;
        compute_milestones(&inputs, seed, &self.config, cancel)
    }
}
