//! Validated simulation inputs.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};
use crate::risk::clamp_equity;

/// Account and edge inputs shared by every engine.
///
/// Construction is the only place caller input is validated. Everything
/// downstream of a `MarketInputs` is total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketInputs {
    /// Current account equity
    equity: f64,

    /// Win probability (0.0 to 1.0)
    win_rate: f64,

    /// Win size as a multiple of the amount risked
    reward_ratio: f64,
}

impl MarketInputs {
    /// Validate dashboard-style inputs. `win_rate_percent` is 0-100.
    pub fn new(equity: f64, win_rate_percent: f64, reward_ratio: f64) -> Result<Self> {
        if !equity.is_finite() || equity <= 0.0 {
            return Err(RiskError::invalid_input(
                "equity",
                equity,
                "must be finite and positive",
            ));
        }
        if !win_rate_percent.is_finite() || !(0.0..=100.0).contains(&win_rate_percent) {
            return Err(RiskError::invalid_input(
                "win_rate_percent",
                win_rate_percent,
                "must be between 0 and 100",
            ));
        }
        if !reward_ratio.is_finite() || reward_ratio <= 0.0 {
            return Err(RiskError::invalid_input(
                "reward_ratio",
                reward_ratio,
                "must be finite and positive",
            ));
        }

        Ok(Self {
            equity,
            win_rate: win_rate_percent / 100.0,
            reward_ratio,
        })
    }

    pub fn equity(&self) -> f64 {
        self.equity
    }

    /// Win probability as a fraction.
    pub fn win_rate(&self) -> f64 {
        self.win_rate
    }

    pub fn win_rate_percent(&self) -> f64 {
        self.win_rate * 100.0
    }

    pub fn reward_ratio(&self) -> f64 {
        self.reward_ratio
    }

    /// Same edge, different starting balance.
    pub fn with_equity(&self, equity: f64) -> Result<Self> {
        Self::new(equity, self.win_rate_percent(), self.reward_ratio)
    }

    /// Build the parameters for one simulated batch. The start balance is
    /// clamped into the model's equity domain.
    pub fn params(&self, seed: u32, path_count: usize, step_count: usize) -> SimulationParams {
        SimulationParams {
            start_equity: clamp_equity(self.equity),
            win_rate: self.win_rate,
            reward_ratio: self.reward_ratio,
            seed,
            path_count,
            step_count,
        }
    }
}

/// Parameters of one simulated batch. Identical params give identical output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    pub start_equity: f64,
    pub win_rate: f64,
    pub reward_ratio: f64,
    pub seed: u32,
    pub path_count: usize,
    pub step_count: usize,
}

impl SimulationParams {
    /// Same batch starting from a different balance.
    pub fn starting_at(mut self, equity: f64) -> Self {
        self.start_equity = clamp_equity(equity);
        self
    }
}
