//! Seams to the surrounding application: where win rate, reward ratio and
//! current equity come from.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, RiskError};
use crate::models::MarketInputs;

/// Supplies the trader's edge assumptions.
pub trait SettingsProvider {
    /// Win rate in percent (0-100)
    fn win_rate_percent(&self) -> f64;

    /// Average win as a multiple of the amount risked
    fn reward_ratio(&self) -> f64;
}

/// Supplies the current account balance.
pub trait EquitySource {
    fn current_equity(&self) -> f64;
}

impl MarketInputs {
    /// Gather and validate inputs from the application's collaborators.
    pub fn from_sources(settings: &dyn SettingsProvider, ledger: &dyn EquitySource) -> Result<Self> {
        Self::new(
            ledger.current_equity(),
            settings.win_rate_percent(),
            settings.reward_ratio(),
        )
    }
}

/// Fixed settings, e.g. straight from CLI flags.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaticSettings {
    pub win_rate_percent: f64,
    pub reward_ratio: f64,
}

impl Default for StaticSettings {
    fn default() -> Self {
        Self {
            win_rate_percent: 50.0,
            reward_ratio: 1.5,
        }
    }
}

impl SettingsProvider for StaticSettings {
    fn win_rate_percent(&self) -> f64 {
        self.win_rate_percent
    }

    fn reward_ratio(&self) -> f64 {
        self.reward_ratio
    }
}

/// Minimal trade ledger: a starting balance plus realized P&L per trade.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradeLedger {
    starting_balance: Decimal,
    pnls: Vec<Decimal>,
}

impl TradeLedger {
    pub fn new(starting_balance: Decimal) -> Self {
        Self {
            starting_balance,
            pnls: Vec::new(),
        }
    }

    /// Record a closed trade's realized P&L.
    pub fn record(&mut self, pnl: Decimal) {
        debug!(pnl = %pnl, "Recording trade");
        self.pnls.push(pnl);
    }

    pub fn balance(&self) -> Decimal {
        self.starting_balance + self.pnls.iter().copied().sum::<Decimal>()
    }

    pub fn trade_count(&self) -> usize {
        self.pnls.len()
    }

    /// Observed win rate in percent, if any trades are recorded.
    pub fn win_rate_percent(&self) -> Option<f64> {
        if self.pnls.is_empty() {
            return None;
        }
        let wins = self.pnls.iter().filter(|p| **p > Decimal::ZERO).count();
        Some(100.0 * wins as f64 / self.pnls.len() as f64)
    }

    /// Average win over average loss, if both sides have trades.
    pub fn reward_ratio(&self) -> Option<f64> {
        let (wins, losses): (Vec<Decimal>, Vec<Decimal>) =
            self.pnls.iter().copied().partition(|p| *p > Decimal::ZERO);
        let losses: Vec<Decimal> = losses.into_iter().filter(|l| *l < Decimal::ZERO).collect();
        if wins.is_empty() || losses.is_empty() {
            return None;
        }

        let avg_win = wins.iter().copied().sum::<Decimal>() / Decimal::from(wins.len() as u32);
        let avg_loss = losses.iter().map(|l| l.abs()).sum::<Decimal>()
            / Decimal::from(losses.len() as u32);
        (avg_win / avg_loss).to_f64()
    }

    /// Inputs derived entirely from the ledger's own history.
    pub fn observed_inputs(&self) -> Result<MarketInputs> {
        let win_rate = self.win_rate_percent().ok_or_else(|| {
            RiskError::invalid_input("win_rate_percent", f64::NAN, "ledger has no trades")
        })?;
        let reward_ratio = self.reward_ratio().ok_or_else(|| {
            RiskError::invalid_input("reward_ratio", f64::NAN, "ledger needs wins and losses")
        })?;
        MarketInputs::new(self.current_equity(), win_rate, reward_ratio)
    }
}

impl EquitySource for TradeLedger {
    fn current_equity(&self) -> f64 {
        self.balance().to_f64().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ledger() -> TradeLedger {
        let mut ledger = TradeLedger::new(dec!(87500));
        ledger.record(dec!(1500));
        ledger.record(dec!(-500));
        ledger.record(dec!(1500));
        ledger.record(dec!(-1000));
        ledger
    }

    #[test]
    fn test_ledger_balance() {
        let ledger = ledger();
        assert_eq!(ledger.balance(), dec!(89000));
        assert_eq!(ledger.trade_count(), 4);
        assert_eq!(ledger.current_equity(), 89_000.0);
    }

    #[test]
    fn test_ledger_stats() {
        let ledger = ledger();
        assert_eq!(ledger.win_rate_percent(), Some(50.0));
        // avg win 1500, avg loss 750
        assert!((ledger.reward_ratio().unwrap() - 2.0).abs() < 1e-12);

        let inputs = ledger.observed_inputs().unwrap();
        assert_eq!(inputs.equity(), 89_000.0);
        assert!((inputs.reward_ratio() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_ledger() {
        let ledger = TradeLedger::new(dec!(1000));
        assert_eq!(ledger.win_rate_percent(), None);
        assert_eq!(ledger.reward_ratio(), None);
        assert!(ledger.observed_inputs().is_err());
    }

    #[test]
    fn test_from_sources() {
        let settings = StaticSettings {
            win_rate_percent: 60.0,
            reward_ratio: 1.5,
        };
        let inputs = MarketInputs::from_sources(&settings, &ledger()).unwrap();
        assert_eq!(inputs.equity(), 89_000.0);
        assert!((inputs.win_rate() - 0.6).abs() < 1e-12);

        // A wiped-out ledger is rejected at the boundary
        let mut broke = TradeLedger::new(dec!(100));
        broke.record(dec!(-100));
        assert!(MarketInputs::from_sources(&settings, &broke).is_err());
    }
}
