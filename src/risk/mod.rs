//! Risk model: sizing strategies and the closed-form analytics built on them.

mod analytics;
mod sizing;

pub use analytics::{
    apply_outcome, consecutive_losses_to_ruin, drawdown_pct, equity_after_streak,
    equity_after_streak_with, geometric_growth_rate, is_profitable, kelly_fraction,
    model_growth_rate, wins_to_reach, RUIN_HORIZON_CAP,
};
pub use sizing::{
    clamp_equity, dollar_risk_primary, risk_fraction, risk_fraction_fixed, risk_fraction_legacy,
    risk_fraction_primary, SizingModel, ANCHOR_EQUITY, ANCHOR_FRACTION, EQUITY_CEILING,
    EQUITY_FLOOR, FULL_RISK_CEILING, MID_BREAKPOINT, MID_FRACTION,
};
