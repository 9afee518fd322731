//! Closed-form risk analytics: growth rate, ruin horizon, streak projection.
//!
//! Everything here is deterministic. The Monte Carlo engines reuse
//! [`apply_outcome`] as their single stepping rule.

use super::sizing::{clamp_equity, SizingModel, EQUITY_FLOOR};

/// Iterations after which a loss streak is treated as "no practical ruin".
pub const RUIN_HORIZON_CAP: u32 = 200;

/// Apply one win or loss at the model's current fraction, clamped to the
/// equity floor and ceiling.
#[inline]
pub fn apply_outcome(model: SizingModel, equity: f64, is_win: bool, reward_ratio: f64) -> f64 {
    let fraction = model.risk_fraction(equity);
    let next = if is_win {
        equity * (1.0 + fraction * reward_ratio)
    } else {
        equity * (1.0 - fraction)
    };
    clamp_equity(next)
}

/// Expected log-growth per trade at risk fraction `r`.
///
/// g = w * ln(1 + r*b) + (1 - w) * ln(1 - r)
///
/// Full risk (`r >= 1`) is certain eventual ruin and yields `-inf`. A win
/// rate of exactly 100% never takes the loss branch and stays finite.
pub fn geometric_growth_rate(risk_fraction: f64, win_rate: f64, reward_ratio: f64) -> f64 {
    if risk_fraction <= 0.0 {
        return 0.0;
    }
    let w = win_rate.clamp(0.0, 1.0);
    if risk_fraction >= 1.0 {
        if w >= 1.0 {
            return (1.0 + risk_fraction * reward_ratio).ln();
        }
        return f64::NEG_INFINITY;
    }
    w * (risk_fraction * reward_ratio).ln_1p() + (1.0 - w) * (-risk_fraction).ln_1p()
}

/// A model compounds over the long run iff its growth rate is positive.
pub fn is_profitable(risk_fraction: f64, win_rate: f64, reward_ratio: f64) -> bool {
    geometric_growth_rate(risk_fraction, win_rate, reward_ratio) > 0.0
}

/// Growth rate of a model evaluated at a specific equity.
pub fn model_growth_rate(model: SizingModel, equity: f64, win_rate: f64, reward_ratio: f64) -> f64 {
    geometric_growth_rate(model.risk_fraction(equity), win_rate, reward_ratio)
}

/// Full-Kelly fraction f* = w - (1 - w) / b, clamped to `[0, 1]`.
pub fn kelly_fraction(win_rate: f64, reward_ratio: f64) -> f64 {
    if reward_ratio <= 0.0 {
        return 0.0;
    }
    let w = win_rate.clamp(0.0, 1.0);
    (w - (1.0 - w) / reward_ratio).clamp(0.0, 1.0)
}

/// Number of back-to-back primary-model losses that take `equity` to the floor.
///
/// Returns [`RUIN_HORIZON_CAP`] when the floor is not reached within the cap.
pub fn consecutive_losses_to_ruin(equity: f64) -> u32 {
    let mut q = clamp_equity(equity);
    let mut losses = 0;
    while q > EQUITY_FLOOR && losses < RUIN_HORIZON_CAP {
        q = apply_outcome(SizingModel::PowerDecay, q, false, 0.0);
        losses += 1;
    }
    losses
}

/// Equity after `n` identical outcomes under the primary model.
pub fn equity_after_streak(equity: f64, n: u32, is_win_streak: bool, reward_ratio: f64) -> f64 {
    equity_after_streak_with(SizingModel::PowerDecay, equity, n, is_win_streak, reward_ratio)
}

/// Same as [`equity_after_streak`] for an arbitrary model.
pub fn equity_after_streak_with(
    model: SizingModel,
    equity: f64,
    n: u32,
    is_win_streak: bool,
    reward_ratio: f64,
) -> f64 {
    (0..n).fold(clamp_equity(equity), |q, _| {
        apply_outcome(model, q, is_win_streak, reward_ratio)
    })
}

/// Consecutive wins needed to lift `from` to at least `target`.
///
/// `Some(0)` if already there, `None` when `cap` wins are not enough.
pub fn wins_to_reach(
    model: SizingModel,
    from: f64,
    target: f64,
    reward_ratio: f64,
    cap: u32,
) -> Option<u32> {
    let mut q = clamp_equity(from);
    if q >= target {
        return Some(0);
    }
    for wins in 1..=cap {
        let next = apply_outcome(model, q, true, reward_ratio);
        if next >= target {
            return Some(wins);
        }
        if next <= q {
            // stuck at the ceiling
            return None;
        }
        q = next;
    }
    None
}

/// Percentage decline from `before` to `after`.
pub fn drawdown_pct(before: f64, after: f64) -> f64 {
    if before <= 0.0 {
        return 0.0;
    }
    ((before - after) / before * 100.0).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::sizing::{risk_fraction_primary, ANCHOR_EQUITY, ANCHOR_FRACTION};

    #[test]
    fn test_growth_rate_edge_cases() {
        assert_eq!(geometric_growth_rate(0.0, 0.6, 1.5), 0.0);
        assert_eq!(geometric_growth_rate(-0.2, 0.6, 1.5), 0.0);
        assert_eq!(geometric_growth_rate(1.0, 0.99, 1.5), f64::NEG_INFINITY);
        assert_eq!(geometric_growth_rate(1.2, 0.5, 3.0), f64::NEG_INFINITY);
        assert!(geometric_growth_rate(1.0, 1.0, 1.5).is_finite());
    }

    #[test]
    fn test_growth_rate_value() {
        let g = geometric_growth_rate(0.33, 0.6, 1.5);
        let expected = 0.6 * (1.0f64 + 0.33 * 1.5).ln() + 0.4 * (1.0f64 - 0.33).ln();
        assert!((g - expected).abs() < 1e-12);
        assert!(is_profitable(0.33, 0.6, 1.5));
        assert!(!is_profitable(0.33, 0.4, 1.0));
    }

    #[test]
    fn test_full_risk_is_certain_ruin() {
        let r = risk_fraction_primary(20_000.0);
        assert_eq!(r, 1.0);
        for w in [0.1, 0.5, 0.9, 0.999] {
            assert_eq!(geometric_growth_rate(r, w, 2.0), f64::NEG_INFINITY);
        }
    }

    #[test]
    fn test_kelly_fraction() {
        assert!((kelly_fraction(0.6, 1.0) - 0.2).abs() < 1e-12);
        assert!((kelly_fraction(0.6, 1.5) - (0.6 - 0.4 / 1.5)).abs() < 1e-12);
        assert_eq!(kelly_fraction(0.3, 1.0), 0.0);
        assert_eq!(kelly_fraction(0.6, 0.0), 0.0);
    }

    #[test]
    fn test_losses_to_ruin() {
        assert_eq!(consecutive_losses_to_ruin(20_000.0), 1);
        assert_eq!(consecutive_losses_to_ruin(5_000.0), 1);
        assert_eq!(consecutive_losses_to_ruin(1.0), 0);

        let at_anchor = consecutive_losses_to_ruin(ANCHOR_EQUITY);
        assert!(at_anchor > 1 && at_anchor < RUIN_HORIZON_CAP);

        // Richer accounts survive at least as many losses
        assert!(consecutive_losses_to_ruin(1_000_000.0) >= at_anchor);

        // No practical ruin at the ceiling
        assert_eq!(consecutive_losses_to_ruin(1e15), RUIN_HORIZON_CAP);
    }

    #[test]
    fn test_equity_after_streak() {
        let after_loss = equity_after_streak(ANCHOR_EQUITY, 1, false, 1.5);
        assert!((after_loss - ANCHOR_EQUITY * (1.0 - ANCHOR_FRACTION)).abs() < 1e-6);

        let after_win = equity_after_streak(ANCHOR_EQUITY, 1, true, 1.5);
        assert!((after_win - ANCHOR_EQUITY * (1.0 + ANCHOR_FRACTION * 1.5)).abs() < 1e-6);

        // Floor holds through long loss streaks
        assert_eq!(equity_after_streak(ANCHOR_EQUITY, 50, false, 1.5), 1.0);
        assert_eq!(equity_after_streak(ANCHOR_EQUITY, 0, false, 1.5), ANCHOR_EQUITY);
    }

    #[test]
    fn test_wins_to_reach() {
        let m = SizingModel::PowerDecay;
        assert_eq!(wins_to_reach(m, 150_000.0, 100_000.0, 1.5, 9999), Some(0));
        assert_eq!(wins_to_reach(m, ANCHOR_EQUITY, 100_000.0, 1.5, 9999), Some(1));
        assert_eq!(wins_to_reach(m, 1.0, 1e9, 1.5, 3), None);

        // Pinned at the ceiling, no number of wins gets past it
        assert_eq!(wins_to_reach(m, 1e15, 2e15, 1.5, 9999), None);
        assert_eq!(wins_to_reach(SizingModel::FixedFraction, 1e15, 2e15, 1.5, 9999), None);

        let n = wins_to_reach(m, ANCHOR_EQUITY, 1_000_000.0, 1.5, 9999).unwrap();
        let fixed = wins_to_reach(SizingModel::FixedFraction, ANCHOR_EQUITY, 1_000_000.0, 1.5, 9999)
            .unwrap();
        // Decaying fraction compounds slower than a constant 33%
        assert!(n >= fixed);
    }

    #[test]
    fn test_drawdown_pct() {
        assert!((drawdown_pct(100.0, 75.0) - 25.0).abs() < 1e-12);
        assert_eq!(drawdown_pct(100.0, 120.0), 0.0);
        assert_eq!(drawdown_pct(0.0, 10.0), 0.0);
    }
}
