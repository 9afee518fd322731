//! Equity-dependent sizing models: power decay, cube-root decay, fixed fraction.

use serde::{Deserialize, Serialize};

/// Fraction every model agrees on at the anchor equity.
pub const ANCHOR_FRACTION: f64 = 0.33;

/// Equity at which all three models converge on [`ANCHOR_FRACTION`].
pub const ANCHOR_EQUITY: f64 = 87_500.0;

/// Below this balance the primary model risks the whole account.
pub const FULL_RISK_CEILING: f64 = 20_000.0;

/// End of the first linear segment (fraction 0.5).
pub const MID_BREAKPOINT: f64 = 50_000.0;

/// Fraction at [`MID_BREAKPOINT`].
pub const MID_FRACTION: f64 = 0.5;

/// Ruin floor. A path whose equity reaches it is wiped out.
pub const EQUITY_FLOOR: f64 = 1.0;

/// Ceiling applied to every step to keep compounding finite.
pub const EQUITY_CEILING: f64 = 1e15;

/// Position sizing model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingModel {
    /// Piecewise model with two-thirds power decay past the anchor (primary)
    PowerDecay,
    /// Cube-root decay, heavier tail (legacy comparison)
    CubeRootDecay,
    /// Constant anchor fraction (baseline)
    FixedFraction,
}

impl SizingModel {
    /// Every model, primary first.
    pub const ALL: [SizingModel; 3] = [
        SizingModel::PowerDecay,
        SizingModel::CubeRootDecay,
        SizingModel::FixedFraction,
    ];

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "power" | "power_decay" | "primary" => Some(Self::PowerDecay),
            "cube_root" | "cuberoot" | "legacy" => Some(Self::CubeRootDecay),
            "fixed" | "fixed_fraction" => Some(Self::FixedFraction),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SizingModel::PowerDecay => "power-decay",
            SizingModel::CubeRootDecay => "cube-root",
            SizingModel::FixedFraction => "fixed-33%",
        }
    }

    /// Fraction of current equity put at risk on the next trade.
    pub fn risk_fraction(&self, equity: f64) -> f64 {
        match self {
            SizingModel::PowerDecay => risk_fraction_primary(equity),
            SizingModel::CubeRootDecay => risk_fraction_legacy(equity),
            SizingModel::FixedFraction => risk_fraction_fixed(),
        }
    }

    /// Dollar amount at risk on the next trade.
    pub fn dollar_risk(&self, equity: f64) -> f64 {
        let equity = clamp_equity(equity);
        self.risk_fraction(equity) * equity
    }
}

impl std::fmt::Display for SizingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Clamp equity into `[EQUITY_FLOOR, EQUITY_CEILING]`. NaN maps to the floor.
pub fn clamp_equity(equity: f64) -> f64 {
    if equity.is_nan() {
        return EQUITY_FLOOR;
    }
    equity.clamp(EQUITY_FLOOR, EQUITY_CEILING)
}

/// Primary power-decay fraction.
///
/// ```text
/// e <= 20K          1.0
/// 20K < e <= 50K    1.0 -> 0.5   (linear)
/// 50K < e <= 87.5K  0.5 -> 0.33  (linear)
/// e > 87.5K         0.33 * (87.5K / e)^(2/3)
/// ```
pub fn risk_fraction_primary(equity: f64) -> f64 {
    let e = clamp_equity(equity);

    if e <= FULL_RISK_CEILING {
        1.0
    } else if e <= MID_BREAKPOINT {
        let t = (e - FULL_RISK_CEILING) / (MID_BREAKPOINT - FULL_RISK_CEILING);
        1.0 + t * (MID_FRACTION - 1.0)
    } else if e <= ANCHOR_EQUITY {
        let t = (e - MID_BREAKPOINT) / (ANCHOR_EQUITY - MID_BREAKPOINT);
        MID_FRACTION + t * (ANCHOR_FRACTION - MID_FRACTION)
    } else {
        ANCHOR_FRACTION * (ANCHOR_EQUITY / e).powf(2.0 / 3.0)
    }
}

/// Legacy cube-root fraction, capped at full risk.
pub fn risk_fraction_legacy(equity: f64) -> f64 {
    let e = clamp_equity(equity);
    (ANCHOR_FRACTION * (ANCHOR_EQUITY / e).cbrt()).min(1.0)
}

pub fn risk_fraction_fixed() -> f64 {
    ANCHOR_FRACTION
}

/// Model-dispatching entry point.
pub fn risk_fraction(model: SizingModel, equity: f64) -> f64 {
    model.risk_fraction(equity)
}

pub fn dollar_risk_primary(equity: f64) -> f64 {
    SizingModel::PowerDecay.dollar_risk(equity)
}
