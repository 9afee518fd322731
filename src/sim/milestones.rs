//! Milestone projection: first-passage statistics to fixed equity thresholds.

use serde::Serialize;
use tracing::info;

use crate::config::SimulationConfig;
use crate::error::Result;
use crate::models::{MarketInputs, SimulationParams};
use crate::risk::{clamp_equity, wins_to_reach, SizingModel};

use super::path::{is_ruined, run_batch, step, CancelToken};
use super::percentile::Quartiles;
use super::rng::Mulberry32;

/// Sampled first-passage statistics for one model and threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassageStats {
    pub seed: u32,
    /// Percentage of paths crossing the threshold within the horizon (0-100)
    pub reach_probability: f64,
    /// Paths that crossed
    pub crossings: usize,
    /// Quartiles of the crossing step, when enough paths crossed
    pub timing: Option<Quartiles>,
}

/// Projection toward one equity milestone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MilestoneResult {
    pub threshold: f64,
    pub achieved: bool,
    /// Percent of the way there, capped at 100
    pub progress: f64,
    /// Straight wins needed under the primary model; `None` if unreachable
    pub best_case_wins: Option<u32>,
    /// Same count under the fixed-fraction model
    pub best_case_wins_fixed: Option<u32>,
    pub primary: PassageStats,
    pub fixed: PassageStats,
}

/// Project every configured milestone from the current balance.
///
/// `seed` drives the primary batch; the fixed-fraction batch uses the seed
/// shifted by `config.fixed_seed_offset`. Re-rolling the seed changes the
/// sampled statistics and leaves the best-case counts alone.
pub fn compute_milestones(
    inputs: &MarketInputs,
    seed: u32,
    config: &SimulationConfig,
    cancel: &CancelToken,
) -> Result<Vec<MilestoneResult>> {
    config.validate()?;

    info!(
        equity = inputs.equity(),
        win_rate = inputs.win_rate(),
        reward_ratio = inputs.reward_ratio(),
        seed,
        milestones = config.milestones.len(),
        "Computing milestones"
    );

    let thresholds = &config.milestones;
    let primary_params = inputs.params(seed, config.milestone_paths, config.milestone_steps);
    let fixed_params = inputs.params(
        config.fixed_milestone_seed(seed),
        config.milestone_paths,
        config.milestone_steps,
    );

    let primary = passage_stats(
        SizingModel::PowerDecay,
        &primary_params,
        thresholds,
        config.min_crossings_for_timing,
        cancel,
    )?;
    let fixed = passage_stats(
        SizingModel::FixedFraction,
        &fixed_params,
        thresholds,
        config.min_crossings_for_timing,
        cancel,
    )?;

    let equity = inputs.equity();
    let rr = inputs.reward_ratio();

    let results = thresholds
        .iter()
        .zip(primary.into_iter().zip(fixed))
        .map(|(&threshold, (primary, fixed))| MilestoneResult {
            threshold,
            achieved: equity >= threshold,
            progress: (100.0 * equity / threshold).min(100.0),
            best_case_wins: wins_to_reach(
                SizingModel::PowerDecay,
                equity,
                threshold,
                rr,
                config.best_case_cap,
            ),
            best_case_wins_fixed: wins_to_reach(
                SizingModel::FixedFraction,
                equity,
                threshold,
                rr,
                config.best_case_cap,
            ),
            primary,
            fixed,
        })
        .collect();

    Ok(results)
}

/// Step at which one path first reaches each threshold.
///
/// Thresholds must be ascending. A path stops on ruin or once every
/// threshold has been crossed; balances already at a threshold cross at 0.
pub fn first_passage(
    model: SizingModel,
    params: &SimulationParams,
    thresholds: &[f64],
    rng: &mut Mulberry32,
) -> Vec<Option<usize>> {
    let mut crossed = vec![None; thresholds.len()];
    let mut equity = clamp_equity(params.start_equity);
    let mut next = mark_crossed(&mut crossed, thresholds, 0, equity, 0);

    for step_index in 1..=params.step_count {
        if next == thresholds.len() || is_ruined(equity) {
            break;
        }
        equity = step(model, equity, params.win_rate, params.reward_ratio, rng);
        next = mark_crossed(&mut crossed, thresholds, next, equity, step_index);
    }

    crossed
}

fn mark_crossed(
    crossed: &mut [Option<usize>],
    thresholds: &[f64],
    mut next: usize,
    equity: f64,
    step_index: usize,
) -> usize {
    while next < thresholds.len() && equity >= thresholds[next] {
        crossed[next] = Some(step_index);
        next += 1;
    }
    next
}

fn passage_stats(
    model: SizingModel,
    params: &SimulationParams,
    thresholds: &[f64],
    min_crossings: usize,
    cancel: &CancelToken,
) -> Result<Vec<PassageStats>> {
    let passages = run_batch(params, cancel, |_, rng| {
        first_passage(model, params, thresholds, rng)
    })?;

    let stats = (0..thresholds.len())
        .map(|i| {
            let steps: Vec<f64> = passages
                .iter()
                .filter_map(|p| p[i])
                .map(|s| s as f64)
                .collect();
            let crossings = steps.len();
            PassageStats {
                seed: params.seed,
                reach_probability: 100.0 * crossings as f64 / params.path_count as f64,
                crossings,
                timing: (crossings > min_crossings).then(|| Quartiles::of(&steps)),
            }
        })
        .collect();

    Ok(stats)
}

/// Table view of a milestone projection.
pub struct MilestoneTable<'a>(pub &'a [MilestoneResult]);

impl std::fmt::Display for MilestoneTable<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn wins(w: Option<u32>) -> String {
            w.map(|w| w.to_string()).unwrap_or_else(|| "-".to_string())
        }
        fn timing(s: &PassageStats) -> String {
            s.timing
                .map(|q| format!("{:.0} [{:.0}-{:.0}]", q.median, q.p25, q.p75))
                .unwrap_or_else(|| "-".to_string())
        }

        writeln!(f, "\n{:=^96}", " MILESTONES ")?;
        writeln!(
            f,
            "{:>12} {:>8} {:>6} {:>6} {:>8} {:>18} {:>8} {:>18}",
            "TARGET", "PROGRESS", "BEST", "BEST33", "REACH", "STEPS (IQR)", "REACH33", "STEPS33 (IQR)"
        )?;
        for m in self.0 {
            writeln!(
                f,
                "{:>12.0} {:>7.1}% {:>6} {:>6} {:>7.1}% {:>18} {:>7.1}% {:>18}{}",
                m.threshold,
                m.progress,
                wins(m.best_case_wins),
                wins(m.best_case_wins_fixed),
                m.primary.reach_probability,
                timing(&m.primary),
                m.fixed.reach_probability,
                timing(&m.fixed),
                if m.achieved { "  achieved" } else { "" }
            )?;
        }
        writeln!(f, "{:=^96}", "")?;
        Ok(())
    }
}
