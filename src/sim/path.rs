//! Single-path stepping shared by both engines, plus the parallel batch runner.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::{Result, RiskError};
use crate::models::SimulationParams;
use crate::risk::{apply_outcome, clamp_equity, SizingModel, EQUITY_FLOOR};

use super::rng::Mulberry32;

/// Cooperative cancellation flag, checked between path iterations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// One trade: a win iff the uniform draw falls below the win rate.
#[inline]
pub fn step(
    model: SizingModel,
    equity: f64,
    win_rate: f64,
    reward_ratio: f64,
    rng: &mut Mulberry32,
) -> f64 {
    let is_win = rng.next_unit() < win_rate;
    apply_outcome(model, equity, is_win, reward_ratio)
}

/// Whether a path has hit the ruin floor.
#[inline]
pub fn is_ruined(equity: f64) -> bool {
    equity <= EQUITY_FLOOR
}

/// Full equity path of `steps + 1` points.
///
/// A ruined path stops drawing and holds the floor for the remaining points.
pub fn simulate_path(
    model: SizingModel,
    params: &SimulationParams,
    rng: &mut Mulberry32,
) -> Vec<f64> {
    let mut path = Vec::with_capacity(params.step_count + 1);
    let mut equity = clamp_equity(params.start_equity);
    path.push(equity);

    for _ in 0..params.step_count {
        if !is_ruined(equity) {
            equity = step(model, equity, params.win_rate, params.reward_ratio, rng);
        }
        path.push(equity);
    }

    path
}

/// Largest peak-to-trough decline along a path (0.0 to 1.0).
pub fn max_drawdown(path: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut max_dd = 0.0f64;

    for &equity in path {
        if equity > peak {
            peak = equity;
        }
        if peak > 0.0 {
            let dd = (peak - equity) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }

    max_dd
}

/// Run `params.path_count` independent paths in parallel.
///
/// Path `i` gets its own stream derived from `(params.seed, i)`, and results
/// come back in path order, so output does not depend on thread count.
pub fn run_batch<T, F>(params: &SimulationParams, cancel: &CancelToken, run: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(usize, &mut Mulberry32) -> T + Sync,
{
    let completed = AtomicUsize::new(0);

    let results: Option<Vec<T>> = (0..params.path_count)
        .into_par_iter()
        .map(|index| {
            if cancel.is_cancelled() {
                return None;
            }
            let mut rng = Mulberry32::for_path(params.seed, index);
            let out = run(index, &mut rng);
            completed.fetch_add(1, Ordering::Relaxed);
            Some(out)
        })
        .collect();

    match results {
        Some(results) => {
            debug!(
                seed = params.seed,
                paths = params.path_count,
                steps = params.step_count,
                "Batch complete"
            );
            Ok(results)
        }
        None => {
            let completed_paths = completed.load(Ordering::Relaxed);
            warn!(seed = params.seed, completed_paths, "Batch cancelled");
            Err(RiskError::Cancelled { completed_paths })
        }
    }
}
