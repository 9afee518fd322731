//! Deterministic Monte Carlo simulation: PRNG, percentiles, path stepping
//! and the two projection engines built on them.

mod metrics;
mod milestones;
mod path;
mod percentile;
mod rng;

pub use metrics::{
    compute_heavy_metrics, full_map, project_model, recovery_stats, survival_probability,
    BandPoint, DrawdownStats, FullMapRow, Headline, MetricsResult, ModelGrowth, ModelProjection,
    RecoveryStat,
};
pub use milestones::{compute_milestones, first_passage, MilestoneResult, MilestoneTable, PassageStats};
pub use path::{is_ruined, max_drawdown, run_batch, simulate_path, step, CancelToken};
pub use percentile::{percentile, percentile_sorted, percentiles, Quartiles};
pub use rng::{derive_seed, Mulberry32};
