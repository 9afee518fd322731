//! Monte Carlo metrics engine: trajectory bands, terminal wealth, drawdowns,
//! survival and recovery across the three sizing models.

use serde::Serialize;
use statrs::statistics::Statistics;
use tracing::info;

use crate::config::SimulationConfig;
use crate::error::Result;
use crate::models::{MarketInputs, SimulationParams};
use crate::risk::{
    clamp_equity, consecutive_losses_to_ruin, drawdown_pct, equity_after_streak, equity_after_streak_with,
    geometric_growth_rate, kelly_fraction, model_growth_rate, wins_to_reach, SizingModel,
};

use super::path::{is_ruined, max_drawdown, run_batch, simulate_path, step, CancelToken};
use super::percentile::{percentile, Quartiles};

/// Cross-section of a trajectory batch at one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandPoint {
    pub step: usize,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    /// Median on a log10 scale, for the growth-comparison chart
    pub log10_median: f64,
}

/// Distribution of per-path maximum drawdown (0.0 to 1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DrawdownStats {
    pub median: f64,
    pub p90: f64,
}

/// Simulated outcome of one sizing model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelProjection {
    pub model: SizingModel,
    pub seed: u32,
    pub bands: Vec<BandPoint>,
    pub terminal: Quartiles,
    pub terminal_mean: f64,
    pub drawdown: DrawdownStats,
}

/// One row of the analytic full-map table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullMapRow {
    pub equity: f64,
    pub risk_fraction: f64,
    pub dollar_risk: f64,
    /// Gain on a single win: dollar risk times reward ratio
    pub projected_gain: f64,
    pub after_one_loss: f64,
    pub after_three_losses: f64,
    pub drawdown_after_three_pct: f64,
    pub growth_rate: f64,
    pub losses_to_ruin: u32,
}

/// Loss streak stress result for one model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoveryStat {
    pub model: SizingModel,
    pub losses: u32,
    pub equity_after: f64,
    pub drawdown_pct: f64,
    /// Primary-sized wins back to the recovery target; `None` past the cap
    pub wins_to_recover: Option<u32>,
}

/// Growth rate of one model at the current balance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelGrowth {
    pub model: SizingModel,
    pub risk_fraction: f64,
    pub growth_rate: f64,
    pub profitable: bool,
}

/// Headline numbers for the current balance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Headline {
    pub equity: f64,
    pub risk_fraction: f64,
    pub dollar_risk: f64,
    pub kelly_fraction: f64,
    pub losses_to_ruin: u32,
    pub growth: Vec<ModelGrowth>,
}

/// Everything the risk dashboard renders from one call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsResult {
    pub inputs: MarketInputs,
    pub headline: Headline,
    /// Primary, legacy, fixed, in that order
    pub projections: Vec<ModelProjection>,
    pub full_map: Vec<FullMapRow>,
    /// Share of accounts starting at the survival equity that reach the
    /// target before the floor (0.0 to 1.0)
    pub survival_probability: f64,
    pub recovery: Vec<RecoveryStat>,
}

impl MetricsResult {
    pub fn projection(&self, model: SizingModel) -> Option<&ModelProjection> {
        self.projections.iter().find(|p| p.model == model)
    }
}

/// Run the full metrics computation for the given inputs.
pub fn compute_heavy_metrics(
    inputs: &MarketInputs,
    config: &SimulationConfig,
    cancel: &CancelToken,
) -> Result<MetricsResult> {
    config.validate()?;

    info!(
        equity = inputs.equity(),
        win_rate = inputs.win_rate(),
        reward_ratio = inputs.reward_ratio(),
        paths = config.metrics_paths,
        steps = config.metrics_steps,
        "Computing heavy metrics"
    );

    let projections = SizingModel::ALL
        .iter()
        .map(|&model| {
            let params = inputs.params(
                config.seeds.for_model(model),
                config.metrics_paths,
                config.metrics_steps,
            );
            project_model(model, &params, config.band_stride, cancel)
        })
        .collect::<Result<Vec<_>>>()?;

    let survival_probability = survival_probability(inputs, config, cancel)?;

    let result = MetricsResult {
        inputs: *inputs,
        headline: headline(inputs),
        projections,
        full_map: full_map(inputs, &config.reference_equities),
        survival_probability,
        recovery: recovery_stats(inputs, config),
    };

    info!(
        survival = result.survival_probability,
        "Heavy metrics complete"
    );

    Ok(result)
}

/// Simulate one model's trajectory batch and summarize it.
pub fn project_model(
    model: SizingModel,
    params: &SimulationParams,
    band_stride: usize,
    cancel: &CancelToken,
) -> Result<ModelProjection> {
    let paths = run_batch(params, cancel, |_, rng| simulate_path(model, params, rng))?;

    let bands = (0..=params.step_count)
        .step_by(band_stride.max(1))
        .map(|step| {
            let column: Vec<f64> = paths.iter().map(|p| p[step]).collect();
            let q = Quartiles::of(&column);
            BandPoint {
                step,
                p25: q.p25,
                median: q.median,
                p75: q.p75,
                log10_median: q.median.log10(),
            }
        })
        .collect();

    let terminal_values: Vec<f64> = paths.iter().map(|p| p[params.step_count]).collect();
    let drawdowns: Vec<f64> = paths.iter().map(|p| max_drawdown(p)).collect();

    Ok(ModelProjection {
        model,
        seed: params.seed,
        bands,
        terminal: Quartiles::of(&terminal_values),
        terminal_mean: if terminal_values.is_empty() {
            0.0
        } else {
            terminal_values.iter().mean()
        },
        drawdown: DrawdownStats {
            median: percentile(&drawdowns, 0.5),
            p90: percentile(&drawdowns, 0.9),
        },
    })
}

/// Share of short primary-model paths that climb from the survival start to
/// the survival target before hitting the floor.
pub fn survival_probability(
    inputs: &MarketInputs,
    config: &SimulationConfig,
    cancel: &CancelToken,
) -> Result<f64> {
    let params = inputs
        .params(
            config.seeds.survival,
            config.survival_paths,
            config.survival_steps,
        )
        .starting_at(config.survival_start_equity);
    let target = config.survival_target_equity;

    let survived = run_batch(&params, cancel, |_, rng| {
        let mut equity = clamp_equity(params.start_equity);
        for _ in 0..params.step_count {
            if equity >= target {
                return true;
            }
            if is_ruined(equity) {
                return false;
            }
            equity = step(
                SizingModel::PowerDecay,
                equity,
                params.win_rate,
                params.reward_ratio,
                rng,
            );
        }
        equity >= target
    })?;

    let count = survived.iter().filter(|&&s| s).count();
    Ok(count as f64 / params.path_count as f64)
}

/// Analytic table over the reference equity levels.
pub fn full_map(inputs: &MarketInputs, reference_equities: &[f64]) -> Vec<FullMapRow> {
    let model = SizingModel::PowerDecay;
    let rr = inputs.reward_ratio();

    reference_equities
        .iter()
        .map(|&equity| {
            let risk_fraction = model.risk_fraction(equity);
            let dollar_risk = model.dollar_risk(equity);
            let after_three_losses = equity_after_streak(equity, 3, false, rr);
            FullMapRow {
                equity,
                risk_fraction,
                dollar_risk,
                projected_gain: dollar_risk * rr,
                after_one_loss: equity_after_streak(equity, 1, false, rr),
                after_three_losses,
                drawdown_after_three_pct: drawdown_pct(equity, after_three_losses),
                growth_rate: geometric_growth_rate(risk_fraction, inputs.win_rate(), rr),
                losses_to_ruin: consecutive_losses_to_ruin(equity),
            }
        })
        .collect()
}

/// Stress each model with the configured loss streaks, then count the
/// primary-sized wins needed to climb back.
pub fn recovery_stats(inputs: &MarketInputs, config: &SimulationConfig) -> Vec<RecoveryStat> {
    let equity = inputs.equity();
    let rr = inputs.reward_ratio();
    let target = equity * config.recovery_target_ratio;

    let mut stats = Vec::with_capacity(config.recovery_streaks.len() * SizingModel::ALL.len());
    for &losses in &config.recovery_streaks {
        for model in SizingModel::ALL {
            let equity_after = equity_after_streak_with(model, equity, losses, false, rr);
            stats.push(RecoveryStat {
                model,
                losses,
                equity_after,
                drawdown_pct: drawdown_pct(equity, equity_after),
                wins_to_recover: wins_to_reach(
                    SizingModel::PowerDecay,
                    equity_after,
                    target,
                    rr,
                    config.recovery_cap,
                ),
            });
        }
    }
    stats
}

fn headline(inputs: &MarketInputs) -> Headline {
    let equity = inputs.equity();
    let primary = SizingModel::PowerDecay;

    Headline {
        equity,
        risk_fraction: primary.risk_fraction(equity),
        dollar_risk: primary.dollar_risk(equity),
        kelly_fraction: kelly_fraction(inputs.win_rate(), inputs.reward_ratio()),
        losses_to_ruin: consecutive_losses_to_ruin(equity),
        growth: SizingModel::ALL
            .iter()
            .map(|&model| {
                let growth_rate =
                    model_growth_rate(model, equity, inputs.win_rate(), inputs.reward_ratio());
                ModelGrowth {
                    model,
                    risk_fraction: model.risk_fraction(equity),
                    growth_rate,
                    profitable: growth_rate > 0.0,
                }
            })
            .collect(),
    }
}

impl std::fmt::Display for MetricsResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let h = &self.headline;
        writeln!(f, "\n{:=^72}", " RISK METRICS ")?;
        writeln!(f)?;
        writeln!(f, "Equity:        ${:.2}", h.equity)?;
        writeln!(f, "Win Rate:      {:.1}%", self.inputs.win_rate_percent())?;
        writeln!(f, "Reward Ratio:  {:.2}", self.inputs.reward_ratio())?;
        writeln!(f, "Risk Fraction: {:.2}%", h.risk_fraction * 100.0)?;
        writeln!(f, "Dollar Risk:   ${:.2}", h.dollar_risk)?;
        writeln!(f, "Full Kelly:    {:.2}%", h.kelly_fraction * 100.0)?;
        writeln!(f, "Losses to Ruin: {}", h.losses_to_ruin)?;
        writeln!(f)?;
        writeln!(f, "--- Growth Rate (per trade) ---")?;
        for g in &h.growth {
            writeln!(
                f,
                "{:<12} f={:>6.2}%  g={:>10.5}  {}",
                g.model.label(),
                g.risk_fraction * 100.0,
                g.growth_rate,
                if g.profitable { "profitable" } else { "not profitable" }
            )?;
        }
        writeln!(f)?;
        writeln!(f, "--- Terminal Equity & Drawdown ---")?;
        writeln!(
            f,
            "{:<12} {:>14} {:>14} {:>14} {:>8} {:>8}",
            "MODEL", "P25", "MEDIAN", "P75", "DD50", "DD90"
        )?;
        for p in &self.projections {
            writeln!(
                f,
                "{:<12} {:>14.2} {:>14.2} {:>14.2} {:>7.1}% {:>7.1}%",
                p.model.label(),
                p.terminal.p25,
                p.terminal.median,
                p.terminal.p75,
                p.drawdown.median * 100.0,
                p.drawdown.p90 * 100.0
            )?;
        }
        writeln!(f)?;
        writeln!(f, "--- Full Map ---")?;
        writeln!(
            f,
            "{:>12} {:>7} {:>12} {:>12} {:>12} {:>7} {:>10} {:>5}",
            "EQUITY", "RISK%", "$RISK", "GAIN", "AFTER 3L", "DD3%", "GROWTH", "RUIN"
        )?;
        for row in &self.full_map {
            writeln!(
                f,
                "{:>12.0} {:>6.2}% {:>12.2} {:>12.2} {:>12.2} {:>6.1}% {:>10.5} {:>5}",
                row.equity,
                row.risk_fraction * 100.0,
                row.dollar_risk,
                row.projected_gain,
                row.after_three_losses,
                row.drawdown_after_three_pct,
                row.growth_rate,
                row.losses_to_ruin
            )?;
        }
        writeln!(f)?;
        writeln!(f, "--- Recovery ---")?;
        for r in &self.recovery {
            let wins = r
                .wins_to_recover
                .map(|w| w.to_string())
                .unwrap_or_else(|| "never".to_string());
            writeln!(
                f,
                "{:<12} {} losses: -{:>5.1}%  wins to recover: {}",
                r.model.label(),
                r.losses,
                r.drawdown_pct,
                wins
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "Survival to anchor: {:.1}%",
            self.survival_probability * 100.0
        )?;
        writeln!(f, "{:=^72}", "")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::ANCHOR_EQUITY;

    fn small_config() -> SimulationConfig {
        SimulationConfig {
            metrics_paths: 120,
            survival_paths: 600,
            ..Default::default()
        }
    }

    fn inputs(equity: f64, win: f64, rr: f64) -> MarketInputs {
        MarketInputs::new(equity, win, rr).unwrap()
    }

    #[test]
    fn test_heavy_metrics_deterministic() {
        let config = SimulationConfig::default();
        let cancel = CancelToken::new();
        let i = inputs(87_500.0, 60.0, 1.5);

        let a = compute_heavy_metrics(&i, &config, &cancel).unwrap();
        let b = compute_heavy_metrics(&i, &config, &cancel).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_result_shape() {
        let config = small_config();
        let result =
            compute_heavy_metrics(&inputs(150_000.0, 55.0, 1.5), &config, &CancelToken::new())
                .unwrap();

        assert_eq!(result.projections.len(), 3);
        assert_eq!(result.projections[0].model, SizingModel::PowerDecay);
        for p in &result.projections {
            // steps 0, 2, ..., 100
            assert_eq!(p.bands.len(), 51);
            assert_eq!(p.bands[0].median, 150_000.0);
            assert_eq!(p.bands.last().unwrap().step, 100);
            assert!(p.terminal.p25 <= p.terminal.median);
            assert!(p.terminal.median <= p.terminal.p75);
            assert!(p.drawdown.median <= p.drawdown.p90);
            assert!((0.0..=1.0).contains(&p.drawdown.p90));
        }

        assert_eq!(result.full_map.len(), config.reference_equities.len());
        assert_eq!(result.recovery.len(), 6);
        assert!((0.0..=1.0).contains(&result.survival_probability));
    }

    #[test]
    fn test_seeds_are_fixed_per_model() {
        let config = small_config();
        let result =
            compute_heavy_metrics(&inputs(100_000.0, 50.0, 1.0), &config, &CancelToken::new())
                .unwrap();
        let fixed = result.projection(SizingModel::FixedFraction).unwrap();
        assert_eq!(fixed.seed, config.seeds.fixed_fraction);
    }

    #[test]
    fn test_survival_improves_with_edge() {
        let config = SimulationConfig::default();
        let cancel = CancelToken::new();

        let strong = survival_probability(&inputs(50_000.0, 70.0, 2.0), &config, &cancel).unwrap();
        let weak = survival_probability(&inputs(50_000.0, 50.0, 1.0), &config, &cancel).unwrap();
        assert!(strong > weak, "strong {strong} <= weak {weak}");
    }

    #[test]
    fn test_survival_extremes() {
        let config = small_config();
        let cancel = CancelToken::new();

        let never = survival_probability(&inputs(50_000.0, 0.0, 2.0), &config, &cancel).unwrap();
        assert_eq!(never, 0.0);

        let always = survival_probability(&inputs(50_000.0, 100.0, 2.0), &config, &cancel).unwrap();
        assert_eq!(always, 1.0);
    }

    #[test]
    fn test_full_map_rows() {
        let i = inputs(87_500.0, 60.0, 1.5);
        let rows = full_map(&i, &[20_000.0, ANCHOR_EQUITY]);

        let floor = &rows[0];
        assert_eq!(floor.risk_fraction, 1.0);
        assert_eq!(floor.after_one_loss, 1.0);
        assert_eq!(floor.losses_to_ruin, 1);
        assert_eq!(floor.growth_rate, f64::NEG_INFINITY);

        let anchor = &rows[1];
        assert!((anchor.dollar_risk - 28_875.0).abs() < 1e-6);
        assert!((anchor.projected_gain - 28_875.0 * 1.5).abs() < 1e-6);
        assert!((anchor.after_one_loss - 58_625.0).abs() < 1e-6);
        assert!(anchor.drawdown_after_three_pct > 0.0 && anchor.drawdown_after_three_pct < 100.0);
        assert!(anchor.growth_rate > 0.0);
    }

    #[test]
    fn test_recovery_stats() {
        let config = SimulationConfig::default();
        let stats = recovery_stats(&inputs(1_000_000.0, 55.0, 1.5), &config);

        let primary_3 = stats
            .iter()
            .find(|s| s.model == SizingModel::PowerDecay && s.losses == 3)
            .unwrap();
        let primary_5 = stats
            .iter()
            .find(|s| s.model == SizingModel::PowerDecay && s.losses == 5)
            .unwrap();
        let fixed_3 = stats
            .iter()
            .find(|s| s.model == SizingModel::FixedFraction && s.losses == 3)
            .unwrap();

        assert!(primary_5.drawdown_pct > primary_3.drawdown_pct);
        // The decayed fraction at $1M is far below 33%
        assert!(fixed_3.drawdown_pct > primary_3.drawdown_pct);
        assert!(primary_3.wins_to_recover.unwrap() > 0);
    }

    #[test]
    fn test_recovery_cap() {
        let config = SimulationConfig {
            recovery_cap: 2,
            ..Default::default()
        };
        let stats = recovery_stats(&inputs(50_000.0, 55.0, 0.1), &config);
        assert!(stats.iter().any(|s| s.wins_to_recover.is_none()));
    }

    #[test]
    fn test_headline() {
        let result =
            compute_heavy_metrics(&inputs(20_000.0, 60.0, 1.5), &small_config(), &CancelToken::new())
                .unwrap();
        assert_eq!(result.headline.risk_fraction, 1.0);
        assert_eq!(result.headline.losses_to_ruin, 1);
        assert_eq!(result.headline.growth[0].growth_rate, f64::NEG_INFINITY);
        assert!(!result.headline.growth[0].profitable);
    }

    #[test]
    fn test_cancelled() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = compute_heavy_metrics(&inputs(87_500.0, 60.0, 1.5), &small_config(), &cancel)
            .unwrap_err();
        assert!(matches!(err, crate::error::RiskError::Cancelled { .. }));
    }

    #[test]
    fn test_out_of_domain_equity_is_clamped() {
        let cancel = CancelToken::new();

        let rich = compute_heavy_metrics(&inputs(1e18, 100.0, 1.5), &small_config(), &cancel).unwrap();
        for projection in &rich.projections {
            assert_eq!(projection.bands[0].median, 1e15);
            assert_eq!(projection.terminal.median, 1e15);
            assert_eq!(projection.drawdown.median, 0.0);
        }

        let poor = compute_heavy_metrics(&inputs(0.5, 50.0, 1.5), &small_config(), &cancel).unwrap();
        for projection in &poor.projections {
            assert!(projection.bands.iter().all(|b| b.log10_median >= 0.0));
            assert_eq!(projection.terminal.median, 1.0);
        }
    }

    #[test]
    fn test_display_renders() {
        let result =
            compute_heavy_metrics(&inputs(87_500.0, 60.0, 1.5), &small_config(), &CancelToken::new())
                .unwrap();
        let text = result.to_string();
        assert!(text.contains("RISK METRICS"));
        assert!(text.contains("power-decay"));
    }
}
