//! Risklab - equity-dependent position sizing with Monte Carlo projection.
//!
//! This crate provides:
//! - Three sizing models (power decay, cube-root decay, fixed 33%)
//! - Closed-form analytics: growth rate, ruin horizon, streak projection
//! - A seeded, reproducible PRNG and percentile estimator
//! - A metrics engine (trajectory bands, terminal wealth, drawdowns,
//!   survival, recovery) and a milestone first-passage engine
//!
//! ```no_run
//! use risklab::RiskEngine;
//!
//! let engine = RiskEngine::default();
//! let metrics = engine.heavy_metrics(87_500.0, 60.0, 1.5)?;
//! let milestones = engine.milestones(87_500.0, 60.0, 1.5, 555)?;
//! println!("{metrics}");
//! println!("{}", risklab::sim::MilestoneTable(&milestones));
//! # Ok::<(), risklab::RiskError>(())
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod inputs;
pub mod models;
pub mod risk;
pub mod sim;

pub use config::{ModelSeeds, SimulationConfig};
pub use engine::RiskEngine;
pub use error::{Result, RiskError};
pub use inputs::{EquitySource, SettingsProvider, StaticSettings, TradeLedger};
pub use models::{MarketInputs, SimulationParams};
pub use risk::{risk_fraction, SizingModel};
pub use sim::{CancelToken, MetricsResult, MilestoneResult};
