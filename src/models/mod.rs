//! Data models shared by the engines.

mod params;

pub use params::{MarketInputs, SimulationParams};
