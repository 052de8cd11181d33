//! basketlab runner: scenario replay on top of `basketlab-core`.
//!
//! This crate provides:
//! - TOML scenario configs with content-hash ids
//! - Price paths from inline lists, CSV files, or seeded random walks
//! - A deterministic keeper simulation of feeds, trigger, manager and token
//! - Parallel batches and JSON/CSV reports

pub mod batch;
pub mod config;
pub mod price_path;
pub mod report;
pub mod simulator;

pub use batch::{load_scenarios, run_batch, save_batch, summarize, BatchOutcome, BatchRow};
pub use config::{ConfigError, ScenarioConfig, ScenarioId};
pub use price_path::{load_path, PathError, PricePath};
pub use report::{export_json, import_json, SimulationReport, SCHEMA_VERSION};
pub use simulator::{run_scenario, RunError, Simulation};
