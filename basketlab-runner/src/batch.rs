//! Parallel scenario batches.

use std::path::{Path, PathBuf};

use alloy_primitives::U256;
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use basketlab_core::math::{format_scaled, u256_dec};

use crate::config::ScenarioConfig;
use crate::report::{save_artifacts, SimulationReport};
use crate::simulator::{run_scenario, RunError};

/// One scenario's result. A failing scenario does not stop the batch.
#[derive(Debug)]
pub struct BatchOutcome {
    pub scenario: String,
    pub result: Result<SimulationReport, RunError>,
}

/// Runs every scenario in parallel; outcomes keep the input order.
pub fn run_batch(configs: &[ScenarioConfig]) -> Vec<BatchOutcome> {
    info!(scenarios = configs.len(), "batch started");
    configs
        .par_iter()
        .map(|config| {
            let result = run_scenario(config);
            if let Err(error) = &result {
                warn!(scenario = %config.name, %error, "scenario failed");
            }
            BatchOutcome {
                scenario: config.name.clone(),
                result,
            }
        })
        .collect()
}

/// Load scenario files. Unreadable files fail the whole load.
pub fn load_scenarios(paths: &[PathBuf]) -> Result<Vec<ScenarioConfig>> {
    paths
        .iter()
        .map(|path| {
            ScenarioConfig::from_file(path)
                .with_context(|| format!("failed to load scenario {}", path.display()))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchRow {
    pub scenario: String,
    pub days: usize,
    pub flips: usize,
    pub rotations: usize,
    pub reverted_proposals: usize,
    #[serde(with = "u256_dec")]
    pub final_value_cents: U256,
    pub error: Option<String>,
}

impl BatchRow {
    pub fn from_outcome(outcome: &BatchOutcome) -> Self {
        match &outcome.result {
            Ok(report) => Self {
                scenario: outcome.scenario.clone(),
                days: report.days,
                flips: report.flips.len(),
                rotations: report.rotations(),
                reverted_proposals: report.reverted_proposals,
                final_value_cents: report.final_value_cents,
                error: None,
            },
            Err(error) => Self {
                scenario: outcome.scenario.clone(),
                days: 0,
                flips: 0,
                rotations: 0,
                reverted_proposals: 0,
                final_value_cents: U256::ZERO,
                error: Some(error.to_string()),
            },
        }
    }
}

pub fn summarize(outcomes: &[BatchOutcome]) -> Vec<BatchRow> {
    outcomes.iter().map(BatchRow::from_outcome).collect()
}

pub fn export_summary_csv(rows: &[BatchRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "scenario",
        "days",
        "flips",
        "rotations",
        "reverted",
        "final_value",
        "error",
    ])?;
    for row in rows {
        wtr.write_record([
            &row.scenario,
            &row.days.to_string(),
            &row.flips.to_string(),
            &row.rotations.to_string(),
            &row.reverted_proposals.to_string(),
            &format_scaled(row.final_value_cents, 2),
            row.error.as_deref().unwrap_or(""),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Write each successful report's artifacts plus `summary.csv` under
/// `output_dir`.
pub fn save_batch(outcomes: &[BatchOutcome], output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;
    for outcome in outcomes {
        if let Ok(report) = &outcome.result {
            save_artifacts(report, output_dir)?;
        }
    }
    let summary = output_dir.join("summary.csv");
    std::fs::write(&summary, export_summary_csv(&summarize(outcomes))?)
        .with_context(|| format!("failed to write {}", summary.display()))?;
    Ok(summary)
}
