//! Simulation reports: the persisted record of one scenario run.
//!
//! Reports serialize to JSON with a `schema_version` field; newer versions
//! are rejected on load. Proposals and settlements also export as CSV.

use std::path::{Path, PathBuf};

use alloy_primitives::{Address, U256};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use basketlab_core::domain::RebalanceState;
use basketlab_core::math::{format_scaled, u256_dec};

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Seconds since the epoch as a UTC datetime.
pub fn to_datetime(timestamp: u64) -> DateTime<Utc> {
    i64::try_from(timestamp)
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlipRecord {
    pub timestamp: u64,
    pub at: DateTime<Utc>,
    pub bullish: bool,
    pub flipped_index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRecord {
    pub timestamp: u64,
    pub at: DateTime<Utc>,
    #[serde(with = "u256_dec")]
    pub base_asset_allocation: U256,
    pub next_set: Address,
    /// Cents.
    #[serde(with = "u256_dec")]
    pub current_value: U256,
    #[serde(with = "u256_dec")]
    pub next_value: U256,
    #[serde(with = "u256_dec")]
    pub start_price: U256,
    #[serde(with = "u256_dec")]
    pub pivot_price: U256,
    pub cache_hit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub timestamp: u64,
    pub at: DateTime<Utc>,
    pub set: Address,
    #[serde(with = "u256_dec")]
    pub value_cents: U256,
}

/// Complete result of a single scenario run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub scenario: String,
    pub scenario_id: String,
    pub condition: String,
    /// BLAKE3 of the replayed price path.
    pub path_hash: String,
    pub synthetic: bool,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub days: usize,
    pub ticks: u64,
    pub flips: Vec<FlipRecord>,
    pub proposals: Vec<ProposalRecord>,
    pub settlements: Vec<SettlementRecord>,
    /// Proposals the manager accepted as callable but that then failed.
    pub reverted_proposals: usize,
    pub sets_created: u64,
    pub final_state: RebalanceState,
    pub final_set: Address,
    #[serde(with = "u256_dec")]
    pub final_base_asset_allocation: U256,
    #[serde(with = "u256_dec")]
    pub final_price: U256,
    #[serde(with = "u256_dec")]
    pub final_value_cents: U256,
}

impl SimulationReport {
    pub fn rotations(&self) -> usize {
        self.settlements.len()
    }

    /// One line for terminal output.
    pub fn summary(&self) -> String {
        format!(
            "{}: {} days, {} flips, {} proposals, {} rotations, final value ${} ({} set {})",
            self.scenario,
            self.days,
            self.flips.len(),
            self.proposals.len(),
            self.rotations(),
            format_scaled(self.final_value_cents, 2),
            self.final_state,
            self.final_set,
        )
    }
}

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_json(report: &SimulationReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize SimulationReport to JSON")
}

/// Deserialize a report, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<SimulationReport> {
    let report: SimulationReport =
        serde_json::from_str(json).context("failed to deserialize SimulationReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV ────────────────────────────────────────────────────────────

/// Columns: timestamp, at, allocation, next_set, current_value, next_value,
/// start_price, pivot_price, cache_hit
pub fn export_proposals_csv(proposals: &[ProposalRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "timestamp",
        "at",
        "allocation",
        "next_set",
        "current_value",
        "next_value",
        "start_price",
        "pivot_price",
        "cache_hit",
    ])?;
    for p in proposals {
        wtr.write_record([
            &p.timestamp.to_string(),
            &p.at.to_rfc3339(),
            &p.base_asset_allocation.to_string(),
            &p.next_set.to_string(),
            &format_scaled(p.current_value, 2),
            &format_scaled(p.next_value, 2),
            &p.start_price.to_string(),
            &p.pivot_price.to_string(),
            &p.cache_hit.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

pub fn export_settlements_csv(settlements: &[SettlementRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "at", "set", "value"])?;
    for s in settlements {
        wtr.write_record([
            &s.timestamp.to_string(),
            &s.at.to_rfc3339(),
            &s.set.to_string(),
            &format_scaled(s.value_cents, 2),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifacts ──────────────────────────────────────────────────────

/// File-name-safe form of a scenario name.
pub fn artifact_stem(scenario: &str) -> String {
    let stem: String = scenario
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "scenario".into()
    } else {
        stem
    }
}

pub fn write_report(report: &SimulationReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    std::fs::write(path, export_json(report)?)
        .with_context(|| format!("failed to write {}", path.display()))
}

pub fn read_report(path: &Path) -> Result<SimulationReport> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

/// Save a run under `output_dir/{scenario}/`:
/// - `report.json`
/// - `proposals.csv`
/// - `settlements.csv`
pub fn save_artifacts(report: &SimulationReport, output_dir: &Path) -> Result<PathBuf> {
    let dir = output_dir.join(artifact_stem(&report.scenario));
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    write_report(report, &dir.join("report.json"))?;
    std::fs::write(dir.join("proposals.csv"), export_proposals_csv(&report.proposals)?)
        .context("failed to write proposals.csv")?;
    std::fs::write(
        dir.join("settlements.csv"),
        export_settlements_csv(&report.settlements)?,
    )
    .context("failed to write settlements.csv")?;
    Ok(dir)
}
