//! Price path loading for the simulator.
//!
//! A path is the base asset's daily dollar price, oldest first, in 18-decimal
//! fixed point. Three sources:
//! 1. Inline decimal strings in the scenario file
//! 2. A CSV file with a named price column
//! 3. A seeded random walk (tagged synthetic in reports)

use std::io::Read;
use std::path::Path;

use alloy_primitives::U256;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use basketlab_core::math::{usd, ParseAmountError, VALUE_TO_CENTS_CONVERSION};

use crate::config::PricePathSpec;

#[derive(Debug, Error)]
pub enum PathError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("csv has no '{0}' column")]
    MissingColumn(String),

    #[error("row {row}: {source}")]
    Price {
        row: usize,
        #[source]
        source: ParseAmountError,
    },

    #[error("price path is empty")]
    Empty,

    #[error("price path has {available} prices, scenario needs {required}")]
    TooShort { required: usize, available: usize },

    #[error("invalid synthetic path: {0}")]
    InvalidSynthetic(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathSource {
    Inline,
    Csv,
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricePath {
    pub prices: Vec<U256>,
    pub source: PathSource,
}

impl PricePath {
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn is_synthetic(&self) -> bool {
        self.source == PathSource::Synthetic
    }

    /// BLAKE3 over the prices, for reports.
    pub fn hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for price in &self.prices {
            hasher.update(&price.to_le_bytes::<32>());
        }
        hasher.finalize().to_hex().to_string()
    }
}

/// Resolve a scenario's path. `scenario` seeds synthetic paths without an
/// explicit seed.
pub fn load_path(spec: &PricePathSpec, scenario: &str) -> Result<PricePath, PathError> {
    let (prices, source) = match spec {
        PricePathSpec::Inline { prices } => (parse_inline(prices)?, PathSource::Inline),
        PricePathSpec::Csv { file, column } => (read_csv(file, column)?, PathSource::Csv),
        PricePathSpec::Synthetic {
            start_price,
            days,
            drift_bps,
            volatility_bps,
            seed,
        } => {
            let start = usd(start_price).map_err(|source| PathError::Price { row: 0, source })?;
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(*seed),
                None => StdRng::from_seed(*blake3::hash(scenario.as_bytes()).as_bytes()),
            };
            let prices = random_walk(start, *days, *drift_bps, *volatility_bps, &mut rng)?;
            (prices, PathSource::Synthetic)
        }
    };
    if prices.is_empty() {
        return Err(PathError::Empty);
    }
    Ok(PricePath { prices, source })
}

pub fn parse_inline(prices: &[String]) -> Result<Vec<U256>, PathError> {
    prices
        .iter()
        .enumerate()
        .map(|(row, p)| usd(p).map_err(|source| PathError::Price { row, source }))
        .collect()
}

pub fn read_csv(file: &Path, column: &str) -> Result<Vec<U256>, PathError> {
    let reader = csv::Reader::from_path(file)?;
    collect_column(reader, column)
}

/// Same as `read_csv`, over any reader.
pub fn read_csv_from<R: Read>(input: R, column: &str) -> Result<Vec<U256>, PathError> {
    collect_column(csv::Reader::from_reader(input), column)
}

fn collect_column<R: Read>(mut reader: csv::Reader<R>, column: &str) -> Result<Vec<U256>, PathError> {
    let index = reader
        .headers()?
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| PathError::MissingColumn(column.to_string()))?;

    let mut prices = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let field = record.get(index).unwrap_or("");
        let price = usd(field).map_err(|source| PathError::Price { row: row + 1, source })?;
        prices.push(price);
    }
    Ok(prices)
}

/// Daily random walk in whole cents: each day moves by `drift_bps` plus a
/// uniform shock in `±volatility_bps`, floored at one cent.
pub fn random_walk(
    start: U256,
    days: usize,
    drift_bps: i64,
    volatility_bps: u64,
    rng: &mut StdRng,
) -> Result<Vec<U256>, PathError> {
    if days == 0 {
        return Err(PathError::InvalidSynthetic("days must be positive".into()));
    }
    if volatility_bps >= 10_000 {
        return Err(PathError::InvalidSynthetic(format!(
            "volatility {volatility_bps} bps must be below 10000"
        )));
    }
    let start_cents: u64 = (start / VALUE_TO_CENTS_CONVERSION)
        .try_into()
        .map_err(|_| PathError::InvalidSynthetic("start price too large".into()))?;
    if start_cents == 0 {
        return Err(PathError::InvalidSynthetic("start price below one cent".into()));
    }

    let volatility = volatility_bps as i64;
    let mut cents = start_cents as i128;
    let mut prices = Vec::with_capacity(days);
    prices.push(U256::from(start_cents) * VALUE_TO_CENTS_CONVERSION);
    for _ in 1..days {
        let shock = if volatility == 0 {
            0
        } else {
            rng.gen_range(-volatility..=volatility)
        };
        let move_bps = (drift_bps + shock) as i128;
        cents = (cents + cents * move_bps / 10_000).max(1);
        prices.push(U256::from(cents as u128) * VALUE_TO_CENTS_CONVERSION);
    }
    Ok(prices)
}
