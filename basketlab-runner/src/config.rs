//! Scenario configuration, loaded from TOML.
//!
//! A scenario names the asset pair, the starting collateral, the feed and
//! trigger that watch the base asset, the manager settings, and the price
//! path the simulation replays. Dollar prices are decimal strings.

use std::path::{Path, PathBuf};

use alloy_primitives::{Address, U256};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use basketlab_core::allocation::DEFAULT_MIN_NATURAL_UNIT;
use basketlab_core::manager::ManagerConfig;
use basketlab_core::math::{u256_dec, usd, ParseAmountError};
use basketlab_core::triggers::TriggerConfig;

const HOUR: u64 = 3_600;
const DAY: u64 = 86_400;

/// Content hash of a scenario (hex BLAKE3 over its JSON form).
pub type ScenarioId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse scenario: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid price: {0}")]
    Price(#[from] ParseAmountError),

    #[error("invalid scenario: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    /// Midnight UTC of this date is the first simulated instant.
    pub start_date: NaiveDate,
    pub base: AssetSpec,
    pub quote: AssetSpec,
    pub collateral: CollateralSpec,
    #[serde(default)]
    pub feed: FeedSpec,
    pub trigger: TriggerSpec,
    pub manager: ManagerConfig,
    #[serde(default)]
    pub token: TokenSpec,
    pub path: PricePathSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSpec {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
    /// Fixed dollar price. Required for the quote asset; the base asset
    /// follows the price path.
    #[serde(default)]
    pub price: Option<String>,
}

/// Which asset the basket starts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Base,
    Quote,
}

/// The two seeded single-asset sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralSpec {
    #[serde(with = "u256_dec")]
    pub base_units: U256,
    #[serde(with = "u256_dec")]
    pub base_natural_unit: U256,
    #[serde(with = "u256_dec")]
    pub quote_units: U256,
    #[serde(with = "u256_dec")]
    pub quote_natural_unit: U256,
    pub start_in: Side,
    #[serde(with = "u256_dec", default = "default_min_natural_unit")]
    pub min_natural_unit: U256,
}

fn default_min_natural_unit() -> U256 {
    DEFAULT_MIN_NATURAL_UNIT
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSpec {
    pub update_interval: u64,
    pub max_data_points: usize,
    pub interpolation_threshold: u64,
    /// Leading path prices used to seed the feed history.
    pub history: usize,
}

impl Default for FeedSpec {
    fn default() -> Self {
        Self {
            update_interval: DAY,
            max_data_points: 200,
            interpolation_threshold: HOUR,
            history: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AverageKind {
    #[default]
    Sma,
    Ema,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConditionSpec {
    /// Bullish while spot is above the moving average.
    MaCrossover {
        period: usize,
        #[serde(default)]
        average: AverageKind,
    },
    /// RSI band: bullish at or above `upper`, bearish below `lower`.
    Rsi { period: usize, lower: u64, upper: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerSpec {
    pub condition: ConditionSpec,
    #[serde(flatten)]
    pub timing: TriggerConfig,
}

/// Token timing and the keeper's clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSpec {
    pub rebalance_interval: u64,
    /// Time a proposal waits before the auction starts.
    pub proposal_period: u64,
    /// Time from auction start to settlement.
    pub auction_duration: u64,
    /// Keeper tick.
    pub step: u64,
}

impl Default for TokenSpec {
    fn default() -> Self {
        Self {
            rebalance_interval: DAY,
            proposal_period: HOUR,
            auction_duration: 2 * HOUR,
            step: HOUR,
        }
    }
}

/// Daily base-asset prices, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum PricePathSpec {
    Inline {
        prices: Vec<String>,
    },
    Csv {
        file: PathBuf,
        #[serde(default = "default_price_column")]
        column: String,
    },
    /// Seeded random walk in whole cents.
    Synthetic {
        start_price: String,
        days: usize,
        #[serde(default)]
        drift_bps: i64,
        #[serde(default = "default_volatility_bps")]
        volatility_bps: u64,
        /// Defaults to a hash of the scenario name.
        #[serde(default)]
        seed: Option<u64>,
    },
}

fn default_price_column() -> String {
    "price".into()
}

fn default_volatility_bps() -> u64 {
    200
}

impl ScenarioConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: ScenarioConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a scenario file. Relative CSV paths resolve against the file's
    /// directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if let PricePathSpec::Csv { file, .. } = &mut config.path {
            if file.is_relative() {
                if let Some(dir) = path.parent() {
                    *file = dir.join(&*file);
                }
            }
        }
        Ok(config)
    }

    pub fn scenario_id(&self) -> ScenarioId {
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    pub fn quote_price(&self) -> Result<U256, ConfigError> {
        let price = self.quote.price.as_deref().ok_or_else(|| {
            ConfigError::Invalid(format!("quote asset {} needs a fixed price", self.quote.symbol))
        })?;
        Ok(usd(price)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("scenario name is empty".into()));
        }
        if self.base.address == self.quote.address {
            return Err(ConfigError::Invalid("base and quote assets share an address".into()));
        }
        self.quote_price()?;
        if self.feed.history == 0 {
            return Err(ConfigError::Invalid("feed history must seed at least one price".into()));
        }
        if self.feed.history > self.feed.max_data_points {
            return Err(ConfigError::Invalid(format!(
                "feed history {} exceeds capacity {}",
                self.feed.history, self.feed.max_data_points
            )));
        }
        if self.token.step == 0 || self.token.step > self.feed.update_interval {
            return Err(ConfigError::Invalid(format!(
                "keeper step {} must be in 1..={}",
                self.token.step, self.feed.update_interval
            )));
        }
        let needed = match self.trigger.condition {
            ConditionSpec::MaCrossover { period, .. } => period,
            ConditionSpec::Rsi { period, .. } => period + 1,
        };
        if needed == 0 {
            return Err(ConfigError::Invalid("indicator period must be positive".into()));
        }
        if needed > self.feed.max_data_points {
            return Err(ConfigError::Invalid(format!(
                "indicator needs {needed} points, feed holds {}",
                self.feed.max_data_points
            )));
        }
        self.manager
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let expected = match self.collateral.start_in {
            Side::Base => self.manager.bullish_base_asset_allocation,
            Side::Quote => self.manager.bearish_base_asset_allocation(),
        };
        if self.manager.initial_base_asset_allocation != expected {
            return Err(ConfigError::Invalid(format!(
                "initial allocation {} does not match a basket starting in the {:?} asset",
                self.manager.initial_base_asset_allocation, self.collateral.start_in
            )));
        }
        Ok(())
    }
}
