//! Two-asset allocator with a set cache.

use super::registry::{CreateSetRequest, SetRegistry};
use super::valuation::{
    calculate_set_value, search_natural_unit, value_of_full_set, AssetConfig,
    DEFAULT_MIN_NATURAL_UNIT, MAX_NATURAL_UNIT,
};
use super::AllocationError;
use crate::domain::collateral::{CollateralKey, CollateralSet};
use crate::math::u256_dec;
use alloy_primitives::{Address, U256};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

/// Outcome of a rotation. Values are in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AllocationResult {
    pub next_set: Address,
    #[serde(with = "u256_dec")]
    pub current_value: U256,
    #[serde(with = "u256_dec")]
    pub next_value: U256,
    #[serde(with = "u256_dec")]
    pub next_units: U256,
    #[serde(with = "u256_dec")]
    pub next_natural_unit: U256,
    pub cache_hit: bool,
}

/// A rotation priced and sized but not yet backed by a registered set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationPlan {
    pub current_set: Address,
    pub next_asset: Address,
    pub next_symbol: String,
    pub current_value: U256,
    pub next_value: U256,
    pub next_units: U256,
    pub next_natural_unit: U256,
    pub key: CollateralKey,
    /// Cached set with the same composition, if still valid.
    pub existing_set: Option<Address>,
}

/// Rotates between a base asset (held when bullish) and a quote asset.
#[derive(Debug, Clone)]
pub struct BinaryAllocator {
    base: AssetConfig,
    quote: AssetConfig,
    min_natural_unit: U256,
    cache: HashMap<CollateralKey, Address>,
}

impl BinaryAllocator {
    /// `base_collateral` and `quote_collateral` must be valid sets holding
    /// exactly their asset. Both seed the cache.
    pub fn new(
        base: AssetConfig,
        quote: AssetConfig,
        base_collateral: Address,
        quote_collateral: Address,
        registry: &dyn SetRegistry,
    ) -> Result<Self, AllocationError> {
        if base.address == Address::ZERO || quote.address == Address::ZERO {
            return Err(AllocationError::InvalidConfig("asset addresses must be non-zero".into()));
        }
        if base.address == quote.address {
            return Err(AllocationError::InvalidConfig(
                "base and quote assets must differ".into(),
            ));
        }

        let mut cache = HashMap::new();
        for (asset, set_address) in [(&base, base_collateral), (&quote, quote_collateral)] {
            let set = valid_set(registry, set_address)?;
            let (component, _) = single_component(set)?;
            if component != asset.address {
                return Err(AllocationError::InvalidCollateral {
                    set: set_address,
                    reason: format!("expected component {}, found {component}", asset.address),
                });
            }
            cache.insert(set.key(), set_address);
        }

        Ok(Self {
            base,
            quote,
            min_natural_unit: DEFAULT_MIN_NATURAL_UNIT,
            cache,
        })
    }

    pub fn with_min_natural_unit(mut self, min_natural_unit: U256) -> Result<Self, AllocationError> {
        if min_natural_unit.is_zero() || min_natural_unit > MAX_NATURAL_UNIT {
            return Err(AllocationError::InvalidConfig(format!(
                "min natural unit {min_natural_unit} out of range"
            )));
        }
        self.min_natural_unit = min_natural_unit;
        Ok(self)
    }

    pub fn base(&self) -> &AssetConfig {
        &self.base
    }

    pub fn quote(&self) -> &AssetConfig {
        &self.quote
    }

    pub fn min_natural_unit(&self) -> U256 {
        self.min_natural_unit
    }

    pub fn cached_sets(&self) -> usize {
        self.cache.len()
    }

    fn asset_for(&self, component: Address) -> Option<&AssetConfig> {
        if component == self.base.address {
            Some(&self.base)
        } else if component == self.quote.address {
            Some(&self.quote)
        } else {
            None
        }
    }

    /// Dollar value of one whole set, in cents.
    pub fn calculate_collateral_set_value(&self, set: &CollateralSet) -> Result<U256, AllocationError> {
        let (component, _) = single_component(set)?;
        let asset = self.asset_for(component).ok_or_else(|| AllocationError::InvalidCollateral {
            set: set.address,
            reason: format!("component {component} is neither base nor quote asset"),
        })?;
        let per_full_set = set
            .units_per_full_set(0)?
            .ok_or_else(|| AllocationError::InvalidCollateral {
                set: set.address,
                reason: "set has no units".into(),
            })?;
        Ok(value_of_full_set(asset.price()?, per_full_set, asset.decimals)?)
    }

    /// Work out the rotation of `current_set` into the asset named by
    /// `target` (`0` → quote, `denominator` → base) at equal dollar value.
    /// Reads prices and the registry only.
    pub fn plan_new_allocation(
        &self,
        target: U256,
        denominator: U256,
        current_set: Address,
        registry: &dyn SetRegistry,
    ) -> Result<AllocationPlan, AllocationError> {
        let current = valid_set(registry, current_set)?;
        let (component, _) = single_component(current)?;
        if self.asset_for(component).is_none() {
            return Err(AllocationError::InvalidCollateral {
                set: current_set,
                reason: format!("component {component} is neither base nor quote asset"),
            });
        }

        let next_asset = if denominator.is_zero() {
            None
        } else if target == denominator {
            Some(&self.base)
        } else if target.is_zero() {
            Some(&self.quote)
        } else {
            None
        };
        let next_asset = next_asset.ok_or(AllocationError::InvalidTarget {
            target,
            denominator,
        })?;
        if next_asset.address == component {
            return Err(AllocationError::AllocationUnchanged { set: current_set });
        }

        let current_value = self.calculate_collateral_set_value(current)?;
        if current_value.is_zero() {
            return Err(AllocationError::ZeroValue);
        }

        let next_price = next_asset.price()?;
        let (next_units, next_natural_unit) = search_natural_unit(
            current_value,
            next_price,
            next_asset.decimals,
            self.min_natural_unit,
        )?;
        let next_value =
            calculate_set_value(next_price, next_units, next_natural_unit, next_asset.decimals)?;

        let key = CollateralKey::single(next_asset.address, next_units, next_natural_unit);
        let existing_set = self
            .cache
            .get(&key)
            .copied()
            .filter(|address| registry.is_valid_set(*address));

        Ok(AllocationPlan {
            current_set,
            next_asset: next_asset.address,
            next_symbol: next_asset.symbol.clone(),
            current_value,
            next_value,
            next_units,
            next_natural_unit,
            key,
            existing_set,
        })
    }

    /// Reuse the plan's cached set or create it, recording new sets in the
    /// cache.
    pub fn apply_plan(
        &mut self,
        plan: &AllocationPlan,
        registry: &mut dyn SetRegistry,
    ) -> Result<AllocationResult, AllocationError> {
        let cached = plan
            .existing_set
            .filter(|address| registry.is_valid_set(*address));

        let (next_set, cache_hit) = match cached {
            Some(address) => {
                debug!(set = %address, key = %plan.key, "collateral set cache hit");
                (address, true)
            }
            None => {
                let address = registry.create_set(CreateSetRequest {
                    components: vec![plan.next_asset],
                    units: vec![plan.next_units],
                    natural_unit: plan.next_natural_unit,
                    name: format!("{} collateral", plan.next_symbol),
                    symbol: format!("{}C", plan.next_symbol),
                })?;
                self.cache.insert(plan.key, address);
                (address, false)
            }
        };

        info!(
            from = %plan.current_set,
            to = %next_set,
            asset = %plan.next_symbol,
            current_value = %plan.current_value,
            next_value = %plan.next_value,
            "allocation determined"
        );

        Ok(AllocationResult {
            next_set,
            current_value: plan.current_value,
            next_value: plan.next_value,
            next_units: plan.next_units,
            next_natural_unit: plan.next_natural_unit,
            cache_hit,
        })
    }

    /// `plan_new_allocation` followed by `apply_plan`.
    pub fn determine_new_allocation(
        &mut self,
        target: U256,
        denominator: U256,
        current_set: Address,
        registry: &mut dyn SetRegistry,
    ) -> Result<AllocationResult, AllocationError> {
        let plan = self.plan_new_allocation(target, denominator, current_set, &*registry)?;
        self.apply_plan(&plan, registry)
    }
}

fn valid_set(registry: &dyn SetRegistry, address: Address) -> Result<&CollateralSet, AllocationError> {
    if !registry.is_valid_set(address) {
        return Err(AllocationError::InvalidCollateral {
            set: address,
            reason: "not a valid registered set".into(),
        });
    }
    registry.set(address).ok_or_else(|| AllocationError::InvalidCollateral {
        set: address,
        reason: "set contents unavailable".into(),
    })
}

fn single_component(set: &CollateralSet) -> Result<(Address, U256), AllocationError> {
    set.single_component().ok_or_else(|| AllocationError::InvalidCollateral {
        set: set.address,
        reason: format!("expected one component, found {}", set.get_components().len()),
    })
}
