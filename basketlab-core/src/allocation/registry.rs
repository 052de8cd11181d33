//! Collateral-set registry: membership checks and set creation.

use crate::domain::collateral::{CollateralError, CollateralSet};
use crate::error::ErrorCategory;
use alloy_primitives::{Address, U256};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("invalid collateral set: {0}")]
    Collateral(#[from] CollateralError),

    #[error("set {0} already registered")]
    AlreadyRegistered(Address),

    #[error("unknown set {0}")]
    UnknownSet(Address),

    #[error("set address must be non-zero")]
    ZeroAddress,

    #[error("set {0} is not the most recently created set")]
    NotLatestCreated(Address),
}

impl RegistryError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RegistryError::Collateral(_) | RegistryError::ZeroAddress => ErrorCategory::Validation,
            RegistryError::AlreadyRegistered(_) | RegistryError::NotLatestCreated(_) => {
                ErrorCategory::State
            }
            RegistryError::UnknownSet(_) => ErrorCategory::Data,
        }
    }
}

/// Parameters of a set to deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSetRequest {
    pub components: Vec<Address>,
    pub units: Vec<U256>,
    pub natural_unit: U256,
    pub name: String,
    pub symbol: String,
}

pub trait SetRegistry: Send + Sync {
    /// Registered and enabled.
    fn is_valid_set(&self, address: Address) -> bool;

    /// Contents of a registered set, enabled or not.
    fn set(&self, address: Address) -> Option<&CollateralSet>;

    /// Deploy and register a new set, returning its address.
    fn create_set(&mut self, request: CreateSetRequest) -> Result<Address, RegistryError>;

    /// Undo the latest `create_set`, for a caller whose own call reverted
    /// after the set was created.
    fn remove_created_set(&mut self, address: Address) -> Result<(), RegistryError>;
}

/// Registry held in memory. New addresses are the low 20 bytes of a BLAKE3
/// digest over the set contents and a creation nonce, so creation order fully
/// determines them.
#[derive(Debug, Clone, Default)]
pub struct InMemorySetRegistry {
    sets: HashMap<Address, CollateralSet>,
    disabled: HashSet<Address>,
    created: Vec<Address>,
}

impl InMemorySetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an existing set under its own address.
    pub fn register(&mut self, set: CollateralSet) -> Result<Address, RegistryError> {
        if set.address == Address::ZERO {
            return Err(RegistryError::ZeroAddress);
        }
        if self.sets.contains_key(&set.address) {
            return Err(RegistryError::AlreadyRegistered(set.address));
        }
        let address = set.address;
        self.sets.insert(address, set);
        Ok(address)
    }

    pub fn disable_set(&mut self, address: Address) -> Result<(), RegistryError> {
        if !self.sets.contains_key(&address) {
            return Err(RegistryError::UnknownSet(address));
        }
        self.disabled.insert(address);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Sets created through `create_set`.
    pub fn created_count(&self) -> u64 {
        self.created.len() as u64
    }

    fn derive_address(&self, request: &CreateSetRequest) -> Address {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"basketlab.set");
        hasher.update(&self.created_count().to_be_bytes());
        for c in &request.components {
            hasher.update(c.as_slice());
        }
        for u in &request.units {
            hasher.update(&u.to_be_bytes::<32>());
        }
        hasher.update(&request.natural_unit.to_be_bytes::<32>());
        hasher.update(request.symbol.as_bytes());
        let digest = hasher.finalize();
        Address::from_slice(&digest.as_bytes()[12..])
    }
}

impl SetRegistry for InMemorySetRegistry {
    fn is_valid_set(&self, address: Address) -> bool {
        self.sets.contains_key(&address) && !self.disabled.contains(&address)
    }

    fn set(&self, address: Address) -> Option<&CollateralSet> {
        self.sets.get(&address)
    }

    fn create_set(&mut self, request: CreateSetRequest) -> Result<Address, RegistryError> {
        let address = self.derive_address(&request);
        let set = CollateralSet::new(
            address,
            request.components,
            request.units,
            request.natural_unit,
        )?;
        self.register(set)?;
        self.created.push(address);
        info!(set = %address, name = %request.name, symbol = %request.symbol, "collateral set created");
        Ok(address)
    }

    fn remove_created_set(&mut self, address: Address) -> Result<(), RegistryError> {
        if self.created.last() != Some(&address) {
            return Err(RegistryError::NotLatestCreated(address));
        }
        self.created.pop();
        self.sets.remove(&address);
        self.disabled.remove(&address);
        info!(set = %address, "collateral set creation undone");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(units: u64) -> CreateSetRequest {
        CreateSetRequest {
            components: vec![Address::repeat_byte(0xee)],
            units: vec![U256::from(units)],
            natural_unit: U256::from(1_000_000u64),
            name: "ETH set".into(),
            symbol: "ETHSET".into(),
        }
    }

    #[test]
    fn created_sets_are_valid_and_distinct() {
        let mut registry = InMemorySetRegistry::new();
        let a = registry.create_set(request(1)).unwrap();
        let b = registry.create_set(request(1)).unwrap();
        assert_ne!(a, b);
        assert!(registry.is_valid_set(a));
        assert_eq!(registry.set(a).unwrap().get_units(), &[U256::from(1u64)]);
        assert_eq!(registry.created_count(), 2);
    }

    #[test]
    fn addresses_are_deterministic() {
        let mut r1 = InMemorySetRegistry::new();
        let mut r2 = InMemorySetRegistry::new();
        assert_eq!(r1.create_set(request(7)).unwrap(), r2.create_set(request(7)).unwrap());
    }

    #[test]
    fn malformed_request_is_rejected_without_side_effects() {
        let mut registry = InMemorySetRegistry::new();
        let err = registry.create_set(request(0)).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert!(registry.is_empty());
        assert_eq!(registry.created_count(), 0);
    }

    #[test]
    fn only_the_latest_creation_can_be_undone() {
        let mut registry = InMemorySetRegistry::new();
        let a = registry.create_set(request(1)).unwrap();
        let b = registry.create_set(request(2)).unwrap();
        assert_eq!(
            registry.remove_created_set(a),
            Err(RegistryError::NotLatestCreated(a))
        );

        registry.remove_created_set(b).unwrap();
        assert!(!registry.is_valid_set(b));
        assert!(registry.set(b).is_none());
        assert_eq!(registry.created_count(), 1);

        // the nonce is reused, so the same request lands on the same address
        assert_eq!(registry.create_set(request(2)).unwrap(), b);
    }

    #[test]
    fn disabled_sets_are_not_valid() {
        let mut registry = InMemorySetRegistry::new();
        let a = registry.create_set(request(1)).unwrap();
        registry.disable_set(a).unwrap();
        assert!(!registry.is_valid_set(a));
        assert!(registry.set(a).is_some());
        assert_eq!(
            registry.disable_set(Address::repeat_byte(1)),
            Err(RegistryError::UnknownSet(Address::repeat_byte(1)))
        );
    }
}
