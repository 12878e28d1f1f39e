//! Blockchain network identification and registry.
//!
//! Maps human-readable network names (e.g. `"hedera-testnet"`) to namespaced
//! chain identifiers (e.g. `hedera:testnet`).
//!
//! Concrete network data lives in chain-specific crates:
//!
//! - `p402-hedera` provides `HEDERA_NETWORKS` for Hedera environments
//! - `p402-ton` provides `TON_NETWORKS` for TON environments
//!
//! Applications assemble a [`NetworkRegistry`] from these slices at startup.

use std::collections::HashMap;

use crate::chain::ChainId;

/// A known network definition with its chain ID and human-readable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkInfo {
    /// Human-readable network name (e.g. "hedera-testnet", "ton")
    pub name: &'static str,
    /// Chain namespace (e.g. "hedera", "ton")
    pub namespace: &'static str,
    /// Chain reference (e.g. "testnet", "mainnet")
    pub reference: &'static str,
}

impl NetworkInfo {
    /// Create a `ChainId` from this network info
    #[must_use]
    pub fn chain_id(&self) -> ChainId {
        ChainId::new(self.namespace, self.reference)
    }
}

/// Registry that maps network names to [`ChainId`] values and vice versa.
///
/// Built from one or more `&[NetworkInfo]` slices provided by chain-specific
/// crates.
#[derive(Debug, Clone, Default)]
pub struct NetworkRegistry {
    name_to_chain_id: HashMap<&'static str, ChainId>,
    chain_id_to_name: HashMap<ChainId, &'static str>,
}

impl NetworkRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry pre-populated from a network info slice.
    #[must_use]
    pub fn from_networks(networks: &[NetworkInfo]) -> Self {
        let mut registry = Self::new();
        registry.register(networks);
        registry
    }

    /// Registers additional networks into this registry.
    pub fn register(&mut self, networks: &[NetworkInfo]) {
        for info in networks {
            self.name_to_chain_id.insert(info.name, info.chain_id());
            self.chain_id_to_name.insert(info.chain_id(), info.name);
        }
    }

    /// Builder-style method: registers additional networks and returns `self`.
    #[must_use]
    pub fn with_networks(mut self, networks: &[NetworkInfo]) -> Self {
        self.register(networks);
        self
    }

    /// Looks up a [`ChainId`] by its human-readable network name.
    #[must_use]
    pub fn chain_id_by_name(&self, name: &str) -> Option<&ChainId> {
        self.name_to_chain_id.get(name)
    }

    /// Looks up a human-readable network name by its [`ChainId`].
    #[must_use]
    pub fn name_by_chain_id(&self, chain_id: &ChainId) -> Option<&'static str> {
        self.chain_id_to_name.get(chain_id).copied()
    }

    /// Returns the number of registered networks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.name_to_chain_id.len()
    }

    /// Returns `true` if no networks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name_to_chain_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_NETWORKS: &[NetworkInfo] = &[
        NetworkInfo {
            name: "hedera-testnet",
            namespace: "hedera",
            reference: "testnet",
        },
        NetworkInfo {
            name: "ton",
            namespace: "ton",
            reference: "mainnet",
        },
    ];

    #[test]
    fn lookup_both_directions() {
        let registry = NetworkRegistry::from_networks(TEST_NETWORKS);
        let chain_id = registry.chain_id_by_name("hedera-testnet").unwrap();
        assert_eq!(chain_id, &ChainId::new("hedera", "testnet"));
        assert_eq!(registry.name_by_chain_id(chain_id), Some("hedera-testnet"));
    }

    #[test]
    fn unknown_name_is_none() {
        let registry = NetworkRegistry::from_networks(TEST_NETWORKS);
        assert!(registry.chain_id_by_name("base").is_none());
    }
}
