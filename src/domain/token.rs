//! Token registry types.
//!
//! Static description of the tracked liquid staking tokens and the networks
//! they trade on. Built once at startup by `config::registry` and shared
//! read-only for the lifetime of the process.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Lightweight network identifier (e.g. `"ethereum"`, `"arbitrum"`).
pub type NetworkName = String;

/// A blockchain network and the asset quotes are expressed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    /// Network name as used in the registry and the store.
    pub name: NetworkName,
    /// EVM chain id.
    pub chain_id: u64,
    /// Address of the reference asset (native ETH placeholder or wrapped ETH).
    pub reference_asset: String,
}

/// Read-only contract call giving a token's canonical exchange rate.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryAccessor {
    /// Home network the contract lives on.
    pub network: NetworkName,
    /// Contract address.
    pub contract: String,
    /// JSON ABI fragment containing at least `function`.
    pub abi: serde_json::Value,
    /// Zero-argument view function returning the rate in base units.
    pub function: String,
}

/// Where a token can be traded on one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Network name.
    pub network: NetworkName,
    /// Token address on that network.
    pub address: String,
}

/// A tracked liquid staking token.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Short symbolic name, unique within the registry.
    pub name: String,
    /// Primary-market accessor; `None` when the token has no on-chain rate.
    pub primary_market: Option<PrimaryAccessor>,
    /// Listings in registry order.
    pub listings: Vec<Listing>,
}

/// Immutable set of tokens plus the network table they reference.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    tokens: Vec<Token>,
    networks: BTreeMap<NetworkName, Network>,
}

impl TokenRegistry {
    /// Assemble a registry. Validation happens in the loader.
    pub const fn new(tokens: Vec<Token>, networks: BTreeMap<NetworkName, Network>) -> Self {
        Self { tokens, networks }
    }

    /// Tokens in registry order.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Look up a network by name.
    pub fn network(&self, name: &str) -> Option<&Network> {
        self.networks.get(name)
    }

    /// Number of (token, network) listing pairs.
    pub fn pair_count(&self) -> usize {
        self.tokens.iter().map(|t| t.listings.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(network: &str) -> Listing {
        Listing {
            network: network.to_string(),
            address: format!("0x{network}"),
        }
    }

    #[test]
    fn test_pair_count_sums_listings() {
        let token = Token {
            name: "rETH".into(),
            primary_market: None,
            listings: vec![listing("ethereum"), listing("arbitrum")],
        };
        let registry = TokenRegistry::new(vec![token.clone(), token], BTreeMap::new());
        assert_eq!(registry.pair_count(), 4);
    }
}
