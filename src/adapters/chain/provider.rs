//! RPC Providers - alloy-rs 0.9 Connection Management
//!
//! Holds one HTTP JSON-RPC provider per configured network. URLs come from
//! `config.toml` / `WEB3_PROVIDER` (never hardcoded). Endpoint URLs are
//! validated at startup; reachability is checked best-effort only, since an
//! unreachable node is a per-cycle condition and not a startup failure.

use std::collections::BTreeMap;

use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::transports::http::{Client, Http};
use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::domain::token::Network;

/// Concrete provider type returned by `ProviderBuilder::on_http`.
pub type HttpProvider = RootProvider<Http<Client>>;

/// JSON-RPC providers keyed by network name.
pub struct RpcProviders {
    providers: BTreeMap<String, HttpProvider>,
}

impl RpcProviders {
    /// Build providers for every configured endpoint.
    ///
    /// # Errors
    /// Fails if an endpoint URL cannot be parsed.
    pub fn new(endpoints: &BTreeMap<String, String>) -> Result<Self> {
        let mut providers = BTreeMap::new();
        for (network, url) in endpoints {
            let parsed = url
                .parse()
                .with_context(|| format!("Invalid RPC URL for {network}"))?;
            providers.insert(network.clone(), ProviderBuilder::new().on_http(parsed));
        }
        Ok(Self { providers })
    }

    /// Provider for `network`, if an endpoint was configured.
    pub fn get(&self, network: &str) -> Option<&HttpProvider> {
        self.providers.get(network)
    }

    /// Query each node's chain id and warn about mismatches or outages.
    #[instrument(skip_all)]
    pub async fn verify(&self, networks: &BTreeMap<String, Network>) {
        for (name, provider) in &self.providers {
            match provider.get_chain_id().await {
                Ok(chain_id) => match networks.get(name) {
                    Some(expected) if expected.chain_id != chain_id => warn!(
                        network = %name,
                        expected = expected.chain_id,
                        actual = chain_id,
                        "Chain ID mismatch for RPC endpoint"
                    ),
                    _ => info!(network = %name, chain_id, "Connected to RPC"),
                },
                Err(e) => warn!(
                    network = %name,
                    error = %e,
                    "RPC endpoint unreachable, primary rates will be skipped until it recovers"
                ),
            }
        }
    }
}
