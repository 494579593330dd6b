//! Token Registry Loader - JSON Document Parsing and Validation
//!
//! Reads the token registry once at startup and resolves it against the
//! network table. Any malformed entry is a fatal startup error: the service
//! never starts a cycle with a registry it only partially understands.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result, bail, ensure};
use serde::Deserialize;
use tracing::info;

use crate::domain::token::{Listing, Network, PrimaryAccessor, Token, TokenRegistry};

/// Longest token name the `prices.token_name` column accepts.
pub const MAX_TOKEN_NAME_LEN: usize = 10;

/// Longest network name the `prices.network` column accepts.
pub const MAX_NETWORK_NAME_LEN: usize = 20;

/// Default home network of primary-market accessors.
const DEFAULT_HOME_NETWORK: &str = "ethereum";

#[derive(Debug, Deserialize)]
struct RegistryDocument {
  tokens: Vec<TokenEntry>,
}

#[derive(Debug, Deserialize)]
struct TokenEntry {
  name: String,
  #[serde(default)]
  primary_market: Option<AccessorEntry>,
  #[serde(default)]
  listings: Vec<Listing>,
}

#[derive(Debug, Deserialize)]
struct AccessorEntry {
  #[serde(default = "default_home_network")]
  network: String,
  #[serde(default)]
  contract: Option<String>,
  abi: serde_json::Value,
  function: String,
}

fn default_home_network() -> String {
  DEFAULT_HOME_NETWORK.to_string()
}

/// Load the registry document at `path`.
///
/// # Errors
/// Fails if the file is unreadable, not valid JSON, or violates any
/// registry rule (see [`parse_registry`]).
pub fn load_registry(path: &str, networks: &BTreeMap<String, Network>) -> Result<TokenRegistry> {
  let path = Path::new(path);
  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read token registry: {}", path.display()))?;

  let registry = parse_registry(&content, networks)
    .with_context(|| format!("Invalid token registry: {}", path.display()))?;

  info!(
    tokens = registry.tokens().len(),
    pairs = registry.pair_count(),
    "Token registry loaded"
  );

  Ok(registry)
}

/// Parse and validate a registry document.
///
/// Rules:
/// - at least one token, names unique, non-empty, at most 10 characters
/// - every listing network exists in `networks`, at most once per token
/// - accessor network exists, ABI is a JSON array declaring `function`,
///   contract given or derivable from the home-network listing
///
/// # Errors
/// Returns the first violated rule.
pub fn parse_registry(content: &str, networks: &BTreeMap<String, Network>) -> Result<TokenRegistry> {
  let doc: RegistryDocument = serde_json::from_str(content).context("Registry is not valid JSON")?;
  ensure!(!doc.tokens.is_empty(), "Registry must define at least one token");

  let mut seen = HashSet::new();
  let mut tokens = Vec::with_capacity(doc.tokens.len());

  for entry in doc.tokens {
    let name = entry.name.trim().to_string();
    ensure!(!name.is_empty(), "Token with empty name");
    ensure!(
      name.chars().count() <= MAX_TOKEN_NAME_LEN,
      "Token name {name} exceeds {MAX_TOKEN_NAME_LEN} characters"
    );
    ensure!(seen.insert(name.clone()), "Duplicate token {name}");

    let mut listed = HashSet::new();
    for listing in &entry.listings {
      ensure!(
        networks.contains_key(&listing.network),
        "Token {name} is listed on unknown network {}",
        listing.network
      );
      ensure!(
        listed.insert(listing.network.as_str()),
        "Token {name} lists network {} twice",
        listing.network
      );
      ensure!(
        !listing.address.trim().is_empty(),
        "Token {name} has an empty address on {}",
        listing.network
      );
    }

    let primary_market = entry
      .primary_market
      .map(|acc| resolve_accessor(&name, acc, &entry.listings, networks))
      .transpose()?;

    tokens.push(Token {
      name,
      primary_market,
      listings: entry.listings,
    });
  }

  Ok(TokenRegistry::new(tokens, networks.clone()))
}

fn resolve_accessor(
  token: &str,
  acc: AccessorEntry,
  listings: &[Listing],
  networks: &BTreeMap<String, Network>,
) -> Result<PrimaryAccessor> {
  ensure!(
    networks.contains_key(&acc.network),
    "Token {token} primary market is on unknown network {}",
    acc.network
  );
  ensure!(
    !acc.function.trim().is_empty(),
    "Token {token} primary market has an empty function name"
  );

  let Some(items) = acc.abi.as_array() else {
    bail!("Token {token} primary market ABI must be a JSON array");
  };
  let declared = items.iter().any(|item| {
    item.get("name").and_then(serde_json::Value::as_str) == Some(acc.function.as_str())
  });
  ensure!(
    declared,
    "Token {token} primary market ABI does not declare {}",
    acc.function
  );

  let contract = match acc.contract {
    Some(c) if !c.trim().is_empty() => c,
    _ => listings
      .iter()
      .find(|l| l.network == acc.network)
      .map(|l| l.address.clone())
      .with_context(|| {
        format!(
          "Token {token} primary market has no contract and no listing on {}",
          acc.network
        )
      })?,
  };

  Ok(PrimaryAccessor {
    network: acc.network,
    contract,
    abi: acc.abi,
    function: acc.function,
  })
}
