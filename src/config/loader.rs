//! Configuration Loader - File Loading, Env Overrides and Validation
//!
//! Handles loading `config.toml`, layering environment variables on top
//! (secrets never live in the file), validating all parameters, and
//! providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};

use super::AppConfig;
use super::registry::MAX_NETWORK_NAME_LEN;

/// Postgres connection string.
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
/// Ethereum JSON-RPC endpoint.
pub const ENV_WEB3_PROVIDER: &str = "WEB3_PROVIDER";
/// 1inch API key.
pub const ENV_ONE_INCH_API_KEY: &str = "ONE_INCH_API_KEY";
/// Outbound proxy for aggregator requests.
pub const ENV_HTTP_PROXY: &str = "HTTP_PROXY";
/// Log level fallback when `RUST_LOG` is unset.
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

/// Load and validate configuration from a TOML file.
///
/// Environment overrides are applied from the process environment.
/// Runs before logging is initialised, so it reports only through its
/// return value.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let mut config = parse_config(&content)?;
  apply_env_overrides(&mut config, |key| std::env::var(key).ok());
  validate_config(&config)?;

  Ok(config)
}

/// Parse TOML content without touching the environment.
///
/// # Errors
/// Returns an error if the TOML is malformed or has wrong field types.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  toml::from_str(content).context("Failed to parse config.toml")
}

/// Layer environment values over the file configuration.
///
/// `lookup` abstracts `std::env::var` so tests need not mutate the
/// process environment. Empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
  F: Fn(&str) -> Option<String>,
{
  let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

  if let Some(url) = get(ENV_DATABASE_URL) {
    config.persistence.database_url = Some(url);
  }
  if let Some(url) = get(ENV_WEB3_PROVIDER) {
    config.rpc.endpoints.insert("ethereum".to_string(), url);
  }
  if let Some(key) = get(ENV_ONE_INCH_API_KEY) {
    config.quotes.one_inch_api_key = Some(key);
  }
  if let Some(proxy) = get(ENV_HTTP_PROXY) {
    config.quotes.http_proxy = Some(proxy);
  }
  if let Some(level) = get(ENV_LOG_LEVEL) {
    config.service.log_level = level;
  }
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Positive period and timeouts
/// - Well-formed network table (names fit the store's network column)
/// - Non-empty endpoints and base URLs
///
/// # Errors
/// Returns the first violated rule.
pub fn validate_config(config: &AppConfig) -> Result<()> {
  anyhow::ensure!(
    config.service.period_minutes > 0,
    "service.period_minutes must be positive, got {}",
    config.service.period_minutes
  );
  anyhow::ensure!(
    !config.service.registry_path.is_empty(),
    "service.registry_path must not be empty"
  );

  anyhow::ensure!(
    config.rpc.timeout_seconds > 0,
    "rpc.timeout_seconds must be positive"
  );
  for (network, url) in &config.rpc.endpoints {
    anyhow::ensure!(
      !url.trim().is_empty(),
      "RPC endpoint for {network} must not be empty"
    );
  }

  anyhow::ensure!(
    config.quotes.timeout_seconds > 0,
    "quotes.timeout_seconds must be positive"
  );
  anyhow::ensure!(
    config.quotes.min_delay_ms >= 1_000,
    "quotes.min_delay_ms must be at least 1000 to respect aggregator rate limits, got {}",
    config.quotes.min_delay_ms
  );
  anyhow::ensure!(
    !config.quotes.one_inch_base_url.is_empty() && !config.quotes.paraswap_base_url.is_empty(),
    "Aggregator base URLs must not be empty"
  );

  for (name, network) in &config.networks {
    anyhow::ensure!(
      !name.is_empty() && name.chars().count() <= MAX_NETWORK_NAME_LEN,
      "Network name {name} must be 1 to {MAX_NETWORK_NAME_LEN} characters"
    );
    anyhow::ensure!(
      network.chain_id > 0,
      "Network {name} has invalid chain_id 0"
    );
    anyhow::ensure!(
      !network.reference_asset.is_empty(),
      "Network {name} has empty reference_asset"
    );
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;
  use crate::config::{AdapterKind, RunMode, SinkBackend};

  #[test]
  fn test_load_nonexistent_file() {
    let result = load_config("nonexistent.toml");
    assert!(result.is_err());
  }

  #[test]
  fn test_empty_file_uses_defaults() {
    let config = parse_config("").unwrap();
    assert_eq!(config.service.mode, RunMode::SingleShot);
    assert_eq!(config.service.period_minutes, 5);
    assert_eq!(config.quotes.adapter, AdapterKind::OneInch);
    assert_eq!(config.persistence.backend, SinkBackend::Postgres);
    assert!(validate_config(&config).is_ok());
  }

  #[test]
  fn test_full_file_parses() {
    let config = parse_config(
      r#"
        [service]
        mode = "continuous"
        period_minutes = 10
        dry_run = true

        [rpc.endpoints]
        ethereum = "https://eth.example"

        [quotes]
        adapter = "paraswap"
        jitter_ms = 500

        [persistence]
        backend = "jsonl"
        data_dir = "/var/lib/lst"

        [networks.linea]
        chain_id = 59144
        reference_asset = "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee"
      "#,
    )
    .unwrap();

    assert_eq!(config.service.mode, RunMode::Continuous);
    assert!(config.service.dry_run);
    assert_eq!(config.quotes.adapter, AdapterKind::Paraswap);
    assert_eq!(config.quotes.jitter_ms, Some(500));
    assert_eq!(config.persistence.backend, SinkBackend::Jsonl);
    assert_eq!(config.rpc.endpoints["ethereum"], "https://eth.example");
    assert_eq!(config.network_table()["linea"].chain_id, 59144);
  }

  #[test]
  fn test_env_overrides_secrets_and_endpoint() {
    let env: HashMap<&str, &str> = HashMap::from([
      (ENV_DATABASE_URL, "postgres://u:p@db/lst"),
      (ENV_WEB3_PROVIDER, "https://rpc.example"),
      (ENV_ONE_INCH_API_KEY, "Bearer abc"),
      (ENV_HTTP_PROXY, ""),
    ]);
    let mut config = AppConfig::default();
    apply_env_overrides(&mut config, |k| env.get(k).map(ToString::to_string));

    assert_eq!(config.persistence.database_url.as_deref(), Some("postgres://u:p@db/lst"));
    assert_eq!(config.rpc.endpoints["ethereum"], "https://rpc.example");
    assert_eq!(config.quotes.one_inch_api_key.as_deref(), Some("Bearer abc"));
    assert!(config.quotes.http_proxy.is_none());
  }

  #[test]
  fn test_rejects_zero_period_and_short_delay() {
    let config = parse_config("[service]\nperiod_minutes = 0").unwrap();
    assert!(validate_config(&config).is_err());

    let config = parse_config("[quotes]\nmin_delay_ms = 200").unwrap();
    assert!(validate_config(&config).is_err());
  }

  #[test]
  fn test_shipped_config_is_valid() {
    let config = parse_config(include_str!("../../config.toml")).unwrap();
    validate_config(&config).unwrap();
    assert_eq!(config.service.mode, RunMode::SingleShot);
    assert_eq!(config.quotes.adapter, AdapterKind::OneInch);
    assert_eq!(config.persistence.backend, SinkBackend::Postgres);
  }

  #[test]
  fn test_rejects_network_name_longer_than_store_column() {
    let ok = parse_config(
      "[networks.arbitrum_nova]\nchain_id = 42170\nreference_asset = \"0xeeee\"",
    )
    .unwrap();
    assert!(validate_config(&ok).is_ok());

    let too_long = parse_config(
      "[networks.arbitrum_nova_mainnet_x]\nchain_id = 42170\nreference_asset = \"0xeeee\"",
    )
    .unwrap();
    let err = validate_config(&too_long).unwrap_err();
    assert!(err.to_string().contains("arbitrum_nova_mainnet_x"));
  }
}
