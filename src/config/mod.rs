//! Configuration Module - TOML-based Service Configuration
//!
//! Loads and validates configuration from `config.toml` with environment
//! variable overrides for secrets and endpoints. The token registry lives in
//! a separate JSON document (see `registry`).
//! Network addresses are externalized here - nothing is hardcoded in the
//! domain layer.

pub mod loader;
pub mod registry;

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::domain::token::Network;

/// Top-level service configuration.
///
/// Every section has defaults, so an empty file is a valid configuration
/// (single-shot run against the 1inch adapter and Postgres).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
  /// Service identity and run mode.
  #[serde(default)]
  pub service: ServiceConfig,
  /// Blockchain RPC endpoints.
  #[serde(default)]
  pub rpc: RpcConfig,
  /// Secondary-market quote adapter.
  #[serde(default)]
  pub quotes: QuotesConfig,
  /// Observation storage.
  #[serde(default)]
  pub persistence: PersistenceConfig,
  /// Metrics and health endpoints.
  #[serde(default)]
  pub metrics: MetricsConfig,
  /// Extra or overridden networks, merged over the built-in table.
  #[serde(default)]
  pub networks: BTreeMap<String, NetworkConfig>,
}

/// How the supervisor drives the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
  /// Run one cycle and exit.
  #[default]
  SingleShot,
  /// Run a cycle every `period_minutes` until shutdown.
  Continuous,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
  /// Human-readable service name.
  #[serde(default = "default_name")]
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Dry-run mode: observations are computed but not stored.
  #[serde(default)]
  pub dry_run: bool,
  /// Single-shot or continuous.
  #[serde(default)]
  pub mode: RunMode,
  /// Cycle period in continuous mode.
  #[serde(default = "default_period_minutes")]
  pub period_minutes: u64,
  /// Path to the JSON token registry.
  #[serde(default = "default_registry_path")]
  pub registry_path: String,
}

/// RPC configuration for primary-market calls.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
  /// Per-call timeout in seconds.
  #[serde(default = "default_rpc_timeout")]
  pub timeout_seconds: u64,
  /// Network name → HTTP JSON-RPC URL.
  #[serde(default)]
  pub endpoints: BTreeMap<String, String>,
}

/// Which aggregator serves secondary-market quotes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
  /// 1inch swap API.
  #[default]
  OneInch,
  /// ParaSwap prices API.
  Paraswap,
}

/// Quote adapter configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct QuotesConfig {
  /// Active adapter.
  #[serde(default)]
  pub adapter: AdapterKind,
  /// HTTP request timeout in seconds.
  #[serde(default = "default_quote_timeout")]
  pub timeout_seconds: u64,
  /// Minimum spacing between two calls of the adapter (milliseconds).
  #[serde(default = "default_min_delay")]
  pub min_delay_ms: u64,
  /// Random extra spacing on top of `min_delay_ms`; adapter default if unset.
  pub jitter_ms: Option<u64>,
  /// 1inch API base URL.
  #[serde(default = "default_one_inch_url")]
  pub one_inch_base_url: String,
  /// ParaSwap API base URL.
  #[serde(default = "default_paraswap_url")]
  pub paraswap_base_url: String,
  /// 1inch API key (env `ONE_INCH_API_KEY` only).
  #[serde(skip)]
  pub one_inch_api_key: Option<String>,
  /// Outbound HTTP proxy (env `HTTP_PROXY` only).
  #[serde(skip)]
  pub http_proxy: Option<String>,
}

/// Storage backend for observations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkBackend {
  /// `prices` table in Postgres.
  #[default]
  Postgres,
  /// Daily JSONL files under `data_dir`.
  Jsonl,
}

/// Persistence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
  /// Storage backend (ignored in dry-run mode).
  #[serde(default)]
  pub backend: SinkBackend,
  /// Directory for JSONL observation files.
  #[serde(default = "default_data_dir")]
  pub data_dir: String,
  /// Postgres connection string (env `DATABASE_URL` only).
  #[serde(skip)]
  pub database_url: Option<String>,
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Serve /live, /ready and /metrics in continuous mode.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Bind address of the health/metrics server.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
}

/// One network entry in `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NetworkConfig {
  /// EVM chain id.
  pub chain_id: u64,
  /// Reference asset address quotes are expressed in.
  pub reference_asset: String,
}

/// Native-ETH placeholder address understood by the aggregators.
pub const NATIVE_ETH: &str = "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee";

impl AppConfig {
  /// Built-in networks overlaid with the ones configured in `[networks]`.
  pub fn network_table(&self) -> BTreeMap<String, Network> {
    let mut table: BTreeMap<String, Network> = builtin_networks()
      .into_iter()
      .map(|(name, chain_id, asset)| {
        (
          name.to_string(),
          Network {
            name: name.to_string(),
            chain_id,
            reference_asset: asset.to_string(),
          },
        )
      })
      .collect();

    for (name, net) in &self.networks {
      table.insert(
        name.clone(),
        Network {
          name: name.clone(),
          chain_id: net.chain_id,
          reference_asset: net.reference_asset.clone(),
        },
      );
    }

    table
  }
}

/// Networks tracked out of the box: (name, chain id, reference asset).
fn builtin_networks() -> [(&'static str, u64, &'static str); 7] {
  [
    ("ethereum", 1, NATIVE_ETH),
    ("arbitrum", 42161, NATIVE_ETH),
    ("optimism", 10, NATIVE_ETH),
    ("polygon", 137, "0x7ceB23fD6bC0adD59E62ac25578270cFf1b9f619"),
    ("gnosis", 100, "0x6a023ccd1ff6f2045c3309768ead9e68f978f6e1"),
    ("base", 8453, NATIVE_ETH),
    ("zksync", 324, NATIVE_ETH),
  ]
}

impl Default for ServiceConfig {
  fn default() -> Self {
    Self {
      name: default_name(),
      log_level: default_log_level(),
      dry_run: false,
      mode: RunMode::default(),
      period_minutes: default_period_minutes(),
      registry_path: default_registry_path(),
    }
  }
}

impl Default for RpcConfig {
  fn default() -> Self {
    Self {
      timeout_seconds: default_rpc_timeout(),
      endpoints: BTreeMap::new(),
    }
  }
}

impl Default for QuotesConfig {
  fn default() -> Self {
    Self {
      adapter: AdapterKind::default(),
      timeout_seconds: default_quote_timeout(),
      min_delay_ms: default_min_delay(),
      jitter_ms: None,
      one_inch_base_url: default_one_inch_url(),
      paraswap_base_url: default_paraswap_url(),
      one_inch_api_key: None,
      http_proxy: None,
    }
  }
}

impl Default for PersistenceConfig {
  fn default() -> Self {
    Self {
      backend: SinkBackend::default(),
      data_dir: default_data_dir(),
      database_url: None,
    }
  }
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      bind_address: default_metrics_addr(),
    }
  }
}

// Default value functions for serde

fn default_name() -> String {
  "lst-price-fetcher".to_string()
}

fn default_log_level() -> String {
  "info".to_string()
}

const fn default_true() -> bool {
  true
}

const fn default_period_minutes() -> u64 {
  5
}

fn default_registry_path() -> String {
  "tokens.json".to_string()
}

const fn default_rpc_timeout() -> u64 {
  10
}

const fn default_quote_timeout() -> u64 {
  30
}

const fn default_min_delay() -> u64 {
  1_000
}

fn default_one_inch_url() -> String {
  "https://api.1inch.dev".to_string()
}

fn default_paraswap_url() -> String {
  "https://apiv5.paraswap.io".to_string()
}

fn default_data_dir() -> String {
  "data".to_string()
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}
