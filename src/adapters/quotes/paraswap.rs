//! ParaSwap Adapter - Prices API v5
//!
//! Quotes a SELL of one unit of a token for the network's reference asset
//! via `GET /prices/`. No API key; the public endpoint throttles hard, so
//! calls carry up to two seconds of random jitter by default.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::config::QuotesConfig;
use crate::domain::error::PriceError;
use crate::domain::observation::{BASE_UNIT_DECIMALS, ONE_UNIT};
use crate::ports::quote_source::QuoteSource;

use super::client::{QuoteClientConfig, QuoteHttpClient};
use super::throttle::CallSpacer;
use super::types::{ParaswapPrices, parse_base_units};

/// Adapter name used in logs and errors.
pub const PARASWAP: &str = "paraswap";

/// Chains served by the ParaSwap prices API.
pub const PARASWAP_CHAINS: [u64; 9] = [1, 42161, 10, 137, 43114, 56, 250, 8453, 100];

/// Default random spacing added to the minimum delay.
pub const PARASWAP_DEFAULT_JITTER: Duration = Duration::from_secs(2);

/// Secondary-market quotes from ParaSwap.
pub struct ParaswapQuotes {
  http: QuoteHttpClient,
  base_url: String,
  spacer: CallSpacer,
}

impl ParaswapQuotes {
  /// Create an adapter from explicit parts.
  pub fn new(http: QuoteHttpClient, base_url: impl Into<String>, spacer: CallSpacer) -> Self {
    Self {
      http,
      base_url: base_url.into().trim_end_matches('/').to_string(),
      spacer,
    }
  }

  /// Create an adapter from the `[quotes]` section.
  ///
  /// # Errors
  /// Fails if the HTTP client cannot be built.
  pub fn from_config(config: &QuotesConfig) -> Result<Self> {
    let http = QuoteHttpClient::new(
      PARASWAP,
      &QuoteClientConfig {
        timeout: Duration::from_secs(config.timeout_seconds),
        proxy: config.http_proxy.clone(),
      },
    )?;

    let jitter = config
      .jitter_ms
      .map_or(PARASWAP_DEFAULT_JITTER, Duration::from_millis);
    let spacer = CallSpacer::new(Duration::from_millis(config.min_delay_ms), jitter);
    debug!(min_delay = ?spacer.min_delay(), jitter = ?jitter, "ParaSwap call spacing configured");

    Ok(Self::new(http, config.paraswap_base_url.clone(), spacer))
  }
}

#[async_trait]
impl QuoteSource for ParaswapQuotes {
  fn name(&self) -> &'static str {
    PARASWAP
  }

  fn supported_chains(&self) -> &[u64] {
    &PARASWAP_CHAINS
  }

  #[instrument(skip(self), fields(adapter = PARASWAP))]
  async fn trade_rate(
    &self,
    chain_id: u64,
    token: &str,
    quote_asset: &str,
  ) -> Result<u128, PriceError> {
    if !PARASWAP_CHAINS.contains(&chain_id) {
      return Err(PriceError::UnsupportedChain {
        adapter: PARASWAP,
        chain_id,
      });
    }

    self.spacer.wait_turn().await;

    let url = format!("{}/prices/", self.base_url);
    let query = [
      ("srcToken", token.to_string()),
      ("destToken", quote_asset.to_string()),
      ("amount", ONE_UNIT.to_string()),
      ("srcDecimals", BASE_UNIT_DECIMALS.to_string()),
      ("destDecimals", BASE_UNIT_DECIMALS.to_string()),
      ("side", "SELL".to_string()),
      ("network", chain_id.to_string()),
    ];

    let prices: ParaswapPrices = self.http.get_json(&url, &query, &[]).await?;
    let dest_amount = prices.price_route.dest_amount;
    let rate = parse_base_units(&dest_amount).ok_or_else(|| {
      PriceError::quote(PARASWAP, format!("destAmount is not an integer: {dest_amount}"))
    })?;

    debug!(chain_id, rate, "ParaSwap quote received");
    Ok(rate)
  }
}
