//! 1inch Adapter - Swap Quote API v5.2
//!
//! Quotes one unit of a token against the network's reference asset via
//! `GET /swap/v5.2/{chain}/quote`. The dev portal requires an API key,
//! sent verbatim in the `Authorization` header.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::config::QuotesConfig;
use crate::domain::error::PriceError;
use crate::domain::observation::ONE_UNIT;
use crate::ports::quote_source::QuoteSource;

use super::client::{QuoteClientConfig, QuoteHttpClient};
use super::throttle::CallSpacer;
use super::types::{OneInchQuote, parse_base_units};

/// Adapter name used in logs and errors.
pub const ONE_INCH: &str = "1inch";

/// Chains served by the 1inch swap API.
pub const ONE_INCH_CHAINS: [u64; 7] = [1, 42161, 10, 137, 100, 8453, 324];

/// 1inch quotes need no random spacing on top of the minimum delay.
pub const ONE_INCH_DEFAULT_JITTER: Duration = Duration::ZERO;

/// Secondary-market quotes from 1inch.
pub struct OneInchQuotes {
  http: QuoteHttpClient,
  base_url: String,
  api_key: Option<String>,
  spacer: CallSpacer,
}

impl OneInchQuotes {
  /// Create an adapter from explicit parts.
  pub fn new(
    http: QuoteHttpClient,
    base_url: impl Into<String>,
    api_key: Option<String>,
    spacer: CallSpacer,
  ) -> Self {
    Self {
      http,
      base_url: base_url.into().trim_end_matches('/').to_string(),
      api_key,
      spacer,
    }
  }

  /// Create an adapter from the `[quotes]` section.
  ///
  /// # Errors
  /// Fails if the HTTP client cannot be built.
  pub fn from_config(config: &QuotesConfig) -> Result<Self> {
    let http = QuoteHttpClient::new(
      ONE_INCH,
      &QuoteClientConfig {
        timeout: Duration::from_secs(config.timeout_seconds),
        proxy: config.http_proxy.clone(),
      },
    )?;

    if config.one_inch_api_key.is_none() {
      warn!("ONE_INCH_API_KEY is not set, 1inch will likely reject every quote");
    }

    let jitter = config
      .jitter_ms
      .map_or(ONE_INCH_DEFAULT_JITTER, Duration::from_millis);
    let spacer = CallSpacer::new(Duration::from_millis(config.min_delay_ms), jitter);
    debug!(min_delay = ?spacer.min_delay(), jitter = ?jitter, "1inch call spacing configured");

    Ok(Self::new(
      http,
      config.one_inch_base_url.clone(),
      config.one_inch_api_key.clone(),
      spacer,
    ))
  }
}

#[async_trait]
impl QuoteSource for OneInchQuotes {
  fn name(&self) -> &'static str {
    ONE_INCH
  }

  fn supported_chains(&self) -> &[u64] {
    &ONE_INCH_CHAINS
  }

  #[instrument(skip(self), fields(adapter = ONE_INCH))]
  async fn trade_rate(
    &self,
    chain_id: u64,
    token: &str,
    quote_asset: &str,
  ) -> Result<u128, PriceError> {
    if !ONE_INCH_CHAINS.contains(&chain_id) {
      return Err(PriceError::UnsupportedChain {
        adapter: ONE_INCH,
        chain_id,
      });
    }

    self.spacer.wait_turn().await;

    let url = format!("{}/swap/v5.2/{chain_id}/quote", self.base_url);
    let query = [
      ("src", token.to_string()),
      ("dst", quote_asset.to_string()),
      ("amount", ONE_UNIT.to_string()),
    ];
    let headers: Vec<(&'static str, String)> = self
      .api_key
      .iter()
      .map(|key| ("Authorization", key.clone()))
      .collect();

    let quote: OneInchQuote = self.http.get_json(&url, &query, &headers).await?;
    let rate = parse_base_units(&quote.to_amount).ok_or_else(|| {
      PriceError::quote(ONE_INCH, format!("toAmount is not an integer: {}", quote.to_amount))
    })?;

    debug!(chain_id, rate, "1inch quote received");
    Ok(rate)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn adapter() -> OneInchQuotes {
    let http = QuoteHttpClient::new(ONE_INCH, &QuoteClientConfig::default()).unwrap();
    OneInchQuotes::new(http, "http://127.0.0.1:9/", None, CallSpacer::new(Duration::ZERO, Duration::ZERO))
  }

  #[tokio::test]
  async fn test_unsupported_chain_rejected_before_io() {
    let err = adapter().trade_rate(43114, "0xtoken", "0xasset").await.unwrap_err();
    assert_eq!(
      err,
      PriceError::UnsupportedChain {
        adapter: ONE_INCH,
        chain_id: 43114
      }
    );
  }

  #[test]
  fn test_trailing_slash_trimmed() {
    assert_eq!(adapter().base_url, "http://127.0.0.1:9");
  }

  #[test]
  fn test_config_jitter_override() {
    let config = QuotesConfig {
      jitter_ms: Some(250),
      ..QuotesConfig::default()
    };
    let adapter = OneInchQuotes::from_config(&config).unwrap();
    assert_eq!(adapter.spacer.min_delay(), Duration::from_secs(1));
    assert_eq!(adapter.supported_chains().len(), 7);
  }
}
