//! Aggregator API Response Types
//!
//! Only the fields the adapters read are modelled; serde ignores the rest
//! of each (large) payload.

use serde::Deserialize;

/// `GET /swap/v5.2/{chain}/quote` response from 1inch.
#[derive(Debug, Clone, Deserialize)]
pub struct OneInchQuote {
  /// Destination amount in base units, as a decimal string.
  #[serde(rename = "toAmount")]
  pub to_amount: String,
}

/// `GET /prices/` response from ParaSwap.
#[derive(Debug, Clone, Deserialize)]
pub struct ParaswapPrices {
  /// Best route found.
  #[serde(rename = "priceRoute")]
  pub price_route: ParaswapPriceRoute,
}

/// Route summary inside a ParaSwap prices response.
#[derive(Debug, Clone, Deserialize)]
pub struct ParaswapPriceRoute {
  /// Destination amount in base units, as a decimal string.
  #[serde(rename = "destAmount")]
  pub dest_amount: String,
}

/// Parse a decimal base-unit amount as returned by the aggregators.
pub fn parse_base_units(raw: &str) -> Option<u128> {
  raw.trim().parse().ok()
}
