//! Quote Adapters - Swap Aggregator REST Clients
//!
//! Implements the `QuoteSource` port for:
//! - 1inch swap API (`one_inch`)
//! - ParaSwap prices API (`paraswap`)
//!
//! Exactly one adapter is active per process. Each owns a `CallSpacer`
//! so its own calls respect the aggregator's rate limit.

pub mod client;
pub mod one_inch;
pub mod paraswap;
pub mod throttle;
pub mod types;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::config::{AdapterKind, QuotesConfig};
use crate::ports::quote_source::QuoteSource;

pub use client::{QuoteClientConfig, QuoteHttpClient};
pub use one_inch::OneInchQuotes;
pub use paraswap::ParaswapQuotes;
pub use throttle::CallSpacer;

/// Build the adapter selected by `config.adapter`.
///
/// # Errors
/// Fails if the adapter's HTTP client cannot be built (e.g. bad proxy URL).
pub fn build_quote_source(config: &QuotesConfig) -> Result<Arc<dyn QuoteSource>> {
  let source: Arc<dyn QuoteSource> = match config.adapter {
    AdapterKind::OneInch => Arc::new(OneInchQuotes::from_config(config)?),
    AdapterKind::Paraswap => Arc::new(ParaswapQuotes::from_config(config)?),
  };

  info!(
    adapter = source.name(),
    chains = ?source.supported_chains(),
    min_delay_ms = config.min_delay_ms,
    "Quote adapter ready"
  );

  Ok(source)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_factory_selects_configured_adapter() {
    let mut config = QuotesConfig::default();
    assert_eq!(build_quote_source(&config).unwrap().name(), one_inch::ONE_INCH);

    config.adapter = AdapterKind::Paraswap;
    assert_eq!(build_quote_source(&config).unwrap().name(), paraswap::PARASWAP);
  }
}
