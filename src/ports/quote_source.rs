//! Quote Source Port - Secondary Market Trade Rate Interface
//!
//! One implementation per swap aggregator. The pipeline only knows this
//! trait; the concrete adapter is picked at startup from configuration.
//!
//! Contract every implementor honours:
//! - `UnsupportedChain` is returned before any network I/O
//! - consecutive calls on one instance are spaced by a minimum delay
//! - upstream failures surface as `QuoteUnavailable`, never as panics

use async_trait::async_trait;

use crate::domain::error::PriceError;

/// Trait for secondary-market quote providers.
#[async_trait]
pub trait QuoteSource: Send + Sync + 'static {
  /// Adapter name for logs and error context.
  fn name(&self) -> &'static str;

  /// Chain ids this adapter can quote on.
  fn supported_chains(&self) -> &[u64];

  /// Amount of `quote_asset` (base units) obtainable for exactly one
  /// unit (10^18 base units) of `token` on `chain_id`.
  ///
  /// # Errors
  /// `UnsupportedChain` or `QuoteUnavailable`.
  async fn trade_rate(
    &self,
    chain_id: u64,
    token: &str,
    quote_asset: &str,
  ) -> Result<u128, PriceError>;
}
