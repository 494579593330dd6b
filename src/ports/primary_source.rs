//! Primary Source Port - Canonical Exchange Rate Interface
//!
//! Resolves a token's issuance rate against the reference asset via a
//! read-only contract call on its home network.

use async_trait::async_trait;

use crate::domain::error::PriceError;
use crate::domain::token::PrimaryAccessor;

/// Trait for primary-market rate providers.
#[async_trait]
pub trait PrimaryRateSource: Send + Sync + 'static {
  /// Call the accessor's view function and return the rate in base units
  /// of the reference asset (10^18 = 1.0).
  ///
  /// # Errors
  /// `SourceUnavailable` when the call cannot complete for any reason.
  async fn exchange_rate(&self, accessor: &PrimaryAccessor) -> Result<u128, PriceError>;
}
