//! Price observations — the unit the pipeline produces and sinks persist.

use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fractional digits of the reference asset's base unit (wei).
pub const BASE_UNIT_DECIMALS: u32 = 18;

/// Exactly one token, in base units.
pub const ONE_UNIT: u128 = 1_000_000_000_000_000_000;

/// Convert an integer base-unit amount into reference-asset units.
///
/// Returns `None` when the amount does not fit a 96-bit decimal mantissa
/// (roughly 79 billion units), which no real exchange rate approaches.
pub fn to_reference_units(base_units: u128) -> Option<Decimal> {
    let raw = i128::try_from(base_units).ok()?;
    Decimal::try_from_i128_with_scale(raw, BASE_UNIT_DECIMALS).ok()
}

/// Timestamp shared by every observation of one cycle, truncated to seconds.
pub fn cycle_timestamp(now: DateTime<Utc>) -> DateTime<Utc> {
    now.trunc_subsecs(0)
}

/// Natural key of an observation; no two stored rows may share it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObservationKey {
    /// Cycle timestamp.
    pub timestamp: DateTime<Utc>,
    /// Token name.
    pub token: String,
    /// Network name.
    pub network: String,
    /// Primary or secondary market row.
    pub is_primary_market: bool,
}

impl fmt::Display for ObservationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let market = if self.is_primary_market { "primary" } else { "secondary" };
        write!(
            f,
            "{}/{}/{}@{}",
            self.token,
            self.network,
            market,
            self.timestamp.to_rfc3339()
        )
    }
}

/// One time-stamped price of a token on a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceObservation {
    /// Cycle timestamp (UTC, second precision).
    pub timestamp: DateTime<Utc>,
    /// Token name.
    pub token: String,
    /// Network name.
    pub network: String,
    /// `true` for the issuer's canonical rate.
    pub is_primary_market: bool,
    /// Price in the reference asset.
    pub price: Decimal,
    /// Fiat price; never computed by this pipeline.
    pub price_fiat: Option<Decimal>,
    /// Signed premium ratio; always zero on primary rows.
    pub premium: Decimal,
}

impl PriceObservation {
    /// Build a primary-market row. Premium is zero by definition.
    pub fn primary(timestamp: DateTime<Utc>, token: &str, network: &str, price: Decimal) -> Self {
        Self {
            timestamp,
            token: token.to_string(),
            network: network.to_string(),
            is_primary_market: true,
            price,
            price_fiat: None,
            premium: Decimal::ZERO,
        }
    }

    /// Build a secondary-market row with its premium over the benchmark.
    pub fn secondary(
        timestamp: DateTime<Utc>,
        token: &str,
        network: &str,
        price: Decimal,
        premium: Decimal,
    ) -> Self {
        Self {
            timestamp,
            token: token.to_string(),
            network: network.to_string(),
            is_primary_market: false,
            price,
            price_fiat: None,
            premium,
        }
    }

    /// Natural key of this observation.
    pub fn key(&self) -> ObservationKey {
        ObservationKey {
            timestamp: self.timestamp,
            token: self.token.clone(),
            network: self.network.clone(),
            is_primary_market: self.is_primary_market,
        }
    }
}
