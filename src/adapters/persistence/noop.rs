//! No-op Sink - Dry-run Observation Sink
//!
//! Accepts every observation and stores nothing.

use async_trait::async_trait;
use tracing::debug;

use crate::domain::error::PriceError;
use crate::domain::observation::PriceObservation;
use crate::ports::sink::ObservationSink;

/// Sink used in dry-run mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

#[async_trait]
impl ObservationSink for NoopSink {
    async fn persist(&self, observation: &PriceObservation) -> Result<(), PriceError> {
        debug!(
            token = %observation.token,
            network = %observation.network,
            primary = observation.is_primary_market,
            price = %observation.price,
            premium = %observation.premium,
            "Dry run, observation not stored"
        );
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use super::*;

    #[tokio::test]
    async fn test_accepts_repeated_keys() {
        let obs = PriceObservation::primary(Utc::now(), "rETH", "ethereum", dec!(1.05));
        assert!(NoopSink.persist(&obs).await.is_ok());
        assert!(NoopSink.persist(&obs).await.is_ok());
        assert!(NoopSink.is_healthy().await);
    }
}
