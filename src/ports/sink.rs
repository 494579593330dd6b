//! Sink Port - Observation Persistence Interface
//!
//! Appends price observations to durable storage. Implementations detect
//! writes of an already-stored natural key and report them as
//! `DuplicateObservation` so a retried run cannot silently double-insert.

use async_trait::async_trait;

use crate::domain::error::PriceError;
use crate::domain::observation::PriceObservation;

/// Trait for observation stores.
#[async_trait]
pub trait ObservationSink: Send + Sync + 'static {
  /// Durably append one observation.
  ///
  /// # Errors
  /// `DuplicateObservation` if the key exists, `SinkFailure` otherwise.
  async fn persist(&self, observation: &PriceObservation) -> Result<(), PriceError>;

  /// Check if the underlying store is reachable.
  async fn is_healthy(&self) -> bool;
}
