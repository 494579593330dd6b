//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer requires from
//! the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `PrimaryRateSource`: On-chain canonical exchange rate
//! - `QuoteSource`: Swap-aggregator trade rate
//! - `ObservationSink`: Observation persistence

pub mod primary_source;
pub mod quote_source;
pub mod sink;

pub use primary_source::PrimaryRateSource;
pub use quote_source::QuoteSource;
pub use sink::ObservationSink;
