//! Domain layer - Core types and pure calculations.
//!
//! Token registry, price observations, the premium calculator, the per-item
//! error taxonomy and the cycle report. No I/O happens here (hexagonal
//! architecture inner ring); everything is testable in isolation.

pub mod error;
pub mod observation;
pub mod premium;
pub mod report;
pub mod token;

// Re-export core types for convenience
pub use error::PriceError;
pub use observation::{ObservationKey, PriceObservation};
pub use report::{CycleReport, ItemOutcome, Market, Outcome, SkipReason};
pub use token::{Listing, Network, PrimaryAccessor, Token, TokenRegistry};
