//! Per-item error taxonomy.
//!
//! Every failure a single (token, network) item can hit during a cycle is
//! one of these variants. None of them is allowed to escape the ingestion
//! pipeline: they are logged, recorded in the cycle report and the item is
//! skipped until the next cycle.

use thiserror::Error;

/// Recoverable failure of one pipeline item.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    /// The primary-market contract call could not complete.
    #[error("primary rate source unavailable: {0}")]
    SourceUnavailable(String),

    /// The active quote adapter does not serve this chain.
    #[error("chain {chain_id} is not supported by {adapter}")]
    UnsupportedChain {
        /// Adapter that rejected the request.
        adapter: &'static str,
        /// Requested chain id.
        chain_id: u64,
    },

    /// The aggregator call errored, timed out or returned a bad status.
    #[error("quote unavailable from {adapter}: {reason}")]
    QuoteUnavailable {
        /// Adapter that failed.
        adapter: &'static str,
        /// Upstream error detail.
        reason: String,
    },

    /// Benchmark rate was zero or negative.
    #[error("invalid benchmark rate: {0}")]
    InvalidBenchmark(String),

    /// The natural key was already written.
    #[error("observation already recorded: {0}")]
    DuplicateObservation(String),

    /// The store rejected the write for any other reason.
    #[error("failed to persist observation: {0}")]
    SinkFailure(String),
}

impl PriceError {
    /// Stable label used in structured logs and metric labels.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SourceUnavailable(_) => "source_unavailable",
            Self::UnsupportedChain { .. } => "unsupported_chain",
            Self::QuoteUnavailable { .. } => "quote_unavailable",
            Self::InvalidBenchmark(_) => "invalid_benchmark",
            Self::DuplicateObservation(_) => "duplicate_observation",
            Self::SinkFailure(_) => "sink_failure",
        }
    }

    /// Shorthand for building a `QuoteUnavailable` from any displayable error.
    pub fn quote(adapter: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::QuoteUnavailable {
            adapter,
            reason: reason.to_string(),
        }
    }
}
