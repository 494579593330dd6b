//! Cycle report — itemized outcome of one pipeline pass.
//!
//! The ingestion loop never raises on a per-item failure; it records an
//! `ItemOutcome` instead and moves on. The supervisor and the CLI read the
//! aggregated counts from here.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::error::PriceError;

/// Which side of the market an item targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    /// Issuer's canonical rate.
    Primary,
    /// Aggregator trade rate.
    Secondary,
}

impl Market {
    /// Label used in logs and metrics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

/// Why an item produced no observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No primary rate was resolved for the token in this cycle.
    NoBenchmark,
    /// A source, adapter, calculator or sink failed.
    Failed(PriceError),
}

impl SkipReason {
    /// Stable label used in logs and metrics.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NoBenchmark => "no_benchmark",
            Self::Failed(e) => e.kind(),
        }
    }
}

/// Result of one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Observation persisted.
    Written {
        /// Price in the reference asset.
        price: Decimal,
        /// Premium ratio (zero on primary rows).
        premium: Decimal,
    },
    /// Item skipped for this cycle.
    Skipped(SkipReason),
}

/// Outcome of one attempted (token, network, market) item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    /// Token name.
    pub token: String,
    /// Network name.
    pub network: String,
    /// Market side.
    pub market: Market,
    /// What happened.
    pub outcome: Outcome,
}

impl ItemOutcome {
    /// Whether an observation was written.
    pub const fn is_written(&self) -> bool {
        matches!(self.outcome, Outcome::Written { .. })
    }
}

/// Everything that happened in one cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Correlation id, also attached to the cycle's tracing span.
    pub cycle_id: Uuid,
    /// Timestamp stamped on every observation of the cycle.
    pub timestamp: DateTime<Utc>,
    /// Item outcomes in attempt order.
    pub items: Vec<ItemOutcome>,
    /// Shutdown was requested before every item was attempted.
    pub interrupted: bool,
}

impl CycleReport {
    /// Empty report for a new cycle.
    pub fn new(cycle_id: Uuid, timestamp: DateTime<Utc>) -> Self {
        Self {
            cycle_id,
            timestamp,
            items: Vec::new(),
            interrupted: false,
        }
    }

    /// Record an item outcome.
    pub fn record(&mut self, token: &str, network: &str, market: Market, outcome: Outcome) {
        self.items.push(ItemOutcome {
            token: token.to_string(),
            network: network.to_string(),
            market,
            outcome,
        });
    }

    /// Number of attempted items.
    pub fn attempted(&self) -> usize {
        self.items.len()
    }

    /// Number of observations written.
    pub fn written(&self) -> usize {
        self.items.iter().filter(|i| i.is_written()).count()
    }

    /// Number of skipped items.
    pub fn skipped(&self) -> usize {
        self.attempted() - self.written()
    }

    /// Skipped items grouped by reason label.
    pub fn skipped_by_reason(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for item in &self.items {
            if let Outcome::Skipped(reason) = &item.outcome {
                *counts.entry(reason.kind()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Items rejected by the sink because their key was already stored.
    pub fn duplicates(&self) -> usize {
        self.skipped_by_reason()
            .get("duplicate_observation")
            .copied()
            .unwrap_or(0)
    }

    /// Outcome for a specific item, if it was attempted.
    pub fn find(&self, token: &str, network: &str, market: Market) -> Option<&ItemOutcome> {
        self.items
            .iter()
            .find(|i| i.token == token && i.network == network && i.market == market)
    }
}
