//! Prometheus Metrics Registry - Ingestion Observability
//!
//! Registers the fetcher's metrics and renders them in the Prometheus text
//! format for the `/metrics` endpoint. Covers cycle outcomes and durations,
//! written observations per market side and skipped items per reason.

use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::domain::report::CycleReport;

/// Outcome label of a cycle that attempted every item.
pub const CYCLE_COMPLETED: &str = "completed";
/// Outcome label of a cycle stopped early by shutdown.
pub const CYCLE_INTERRUPTED: &str = "interrupted";
/// Outcome label of a cycle that returned an error or panicked.
pub const CYCLE_FAILED: &str = "failed";

/// Centralized Prometheus metrics for the fetcher.
///
/// All metrics follow the naming convention `lst_fetcher_*`.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Cycles run, by outcome.
    pub cycles: IntCounterVec,
    /// Wall-clock duration of each cycle.
    pub cycle_duration: Histogram,
    /// Observations written, by market side.
    pub observations: IntCounterVec,
    /// Items skipped, by reason.
    pub items_skipped: IntCounterVec,
    /// Unix timestamp of the last finished cycle.
    pub last_cycle_timestamp: Gauge,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let cycles = IntCounterVec::new(
            Opts::new("lst_fetcher_cycles_total", "Ingestion cycles run"),
            &["outcome"],
        )?;

        let cycle_duration = Histogram::with_opts(
            HistogramOpts::new(
                "lst_fetcher_cycle_duration_seconds",
                "Wall-clock duration of one ingestion cycle",
            )
            .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        )?;

        let observations = IntCounterVec::new(
            Opts::new(
                "lst_fetcher_observations_total",
                "Price observations written",
            ),
            &["market"],
        )?;

        let items_skipped = IntCounterVec::new(
            Opts::new(
                "lst_fetcher_items_skipped_total",
                "Pipeline items skipped",
            ),
            &["reason"],
        )?;

        let last_cycle_timestamp = Gauge::new(
            "lst_fetcher_last_cycle_timestamp_seconds",
            "Unix time of the last finished cycle",
        )?;

        // Register all metrics
        registry.register(Box::new(cycles.clone()))?;
        registry.register(Box::new(cycle_duration.clone()))?;
        registry.register(Box::new(observations.clone()))?;
        registry.register(Box::new(items_skipped.clone()))?;
        registry.register(Box::new(last_cycle_timestamp.clone()))?;

        Ok(Self {
            registry,
            cycles,
            cycle_duration,
            observations,
            items_skipped,
            last_cycle_timestamp,
        })
    }

    /// Record a cycle that returned a report.
    pub fn record_cycle(&self, report: &CycleReport, elapsed: Duration) {
        let outcome = if report.interrupted {
            CYCLE_INTERRUPTED
        } else {
            CYCLE_COMPLETED
        };
        self.cycles.with_label_values(&[outcome]).inc();
        self.cycle_duration.observe(elapsed.as_secs_f64());

        for item in report.items.iter().filter(|i| i.is_written()) {
            self.observations
                .with_label_values(&[item.market.as_str()])
                .inc();
        }
        for (reason, count) in report.skipped_by_reason() {
            self.items_skipped
                .with_label_values(&[reason])
                .inc_by(count as u64);
        }

        self.mark_finished(Utc::now());
    }

    /// Record a cycle that failed or panicked before producing a report.
    pub fn record_failed_cycle(&self, elapsed: Duration) {
        self.cycles.with_label_values(&[CYCLE_FAILED]).inc();
        self.cycle_duration.observe(elapsed.as_secs_f64());
        self.mark_finished(Utc::now());
    }

    #[allow(clippy::cast_precision_loss)]
    fn mark_finished(&self, at: DateTime<Utc>) {
        self.last_cycle_timestamp.set(at.timestamp() as f64);
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .context("Failed to encode metrics")?;
        String::from_utf8(buffer).context("Metrics output is not UTF-8")
    }
}
