//! Ingestion Pipeline - One Pass over the Token Registry
//!
//! For every token, in registry order:
//! 1. Resolve the primary-market rate (if the token has an accessor) and
//!    persist it as a primary observation with zero premium
//! 2. Quote every listing through the active aggregator adapter
//! 3. Compute the premium against the benchmark and persist it
//!
//! Every item ends as an `ItemOutcome` in the cycle report. No per-item
//! failure leaves this module; the loop shape guarantees it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::domain::error::PriceError;
use crate::domain::observation::{PriceObservation, cycle_timestamp, to_reference_units};
use crate::domain::premium::{describe, premium};
use crate::domain::report::{CycleReport, Market, Outcome, SkipReason};
use crate::domain::token::{Listing, PrimaryAccessor, Token, TokenRegistry};
use crate::ports::primary_source::PrimaryRateSource;
use crate::ports::quote_source::QuoteSource;
use crate::ports::sink::ObservationSink;

/// Anything the supervisor can run once per tick.
///
/// An `Err` here is a defect, never a per-item failure.
#[async_trait]
pub trait CycleRunner: Send + Sync + 'static {
  /// Run one full cycle. `shutdown` is polled between items.
  async fn run_cycle(&self, shutdown: watch::Receiver<bool>) -> anyhow::Result<CycleReport>;

  /// Whether the runner's storage can currently accept observations.
  async fn is_healthy(&self) -> bool {
    true
  }
}

/// Price-ingestion pipeline over a fixed registry.
pub struct IngestionPipeline<P: ?Sized, Q: ?Sized, S: ?Sized> {
  /// Tokens, listings and network table.
  registry: Arc<TokenRegistry>,
  /// On-chain primary-market rates.
  primary: Arc<P>,
  /// Active secondary-market adapter.
  quotes: Arc<Q>,
  /// Observation store.
  sink: Arc<S>,
}

impl<P, Q, S> IngestionPipeline<P, Q, S>
where
  P: PrimaryRateSource + ?Sized,
  Q: QuoteSource + ?Sized,
  S: ObservationSink + ?Sized,
{
  /// Create a pipeline.
  pub const fn new(
    registry: Arc<TokenRegistry>,
    primary: Arc<P>,
    quotes: Arc<Q>,
    sink: Arc<S>,
  ) -> Self {
    Self {
      registry,
      primary,
      quotes,
      sink,
    }
  }

  /// Run one cycle stamped with `now` (truncated to seconds).
  pub async fn run_at(&self, now: DateTime<Utc>, shutdown: &watch::Receiver<bool>) -> CycleReport {
    let cycle_id = Uuid::new_v4();
    let span = info_span!("cycle", %cycle_id, adapter = self.quotes.name());
    let mut report = CycleReport::new(cycle_id, cycle_timestamp(now));

    async {
      info!(
        tokens = self.registry.tokens().len(),
        pairs = self.registry.pair_count(),
        "Cycle started"
      );

      'tokens: for token in self.registry.tokens() {
        if *shutdown.borrow() {
          report.interrupted = true;
          break;
        }

        let benchmark = match &token.primary_market {
          Some(accessor) => self.resolve_primary(&mut report, token, accessor).await,
          None => {
            debug!(token = %token.name, "No primary accessor, listings quoted without benchmark");
            None
          }
        };

        for listing in &token.listings {
          if *shutdown.borrow() {
            report.interrupted = true;
            break 'tokens;
          }
          self
            .resolve_secondary(&mut report, token, listing, benchmark)
            .await;
        }
      }

      log_summary(&report);
    }
    .instrument(span)
    .await;

    report
  }

  /// Resolve, record and persist the primary rate. Returns the benchmark.
  async fn resolve_primary(
    &self,
    report: &mut CycleReport,
    token: &Token,
    accessor: &PrimaryAccessor,
  ) -> Option<Decimal> {
    let network = accessor.network.as_str();

    let rate = match self.primary.exchange_rate(accessor).await.and_then(|raw| {
      to_reference_units(raw)
        .ok_or_else(|| PriceError::SourceUnavailable(format!("rate {raw} out of range")))
    }) {
      Ok(rate) => rate,
      Err(e) => {
        warn!(token = %token.name, network, phase = "primary", error = %e, "Primary rate unavailable");
        report.record(
          &token.name,
          network,
          Market::Primary,
          Outcome::Skipped(SkipReason::Failed(e)),
        );
        return None;
      }
    };

    let observation = PriceObservation::primary(report.timestamp, &token.name, network, rate);
    let outcome = self.store(&observation, "primary").await;
    if outcome.is_ok() {
      info!(token = %token.name, network, price = %rate, "Primary rate stored");
    }
    report.record(&token.name, network, Market::Primary, to_outcome(outcome, rate, Decimal::ZERO));

    // The benchmark stands even if the row could not be stored.
    Some(rate)
  }

  /// Quote one listing and, with a benchmark, persist its premium.
  async fn resolve_secondary(
    &self,
    report: &mut CycleReport,
    token: &Token,
    listing: &Listing,
    benchmark: Option<Decimal>,
  ) {
    let network_name = listing.network.as_str();
    let Some(network) = self.registry.network(network_name) else {
      // Unreachable with a validated registry.
      error!(token = %token.name, network = network_name, "Listing references an unknown network");
      return;
    };

    let quoted = self
      .quotes
      .trade_rate(network.chain_id, &listing.address, &network.reference_asset)
      .await
      .and_then(|raw| {
        to_reference_units(raw)
          .ok_or_else(|| PriceError::quote(self.quotes.name(), format!("quote {raw} out of range")))
      });

    let price = match quoted {
      Ok(price) => price,
      Err(e) => {
        warn!(token = %token.name, network = network_name, phase = "secondary", error = %e, "Quote unavailable");
        report.record(
          &token.name,
          network_name,
          Market::Secondary,
          Outcome::Skipped(SkipReason::Failed(e)),
        );
        return;
      }
    };

    let Some(benchmark) = benchmark else {
      info!(token = %token.name, network = network_name, price = %price, "Quote received without benchmark, not stored");
      report.record(
        &token.name,
        network_name,
        Market::Secondary,
        Outcome::Skipped(SkipReason::NoBenchmark),
      );
      return;
    };

    let ratio = match premium(benchmark, price) {
      Ok(ratio) => ratio,
      Err(e) => {
        warn!(token = %token.name, network = network_name, phase = "premium", error = %e, "Premium not computable");
        report.record(
          &token.name,
          network_name,
          Market::Secondary,
          Outcome::Skipped(SkipReason::Failed(e)),
        );
        return;
      }
    };

    let observation =
      PriceObservation::secondary(report.timestamp, &token.name, network_name, price, ratio);
    let outcome = self.store(&observation, "secondary").await;
    if outcome.is_ok() {
      info!(
        token = %token.name,
        network = network_name,
        price = %price,
        premium = %describe(ratio),
        "Secondary rate stored"
      );
    }
    report.record(&token.name, network_name, Market::Secondary, to_outcome(outcome, price, ratio));
  }

  /// Persist an observation, logging sink failures by severity.
  async fn store(&self, observation: &PriceObservation, phase: &'static str) -> Result<(), PriceError> {
    let result = self.sink.persist(observation).await;
    match &result {
      Ok(()) => {}
      Err(e @ PriceError::DuplicateObservation(_)) => {
        warn!(token = %observation.token, network = %observation.network, phase, error = %e, "Duplicate observation ignored");
      }
      Err(e) => {
        error!(token = %observation.token, network = %observation.network, phase, error = %e, "Failed to store observation");
      }
    }
    result
  }
}

fn to_outcome(stored: Result<(), PriceError>, price: Decimal, premium: Decimal) -> Outcome {
  match stored {
    Ok(()) => Outcome::Written { price, premium },
    Err(e) => Outcome::Skipped(SkipReason::Failed(e)),
  }
}

fn log_summary(report: &CycleReport) {
  info!(
    attempted = report.attempted(),
    written = report.written(),
    skipped = report.skipped(),
    duplicates = report.duplicates(),
    skipped_by_reason = ?report.skipped_by_reason(),
    interrupted = report.interrupted,
    "Cycle finished"
  );
}

#[async_trait]
impl<P, Q, S> CycleRunner for IngestionPipeline<P, Q, S>
where
  P: PrimaryRateSource + ?Sized,
  Q: QuoteSource + ?Sized,
  S: ObservationSink + ?Sized,
{
  async fn run_cycle(&self, shutdown: watch::Receiver<bool>) -> anyhow::Result<CycleReport> {
    Ok(self.run_at(Utc::now(), &shutdown).await)
  }

  async fn is_healthy(&self) -> bool {
    self.sink.is_healthy().await
  }
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;
  use std::sync::Mutex;
  use std::sync::atomic::{AtomicBool, Ordering};

  use chrono::TimeZone;
  use rust_decimal_macros::dec;

  use super::*;
  use crate::domain::token::Network;

  const ONE_POINT_05: u128 = 1_050_000_000_000_000_000;
  const ONE_POINT_10: u128 = 1_100_000_000_000_000_000;

  struct FixedPrimary(Result<u128, PriceError>);

  #[async_trait]
  impl PrimaryRateSource for FixedPrimary {
    async fn exchange_rate(&self, _accessor: &PrimaryAccessor) -> Result<u128, PriceError> {
      self.0.clone()
    }
  }

  struct FixedQuotes(u128);

  #[async_trait]
  impl QuoteSource for FixedQuotes {
    fn name(&self) -> &'static str {
      "fixed"
    }

    fn supported_chains(&self) -> &[u64] {
      &[1]
    }

    async fn trade_rate(&self, _chain_id: u64, _token: &str, _asset: &str) -> Result<u128, PriceError> {
      Ok(self.0)
    }
  }

  #[derive(Default)]
  struct MemorySink(Mutex<Vec<PriceObservation>>, AtomicBool);

  #[async_trait]
  impl ObservationSink for MemorySink {
    async fn persist(&self, observation: &PriceObservation) -> Result<(), PriceError> {
      let mut rows = self.0.lock().unwrap();
      if rows.iter().any(|r| r.key() == observation.key()) {
        return Err(PriceError::DuplicateObservation(observation.key().to_string()));
      }
      rows.push(observation.clone());
      Ok(())
    }

    async fn is_healthy(&self) -> bool {
      !self.1.load(Ordering::SeqCst)
    }
  }

  fn registry(with_accessor: bool) -> Arc<TokenRegistry> {
    let networks = BTreeMap::from([(
      "ethereum".to_string(),
      Network {
        name: "ethereum".into(),
        chain_id: 1,
        reference_asset: "0xeeee".into(),
      },
    )]);
    let token = Token {
      name: "X".into(),
      primary_market: with_accessor.then(|| PrimaryAccessor {
        network: "ethereum".into(),
        contract: "0x1".into(),
        abi: serde_json::json!([]),
        function: "rate".into(),
      }),
      listings: vec![Listing {
        network: "ethereum".into(),
        address: "0x1".into(),
      }],
    };
    Arc::new(TokenRegistry::new(vec![token], networks))
  }

  fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
  }

  #[tokio::test]
  async fn test_writes_primary_then_secondary() {
    let sink = Arc::new(MemorySink::default());
    let pipeline = IngestionPipeline::new(
      registry(true),
      Arc::new(FixedPrimary(Ok(ONE_POINT_05))),
      Arc::new(FixedQuotes(ONE_POINT_10)),
      Arc::clone(&sink),
    );
    let (_tx, rx) = watch::channel(false);

    let report = pipeline.run_at(noon(), &rx).await;

    assert_eq!(report.written(), 2);
    let rows = sink.0.lock().unwrap();
    assert!(rows[0].is_primary_market);
    assert_eq!(rows[0].premium, Decimal::ZERO);
    assert_eq!(rows[1].premium.round_dp(6), dec!(0.047619));
  }

  #[tokio::test]
  async fn test_rerun_at_same_second_reports_duplicates() {
    let sink = Arc::new(MemorySink::default());
    let pipeline = IngestionPipeline::new(
      registry(true),
      Arc::new(FixedPrimary(Ok(ONE_POINT_05))),
      Arc::new(FixedQuotes(ONE_POINT_10)),
      Arc::clone(&sink),
    );
    let (_tx, rx) = watch::channel(false);

    pipeline.run_at(noon(), &rx).await;
    let second = pipeline.run_at(noon(), &rx).await;

    assert_eq!(second.written(), 0);
    assert_eq!(second.duplicates(), 2);
    assert_eq!(sink.0.lock().unwrap().len(), 2);
  }

  #[tokio::test]
  async fn test_no_accessor_skips_with_no_benchmark() {
    let sink = Arc::new(MemorySink::default());
    let pipeline = IngestionPipeline::new(
      registry(false),
      Arc::new(FixedPrimary(Ok(ONE_POINT_05))),
      Arc::new(FixedQuotes(ONE_POINT_10)),
      Arc::clone(&sink),
    );
    let (_tx, rx) = watch::channel(false);

    let report = pipeline.run_at(noon(), &rx).await;

    assert_eq!(report.attempted(), 1);
    assert_eq!(report.skipped_by_reason().get("no_benchmark"), Some(&1));
    assert!(sink.0.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_zero_benchmark_is_invalid() {
    let pipeline = IngestionPipeline::new(
      registry(true),
      Arc::new(FixedPrimary(Ok(0))),
      Arc::new(FixedQuotes(ONE_POINT_10)),
      Arc::new(MemorySink::default()),
    );
    let (_tx, rx) = watch::channel(false);

    let report = pipeline.run_at(noon(), &rx).await;

    let item = report.find("X", "ethereum", Market::Secondary).unwrap();
    assert!(matches!(
      item.outcome,
      Outcome::Skipped(SkipReason::Failed(PriceError::InvalidBenchmark(_)))
    ));
  }

  #[tokio::test]
  async fn test_shutdown_before_start_attempts_nothing() {
    let pipeline = IngestionPipeline::new(
      registry(true),
      Arc::new(FixedPrimary(Ok(ONE_POINT_05))),
      Arc::new(FixedQuotes(ONE_POINT_10)),
      Arc::new(MemorySink::default()),
    );
    let (_tx, rx) = watch::channel(true);

    let report = pipeline.run_at(noon(), &rx).await;

    assert!(report.interrupted);
    assert_eq!(report.attempted(), 0);
  }

  #[tokio::test]
  async fn test_health_follows_sink() {
    let sink = Arc::new(MemorySink::default());
    let pipeline = IngestionPipeline::new(
      registry(true),
      Arc::new(FixedPrimary(Ok(ONE_POINT_05))),
      Arc::new(FixedQuotes(ONE_POINT_10)),
      Arc::clone(&sink),
    );
    assert!(CycleRunner::is_healthy(&pipeline).await);

    sink.1.store(true, Ordering::SeqCst);
    assert!(!CycleRunner::is_healthy(&pipeline).await);
  }
}
