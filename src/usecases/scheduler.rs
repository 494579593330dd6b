//! Supervisor - Cycle Scheduling and Defect Containment
//!
//! Drives a `CycleRunner` once (single-shot) or on a fixed period
//! (continuous). Ticks come from `tokio::time::interval` with
//! `MissedTickBehavior::Skip`: a cycle that overruns its period is followed
//! at once by exactly one deferred cycle, then the schedule snaps back to
//! the initial grid. Cycles never overlap because the next tick is only
//! awaited after the current cycle has returned.
//!
//! Each cycle runs in its own task so that an `Err` or a panic is
//! contained here and the next tick still fires.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{error, info, instrument, warn};

use crate::adapters::metrics::{HealthState, MetricsRegistry};
use crate::domain::report::CycleReport;

use super::ingestion::CycleRunner;

/// Schedules cycles and survives their defects.
pub struct Supervisor<R: ?Sized> {
  /// Pipeline (or any runner) executed per tick.
  runner: Arc<R>,
  /// Distance between two scheduled cycle starts.
  period: Duration,
  /// Optional Prometheus metrics.
  metrics: Option<Arc<MetricsRegistry>>,
  /// Optional readiness state.
  health: Option<Arc<HealthState>>,
}

impl<R: CycleRunner + ?Sized> Supervisor<R> {
  /// Create a supervisor ticking every `period`.
  pub const fn new(runner: Arc<R>, period: Duration) -> Self {
    Self {
      runner,
      period,
      metrics: None,
      health: None,
    }
  }

  /// Report cycle outcomes to metrics and readiness.
  #[must_use]
  pub fn with_monitoring(mut self, metrics: Arc<MetricsRegistry>, health: Arc<HealthState>) -> Self {
    self.metrics = Some(metrics);
    self.health = Some(health);
    self
  }

  /// Run a single cycle. `None` means the cycle hit a defect (logged).
  #[instrument(skip_all, name = "single_shot")]
  pub async fn run_once(&self, shutdown: watch::Receiver<bool>) -> Option<CycleReport> {
    self.supervise(shutdown).await
  }

  /// Run cycles on the period grid until `shutdown` turns `true`.
  ///
  /// Returns the number of cycles started.
  #[instrument(skip_all, name = "continuous", fields(period_secs = self.period.as_secs()))]
  pub async fn run_continuous(&self, mut shutdown: watch::Receiver<bool>) -> u64 {
    let mut ticker = interval(self.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut cycles = 0u64;

    info!("Supervisor started");

    loop {
      let scheduled = tokio::select! {
        biased;
        () = stopped(&mut shutdown) => break,
        scheduled = ticker.tick() => scheduled,
      };

      let lag = scheduled.elapsed();
      if lag > Duration::from_secs(1) {
        warn!(lag_secs = lag.as_secs(), "Previous cycle overran its period, running deferred cycle now");
      }
      cycles += 1;
      self.supervise(shutdown.clone()).await;
    }

    if let Some(health) = &self.health {
      health.mark_shutting_down();
    }
    info!(cycles, "Supervisor stopped");
    cycles
  }

  /// Run one cycle in its own task and contain whatever it returns.
  async fn supervise(&self, shutdown: watch::Receiver<bool>) -> Option<CycleReport> {
    let runner = Arc::clone(&self.runner);
    let started = Instant::now();
    let joined = tokio::spawn(async move { runner.run_cycle(shutdown).await }).await;
    let elapsed = started.elapsed();

    let report = match joined {
      Ok(Ok(report)) => Some(report),
      Ok(Err(e)) => {
        error!(error = ?e, "Cycle failed with an unexpected error");
        None
      }
      Err(join_err) if join_err.is_panic() => {
        error!(panic = %panic_message(join_err.into_panic()), "Cycle panicked");
        None
      }
      Err(join_err) => {
        error!(error = %join_err, "Cycle task was cancelled");
        None
      }
    };

    if let Some(metrics) = &self.metrics {
      match &report {
        Some(r) => metrics.record_cycle(r, elapsed),
        None => metrics.record_failed_cycle(elapsed),
      }
    }
    if let Some(health) = &self.health {
      let sink_ok = self.runner.is_healthy().await;
      if !sink_ok {
        warn!("Observation sink failed its health check");
      }
      health.set_last_cycle_ok(report.is_some());
      health.set_sink_ok(sink_ok);
    }

    report
  }
}

/// Resolves once shutdown is requested or the sender is gone.
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
  while !*shutdown.borrow_and_update() {
    if shutdown.changed().await.is_err() {
      return;
    }
  }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
  payload
    .downcast_ref::<&str>()
    .map(|s| (*s).to_string())
    .or_else(|| payload.downcast_ref::<String>().cloned())
    .unwrap_or_else(|| "non-string panic payload".to_string())
}
