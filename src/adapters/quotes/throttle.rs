//! Call Spacer - Per-adapter Request Throttle
//!
//! Aggregator APIs rate-limit aggressively. Every adapter instance owns one
//! spacer and awaits its turn before each outbound request, so two calls
//! never start closer than `min_delay` (+ jitter) apart, no matter how many
//! tasks share the adapter.

use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tracing::trace;

/// Spaces consecutive calls by a minimum delay plus random jitter.
pub struct CallSpacer {
  /// Guaranteed spacing between two call starts.
  min_delay: Duration,
  /// Upper bound of the random extra spacing.
  jitter: Duration,
  /// Start time of the previous call. Held across the wait so callers queue.
  last_call: Mutex<Option<Instant>>,
}

impl CallSpacer {
  /// Create a spacer. A zero `jitter` makes the spacing deterministic.
  pub fn new(min_delay: Duration, jitter: Duration) -> Self {
    Self {
      min_delay,
      jitter,
      last_call: Mutex::new(None),
    }
  }

  /// Minimum spacing between calls.
  pub const fn min_delay(&self) -> Duration {
    self.min_delay
  }

  /// Wait until this instance may issue its next call, then claim the slot.
  ///
  /// The first call on a fresh spacer returns immediately.
  pub async fn wait_turn(&self) {
    let mut last = self.last_call.lock().await;
    if let Some(prev) = *last {
      let spacing = self.min_delay + self.sample_jitter();
      trace!(spacing_ms = spacing.as_millis(), "Waiting for call slot");
      sleep_until(prev + spacing).await;
    }
    *last = Some(Instant::now());
  }

  fn sample_jitter(&self) -> Duration {
    let max_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
    if max_ms == 0 {
      return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;

  #[tokio::test(start_paused = true)]
  async fn test_first_call_is_immediate() {
    let spacer = CallSpacer::new(Duration::from_secs(1), Duration::ZERO);
    let start = Instant::now();
    spacer.wait_turn().await;
    assert_eq!(start.elapsed(), Duration::ZERO);
  }

  #[tokio::test(start_paused = true)]
  async fn test_consecutive_calls_are_spaced() {
    let spacer = CallSpacer::new(Duration::from_secs(1), Duration::ZERO);
    let start = Instant::now();
    for _ in 0..4 {
      spacer.wait_turn().await;
    }
    assert!(start.elapsed() >= Duration::from_secs(3));
  }

  #[tokio::test(start_paused = true)]
  async fn test_jitter_stays_within_bounds() {
    let spacer = CallSpacer::new(Duration::from_secs(1), Duration::from_secs(2));
    spacer.wait_turn().await;
    let start = Instant::now();
    spacer.wait_turn().await;
    let gap = start.elapsed();
    assert!(gap >= Duration::from_secs(1));
    assert!(gap <= Duration::from_secs(3));
  }

  #[tokio::test(start_paused = true)]
  async fn test_concurrent_callers_share_the_throttle() {
    let spacer = Arc::new(CallSpacer::new(Duration::from_millis(500), Duration::ZERO));
    let start = Instant::now();

    let handles: Vec<_> = (0..3)
      .map(|_| {
        let spacer = Arc::clone(&spacer);
        tokio::spawn(async move { spacer.wait_turn().await })
      })
      .collect();
    for handle in handles {
      handle.await.unwrap();
    }

    assert!(start.elapsed() >= Duration::from_millis(1000));
  }

  #[tokio::test(start_paused = true)]
  async fn test_idle_time_counts_toward_spacing() {
    let spacer = CallSpacer::new(Duration::from_secs(1), Duration::ZERO);
    spacer.wait_turn().await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    let start = Instant::now();
    spacer.wait_turn().await;
    assert_eq!(start.elapsed(), Duration::ZERO);
  }
}
