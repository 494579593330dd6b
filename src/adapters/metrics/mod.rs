//! Metrics and Monitoring Adapters
//!
//! Provides Prometheus metrics and health check endpoints (/live, /ready,
//! /metrics) via axum 0.7. Served in continuous mode only.

pub mod health;
pub mod prometheus;

pub use health::{HealthServer, HealthState};
pub use prometheus::MetricsRegistry;
