//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (blockchain RPC, HTTP clients, database, file
//! I/O). Each sub-module groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `chain`: EVM JSON-RPC access and exchange-rate calls via alloy-rs
//! - `quotes`: 1inch and ParaSwap swap-aggregator clients
//! - `persistence`: Postgres, JSONL and dry-run observation sinks
//! - `metrics`: Prometheus metrics export and health checks

pub mod chain;
pub mod metrics;
pub mod persistence;
pub mod quotes;
