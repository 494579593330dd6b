//! Persistence Adapters - Observation Sinks
//!
//! Implements the `ObservationSink` port:
//! - `PostgresSink`: `prices` table via SeaORM, schema migrated at startup
//! - `JsonlSink`: append-only daily JSONL files, no database dependency
//! - `NoopSink`: dry-run, stores nothing

pub mod jsonl;
pub mod migration;
pub mod noop;
pub mod postgres;
pub mod prices;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::{PersistenceConfig, SinkBackend};
use crate::ports::sink::ObservationSink;

pub use jsonl::JsonlSink;
pub use noop::NoopSink;
pub use postgres::PostgresSink;

/// Build the sink for this run. `dry_run` always wins over the backend.
///
/// # Errors
/// Fails if the backend cannot be opened (missing `DATABASE_URL`,
/// unreachable database, unwritable data directory).
pub async fn build_sink(config: &PersistenceConfig, dry_run: bool) -> Result<Arc<dyn ObservationSink>> {
    if dry_run {
        info!("Dry run: observations will not be stored");
        return Ok(Arc::new(NoopSink));
    }

    let sink: Arc<dyn ObservationSink> = match config.backend {
        SinkBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set for the postgres backend")?;
            Arc::new(PostgresSink::connect(url).await?)
        }
        SinkBackend::Jsonl => Arc::new(JsonlSink::open(&config.data_dir).await?),
    };

    info!(backend = ?config.backend, "Observation sink ready");
    Ok(sink)
}
