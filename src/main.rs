//! LST Price Fetcher — Entry Point
//!
//! Initializes configuration, logging, the token registry and every
//! adapter, then hands the ingestion pipeline to the supervisor.
//!
//! Wiring sequence:
//! 1. Parse CLI flags, load config.toml + env overrides, validate
//! 2. Init tracing (JSON structured logging)
//! 3. Load and validate the token registry
//! 4. Create RPC providers + exchange-rate reader (PrimaryRateSource port)
//! 5. Create the configured quote adapter (QuoteSource port)
//! 6. Open the observation sink (ObservationSink port, migrations included)
//! 7. Spawn the signal listener (SIGINT/SIGTERM → watch channel)
//! 8. Single-shot: run one cycle and log the itemized result
//!    Continuous: spawn health/metrics server, run the supervisor loop

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};

use lst_price_fetcher::adapters::chain::{ExchangeRateContracts, RpcProviders};
use lst_price_fetcher::adapters::metrics::{HealthServer, HealthState, MetricsRegistry};
use lst_price_fetcher::adapters::persistence::build_sink;
use lst_price_fetcher::adapters::quotes::build_quote_source;
use lst_price_fetcher::config::loader::{load_config, validate_config};
use lst_price_fetcher::config::registry::load_registry;
use lst_price_fetcher::config::{AdapterKind, AppConfig, RunMode};
use lst_price_fetcher::domain::report::{CycleReport, Outcome};
use lst_price_fetcher::usecases::{IngestionPipeline, Supervisor};

/// Primary/secondary market price ingestion for liquid staking tokens.
#[derive(Debug, Parser)]
#[command(name = "lst-price-fetcher", version, about)]
struct Cli {
    /// Path to config.toml.
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Path to the token registry (overrides service.registry_path).
    #[arg(short, long)]
    registry: Option<String>,

    /// Compute observations without storing them.
    #[arg(short, long, env = "DRY_RUN")]
    dry_run: bool,

    /// Run continuously instead of a single cycle.
    #[arg(short = 'l', long, env = "LONG_RUN")]
    long_run: bool,

    /// Cycle period in minutes for continuous mode.
    #[arg(short, long, env = "SCHEDULE_MINUTES")]
    schedule: Option<u64>,

    /// Secondary-market quote adapter.
    #[arg(long, value_enum)]
    adapter: Option<AdapterKind>,
}

impl Cli {
    /// Layer command-line flags over the loaded configuration.
    fn apply(&self, config: &mut AppConfig) {
        if let Some(path) = &self.registry {
            config.service.registry_path.clone_from(path);
        }
        if self.dry_run {
            config.service.dry_run = true;
        }
        if self.long_run {
            config.service.mode = RunMode::Continuous;
        }
        if let Some(minutes) = self.schedule {
            config.service.period_minutes = minutes;
        }
        if let Some(adapter) = self.adapter {
            config.quotes.adapter = adapter;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Configuration: file → env → CLI ──────────────────
    let cli = Cli::parse();
    let mut config = load_config(&cli.config).context("Failed to load configuration")?;
    cli.apply(&mut config);
    validate_config(&config).context("Invalid configuration after CLI overrides")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.service.log_level)),
        )
        .json()
        .init();

    log_startup(&cli.config, &config);

    // ── 3. Token registry ───────────────────────────────────
    let networks = config.network_table();
    let registry = Arc::new(
        load_registry(&config.service.registry_path, &networks)
            .context("Failed to load token registry")?,
    );

    // ── 4. Primary market: RPC providers + rate reader ──────
    let rpc_timeout = Duration::from_secs(config.rpc.timeout_seconds);
    let providers =
        Arc::new(RpcProviders::new(&config.rpc.endpoints).context("Failed to create RPC providers")?);
    if tokio::time::timeout(rpc_timeout, providers.verify(&networks))
        .await
        .is_err()
    {
        warn!("RPC endpoint check timed out, continuing");
    }
    let primary = Arc::new(ExchangeRateContracts::new(Arc::clone(&providers), rpc_timeout));

    // ── 5. Secondary market: quote adapter ──────────────────
    let quotes = build_quote_source(&config.quotes).context("Failed to create quote adapter")?;

    // ── 6. Observation sink ─────────────────────────────────
    let sink = build_sink(&config.persistence, config.service.dry_run)
        .await
        .context("Failed to open observation sink")?;

    let pipeline = Arc::new(IngestionPipeline::new(registry, primary, quotes, sink));
    let period = Duration::from_secs(config.service.period_minutes * 60);
    let supervisor = Supervisor::new(pipeline, period);

    // ── 7. Shutdown signal channel ──────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown signal received, finishing current item");
        let _ = signal_tx.send(true);
    });

    // ── 8. Run ──────────────────────────────────────────────
    match config.service.mode {
        RunMode::SingleShot => match supervisor.run_once(shutdown_rx).await {
            Some(report) => log_itemized(&report),
            None => error!("Cycle aborted by an unexpected error, see previous log entries"),
        },
        RunMode::Continuous => {
            let mut supervisor = supervisor;
            let mut health_handle = None;

            if config.metrics.enabled {
                let metrics =
                    Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);
                let health = Arc::new(HealthState::new());
                let server = HealthServer::new(
                    Arc::clone(&health),
                    Arc::clone(&metrics),
                    config.metrics.bind_address.clone(),
                );
                let server_shutdown = shutdown_rx.clone();
                health_handle = Some(tokio::spawn(async move {
                    if let Err(e) = server.run(server_shutdown).await {
                        error!(error = %e, "Health server failed");
                    }
                }));
                supervisor = supervisor.with_monitoring(metrics, health);
            }

            supervisor.run_continuous(shutdown_rx).await;

            // Stop the health server even if the loop ended on its own.
            let _ = shutdown_tx.send(true);
            if let Some(handle) = health_handle {
                let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
            }
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Configuration summary. Called once the subscriber is installed.
fn log_startup(config_path: &str, config: &AppConfig) {
    info!(
        path = config_path,
        backend = ?config.persistence.backend,
        "Configuration loaded successfully"
    );
    info!(
        name = %config.service.name,
        version = env!("CARGO_PKG_VERSION"),
        dry_run = config.service.dry_run,
        mode = ?config.service.mode,
        adapter = ?config.quotes.adapter,
        "Starting LST price fetcher"
    );
}

/// Resolve on SIGINT, or SIGTERM on Unix.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("SIGINT received"),
                    _ = sigterm.recv() => info!("SIGTERM received"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "Cannot listen for SIGTERM, only SIGINT will stop the service"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Cannot listen for SIGINT");
        std::future::pending::<()>().await;
    }
}

/// Single-shot report: one line per item plus the totals.
fn log_itemized(report: &CycleReport) {
    for item in &report.items {
        match &item.outcome {
            Outcome::Written { price, premium } => info!(
                token = %item.token,
                network = %item.network,
                market = item.market.as_str(),
                price = %price,
                premium = %premium,
                "written"
            ),
            Outcome::Skipped(reason) => info!(
                token = %item.token,
                network = %item.network,
                market = item.market.as_str(),
                reason = reason.kind(),
                "skipped"
            ),
        }
    }

    info!(
        cycle_id = %report.cycle_id,
        attempted = report.attempted(),
        written = report.written(),
        skipped = report.skipped(),
        interrupted = report.interrupted,
        "Single-shot run complete"
    );
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Mutex;

    use super::*;

    /// Log sink shared between the subscriber and the assertions.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    fn capture<F: FnOnce()>(f: F) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .json()
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        captured.text()
    }

    #[test]
    fn test_config_summary_reaches_installed_subscriber() {
        let config = AppConfig::default();
        let out = capture(|| log_startup("config.toml", &config));
        assert!(out.contains("Configuration loaded successfully"), "got {out}");
        assert!(out.contains("config.toml"));
        assert!(out.contains("Starting LST price fetcher"));
    }

    #[test]
    fn test_config_loading_emits_nothing_before_init() {
        let out = capture(|| {
            let _ = load_config("config.toml");
        });
        assert!(out.is_empty(), "events before init are lost: {out}");
    }

    #[test]
    fn test_cli_flags_override_config() {
        let cli = Cli::parse_from([
            "lst-price-fetcher",
            "--long-run",
            "--schedule",
            "15",
            "--adapter",
            "paraswap",
            "-r",
            "other.json",
        ]);
        let mut config = AppConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.service.mode, RunMode::Continuous);
        assert_eq!(config.service.period_minutes, 15);
        assert_eq!(config.quotes.adapter, AdapterKind::Paraswap);
        assert_eq!(config.service.registry_path, "other.json");
    }

    #[test]
    fn test_defaults_leave_config_untouched() {
        let cli = Cli::parse_from(["lst-price-fetcher", "-c", "x.toml"]);
        let mut config = AppConfig::default();
        cli.apply(&mut config);
        assert_eq!(cli.config, "x.toml");
        assert_eq!(config.service.mode, RunMode::SingleShot);
        assert_eq!(config.quotes.adapter, AdapterKind::OneInch);
    }
}
