use anyhow::Result;
use assetflow_core::{ConfigLoader, SnapshotCache};
use assetflow_gateway::OrderGateway;
use assetflow_orchestrator::{AssetRegistry, Dispatcher};
use assetflow_paper::{PaperBroker, SimFeed};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Parser)]
#[command(name = "assetflow")]
#[command(about = "Multi-asset trading orchestrator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the orchestrator against the simulated paper market
    Run {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
        /// Milliseconds between simulated feed ticks
        #[arg(long, default_value_t = 500)]
        tick_ms: u64,
    },
    /// Load a config file and report what it declares
    ValidateConfig {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Run { config, tick_ms } => run_paper(&config, tick_ms).await?,
        Commands::ValidateConfig { config } => validate_config(&config)?,
    }

    Ok(())
}

async fn run_paper(config_path: &str, tick_ms: u64) -> Result<()> {
    tracing::info!(config = config_path, "starting orchestrator");

    let config = ConfigLoader::load(config_path)?;

    let cache = Arc::new(SnapshotCache::new());
    let broker = Arc::new(PaperBroker::new());
    let gateway = Arc::new(OrderGateway::new(broker, config.gateway.clone()));
    let registry = Arc::new(AssetRegistry::new(
        Arc::clone(&cache),
        gateway,
        config.shutdown_drain_timeout(),
    ));

    let mut vehicles = Vec::new();
    for asset in &config.assets {
        let strategy = assetflow_strategy::create_strategy(asset)?;
        registry.spawn_asset(asset.clone(), strategy).await?;
        let vehicle = asset.vehicle();
        if !vehicles.contains(&vehicle) {
            vehicles.push(vehicle);
        }
    }
    tracing::info!(
        assets = config.assets.len(),
        vehicles = vehicles.len(),
        "assets spawned"
    );

    let feed = SimFeed::new(vehicles, Duration::from_millis(tick_ms));
    let dispatcher = Dispatcher::new(Arc::clone(&cache), Arc::clone(&registry), config.feed.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let dispatch = tokio::spawn(async move { dispatcher.run(Box::new(feed), shutdown_rx).await });

    wait_for_signal().await;

    let _ = shutdown_tx.send(true);
    if let Err(e) = dispatch.await? {
        tracing::error!(error = %e, "dispatcher exited with error");
    }
    registry.shutdown_all().await;

    println!("\nFinal positions");
    println!("{}", "-".repeat(72));
    for status in registry.statuses().await {
        println!(
            "{:<16} committed {:>12}  realized pnl {:>12}  state {:?}",
            status.asset_id,
            status.position.cash_committed,
            status.position.realized_pnl,
            status.state,
        );
        for (vehicle, lot) in status.position.lots() {
            println!(
                "  {:<14} qty {:>10} @ basis {:>10}",
                vehicle.symbol, lot.quantity, lot.basis
            );
        }
    }

    tracing::info!("orchestrator stopped");
    Ok(())
}

fn validate_config(config_path: &str) -> Result<()> {
    let config = ConfigLoader::load(config_path)?;

    println!("Config OK: {config_path}");
    println!(
        "feed backoff {}..{}ms, gateway {} attempts, drain timeout {}s",
        config.feed.initial_backoff_ms,
        config.feed.max_backoff_ms,
        config.gateway.max_attempts,
        config.shutdown_drain_timeout_secs,
    );
    println!(
        "{:<16} {:<20} {:<8} {:>12} {:>8}",
        "Asset", "Strategy", "Vehicle", "Budget", "Enabled"
    );
    println!("{}", "-".repeat(72));
    for asset in &config.assets {
        println!(
            "{:<16} {:<20} {:<8} {:>12} {:>8}",
            asset.id, asset.strategy, asset.vehicle, asset.budget, asset.enabled
        );
    }

    Ok(())
}

async fn wait_for_signal() {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("Failed to create SIGTERM handler");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received Ctrl+C, initiating graceful shutdown");
        }
        _ = sigterm.recv() => {
            tracing::info!("received SIGTERM, initiating graceful shutdown");
        }
    }
}
