//! `serve` command implementation.

use anyhow::{Context, Result};
use std::time::Instant;
use tracing::{info, warn};

use config_loader::ConfigLoader;
use contracts::ServiceBlueprint;
use transport::IngestService;

use crate::cli::ServeArgs;
use crate::stats::ServeStats;

/// Execute the `serve` command
pub async fn run_serve(args: &ServeArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let mut blueprint = ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    apply_overrides(&mut blueprint, args);
    ConfigLoader::validate(&blueprint).context("Configuration invalid after CLI overrides")?;

    info!(
        listen = %blueprint.server.listen_addr,
        shards = blueprint.shards.len(),
        max_attempts = blueprint.failover.max_attempts,
        max_rounds = blueprint.failover.max_rounds,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    if let Some(port) = blueprint.server.metrics_port {
        observability::init_metrics_only(port)?;
    }

    let dispatcher = dispatcher::create_dispatcher(&blueprint)
        .await
        .context("Failed to open shard backends")?;
    let service = IngestService::new(dispatcher.clone());
    let app = transport::router(service.clone(), blueprint.server.max_body_bytes);

    let listener = transport::bind(&blueprint.server.listen_addr).await?;
    let started = Instant::now();

    info!("Starting ingest service...");
    transport::serve(listener, app, transport::shutdown_signal())
        .await
        .context("Ingest server failed")?;

    warn!("Listener closed, draining in-flight writes...");
    let unfinished = dispatcher.drain(blueprint.server.shutdown_grace()).await;

    let stats = ServeStats::collect(&service, started.elapsed(), unfinished);
    stats.log();
    stats.print_summary();

    info!("Event Ingest finished");
    Ok(())
}

/// Apply CLI overrides on top of the file configuration
fn apply_overrides(blueprint: &mut ServiceBlueprint, args: &ServeArgs) {
    if let Some(ref listen) = args.listen {
        info!(listen = %listen, "Overriding listen address from CLI");
        blueprint.server.listen_addr = listen.clone();
    }
    if let Some(port) = args.metrics_port {
        info!(port, "Overriding metrics port from CLI");
        blueprint.server.metrics_port = (port != 0).then_some(port);
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &ServiceBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Server:");
    println!("  Listen: {}", blueprint.server.listen_addr);
    println!("  Max body: {} bytes", blueprint.server.max_body_bytes);
    match blueprint.server.metrics_port {
        Some(port) => println!("  Metrics: :{}", port),
        None => println!("  Metrics: disabled"),
    }

    println!("\nShards ({}):", blueprint.shards.len());
    for (index, shard) in blueprint.shards.iter().enumerate() {
        println!("  [{}] {} ({:?})", index, shard.name, shard.backend_type);
    }

    let failover = &blueprint.failover;
    println!("\nFailover:");
    println!(
        "  {} attempts every {}ms, {}ms between rounds",
        failover.max_attempts, failover.retry_delay_ms, failover.round_pause_ms
    );
    match failover.round_limit() {
        Some(rounds) => println!("  Abandon after {} round(s)", rounds),
        None => println!("  Retry forever"),
    }

    if let Some(ref path) = blueprint.dead_letter.path {
        println!("\nDead letters: {}", path.display());
    }

    println!();
}
