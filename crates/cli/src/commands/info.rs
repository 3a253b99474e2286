//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::ServiceBlueprint;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    server: ServerInfo,
    failover: FailoverInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    dead_letter_path: Option<String>,
    shards: Vec<ShardInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    route: Option<RouteInfo>,
}

#[derive(Serialize)]
struct ServerInfo {
    listen_addr: String,
    max_body_bytes: usize,
    shutdown_grace_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics_port: Option<u16>,
}

#[derive(Serialize)]
struct FailoverInfo {
    max_attempts: u32,
    retry_delay_ms: u64,
    round_pause_ms: u64,
    /// 0 = retry forever
    max_rounds: u32,
}

#[derive(Serialize)]
struct ShardInfo {
    index: usize,
    name: String,
    backend_type: String,
    #[serde(skip_serializing_if = "std::collections::HashMap::is_empty")]
    params: std::collections::HashMap<String, String>,
}

#[derive(Serialize, Debug, PartialEq)]
struct RouteInfo {
    /// Key as given on the command line
    key: String,
    /// Key after normalization, which is what gets hashed
    normalized_key: String,
    hash: String,
    shard_index: usize,
    shard: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let route = args
        .route
        .as_deref()
        .map(|key| route_info(&blueprint, key))
        .transpose()?;

    if args.json {
        let info = build_config_info(&blueprint, route);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, route.as_ref());
    }

    Ok(())
}

/// Resolve the shard a transaction id is written to
fn route_info(blueprint: &ServiceBlueprint, key: &str) -> Result<RouteInfo> {
    let normalized_key = ingestion::normalize_key(key);
    let shard_index = dispatcher::shard_for_key(&normalized_key, blueprint.shards.len())
        .context("Cannot route without shards")?;
    let shard = blueprint
        .shards
        .get(shard_index)
        .map(|s| s.name.clone())
        .context("Shard index out of range")?;

    Ok(RouteInfo {
        key: key.to_string(),
        hash: format!("{:016x}", dispatcher::stable_hash(&normalized_key)),
        normalized_key,
        shard_index,
        shard,
    })
}

fn build_config_info(blueprint: &ServiceBlueprint, route: Option<RouteInfo>) -> ConfigInfo {
    let shards = blueprint
        .shards
        .iter()
        .enumerate()
        .map(|(index, s)| ShardInfo {
            index,
            name: s.name.clone(),
            backend_type: format!("{:?}", s.backend_type),
            params: s.params.clone(),
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        server: ServerInfo {
            listen_addr: blueprint.server.listen_addr.clone(),
            max_body_bytes: blueprint.server.max_body_bytes,
            shutdown_grace_ms: blueprint.server.shutdown_grace_ms,
            metrics_port: blueprint.server.metrics_port,
        },
        failover: FailoverInfo {
            max_attempts: blueprint.failover.max_attempts,
            retry_delay_ms: blueprint.failover.retry_delay_ms,
            round_pause_ms: blueprint.failover.round_pause_ms,
            max_rounds: blueprint.failover.max_rounds,
        },
        dead_letter_path: blueprint
            .dead_letter
            .path
            .as_ref()
            .map(|p| p.display().to_string()),
        shards,
        route,
    }
}

fn print_config_info(blueprint: &ServiceBlueprint, route: Option<&RouteInfo>) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Event Ingest Configuration                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let server = &blueprint.server;
    println!("🌐 Server");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Listen: {}", server.listen_addr);
    println!("   ├─ Max body: {} bytes", server.max_body_bytes);
    println!("   ├─ Shutdown grace: {}ms", server.shutdown_grace_ms);
    match server.metrics_port {
        Some(port) => println!("   └─ Metrics port: {}", port),
        None => println!("   └─ Metrics: disabled"),
    }

    println!("\n🗄️  Shards ({})", blueprint.shards.len());
    for (i, shard) in blueprint.shards.iter().enumerate() {
        let is_last = i == blueprint.shards.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!("   {} [{}] {} ({:?})", prefix, i, shard.name, shard.backend_type);
        if let Some(path) = shard.params.get("path") {
            println!("   {}  └─ path: {}", child_prefix, path);
        }
    }

    let failover = &blueprint.failover;
    println!("\n🔁 Failover");
    println!("   ├─ Attempts per round: {}", failover.max_attempts);
    println!("   ├─ Retry delay: {}ms", failover.retry_delay_ms);
    println!("   ├─ Round pause: {}ms", failover.round_pause_ms);
    match failover.round_limit() {
        Some(rounds) => println!("   └─ Rounds: {}", rounds),
        None => println!("   └─ Rounds: unbounded"),
    }

    if let Some(ref path) = blueprint.dead_letter.path {
        println!("\n📮 Dead letters: {}", path.display());
    }

    if let Some(route) = route {
        println!("\n🧭 Route");
        println!("   ├─ Key: {} (normalized: {})", route.key, route.normalized_key);
        println!("   ├─ Hash: {}", route.hash);
        println!("   └─ Shard: [{}] {}", route.shard_index, route.shard);
    }

    println!();
}
