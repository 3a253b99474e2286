//! ServiceBlueprint - Config Loader output
//!
//! Describes the complete service configuration: listener, failover policy,
//! dead-letter destination and the fixed list of shard backends.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete service blueprint
///
/// Shard order is significant: the router maps keys to positions in
/// `shards`, so reordering or resizing the list remaps stored data.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServiceBlueprint {
    #[serde(default)]
    pub version: ConfigVersion,

    #[serde(default)]
    #[validate(nested)]
    pub server: ServerConfig,

    #[serde(default)]
    #[validate(nested)]
    pub failover: FailoverConfig,

    #[serde(default)]
    #[validate(nested)]
    pub dead_letter: DeadLetterConfig,

    /// Shard backends, at least one
    #[validate(length(min = 1), nested)]
    pub shards: Vec<ShardConfig>,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    /// Listen address (e.g., "0.0.0.0:8888")
    #[serde(default = "default_listen_addr")]
    #[validate(length(min = 1))]
    pub listen_addr: String,

    /// Largest accepted request body
    #[serde(default = "default_max_body_bytes")]
    #[validate(range(min = 1))]
    pub max_body_bytes: usize,

    /// How long shutdown waits for in-flight writes
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,

    /// Prometheus exporter port (None = disabled)
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

impl ServerConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            max_body_bytes: default_max_body_bytes(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
            metrics_port: None,
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8888".to_string()
}

fn default_max_body_bytes() -> usize {
    16 * 1024 * 1024
}

fn default_shutdown_grace_ms() -> u64 {
    10_000
}

/// Retry policy for transient backend failures
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FailoverConfig {
    /// Attempts per failover round
    #[serde(default = "default_max_attempts")]
    #[validate(range(min = 1))]
    pub max_attempts: u32,

    /// Delay between attempts within a round
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Pause before each round
    #[serde(default = "default_round_pause_ms")]
    pub round_pause_ms: u64,

    /// Rounds before the event is abandoned (0 = retry forever)
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
}

impl FailoverConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn round_pause(&self) -> Duration {
        Duration::from_millis(self.round_pause_ms)
    }

    /// Round cap, `None` when retrying forever
    pub fn round_limit(&self) -> Option<u32> {
        (self.max_rounds > 0).then_some(self.max_rounds)
    }
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            round_pause_ms: default_round_pause_ms(),
            max_rounds: default_max_rounds(),
        }
    }
}

fn default_max_attempts() -> u32 {
    60
}

fn default_retry_delay_ms() -> u64 {
    5_000
}

fn default_round_pause_ms() -> u64 {
    1_000
}

fn default_max_rounds() -> u32 {
    1
}

/// Where abandoned events are recorded
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DeadLetterConfig {
    /// JSONL file; abandoned events are only kept in memory when unset
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Most recent letters kept in memory; older ones survive only in `path`
    #[serde(default = "default_recent_limit")]
    #[validate(range(min = 1))]
    pub recent_limit: usize,
}

impl Default for DeadLetterConfig {
    fn default() -> Self {
        Self {
            path: None,
            recent_limit: default_recent_limit(),
        }
    }
}

fn default_recent_limit() -> usize {
    1_000
}

/// Backend kind of one shard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendType {
    /// Process-local map
    Memory,
    /// Append-only JSONL file
    File,
    /// Logs documents only
    Log,
}

/// Shard configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ShardConfig {
    /// Unique shard name
    #[validate(length(min = 1))]
    pub name: String,

    pub backend_type: BackendType,

    /// Backend specific parameters (e.g., `path` for file backends)
    #[serde(default)]
    pub params: HashMap<String, String>,
}
