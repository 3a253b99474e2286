//! Blueprint validation
//!
//! Rules:
//! - field-level constraints declared on the contract types (`validator` derive)
//! - shard names unique
//! - file backends carry a `path` parameter
//! - listen address parses as a socket address

use std::collections::HashSet;
use std::net::SocketAddr;

use contracts::{BackendType, ContractError, ServiceBlueprint};
use validator::Validate;

/// Validate a ServiceBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &ServiceBlueprint) -> Result<(), ContractError> {
    validate_declared_rules(blueprint)?;
    validate_shard_names(blueprint)?;
    validate_shard_params(blueprint)?;
    validate_listen_addr(blueprint)?;
    Ok(())
}

fn validate_declared_rules(blueprint: &ServiceBlueprint) -> Result<(), ContractError> {
    blueprint
        .validate()
        .map_err(|e| ContractError::config_validation("blueprint", e.to_string()))
}

/// Shard names must be unique
fn validate_shard_names(blueprint: &ServiceBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for shard in &blueprint.shards {
        if !seen.insert(shard.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("shards[name={}]", shard.name),
                "duplicate shard name",
            ));
        }
    }
    Ok(())
}

fn validate_shard_params(blueprint: &ServiceBlueprint) -> Result<(), ContractError> {
    for (idx, shard) in blueprint.shards.iter().enumerate() {
        if shard.backend_type == BackendType::File
            && shard.params.get("path").is_none_or(|p| p.trim().is_empty())
        {
            return Err(ContractError::config_validation(
                format!("shards[{}].params.path", idx),
                format!("file shard '{}' requires a 'path' parameter", shard.name),
            ));
        }
    }
    Ok(())
}

fn validate_listen_addr(blueprint: &ServiceBlueprint) -> Result<(), ContractError> {
    let addr = &blueprint.server.listen_addr;
    addr.parse::<SocketAddr>().map(|_| ()).map_err(|e| {
        ContractError::config_validation(
            "server.listen_addr",
            format!("invalid listen address '{addr}': {e}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        ConfigVersion, DeadLetterConfig, FailoverConfig, ServerConfig, ShardConfig,
    };
    use std::collections::HashMap;

    fn minimal_blueprint() -> ServiceBlueprint {
        ServiceBlueprint {
            version: ConfigVersion::V1,
            server: ServerConfig::default(),
            failover: FailoverConfig::default(),
            dead_letter: DeadLetterConfig::default(),
            shards: vec![
                ShardConfig {
                    name: "database_1".into(),
                    backend_type: BackendType::Memory,
                    params: HashMap::new(),
                },
                ShardConfig {
                    name: "database_2".into(),
                    backend_type: BackendType::File,
                    params: HashMap::from([("path".into(), "./data/db2.jsonl".into())]),
                },
            ],
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&minimal_blueprint()).is_ok());
    }

    #[test]
    fn test_duplicate_shard_name() {
        let mut bp = minimal_blueprint();
        bp.shards[1].name = "database_1".into();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("duplicate shard name"), "got: {err}");
    }

    #[test]
    fn test_file_shard_without_path() {
        let mut bp = minimal_blueprint();
        bp.shards[1].params.clear();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("requires a 'path'"), "got: {err}");
    }

    #[test]
    fn test_no_shards() {
        let mut bp = minimal_blueprint();
        bp.shards.clear();
        let err = validate(&bp).unwrap_err();
        assert!(matches!(err, ContractError::ConfigValidation { .. }));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut bp = minimal_blueprint();
        bp.failover.max_attempts = 0;
        assert!(validate(&bp).is_err());
    }

    #[test]
    fn test_bad_listen_addr() {
        let mut bp = minimal_blueprint();
        bp.server.listen_addr = "localhost".into();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("invalid listen address"), "got: {err}");
    }
}
