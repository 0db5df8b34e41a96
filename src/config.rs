//! Client configuration.
//!
//! Values resolve in priority order:
//! 1. CLI flags
//! 2. the JSON config file (`--config`, else `<config dir>/dorch/config.json`)
//! 3. `DORCH_*` environment variables
//! 4. built-in defaults
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_SCHEMA_VERSION: u32 = 1;

pub const DEFAULT_TIMEOUT_MS: u64 = 20_000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_500;
pub const DEFAULT_ACTOR: &str = "portal";
pub const DEFAULT_NAME_PREFIX: &str = "onboard";
pub const DEFAULT_REGION: &str = "westeurope";
pub const DEFAULT_ENVIRONMENT: &str = "dev";

pub const ENV_BASE_URL: &str = "DORCH_BASE_URL";
pub const ENV_API_KEY: &str = "DORCH_API_KEY";
pub const ENV_AUTHORIZATION: &str = "DORCH_AUTHORIZATION";
pub const ENV_TIMEOUT_MS: &str = "DORCH_TIMEOUT_MS";
pub const ENV_POLL_INTERVAL_MS: &str = "DORCH_POLL_INTERVAL_MS";
pub const ENV_ACTOR: &str = "DORCH_ACTOR";

/// Fully resolved settings used by every command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub authorization: Option<String>,
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub actor: String,
    pub name_prefix: String,
    pub region: String,
    pub environment: String,
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// On-disk config file. Every field except the schema version is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_ms: Option<u64>,
}

/// Default config file location under the user's config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dorch").join("config.json"))
}

/// Load a config file from disk.
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: ConfigFile = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {} in {}",
            config.schema_version,
            path.display()
        ));
    }
    Ok(config)
}

/// Resolve the effective config from flags, the config file, and the process environment.
pub fn load_client_config(overrides: &ConfigOverrides) -> Result<ClientConfig> {
    let file = match &overrides.config_path {
        Some(path) => Some(load_config_file(path)?),
        None => match default_config_path().filter(|path| path.is_file()) {
            Some(path) => Some(load_config_file(&path)?),
            None => None,
        },
    };
    resolve_config(overrides, file.as_ref(), |key| std::env::var(key).ok())
}

/// Merge the config layers; `env` is injected so resolution stays testable.
pub fn resolve_config(
    overrides: &ConfigOverrides,
    file: Option<&ConfigFile>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ClientConfig> {
    let env_text = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let env_ms = |key: &str| -> Result<Option<u64>> {
        env_text(key)
            .map(|raw| {
                raw.parse::<u64>()
                    .with_context(|| format!("parse {key}={raw} as milliseconds"))
            })
            .transpose()
    };

    let base_url = overrides
        .base_url
        .clone()
        .or_else(|| file.and_then(|f| f.base_url.clone()))
        .or_else(|| env_text(ENV_BASE_URL))
        .ok_or_else(|| {
            anyhow!("base URL missing; pass --base-url, set base_url in the config file, or set {ENV_BASE_URL}")
        })?;
    let api_key = overrides
        .api_key
        .clone()
        .or_else(|| file.and_then(|f| f.api_key.clone()))
        .or_else(|| env_text(ENV_API_KEY));
    let authorization = file
        .and_then(|f| f.authorization.clone())
        .or_else(|| env_text(ENV_AUTHORIZATION));
    let timeout_ms = match overrides
        .timeout_ms
        .or_else(|| file.and_then(|f| f.timeout_ms))
    {
        Some(ms) => ms,
        None => env_ms(ENV_TIMEOUT_MS)?.unwrap_or(DEFAULT_TIMEOUT_MS),
    };
    let poll_interval_ms = match file.and_then(|f| f.poll_interval_ms) {
        Some(ms) => ms,
        None => env_ms(ENV_POLL_INTERVAL_MS)?.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
    };
    let actor = file
        .and_then(|f| f.actor.clone())
        .or_else(|| env_text(ENV_ACTOR))
        .unwrap_or_else(|| DEFAULT_ACTOR.to_string());

    let config = ClientConfig {
        base_url: base_url.trim().trim_end_matches('/').to_string(),
        api_key,
        authorization,
        timeout_ms,
        poll_interval_ms,
        actor,
        name_prefix: file
            .and_then(|f| f.name_prefix.clone())
            .unwrap_or_else(|| DEFAULT_NAME_PREFIX.to_string()),
        region: file
            .and_then(|f| f.region.clone())
            .unwrap_or_else(|| DEFAULT_REGION.to_string()),
        environment: file
            .and_then(|f| f.environment.clone())
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
    };
    validate_config(&config)?;
    Ok(config)
}

/// Validate resolved settings before any request is made.
pub fn validate_config(config: &ClientConfig) -> Result<()> {
    if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
        return Err(anyhow!(
            "base URL must start with http:// or https:// (got {})",
            config.base_url
        ));
    }
    if config.timeout_ms == 0 {
        return Err(anyhow!("timeout_ms must be greater than zero"));
    }
    if config.poll_interval_ms == 0 {
        return Err(anyhow!("poll_interval_ms must be greater than zero"));
    }
    if config.actor.trim().is_empty() {
        return Err(anyhow!("actor must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
