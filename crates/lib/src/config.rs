//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.despacho/config.json`) and
//! environment. A missing file is not an error; everything has a default.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::assistant::DEFAULT_WEBHOOK_URL;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Gateway server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Conversational service settings.
    #[serde(default)]
    pub assistant: AssistantConfig,
}

/// Gateway bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// HTTP port (default 3000).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    3000
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// Conversational service settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantConfig {
    /// Webhook URL of the conversational service. Overridden by
    /// DESPACHO_WEBHOOK_URL env.
    pub webhook_url: Option<String>,
}

/// Resolve the assistant webhook URL: env DESPACHO_WEBHOOK_URL overrides
/// config; the hardcoded default is the last resort.
pub fn resolve_webhook_url(config: &Config) -> String {
    std::env::var("DESPACHO_WEBHOOK_URL")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            config
                .assistant
                .webhook_url
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .unwrap_or_else(|| DEFAULT_WEBHOOK_URL.to_string())
}

/// Default config path: DESPACHO_CONFIG_PATH env, else ~/.despacho/config.json.
pub fn default_config_path() -> PathBuf {
    if let Ok(p) = std::env::var("DESPACHO_CONFIG_PATH") {
        let p = p.trim();
        if !p.is_empty() {
            return PathBuf::from(p);
        }
    }
    dirs::home_dir()
        .map(|h| h.join(".despacho").join("config.json"))
        .unwrap_or_else(|| PathBuf::from("config.json"))
}

/// Load config from the given path (or the default path). A missing file
/// yields the defaults; a malformed file is an error.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok((Config::default(), path));
    }
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    let config: Config =
        serde_json::from_str(&raw).with_context(|| format!("parsing config at {}", path.display()))?;
    Ok((config, path))
}
