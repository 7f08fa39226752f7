//! Configuration management for fundledger

use serde::Deserialize;
use std::fs;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_api_port")]
    pub api_port: u16,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayConfig {
    /// Shared secret used to verify payment signatures. Required unless
    /// `dev_mode` is set.
    #[serde(default)]
    pub key_secret: String,
    /// Accept unverified receipts. Never enable outside local development.
    #[serde(default)]
    pub dev_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                api_port: default_api_port(),
            },
            database: DatabaseConfig {
                path: default_db_path(),
            },
            // Zero-config runs get the dev gateway. A written config file
            // must choose between a real secret and an explicit dev_mode.
            gateway: GatewayConfig {
                key_secret: String::new(),
                dev_mode: true,
            },
        }
    }
}

pub fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    load_config_from("config.toml")
}

pub fn load_config_from(path: &str) -> Result<Config, Box<dyn std::error::Error>> {
    let config_str = fs::read_to_string(path).unwrap_or_default();
    let config: Config = if config_str.is_empty() {
        // Sane defaults when the config file is absent
        Config::default()
    } else {
        toml::from_str(&config_str)?
    };

    // Validate critical values
    if config.database.path.is_empty() {
        return Err("database.path must be set in config.toml".into());
    }

    if !config.gateway.dev_mode && config.gateway.key_secret.is_empty() {
        return Err("gateway.key_secret must be set unless gateway.dev_mode is enabled".into());
    }

    Ok(config)
}

fn default_api_port() -> u16 {
    5001
}

fn default_db_path() -> String {
    "./data/fundledger.db".to_string()
}
