use std::path::Path;

use anyhow::{Context as _, Result};
use clap::Parser;
use serde_derive::Deserialize;

const DEFAULT_CONFIG_FILE: &str = "callsign.toml";

#[derive(Debug, Parser)]
#[command(name = "callsign", version, about = "Relay messages between named WebSocket clients")]
pub struct CliConfig {
    /// Path to the config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<String>,

    /// Port to listen on all interfaces, overrides the listen address of the config file
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Directory of the web client files
    #[arg(long, value_name = "DIR")]
    pub static_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub assets: Assets,
}

#[derive(Debug, Deserialize)]
pub struct Network {
    #[serde(default = "default_listen")]
    pub listen: String,
}

#[derive(Debug, Deserialize)]
pub struct Assets {
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

impl Default for Network {
    fn default() -> Self {
        Self { listen: default_listen() }
    }
}

impl Default for Assets {
    fn default() -> Self {
        Self {
            static_dir: default_static_dir(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_static_dir() -> String {
    "static".to_string()
}

pub fn parse_config(path: &str) -> Result<Config> {
    let cfg = std::fs::read_to_string(path).with_context(|| format!("Cannot read config file {path}"))?;

    parse_config_str(&cfg)
}

pub fn parse_config_str(cfg: &str) -> Result<Config> {
    Ok(toml::from_str(cfg)?)
}

pub fn cli() -> CliConfig {
    CliConfig::parse()
}

/// Build the effective config: defaults, then the config file, then the command line.
///
/// The default config file is optional, an explicitly given one must exist.
pub fn load(cli: &CliConfig) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => parse_config(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => parse_config(DEFAULT_CONFIG_FILE)?,
        None => Config::default(),
    };

    if let Some(port) = cli.port {
        config.network.listen = format!("0.0.0.0:{port}");
    }

    if let Some(static_dir) = &cli.static_dir {
        config.assets.static_dir = static_dir.clone();
    }

    Ok(config)
}
