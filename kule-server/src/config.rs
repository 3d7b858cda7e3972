//! Gateway configuration.
//!
//! Configuration is merged from the following sources, lowest priority first:
//! 1. Built-in defaults
//! 2. `./kule.toml`, or the file given by `--config`
//! 3. Environment variables prefixed with `KULE_`, nested with `__`
//!    (for example `KULE_STORE__HOST`)
//! 4. Command-line flags

use std::{fmt, path::PathBuf};

use clap::{Parser, ValueEnum};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ServerError;

pub const DEFAULT_CONFIG_FILE: &str = "kule.toml";
pub const DEFAULT_BIND: &str = "localhost:8000";
pub const DEFAULT_PORT: u16 = 8000;

/// Command-line options of the `kule` binary.
#[derive(Debug, Default, Parser)]
#[command(name = "kule", version, about = "REST gateway over document collections")]
pub struct Cli {
    /// Address to listen on.
    #[arg(long, value_name = "HOST[:PORT]")]
    pub bind: Option<String>,

    /// MongoDB host.
    #[arg(long = "mongodb-host", value_name = "HOST")]
    pub mongodb_host: Option<String>,

    /// MongoDB port.
    #[arg(long = "mongodb-port", value_name = "PORT")]
    pub mongodb_port: Option<u16>,

    /// Database to serve.
    #[arg(short = 'd', long)]
    pub database: Option<String>,

    /// Comma-separated collection whitelist.
    #[arg(short = 'c', long, value_name = "NAMES")]
    pub collections: Option<String>,

    /// Storage backend.
    #[arg(long, value_enum)]
    pub store: Option<StoreKind>,

    /// Configuration file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log filter directive, such as `debug` or `kule_server=trace`.
    #[arg(long, value_name = "FILTER")]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub json_logs: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Mongodb,
    Memory,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Mongodb => f.write_str("mongodb"),
            StoreKind::Memory => f.write_str("memory"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    /// Collection whitelist. Empty permits every collection.
    #[serde(default, deserialize_with = "names")]
    pub collections: Vec<String>,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// `host[:port]`
    pub bind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreKind,
    pub host: String,
    pub port: u16,
    pub database: String,
    /// Full connection string; overrides `host` and `port` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: DEFAULT_BIND.to_string() }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreKind::Mongodb,
            host: "localhost".to_string(),
            port: 27017,
            database: String::new(),
            uri: None,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl GatewayConfig {
    /// Loads and validates the configuration for `cli`.
    pub fn load(cli: &Cli) -> Result<Self, ServerError> {
        let config: Self = Self::figment(cli).extract()?;
        config.validate()?;

        Ok(config)
    }

    /// The merged configuration sources for `cli`.
    pub fn figment(cli: &Cli) -> Figment {
        let path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("KULE_").split("__"));

        if let Some(bind) = &cli.bind {
            figment = figment.merge(Serialized::default("server.bind", bind));
        }
        if let Some(host) = &cli.mongodb_host {
            figment = figment.merge(Serialized::default("store.host", host));
        }
        if let Some(port) = cli.mongodb_port {
            figment = figment.merge(Serialized::default("store.port", port));
        }
        if let Some(database) = &cli.database {
            figment = figment.merge(Serialized::default("store.database", database));
        }
        if let Some(store) = cli.store {
            figment = figment.merge(Serialized::default("store.backend", store));
        }
        if let Some(collections) = &cli.collections {
            figment = figment.merge(Serialized::default("collections", collections));
        }
        if let Some(level) = &cli.log_level {
            figment = figment.merge(Serialized::default("log.level", level));
        }
        if cli.json_logs {
            figment = figment.merge(Serialized::default("log.json", true));
        }

        figment
    }

    pub fn validate(&self) -> Result<(), ServerError> {
        if self.store.backend == StoreKind::Mongodb && self.store.database.trim().is_empty() {
            return Err(ServerError::Config(
                "a database is required (--database, store.database or KULE_STORE__DATABASE)".to_string(),
            ));
        }

        self.server.bind_addr()?;

        Ok(())
    }
}

impl ServerConfig {
    /// Splits `bind` into host and port. The port defaults to 8000.
    pub fn bind_addr(&self) -> Result<(String, u16), ServerError> {
        let bind = self.bind.trim();
        let invalid = || ServerError::Config(format!("invalid bind address {bind:?}"));

        let (host, port) = match bind.rsplit_once(':') {
            // A bare IPv6 address has several colons and no port.
            Some((host, _)) if host.contains(':') && !host.ends_with(']') => (bind, DEFAULT_PORT),
            Some((host, port)) => (host, port.parse::<u16>().map_err(|_| invalid())?),
            None => (bind, DEFAULT_PORT),
        };

        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(invalid());
        }

        Ok((host.to_string(), port))
    }
}

/// Accepts either a list of names or one comma-separated string.
fn names<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Names {
        List(Vec<String>),
        Joined(String),
    }

    let names = match Names::deserialize(deserializer)? {
        Names::List(names) => names,
        Names::Joined(joined) => joined.split(',').map(str::to_string).collect(),
    };

    Ok(names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect())
}
