//! Configuration module for the studio API server.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::Parser;
use serde::Deserialize;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Largest accepted `read_buffer_size` (16 MB)
pub const MAX_READ_BUFFER_SIZE: usize = 16 * 1024 * 1024;

/// Command-line arguments for the command server
#[derive(Parser, Debug, Default)]
#[command(name = "studio-api-server")]
#[command(author = "studio authors")]
#[command(version = "0.1.0")]
#[command(about = "Framed TCP command server for the practice instrument", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Interface to listen on (e.g., 127.0.0.1)
    #[arg(short = 'a', long)]
    pub bind_address: Option<String>,

    /// TCP port to listen on
    #[arg(short = 'p', long)]
    pub bind_port: Option<u16>,

    /// Maximum bytes read from a connection per request
    #[arg(short = 'b', long)]
    pub read_buffer_size: Option<usize>,

    /// Connections served at once (1 = strictly sequential)
    #[arg(short = 'n', long)]
    pub max_connections: Option<usize>,

    /// Listen backlog passed to the socket
    #[arg(long)]
    pub backlog: Option<i32>,

    /// Log level (trace, debug, info, warn/warning, error/critical, off)
    #[arg(long, env = "LOGLEVEL")]
    pub log_level: Option<String>,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Port to bind to
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,
    /// Maximum bytes read per request
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
    /// Connections served at once
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Listen backlog
    #[serde(default = "default_backlog")]
    pub backlog: i32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            read_buffer_size: default_read_buffer_size(),
            max_connections: default_max_connections(),
            backlog: default_backlog(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_port() -> u16 {
    8080
}

fn default_read_buffer_size() -> usize {
    1024
}

fn default_max_connections() -> usize {
    1 // one request in flight at a time
}

fn default_backlog() -> i32 {
    128
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub bind_port: u16,
    pub read_buffer_size: usize,
    pub max_connections: usize,
    pub backlog: i32,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::merge(CliArgs::default(), TomlConfig::default())
    }
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        let cli = CliArgs::parse();

        // Load TOML config if specified
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        let config = Self::merge(cli, toml_config);
        config.validate()?;
        Ok(config)
    }

    /// Merge CLI args with TOML config (CLI takes precedence)
    fn merge(cli: CliArgs, toml_config: TomlConfig) -> Self {
        Config {
            bind_address: cli
                .bind_address
                .unwrap_or(toml_config.server.bind_address),
            bind_port: cli.bind_port.unwrap_or(toml_config.server.bind_port),
            read_buffer_size: cli
                .read_buffer_size
                .unwrap_or(toml_config.server.read_buffer_size),
            max_connections: cli
                .max_connections
                .unwrap_or(toml_config.server.max_connections),
            backlog: cli.backlog.unwrap_or(toml_config.server.backlog),
            log_level: cli.log_level.unwrap_or(toml_config.logging.level),
        }
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.read_buffer_size == 0 {
            return Err(ConfigError::Invalid(
                "read_buffer_size must be greater than 0".to_string(),
            ));
        }
        if self.read_buffer_size > MAX_READ_BUFFER_SIZE {
            return Err(ConfigError::Invalid(format!(
                "read_buffer_size must be at most {}",
                MAX_READ_BUFFER_SIZE
            )));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "max_connections must be greater than 0".to_string(),
            ));
        }
        self.level_filter()?;
        Ok(())
    }

    /// Parse `log_level`, also accepting `WARNING` and `CRITICAL`.
    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        parse_level(&self.log_level)
            .ok_or_else(|| ConfigError::Invalid(format!("unknown log level '{}'", self.log_level)))
    }

    /// Build the log filter. A valid `rust_log` directive string wins over
    /// the configured level.
    pub fn env_filter(&self, rust_log: Option<&str>) -> Result<EnvFilter, ConfigError> {
        let directives = rust_log.map(str::trim).filter(|d| !d.is_empty());
        if let Some(filter) = directives.and_then(|d| EnvFilter::try_new(d).ok()) {
            return Ok(filter);
        }
        Ok(EnvFilter::default().add_directive(self.level_filter()?.into()))
    }

    /// Resolve `bind_address:bind_port` to a socket address.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let listen = format!("{}:{}", self.bind_address, self.bind_port);
        (self.bind_address.as_str(), self.bind_port)
            .to_socket_addrs()
            .map_err(|e| ConfigError::InvalidAddress(listen.clone(), Some(e)))?
            .next()
            .ok_or(ConfigError::InvalidAddress(listen, None))
    }
}

fn parse_level(level: &str) -> Option<LevelFilter> {
    let level = level.trim();
    if level.eq_ignore_ascii_case("warning") {
        Some(LevelFilter::WARN)
    } else if level.eq_ignore_ascii_case("critical") {
        Some(LevelFilter::ERROR)
    } else {
        level.parse().ok()
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
    InvalidAddress(String, Option<std::io::Error>),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidAddress(addr, Some(e)) => {
                write!(f, "Invalid listen address '{}': {}", addr, e)
            }
            ConfigError::InvalidAddress(addr, None) => {
                write!(f, "Listen address '{}' did not resolve", addr)
            }
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
