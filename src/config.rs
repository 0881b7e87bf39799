//! Configuration module for the execution node.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

/// Operating mode for the node
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// TCP listener answering with framed HTTP-style responses
    Server,
    /// Subprocess bridge: requests on stdin, delimited results on stdout
    Bridge,
}

/// Command-line arguments for the execution node
#[derive(Parser, Debug)]
#[command(name = "exec-node")]
#[command(author = "exec-node authors")]
#[command(version = "0.1.0")]
#[command(about = "A polyglot execution-dispatch node", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host address to bind to (e.g., 127.0.0.1)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Operating mode (server or bridge)
    #[arg(short, long, value_enum)]
    pub mode: Option<Mode>,

    /// Maximum accepted request size in bytes
    #[arg(long)]
    pub max_request_bytes: Option<usize>,

    /// Maximum number of concurrently handled connections
    #[arg(long)]
    pub max_connections: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Operating mode
    pub mode: Option<Mode>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            mode: None,
        }
    }
}

/// Request and concurrency limits
#[derive(Debug, Deserialize)]
pub struct LimitsConfig {
    /// Maximum accepted request size in bytes
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,
    /// Maximum number of concurrently handled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_bytes: default_max_request_bytes(),
            max_connections: default_max_connections(),
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

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    56000
}

fn default_max_request_bytes() -> usize {
    30_000
}

fn default_max_connections() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub mode: Mode,
    pub max_request_bytes: usize,
    pub max_connections: usize,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::resolve(CliArgs::parse())
    }

    fn resolve(cli: CliArgs) -> Result<Self, ConfigError> {
        // Load TOML config if specified
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        // Merge CLI args with TOML config (CLI takes precedence)
        Ok(Config {
            host: cli.host.unwrap_or(toml_config.server.host),
            port: cli.port.unwrap_or(toml_config.server.port),
            mode: cli
                .mode
                .or(toml_config.server.mode)
                .unwrap_or(Mode::Server),
            max_request_bytes: cli
                .max_request_bytes
                .unwrap_or(toml_config.limits.max_request_bytes),
            max_connections: cli
                .max_connections
                .unwrap_or(toml_config.limits.max_connections),
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.logging.level
            },
        })
    }

    /// Address to bind the listener to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
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
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TomlConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 56000);
        assert_eq!(config.limits.max_request_bytes, 30_000);
        assert_eq!(config.limits.max_connections, 1024);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            host = "0.0.0.0"
            port = 56004
            mode = "bridge"

            [limits]
            max_request_bytes = 65536
            max_connections = 256

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 56004);
        assert_eq!(config.server.mode, Some(Mode::Bridge));
        assert_eq!(config.limits.max_request_bytes, 65536);
        assert_eq!(config.limits.max_connections, 256);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_listen_addr() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 56000,
            mode: Mode::Server,
            max_request_bytes: 30_000,
            max_connections: 1024,
            log_level: "info".to_string(),
        };
        assert_eq!(config.listen_addr(), "127.0.0.1:56000");
    }
}
