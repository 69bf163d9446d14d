//! Configuration module for packet-log.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

use crate::protocol::DEFAULT_MAX_MESSAGE_SIZE;

/// Command-line arguments for the server
#[derive(Parser, Debug)]
#[command(name = "packet-log")]
#[command(author = "packet-log authors")]
#[command(version = "0.1.0")]
#[command(about = "Logs text packets and shows them back on request", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (e.g., 0.0.0.0:8080)
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Largest accepted request payload in bytes
    #[arg(long)]
    pub max_message_size: Option<usize>,

    /// Path of the packet log file
    #[arg(short = 'f', long)]
    pub log_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Command-line arguments for the one-shot client
#[derive(Parser, Debug)]
#[command(name = "packet-log-client")]
#[command(author = "packet-log authors")]
#[command(version = "0.1.0")]
#[command(about = "Sends one message to a packet-log server and prints the reply", long_about = None)]
pub struct ClientArgs {
    /// Server address to connect to
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    pub connect: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Message to send; `show` prints the server's log
    #[arg(default_value = "Hello, server!")]
    pub message: String,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Largest accepted request payload in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            max_message_size: default_max_message_size(),
        }
    }
}

/// Storage-related configuration
#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    /// Path of the packet log file
    #[serde(default = "default_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
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

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_message_size() -> usize {
    DEFAULT_MAX_MESSAGE_SIZE
}

fn default_path() -> PathBuf {
    PathBuf::from("packet_log.txt")
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: String,
    pub max_message_size: usize,
    pub log_file: PathBuf,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::merge(
            CliArgs {
                config: None,
                listen: None,
                max_message_size: None,
                log_file: None,
                log_level: None,
            },
            TomlConfig::default(),
        )
    }
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(CliArgs::parse())
    }

    /// Resolve already-parsed CLI args, reading the TOML file they name.
    pub fn from_args(cli: CliArgs) -> Result<Self, ConfigError> {
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Ok(Self::merge(cli, toml_config))
    }

    fn merge(cli: CliArgs, toml_config: TomlConfig) -> Self {
        Config {
            listen: cli.listen.unwrap_or(toml_config.server.listen),
            max_message_size: cli
                .max_message_size
                .unwrap_or(toml_config.server.max_message_size),
            log_file: cli.log_file.unwrap_or(toml_config.storage.path),
            log_level: cli.log_level.unwrap_or(toml_config.logging.level),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {err}", path = .0.display(), err = .1)]
    FileRead(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse config file '{path}': {err}", path = .0.display(), err = .1)]
    TomlParse(PathBuf, #[source] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = TomlConfig::default();
        assert_eq!(config.server.listen, "0.0.0.0:8080");
        assert_eq!(config.server.max_message_size, 16 * 1024 * 1024);
        assert_eq!(config.storage.path, PathBuf::from("packet_log.txt"));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            listen = "127.0.0.1:9090"
            max_message_size = 4096

            [storage]
            path = "/var/lib/packet-log/packets.txt"

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:9090");
        assert_eq!(config.server.max_message_size, 4096);
        assert_eq!(
            config.storage.path,
            PathBuf::from("/var/lib/packet-log/packets.txt")
        );
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_partial_toml() {
        let config: TomlConfig = toml::from_str("[storage]\npath = \"x.txt\"\n").unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:8080");
        assert_eq!(config.storage.path, PathBuf::from("x.txt"));
    }

    #[test]
    fn test_cli_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("packet-log.toml");
        std::fs::write(
            &path,
            "[server]\nlisten = \"127.0.0.1:9090\"\n[logging]\nlevel = \"debug\"\n",
        )
        .unwrap();

        let cli = CliArgs::try_parse_from([
            "packet-log",
            "--config",
            path.to_str().unwrap(),
            "--listen",
            "127.0.0.1:7070",
            "-f",
            "other.txt",
        ])
        .unwrap();
        let config = Config::from_args(cli).unwrap();

        assert_eq!(config.listen, "127.0.0.1:7070");
        assert_eq!(config.log_file, PathBuf::from("other.txt"));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.max_message_size, DEFAULT_MAX_MESSAGE_SIZE);
    }

    #[test]
    fn test_missing_config_file() {
        let cli = CliArgs::try_parse_from(["packet-log", "-c", "/nonexistent/packet-log.toml"])
            .unwrap();

        match Config::from_args(cli) {
            Err(ConfigError::FileRead(path, _)) => {
                assert_eq!(path, PathBuf::from("/nonexistent/packet-log.toml"))
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_bad_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[server\nlisten = ").unwrap();

        let cli = CliArgs::try_parse_from(["packet-log", "-c", path.to_str().unwrap()]).unwrap();
        assert!(matches!(
            Config::from_args(cli),
            Err(ConfigError::TomlParse(..))
        ));
    }

    #[test]
    fn test_client_defaults() {
        let args = ClientArgs::try_parse_from(["packet-log-client"]).unwrap();
        assert_eq!(args.connect, "127.0.0.1:8080");
        assert_eq!(args.message, "Hello, server!");

        let args = ClientArgs::try_parse_from(["packet-log-client", "-c", "10.0.0.2:8080", "show"])
            .unwrap();
        assert_eq!(args.connect, "10.0.0.2:8080");
        assert_eq!(args.message, "show");
    }
}
