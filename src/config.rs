//! Configuration for the echo server and client.
//!
//! Both binaries take their required settings positionally on the command
//! line. Optional settings may also come from a TOML file passed with
//! `--config`; CLI arguments take precedence over config file values.

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::net;

/// When the server sends received text back to its client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EchoMode {
    /// Accumulate everything the client sends and echo it once, after the
    /// client has closed its side.
    #[default]
    Session,
    /// Echo each line as soon as its terminator arrives.
    Line,
}

/// Command-line arguments for the echo server
#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(version = "0.1.0")]
#[command(about = "Line-oriented TCP echo server", long_about = None)]
pub struct ServerArgs {
    /// Port to listen on (1024-49151)
    #[arg(allow_hyphen_values = true)]
    pub port: String,

    /// Local address to bind to (defaults to all interfaces)
    #[arg(short, long)]
    pub bind: Option<IpAddr>,

    /// When to echo received text back
    #[arg(short, long, value_enum)]
    pub echo_mode: Option<EchoMode>,

    /// Put accepted client sockets in non-blocking mode
    #[arg(long)]
    pub nonblocking: bool,

    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Command-line arguments for the interactive client
#[derive(Parser, Debug)]
#[command(name = "client")]
#[command(version = "0.1.0")]
#[command(about = "Interactive client for the line echo server", long_about = None)]
pub struct ClientArgs {
    /// Host name or IP address of the server
    pub host: String,

    /// Port the server is listening on (1024-49151)
    #[arg(allow_hyphen_values = true)]
    pub port: String,

    /// Read a reply after every line (for a server started with `--echo-mode line`)
    #[arg(long)]
    pub await_replies: bool,

    /// Whether a line holding only '.' ends the session after it is sent
    #[arg(long)]
    pub dot_terminates: Option<bool>,

    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub client: ClientSection,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize, Default)]
pub struct ServerSection {
    /// Local address to bind to
    pub bind: Option<IpAddr>,
    /// When to echo received text back
    pub echo_mode: Option<EchoMode>,
    /// Put accepted client sockets in non-blocking mode
    #[serde(default)]
    pub nonblocking: bool,
}

/// Client-related configuration
#[derive(Debug, Deserialize, Default)]
pub struct ClientSection {
    /// Read one reply line after every send
    pub await_replies: Option<bool>,
    /// A lone '.' ends the session after it is sent
    pub dot_terminates: Option<bool>,
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

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: IpAddr,
    pub port: u16,
    pub echo_mode: EchoMode,
    pub nonblocking: bool,
    pub log_level: String,
}

impl ServerConfig {
    /// Load configuration from the process arguments and optional TOML file.
    pub fn load() -> Result<Self> {
        Self::from_args(parse_args::<ServerArgs>()?)
    }

    /// Merge parsed CLI args with the TOML file they reference, if any.
    pub fn from_args(cli: ServerArgs) -> Result<Self> {
        let port = parse_port(&cli.port)?;
        let toml_config = load_toml(cli.config.as_deref())?;

        Ok(ServerConfig {
            bind: cli
                .bind
                .or(toml_config.server.bind)
                .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            port,
            echo_mode: cli
                .echo_mode
                .or(toml_config.server.echo_mode)
                .unwrap_or_default(),
            nonblocking: cli.nonblocking || toml_config.server.nonblocking,
            log_level: merge_log_level(cli.log_level, toml_config.logging),
        })
    }
}

/// Final resolved client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub await_replies: bool,
    pub dot_terminates: bool,
    pub log_level: String,
}

impl ClientConfig {
    /// Load configuration from the process arguments and optional TOML file.
    pub fn load() -> Result<Self> {
        Self::from_args(parse_args::<ClientArgs>()?)
    }

    /// Merge parsed CLI args with the TOML file they reference, if any.
    pub fn from_args(cli: ClientArgs) -> Result<Self> {
        let port = parse_port(&cli.port)?;
        let toml_config = load_toml(cli.config.as_deref())?;

        Ok(ClientConfig {
            host: cli.host,
            port,
            await_replies: cli.await_replies || toml_config.client.await_replies.unwrap_or(false),
            dot_terminates: cli
                .dot_terminates
                .or(toml_config.client.dot_terminates)
                .unwrap_or(true),
            log_level: merge_log_level(cli.log_level, toml_config.logging),
        })
    }
}

/// Parse a port argument.
///
/// Text that is not an integer is an invalid argument; an integer outside the
/// registered range is an invalid port.
pub fn parse_port(arg: &str) -> Result<u16> {
    let value: i64 = arg
        .trim()
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("'{arg}' is not a port number")))?;
    net::validate_port(value)
}

fn parse_args<T: Parser>() -> Result<T> {
    T::try_parse().map_err(|e| match e.kind() {
        clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => e.exit(),
        _ => Error::InvalidArgument(e.to_string()),
    })
}

fn load_toml(path: Option<&Path>) -> std::result::Result<TomlConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(TomlConfig::default());
    };
    let contents = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
    toml::from_str(&contents).map_err(|source| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source,
    })
}

fn merge_log_level(cli_level: String, logging: LoggingConfig) -> String {
    if cli_level != "info" {
        cli_level
    } else {
        logging.level
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}'", .path.display())]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file '{}'", .path.display())]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
