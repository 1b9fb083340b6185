use std::path::PathBuf;

use clap::Parser;
use thiserror::Error as ThisError;

/// Number of logical databases a server exposes. Clients start on database 0
/// and move with `SELECT`.
pub const DEFAULT_DB_NUM: usize = 16;

/// Upper bound accepted for `--hz`; matching the range Redis clamps to.
pub const CONFIG_MAX_HZ: u32 = 500;

const DEFAULT_PORT: u16 = 9988;
const DEFAULT_MAX_CLIENTS: u64 = 10_000;
const DEFAULT_PROTO_MAX_BULK_LEN: u64 = 512 * 1024 * 1024;

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("hz must be between 1 and {CONFIG_MAX_HZ}, got {0}")]
    InvalidHz(u32),
    #[error("maxclients must be greater than 0")]
    InvalidMaxClients,
    #[error("proto-max-bulk-len must be greater than 0")]
    InvalidProtoMaxBulkLen,
    #[error("unknown log level {0:?}")]
    InvalidLogLevel(String),
}

#[derive(Parser, Debug, Clone)]
#[command(name = "kiwi", about = "A Redis-compatible in-memory key-value server")]
pub struct Config {
    /// The TCP port to listen on
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Addresses to bind. When none are given the server listens on 0.0.0.0,
    /// which also counts as "no bind address configured" for protected mode.
    #[arg(long = "bind")]
    pub binds: Vec<String>,

    /// Path of the Unix domain socket. Defaults to kiwi.sock in the system
    /// temporary directory.
    #[arg(long)]
    pub unixsocket: Option<PathBuf>,

    /// Disable the Unix domain socket listener
    #[arg(long, default_value_t = false)]
    pub no_unixsocket: bool,

    /// Path of the PID file. Defaults to kiwi.pid in the system temporary
    /// directory.
    #[arg(long)]
    pub pidfile: Option<PathBuf>,

    /// Refuse non-loopback TCP connections when no bind address and no
    /// password are configured
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub protected_mode: bool,

    /// Maximum number of simultaneous clients
    #[arg(long, default_value_t = DEFAULT_MAX_CLIENTS)]
    pub maxclients: u64,

    /// Maximum size of a single bulk string on the wire, in bytes
    #[arg(long, default_value_t = DEFAULT_PROTO_MAX_BULK_LEN)]
    pub proto_max_bulk_len: u64,

    /// Memory usage limit in bytes. 0 disables the limit.
    #[arg(long, default_value_t = 0)]
    pub maxmemory: u64,

    /// Frequency of the server cron in ticks per second
    #[arg(long, default_value_t = 10)]
    pub hz: u32,

    /// Seconds a client may stay idle before it is closed
    #[arg(long, default_value_t = 5)]
    pub timeout: u64,

    /// Require clients to issue AUTH <password> before any other command
    #[arg(long)]
    pub requirepass: Option<String>,

    /// Log verbosity: error, warn, info, debug or trace
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Enable SO_KEEPALIVE on accepted TCP sockets
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub tcp_keepalive: bool,
}

impl Config {
    /// Reject settings the runtime cannot operate under. `hz == 0` would
    /// make the cron period a division by zero, so it fails here instead.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hz == 0 || self.hz > CONFIG_MAX_HZ {
            return Err(ConfigError::InvalidHz(self.hz));
        }
        if self.maxclients == 0 {
            return Err(ConfigError::InvalidMaxClients);
        }
        if self.proto_max_bulk_len == 0 {
            return Err(ConfigError::InvalidProtoMaxBulkLen);
        }
        self.tracing_level()?;
        Ok(())
    }

    pub fn tracing_level(&self) -> Result<tracing::Level, ConfigError> {
        match self.log_level.to_lowercase().as_str() {
            "error" => Ok(tracing::Level::ERROR),
            "warn" => Ok(tracing::Level::WARN),
            "info" => Ok(tracing::Level::INFO),
            "debug" => Ok(tracing::Level::DEBUG),
            "trace" => Ok(tracing::Level::TRACE),
            other => Err(ConfigError::InvalidLogLevel(other.to_string())),
        }
    }

    pub fn pidfile_path(&self) -> PathBuf {
        self.pidfile
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("kiwi.pid"))
    }

    pub fn unixsocket_path(&self) -> Option<PathBuf> {
        if self.no_unixsocket {
            return None;
        }
        Some(
            self.unixsocket
                .clone()
                .unwrap_or_else(|| std::env::temp_dir().join("kiwi.sock")),
        )
    }

    /// Addresses the TCP acceptors bind to.
    pub fn listen_addrs(&self) -> Vec<String> {
        if self.binds.is_empty() {
            vec!["0.0.0.0".to_string()]
        } else {
            self.binds.clone()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::parse_from(["kiwi"])
    }
}
