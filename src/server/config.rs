//! Command-Line Configuration
//!
//! ```text
//! respite [--host HOST] [--port PORT] [--dir DIR] [--dbfilename FILE]
//!         [--replicaof "HOST PORT"]
//! ```

use crate::storage::StoreConfig;
use thiserror::Error;

/// Errors produced while reading command-line arguments.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} requires a value")]
    MissingValue(String),

    #[error("invalid port number: {0}")]
    InvalidPort(String),

    #[error("unknown argument: {0}")]
    UnknownArgument(String),
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Directory holding the snapshot file
    pub dir: String,
    /// Snapshot file name inside `dir`
    pub dbfilename: String,
    /// `"<host> <port>"` of the leader when running as a follower
    pub replicaof: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let store = StoreConfig::default();
        Self {
            host: crate::DEFAULT_HOST.to_string(),
            port: crate::DEFAULT_PORT,
            dir: store.dir,
            dbfilename: store.dbfilename,
            replicaof: None,
        }
    }
}

/// What the process was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Serve(ServerConfig),
    Help,
    Version,
}

impl ServerConfig {
    /// Parses configuration from command-line arguments, program name excluded.
    pub fn from_args<I>(args: I) -> Result<Invocation, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = ServerConfig::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let mut value = || {
                args.next()
                    .ok_or_else(|| ConfigError::MissingValue(arg.clone()))
            };

            match arg.as_str() {
                "--host" | "-h" => config.host = value()?,
                "--port" | "-p" => {
                    let port = value()?;
                    config.port = port.parse().map_err(|_| ConfigError::InvalidPort(port))?;
                }
                "--dir" => config.dir = value()?,
                "--dbfilename" => config.dbfilename = value()?,
                "--replicaof" => config.replicaof = Some(value()?),
                "--help" => return Ok(Invocation::Help),
                "--version" | "-v" => return Ok(Invocation::Version),
                _ => return Err(ConfigError::UnknownArgument(arg.clone())),
            }
        }

        Ok(Invocation::Serve(config))
    }

    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            dir: self.dir.clone(),
            dbfilename: self.dbfilename.clone(),
        }
    }
}
