//! Configuration loading and validation.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, Result, ValidationError};

/// Tunables for a scan.
///
/// Loaded from an optional TOML file; command-line flags override
/// individual values afterwards (see [`crate::cli::Args::config`]).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Number of concurrent workers, used for both nameserver resolution
    /// and domain queries.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Round-trip deadline for a single DNS query, in seconds.
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,

    /// Port the nameservers are queried on.
    #[serde(default = "default_nameserver_port")]
    pub nameserver_port: u16,

    /// Capacity of the job and answer channels.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Disable ANSI colors on the console.
    #[serde(default)]
    pub no_color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            query_timeout_secs: default_query_timeout(),
            nameserver_port: default_nameserver_port(),
            channel_capacity: default_channel_capacity(),
            no_color: false,
        }
    }
}

const fn default_workers() -> usize {
    10
}

const fn default_query_timeout() -> u64 {
    5
}

const fn default_nameserver_port() -> u16 {
    53
}

const fn default_channel_capacity() -> usize {
    100
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Per-query deadline.
    pub const fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(ConfigError::from(ValidationError::ZeroWorkers(self.workers)).into());
        }

        if self.query_timeout_secs == 0 {
            return Err(ConfigError::from(ValidationError::ZeroTimeout).into());
        }

        if self.channel_capacity == 0 {
            return Err(ConfigError::from(ValidationError::ZeroChannelCapacity).into());
        }

        Ok(())
    }
}
