//! Command-line interface.

use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;
use crate::error::{ConfigError, Result, ValidationError};
use crate::lists::NameserverSource;

#[derive(Parser, Debug)]
#[command(name = "nsrip", version)]
#[command(
    about = "Query domains directly against cloud nameservers to find origin IP leaks",
    long_about = None
)]
pub struct Args {
    /// Target domain
    #[arg(short, long)]
    pub domain: Option<String>,

    /// File with a list of target domains (takes precedence over --domain)
    #[arg(short, long)]
    pub list: Option<PathBuf>,

    /// Nameserver list to use: aws, azure, gcp, cloud, or the path to a custom file
    #[arg(short, long, default_value = "cloud")]
    pub nameservers: NameserverSource,

    /// Number of concurrent workers [default: 10]
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Per-query timeout in seconds [default: 5]
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Only output raw results
    #[arg(short, long)]
    pub quiet: bool,

    /// Show failed queries
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Output file where to save results
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// TOML file with default settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

impl Args {
    /// Reject invalid flag values before touching the filesystem.
    pub fn validate(&self) -> Result<()> {
        if self.workers == Some(0) {
            return Err(ConfigError::from(ValidationError::ZeroWorkers(0)).into());
        }
        if self.timeout == Some(0) {
            return Err(ConfigError::from(ValidationError::ZeroTimeout).into());
        }
        if self.domain.is_none() && self.list.is_none() {
            return Err(ConfigError::from(ValidationError::MissingDomain).into());
        }
        Ok(())
    }

    /// Effective configuration: file (or defaults) overridden by flags.
    pub fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(timeout) = self.timeout {
            config.query_timeout_secs = timeout;
        }
        config.no_color |= self.no_color;

        config.validate()?;
        Ok(config)
    }
}
