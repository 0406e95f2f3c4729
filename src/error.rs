//! Error types for nsrip.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Main error type for nsrip operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("query error: {0}")]
    Query(#[from] QueryError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Configuration-related errors.
///
/// All of these are fatal and are raised before any network activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[source] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("error opening file {path:?}: {source}")]
    ListFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not create output file {path:?}: {source}")]
    OutputFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// Validation errors for configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid number of workers: {0}. It must be a positive integer")]
    ZeroWorkers(usize),

    #[error("query_timeout_secs must be greater than 0")]
    ZeroTimeout,

    #[error("channel_capacity must be greater than 0")]
    ZeroChannelCapacity,

    #[error("you must provide either a domain (-d) or a list of domains (-l)")]
    MissingDomain,

    #[error("nameserver list {0:?} contains no entries")]
    EmptyNameserverList(String),
}

/// Failure of a single (domain, nameserver) query.
///
/// These never abort a scan; they are counted and optionally logged.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("no answer from nameserver: {nameserver}")]
    NoAnswer { nameserver: SocketAddr },

    #[error("timeout waiting for nameserver: {nameserver}")]
    Timeout { nameserver: SocketAddr },

    #[error("transport error talking to {nameserver}: {source}")]
    Transport {
        nameserver: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("malformed response from {nameserver}: {source}")]
    Malformed {
        nameserver: SocketAddr,
        #[source]
        source: hickory_proto::ProtoError,
    },

    #[error("invalid domain name {domain:?}: {source}")]
    InvalidDomain {
        domain: String,
        #[source]
        source: hickory_proto::ProtoError,
    },
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;
