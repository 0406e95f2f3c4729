//! nsrip - query domains directly against cloud nameservers.
//!
//! Given a set of nameserver hostnames and a set of target domains, nsrip
//! resolves every nameserver to an address and then asks each of them for
//! the `A` records of every domain. Nameservers that answer for zones they
//! should not know about can leak the origin address of a site hidden
//! behind a CDN or WAF.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`config`] and [`cli`]: Configuration loading and validation
//! - [`lists`]: Bundled provider nameserver lists and list files
//! - [`nameservers`]: Concurrent nameserver hostname resolution
//! - [`dns`]: Query construction, wire exchange, and answer classification
//! - [`dispatch`]: Cross-product query dispatch over a worker pool
//! - [`progress`]: Progress accounting and reporting
//! - [`sink`]: Result rendering and output file
//! - [`scan`]: Pipeline orchestration
//! - [`error`]: Error types
//!
//! # Testing
//!
//! Network access goes through two traits, [`nameservers::HostLookup`] and
//! [`dns::DnsExchange`], so the whole pipeline can run against mocks:
//!
//! ```rust
//! use std::net::Ipv4Addr;
//! use nsrip::dns::ClassifiedRecord;
//!
//! let record = ClassifiedRecord::A(Ipv4Addr::new(198, 51, 100, 9));
//! assert!(record.is_resolvable());
//! assert_eq!(record.to_string(), "198.51.100.9");
//! ```

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod dns;
pub mod error;
pub mod lists;
pub mod nameservers;
pub mod progress;
pub mod scan;
pub mod sink;

pub use config::Config;
pub use error::{Error, Result};
