//! DNS-related modules.

pub mod answer;
pub mod client;
pub mod query;

pub use answer::{Answer, ClassifiedRecord};
pub use client::{DnsExchange, UdpTcpExchange};
pub use query::QueryEngine;
