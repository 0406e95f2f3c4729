//! Classified DNS answers.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use hickory_proto::rr::{Name, RData, Record};

/// One answer-section record, tagged by the kind of value it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedRecord {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Cname(Name),
    /// Any other record type, kept as its zone-file rendering.
    Other(String),
}

impl ClassifiedRecord {
    /// Classify a single resource record.
    pub fn classify(record: &Record) -> Self {
        match record.data() {
            RData::A(a) => Self::A(a.0),
            RData::AAAA(aaaa) => Self::Aaaa(aaaa.0),
            RData::CNAME(cname) => Self::Cname(cname.0.clone()),
            _ => Self::Other(record.to_string()),
        }
    }

    /// Whether the record points somewhere (address or alias).
    pub const fn is_resolvable(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for ClassifiedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A(addr) => write!(f, "{addr}"),
            Self::Aaaa(addr) => write!(f, "{addr}"),
            Self::Cname(target) => write!(f, "{target}"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

/// Classify an answer section, preserving the server's record order.
pub fn classify(records: &[Record]) -> Vec<ClassifiedRecord> {
    records.iter().map(ClassifiedRecord::classify).collect()
}

/// The successful result of querying one domain against one nameserver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub nameserver: IpAddr,
    pub domain: String,
    pub records: Vec<ClassifiedRecord>,
}
