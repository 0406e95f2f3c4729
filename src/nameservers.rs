//! Nameserver hostname resolution.
//!
//! Turns the input list of nameserver hostnames into a [`NameserverIndex`]
//! keyed by IP address, using a bounded pool of lookup workers. Hostnames
//! that do not resolve are recorded as unresolved and never queried.

use std::collections::BTreeMap;
use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

/// Trait for hostname-to-address lookups.
///
/// Implementations:
/// - [`SystemLookup`], backed by the operating system resolver
/// - Mock lookups with canned answers for testing
pub trait HostLookup: Send + Sync + Clone + 'static {
    /// Resolve `hostname` to a single address, `None` when it does not resolve.
    fn lookup(&self, hostname: &str) -> impl Future<Output = Option<IpAddr>> + Send;
}

/// Lookup through the system resolver (`getaddrinfo`).
///
/// Lookup failures and empty answers are both reported as `None`; only the
/// resolver's own timeout bounds a lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLookup;

impl HostLookup for SystemLookup {
    async fn lookup(&self, hostname: &str) -> Option<IpAddr> {
        match tokio::net::lookup_host((hostname, 0)).await {
            Ok(mut addrs) => addrs.next().map(|addr| addr.ip()),
            Err(err) => {
                debug!(%hostname, "nameserver lookup failed: {err}");
                None
            }
        }
    }
}

/// A nameserver hostname and the address it resolved to, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameserverRecord {
    pub hostname: String,
    pub resolved_ip: Option<IpAddr>,
}

/// Resolved nameservers keyed by IP address.
///
/// Built once by [`resolve_nameservers`] and read-only afterwards. When
/// several hostnames share an address, the one listed first in the input
/// is kept. Iteration is in ascending IP order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameserverIndex {
    by_ip: BTreeMap<IpAddr, String>,
    unresolved: Vec<String>,
}

impl NameserverIndex {
    /// Build an index from records tagged with their input position.
    pub fn from_records(records: impl IntoIterator<Item = (usize, NameserverRecord)>) -> Self {
        let mut records: Vec<_> = records.into_iter().collect();
        records.sort_by_key(|(position, _)| *position);

        let mut index = Self::default();
        for (_, record) in records {
            match record.resolved_ip {
                Some(ip) => {
                    index.by_ip.entry(ip).or_insert(record.hostname);
                }
                None => index.unresolved.push(record.hostname),
            }
        }
        index
    }

    /// Hostname registered for `ip`.
    pub fn hostname(&self, ip: &IpAddr) -> Option<&str> {
        self.by_ip.get(ip).map(String::as_str)
    }

    /// Resolved addresses in dispatch order.
    pub fn ips(&self) -> impl Iterator<Item = IpAddr> + '_ {
        self.by_ip.keys().copied()
    }

    /// `(ip, hostname)` pairs in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = (IpAddr, &str)> + '_ {
        self.by_ip.iter().map(|(ip, name)| (*ip, name.as_str()))
    }

    /// Hostnames that failed to resolve, in input order.
    pub fn unresolved(&self) -> &[String] {
        &self.unresolved
    }

    /// Number of distinct resolved addresses.
    pub fn len(&self) -> usize {
        self.by_ip.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_ip.is_empty()
    }
}

/// Resolve every hostname with `workers` concurrent lookups.
///
/// Blocks until every hostname has been attempted. Duplicate hostnames are
/// looked up again; unresolved ones end up in
/// [`NameserverIndex::unresolved`] instead of failing the call.
pub async fn resolve_nameservers<L: HostLookup>(
    lookup: &L,
    hostnames: &[String],
    workers: usize,
) -> NameserverIndex {
    if hostnames.is_empty() {
        return NameserverIndex::default();
    }

    let (job_tx, job_rx) = mpsc::channel::<(usize, String)>(hostnames.len());
    let (result_tx, mut result_rx) = mpsc::channel(hostnames.len());

    for job in hostnames.iter().cloned().enumerate() {
        // Capacity equals the job count, so this never waits.
        if job_tx.send(job).await.is_err() {
            break;
        }
    }
    drop(job_tx);

    let job_rx = Arc::new(Mutex::new(job_rx));
    let handles: Vec<_> = (0..workers.min(hostnames.len()))
        .map(|_| {
            let lookup = lookup.clone();
            let job_rx = Arc::clone(&job_rx);
            let result_tx = result_tx.clone();
            tokio::spawn(async move {
                loop {
                    let Some((position, hostname)) = job_rx.lock().await.recv().await else {
                        break;
                    };
                    let resolved_ip = lookup.lookup(&hostname).await;
                    debug!(%hostname, ?resolved_ip, "nameserver resolved");
                    let record = NameserverRecord {
                        hostname,
                        resolved_ip,
                    };
                    if result_tx.send((position, record)).await.is_err() {
                        break;
                    }
                }
            })
        })
        .collect();
    // Workers hold the remaining senders; the channel closes once they exit.
    drop(result_tx);

    let mut records = Vec::with_capacity(hostnames.len());
    while let Some(result) = result_rx.recv().await {
        records.push(result);
    }

    for handle in handles {
        if let Err(err) = handle.await {
            warn!("nameserver lookup worker failed: {err}");
        }
    }

    let index = NameserverIndex::from_records(records);
    info!(
        resolved = index.len(),
        unresolved = index.unresolved().len(),
        "nameserver mapping complete"
    );
    index
}
