//! Scan orchestration.
//!
//! A scan runs in two phases:
//! 1. Resolve every nameserver hostname (blocks until all are attempted)
//! 2. Query every domain against every resolved nameserver, streaming
//!    results to the [`ResultSink`] while the [`ProgressReporter`] answers
//!    progress requests

use std::sync::Arc;

use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dispatch::{Dispatcher, query_count};
use crate::dns::{DnsExchange, QueryEngine};
use crate::error::Result;
use crate::nameservers::{HostLookup, NameserverIndex, resolve_nameservers};
use crate::progress::{ProgressReporter, ProgressSnapshot, ProgressTracker};
use crate::sink::ResultSink;

/// Outcome of a finished scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    /// Distinct resolved nameserver addresses.
    pub nameservers: usize,
    /// Hostnames that did not resolve.
    pub unresolved: usize,
    pub progress: ProgressSnapshot,
    pub answers: u64,
    pub records: u64,
}

/// Runs the resolve-then-query pipeline.
pub struct Scanner<L, E> {
    lookup: L,
    dispatcher: Dispatcher<E>,
    workers: usize,
    channel_capacity: usize,
    verbose: bool,
}

impl<L, E> Scanner<L, E>
where
    L: HostLookup,
    E: DnsExchange,
{
    pub fn new(lookup: L, exchange: E, config: &Config) -> Self {
        let engine = QueryEngine::new(exchange, config.nameserver_port);
        Self {
            lookup,
            dispatcher: Dispatcher::new(engine, config.workers, config.channel_capacity),
            workers: config.workers,
            channel_capacity: config.channel_capacity,
            verbose: false,
        }
    }

    /// Forward failed queries to the sink and report unresolved nameservers.
    #[must_use]
    pub fn verbose(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self.dispatcher = self.dispatcher.report_failures(enabled);
        self
    }

    /// Phase 1: map nameserver hostnames to addresses.
    ///
    /// Unresolved hostnames are dropped silently unless verbose.
    pub async fn resolve(&self, hostnames: &[String]) -> NameserverIndex {
        let index = resolve_nameservers(&self.lookup, hostnames, self.workers).await;
        for hostname in index.unresolved() {
            if self.verbose {
                warn!(%hostname, "nameserver did not resolve, skipping");
            } else {
                debug!(%hostname, "nameserver did not resolve, skipping");
            }
        }
        index
    }

    /// Phase 2: query every domain against every resolved nameserver.
    ///
    /// Returns once every query has been attempted and the sink has
    /// written every result. The reporter, if any, is stopped first.
    pub async fn query<W>(
        &self,
        index: Arc<NameserverIndex>,
        domains: &[String],
        sink: ResultSink<W>,
        reporter: Option<ProgressReporter>,
    ) -> Result<ScanSummary>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let progress = Arc::new(ProgressTracker::new(query_count(&index, domains)));
        info!(total = progress.total(), "querying domains against nameservers");

        let (event_tx, event_rx) = mpsc::channel(self.channel_capacity);
        let sink_handle = tokio::spawn(sink.run(Arc::clone(&index), event_rx));

        let cancel = CancellationToken::new();
        let reporter_handle =
            reporter.map(|reporter| reporter.spawn(Arc::clone(&progress), cancel.clone()));

        self.dispatcher
            .run(&index, domains, Arc::clone(&progress), event_tx)
            .await;

        cancel.cancel();
        if let Some(handle) = reporter_handle
            && let Err(err) = handle.await
        {
            warn!("progress reporter failed: {err}");
        }

        let stats = sink_handle.await.map_err(std::io::Error::other)??;

        Ok(ScanSummary {
            nameservers: index.len(),
            unresolved: index.unresolved().len(),
            progress: progress.snapshot(),
            answers: stats.answers,
            records: stats.records,
        })
    }

    /// Run both phases back to back.
    pub async fn run<W>(
        &self,
        hostnames: &[String],
        domains: &[String],
        sink: ResultSink<W>,
        reporter: Option<ProgressReporter>,
    ) -> Result<ScanSummary>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let index = Arc::new(self.resolve(hostnames).await);
        self.query(index, domains, sink, reporter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::query::tests::MockExchange;
    use crate::nameservers::tests::MockLookup;
    use std::io;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Mutex;
    use tracing_subscriber::EnvFilter;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Resolve two dead hostnames and one live one under the default `warn` filter.
    async fn resolve_logs(verbose: bool) -> (NameserverIndex, String) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("warn"))
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let lookup = MockLookup::new([("ns1.example", IpAddr::V4(Ipv4Addr::new(203, 0, 113, 5)))]);
        let scanner =
            Scanner::new(lookup, MockExchange::default(), &Config::default()).verbose(verbose);
        let hostnames = ["dead1.example", "ns1.example", "dead2.example"].map(String::from);
        let index = scanner.resolve(&hostnames).await;

        (index, logs.text())
    }

    #[tokio::test]
    async fn should_exclude_unresolved_nameservers_silently() {
        let (index, logs) = resolve_logs(false).await;

        assert_eq!(index.len(), 1);
        assert_eq!(index.unresolved(), ["dead1.example", "dead2.example"]);
        assert!(!logs.contains("did not resolve"), "unexpected log output: {logs}");
    }

    #[tokio::test]
    async fn should_report_unresolved_nameservers_when_verbose() {
        let (index, logs) = resolve_logs(true).await;

        assert_eq!(index.unresolved().len(), 2);
        assert!(logs.contains("hostname=dead1.example"), "missing log: {logs}");
        assert!(logs.contains("hostname=dead2.example"), "missing log: {logs}");
    }
}
