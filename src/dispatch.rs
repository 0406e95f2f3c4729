//! Cross-product query dispatch over a bounded worker pool.
//!
//! Every (domain, resolved nameserver) pair becomes one [`QueryJob`]. A
//! producer feeds jobs through a bounded channel to `workers` tasks running
//! the [`QueryEngine`]; successful answers, and failures when requested, flow
//! out through the event channel in completion order.

use std::net::IpAddr;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use crate::dns::{Answer, DnsExchange, QueryEngine};
use crate::error::QueryError;
use crate::nameservers::NameserverIndex;
use crate::progress::ProgressTracker;

/// One unit of work: query `domain` against `nameserver`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryJob {
    pub domain: Arc<str>,
    pub nameserver: IpAddr,
}

/// A query that did not produce an answer.
#[derive(Debug)]
pub struct QueryFailure {
    pub domain: Arc<str>,
    pub nameserver: IpAddr,
    pub error: QueryError,
}

/// What the workers hand to the result sink.
#[derive(Debug)]
pub enum DispatchEvent {
    Answer(Answer),
    Failure(QueryFailure),
}

/// Number of queries a dispatch over `index` and `domains` will run.
pub fn query_count(index: &NameserverIndex, domains: &[String]) -> u64 {
    index.len() as u64 * domains.len() as u64
}

/// Runs every (domain, nameserver) combination through a [`QueryEngine`].
#[derive(Debug, Clone)]
pub struct Dispatcher<E> {
    engine: QueryEngine<E>,
    workers: usize,
    channel_capacity: usize,
    report_failures: bool,
}

impl<E: DnsExchange> Dispatcher<E> {
    pub const fn new(engine: QueryEngine<E>, workers: usize, channel_capacity: usize) -> Self {
        Self {
            engine,
            workers,
            channel_capacity,
            report_failures: false,
        }
    }

    /// Also forward failed queries to the event channel.
    #[must_use]
    pub fn report_failures(mut self, enabled: bool) -> Self {
        self.report_failures = enabled;
        self
    }

    /// Dispatch the full cross product and wait until every job is done.
    ///
    /// Jobs are produced nameserver by nameserver, domains in input order
    /// within each. Each attempted job bumps `progress` exactly once. The
    /// event channel is closed when this returns, which ends the sink.
    pub async fn run(
        &self,
        index: &NameserverIndex,
        domains: &[String],
        progress: Arc<ProgressTracker>,
        events: mpsc::Sender<DispatchEvent>,
    ) {
        let (job_tx, job_rx) = mpsc::channel::<QueryJob>(self.channel_capacity);
        let job_rx = Arc::new(Mutex::new(job_rx));

        let handles: Vec<_> = (0..self.workers)
            .map(|_| {
                tokio::spawn(worker(
                    self.engine.clone(),
                    Arc::clone(&job_rx),
                    Arc::clone(&progress),
                    events.clone(),
                    self.report_failures,
                ))
            })
            .collect();
        drop(job_rx);
        drop(events);

        let domains: Vec<Arc<str>> = domains.iter().map(|d| Arc::from(d.as_str())).collect();
        'produce: for nameserver in index.ips() {
            for domain in &domains {
                let job = QueryJob {
                    domain: Arc::clone(domain),
                    nameserver,
                };
                if job_tx.send(job).await.is_err() {
                    warn!("all query workers exited early, stopping dispatch");
                    break 'produce;
                }
            }
        }
        drop(job_tx);

        for handle in handles {
            if let Err(err) = handle.await {
                warn!("query worker failed: {err}");
            }
        }

        info!(
            completed = progress.completed(),
            total = progress.total(),
            "dispatch finished"
        );
    }
}

async fn worker<E: DnsExchange>(
    engine: QueryEngine<E>,
    jobs: Arc<Mutex<mpsc::Receiver<QueryJob>>>,
    progress: Arc<ProgressTracker>,
    events: mpsc::Sender<DispatchEvent>,
    report_failures: bool,
) {
    loop {
        let Some(job) = jobs.lock().await.recv().await else {
            break;
        };

        let result = engine.query(&job.domain, job.nameserver).await;
        progress.record_completed();

        let event = match result {
            Ok(answer) => DispatchEvent::Answer(answer),
            Err(error) => {
                debug!(domain = %job.domain, nameserver = %job.nameserver, "query failed: {error}");
                if !report_failures {
                    continue;
                }
                DispatchEvent::Failure(QueryFailure {
                    domain: job.domain,
                    nameserver: job.nameserver,
                    error,
                })
            }
        };

        // Keep draining jobs even without a sink so progress stays exact.
        if events.send(event).await.is_err() {
            debug!("result sink closed, dropping event");
        }
    }
}
