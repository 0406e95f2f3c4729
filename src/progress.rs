//! Query progress accounting and the on-demand console reporter.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crossterm::style::Stylize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Completed vs. total queries for one scan.
///
/// `total` is fixed at construction; `completed` only ever grows.
#[derive(Debug)]
pub struct ProgressTracker {
    completed: AtomicU64,
    total: u64,
}

impl ProgressTracker {
    pub const fn new(total: u64) -> Self {
        Self {
            completed: AtomicU64::new(0),
            total,
        }
    }

    /// Account for one query reaching a terminal state, success or failure.
    pub fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub const fn total(&self) -> u64 {
        self.total
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            completed: self.completed(),
            total: self.total,
        }
    }
}

/// A point-in-time reading of a [`ProgressTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub completed: u64,
    pub total: u64,
}

impl ProgressSnapshot {
    /// Percentage done; an empty scan counts as finished.
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.completed as f64 * 100.0 / self.total as f64
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[~] Progress: {}/{} ({:.2}%)",
            self.completed,
            self.total,
            self.percentage()
        )
    }
}

/// Prints a progress line every time a line is read from `input`.
///
/// Runs until `cancel` fires or `input` reaches end of file.
pub struct ProgressReporter {
    input: Box<dyn AsyncBufRead + Unpin + Send>,
    output: Box<dyn AsyncWrite + Unpin + Send>,
    colored: bool,
}

impl ProgressReporter {
    pub fn new(
        input: impl AsyncBufRead + Unpin + Send + 'static,
        output: impl AsyncWrite + Unpin + Send + 'static,
        colored: bool,
    ) -> Self {
        Self {
            input: Box::new(input),
            output: Box::new(output),
            colored,
        }
    }

    /// Reporter triggered by the enter key, writing to stderr.
    pub fn stdio(colored: bool) -> Self {
        Self::new(
            tokio::io::BufReader::new(tokio::io::stdin()),
            tokio::io::stderr(),
            colored,
        )
    }

    /// Spawn the reporter loop.
    pub fn spawn(
        self,
        tracker: std::sync::Arc<ProgressTracker>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let Self {
            input,
            mut output,
            colored,
        } = self;

        tokio::spawn(async move {
            let mut lines = input.lines();
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    line = lines.next_line() => match line {
                        Ok(Some(_)) => {
                            let snapshot = tracker.snapshot().to_string();
                            let text = if colored {
                                format!("{}\n", snapshot.cyan())
                            } else {
                                format!("{snapshot}\n")
                            };
                            if let Err(err) = output.write_all(text.as_bytes()).await {
                                debug!("progress reporter output closed: {err}");
                                break;
                            }
                            let _ = output.flush().await;
                        }
                        Ok(None) => break,
                        Err(err) => {
                            debug!("progress reporter input failed: {err}");
                            break;
                        }
                    },
                }
            }
        })
    }
}
