//! Rendering and persistence of query results.
//!
//! The [`ResultSink`] is the only consumer of the dispatch event channel and
//! the only writer of the console result stream and the output file.

use std::io;
use std::path::Path;
use std::sync::Arc;

use crossterm::style::Stylize;
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::dispatch::{DispatchEvent, QueryFailure};
use crate::dns::{Answer, ClassifiedRecord};
use crate::error::{ConfigError, Result};
use crate::nameservers::NameserverIndex;

/// How a rendered line is presented on the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// A/AAAA/CNAME record.
    Resolved,
    /// Any other record type.
    Unclassified,
    /// A failed query, only shown in verbose mode.
    Failure,
}

/// A single line of output, without trailing newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLine {
    pub kind: LineKind,
    pub text: String,
}

impl RenderedLine {
    fn styled(&self, colored: bool) -> String {
        if !colored {
            return self.text.clone();
        }
        match self.kind {
            LineKind::Resolved => self.text.as_str().green().to_string(),
            LineKind::Unclassified => self.text.as_str().yellow().to_string(),
            LineKind::Failure => self.text.as_str().red().to_string(),
        }
    }
}

/// Render one line per record of `answer`.
///
/// `nameserver_name` is the hostname the answering IP was resolved from.
pub fn render_answer(answer: &Answer, nameserver_name: &str) -> Vec<RenderedLine> {
    let prefix = format!("[{nameserver_name} ({})] {}", answer.nameserver, answer.domain);
    answer
        .records
        .iter()
        .map(|record| match record {
            ClassifiedRecord::Other(raw) => RenderedLine {
                kind: LineKind::Unclassified,
                text: format!("{prefix} {raw}"),
            },
            resolved => RenderedLine {
                kind: LineKind::Resolved,
                text: format!("{prefix} => {resolved}"),
            },
        })
        .collect()
}

/// Render a failed query.
pub fn render_failure(failure: &QueryFailure) -> RenderedLine {
    RenderedLine {
        kind: LineKind::Failure,
        text: format!("[-] {}", failure.error),
    }
}

/// Totals of what the sink consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub answers: u64,
    pub records: u64,
    pub failures: u64,
}

/// Create (or truncate) the output file.
pub async fn create_output_file(path: &Path) -> Result<File> {
    File::create(path).await.map_err(|source| {
        ConfigError::OutputFile {
            path: path.to_path_buf(),
            source,
        }
        .into()
    })
}

/// Consumes dispatch events and writes them to the console and output file.
///
/// A console write error does not stop the sink: the remaining results still
/// reach the output file and the error is returned once the channel closes.
pub struct ResultSink<W> {
    console: W,
    console_error: Option<io::Error>,
    output: Option<BufWriter<File>>,
    colored: bool,
}

impl<W> ResultSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(console: W, colored: bool) -> Self {
        Self {
            console,
            console_error: None,
            output: None,
            colored,
        }
    }

    /// Also append every result line to `file`. Failure lines are not written.
    #[must_use]
    pub fn with_output(mut self, file: File) -> Self {
        self.output = Some(BufWriter::new(file));
        self
    }

    /// Consume events until the channel closes.
    ///
    /// The output file is flushed on every exit path.
    pub async fn run(
        mut self,
        index: Arc<NameserverIndex>,
        mut events: mpsc::Receiver<DispatchEvent>,
    ) -> Result<SinkStats> {
        let mut stats = SinkStats::default();
        let drained = self.drain(&index, &mut events, &mut stats).await;

        let flushed = match self.output.as_mut() {
            Some(output) => output.flush().await,
            None => Ok(()),
        };
        self.flush_console().await;

        drained?;
        flushed?;
        if let Some(err) = self.console_error.take() {
            return Err(err.into());
        }
        debug!(?stats, "result sink drained");
        Ok(stats)
    }

    async fn drain(
        &mut self,
        index: &NameserverIndex,
        events: &mut mpsc::Receiver<DispatchEvent>,
        stats: &mut SinkStats,
    ) -> Result<()> {
        while let Some(event) = events.recv().await {
            match event {
                DispatchEvent::Answer(answer) => {
                    stats.answers += 1;
                    let ip = answer.nameserver.to_string();
                    let name = index.hostname(&answer.nameserver).unwrap_or(&ip);
                    let lines = render_answer(&answer, name);
                    stats.records += lines.len() as u64;
                    for line in &lines {
                        self.write_line(line).await?;
                    }
                }
                DispatchEvent::Failure(failure) => {
                    stats.failures += 1;
                    self.write_line(&render_failure(&failure)).await?;
                }
            }
            self.flush_console().await;
        }
        Ok(())
    }

    async fn write_line(&mut self, line: &RenderedLine) -> Result<()> {
        if self.console_error.is_none() {
            let console_line = format!("{}\n", line.styled(self.colored));
            if let Err(err) = self.console.write_all(console_line.as_bytes()).await {
                self.console_failed(err);
            }
        }

        if line.kind != LineKind::Failure
            && let Some(output) = self.output.as_mut()
        {
            output.write_all(line.text.as_bytes()).await?;
            output.write_all(b"\n").await?;
        }
        Ok(())
    }

    async fn flush_console(&mut self) {
        if self.console_error.is_none()
            && let Err(err) = self.console.flush().await
        {
            self.console_failed(err);
        }
    }

    fn console_failed(&mut self, err: io::Error) {
        warn!("console closed, results go to the output file only: {err}");
        self.console_error = Some(err);
    }
}
