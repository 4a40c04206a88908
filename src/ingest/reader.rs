// src/ingest/reader.rs
//! One reader per source: opens the stream, drops the header line and turns
//! every further line (or the single terminal failure) into an [`IngestEvent`].

use futures::StreamExt;
use metrics::counter;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::ingest::lines::LineBuffer;
use crate::ingest::types::{FailureKind, IngestEvent, RawLine, Source, SourceFailure, SourceResolver};

#[derive(Debug, Clone, Copy)]
pub struct ReaderOptions {
    /// Time allowed for opening and reading one source; `None` waits forever.
    pub timeout: Option<Duration>,
    pub max_line_bytes: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            max_line_bytes: 64 * 1024,
        }
    }
}

/// What a finished reader reports back to the join barrier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderOutcome {
    pub source: Source,
    pub lines_emitted: usize,
    pub failed: bool,
}

enum Stop {
    Failed(FailureKind),
    // The aggregator dropped its receiver; nobody is listening anymore.
    ChannelClosed,
}

/// Per-source read budget. Only opening the source and waiting for chunks
/// spend it; time blocked on a full merge channel does not.
struct ReadBudget {
    limit: Duration,
    left: Option<Duration>,
}

impl ReadBudget {
    fn new(limit: Option<Duration>) -> Self {
        Self {
            limit: limit.unwrap_or_default(),
            left: limit,
        }
    }

    async fn spend<F: Future>(&mut self, fut: F) -> Result<F::Output, Stop> {
        let Some(left) = self.left else {
            return Ok(fut.await);
        };
        let t0 = Instant::now();
        let out = tokio::time::timeout(left, fut).await.map_err(|_| {
            Stop::Failed(FailureKind::Timeout {
                secs: self.limit.as_secs(),
            })
        })?;
        self.left = Some(left.saturating_sub(t0.elapsed()));
        Ok(out)
    }
}

pub struct SourceReader {
    resolver: Arc<dyn SourceResolver>,
    source: Source,
    opts: ReaderOptions,
}

impl SourceReader {
    pub fn new(resolver: Arc<dyn SourceResolver>, source: Source, opts: ReaderOptions) -> Self {
        Self {
            resolver,
            source,
            opts,
        }
    }

    /// Stream the source into `tx`. The sender is dropped on return, which is
    /// how the merge channel learns this reader is done.
    pub async fn run(self, tx: mpsc::Sender<IngestEvent>) -> ReaderOutcome {
        let mut emitted = 0usize;
        let result = self.stream_lines(&tx, &mut emitted).await;

        let failed = match result {
            Ok(()) => {
                tracing::debug!(source = %self.source, lines = emitted, "source drained");
                false
            }
            Err(Stop::ChannelClosed) => {
                tracing::debug!(source = %self.source, "merge channel closed, reader stopping");
                false
            }
            Err(Stop::Failed(kind)) => {
                tracing::warn!(
                    source = %self.source,
                    resolver = self.resolver.name(),
                    lines = emitted,
                    failure = ?kind,
                    "source failed"
                );
                counter!("evaluation_source_failures_total").increment(1);
                let failure = SourceFailure {
                    source: self.source.clone(),
                    kind,
                };
                // A closed channel means the result is already abandoned.
                let _ = tx.send(IngestEvent::Failure(failure)).await;
                true
            }
        };

        ReaderOutcome {
            source: self.source,
            lines_emitted: emitted,
            failed,
        }
    }

    async fn stream_lines(
        &self,
        tx: &mpsc::Sender<IngestEvent>,
        emitted: &mut usize,
    ) -> Result<(), Stop> {
        let mut budget = ReadBudget::new(self.opts.timeout);

        let mut chunks = budget
            .spend(self.resolver.open(&self.source))
            .await?
            .map_err(|e| Stop::Failed(FailureKind::Open(format!("{e:#}"))))?;

        let mut buf = LineBuffer::new(self.opts.max_line_bytes);
        let mut header_seen = false;

        while let Some(chunk) = budget.spend(chunks.next()).await? {
            let chunk = chunk.map_err(|e| Stop::Failed(FailureKind::Read(format!("{e:#}"))))?;
            let (lines, overflow) = buf.push(&chunk);
            for text in lines {
                self.emit(tx, text, &mut header_seen, emitted).await?;
            }
            if let Some(e) = overflow {
                return Err(Stop::Failed(FailureKind::Read(e.to_string())));
            }
        }

        let tail = buf
            .finish()
            .map_err(|e| Stop::Failed(FailureKind::Read(e.to_string())))?;
        if let Some(text) = tail {
            self.emit(tx, text, &mut header_seen, emitted).await?;
        }
        Ok(())
    }

    async fn emit(
        &self,
        tx: &mpsc::Sender<IngestEvent>,
        text: String,
        header_seen: &mut bool,
        emitted: &mut usize,
    ) -> Result<(), Stop> {
        // First line is the header; never validated.
        if !*header_seen {
            *header_seen = true;
            return Ok(());
        }
        let line = RawLine {
            text,
            source: self.source.clone(),
        };
        tx.send(IngestEvent::Line(line))
            .await
            .map_err(|_| Stop::ChannelClosed)?;
        *emitted += 1;
        Ok(())
    }
}
