// src/ingest/mod.rs
//! Fan-out / fan-in evaluation pipeline.
//!
//! One [`SourceReader`] task per source writes into a single bounded merge
//! channel; one [`Aggregator`] task drains it. Each reader owns a sender
//! clone, so the channel closes only after every reader has returned. The
//! aggregator is the only writer of the counters and the error log.
pub mod lines;
pub mod providers;
pub mod reader;
pub mod types;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use crate::aggregate::{Aggregator, MatchRules};
use crate::config::EvaluationConfig;
use crate::error::EvaluationError;
use crate::ingest::reader::{ReaderOptions, SourceReader};
use crate::ingest::types::{Source, SourceResolver};
use crate::snapshot::Snapshot;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("evaluation_requests_total", "Evaluations started.");
        describe_counter!("evaluation_sources_total", "Sources read across all evaluations.");
        describe_counter!(
            "evaluation_source_failures_total",
            "Sources that failed to open, broke mid-stream or timed out."
        );
        describe_counter!("evaluation_lines_total", "Data lines received by the aggregator.");
        describe_counter!(
            "evaluation_record_errors_total",
            "Lines rejected as malformed records or counts."
        );
        describe_histogram!("evaluation_duration_ms", "Wall-clock evaluation time in milliseconds.");
        describe_histogram!("evaluation_source_open_ms", "Time to open an http source in milliseconds.");
    });
}

/// Aborts the wrapped task when dropped before it is awaited to completion.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl From<&EvaluationConfig> for ReaderOptions {
    fn from(cfg: &EvaluationConfig) -> Self {
        Self {
            timeout: cfg.source_timeout(),
            max_line_bytes: cfg.max_line_bytes,
        }
    }
}

/// Evaluates a set of sources into a [`Snapshot`]. Holds no per-request
/// state, so one pipeline serves any number of concurrent requests.
#[derive(Clone)]
pub struct Pipeline {
    resolver: Arc<dyn SourceResolver>,
    config: EvaluationConfig,
}

impl Pipeline {
    pub fn new(resolver: Arc<dyn SourceResolver>, config: EvaluationConfig) -> Self {
        Self { resolver, config }
    }

    /// Read every source in parallel and rank the aggregated counters.
    /// Duplicate sources are read once.
    pub async fn evaluate<I>(&self, sources: I) -> Result<Snapshot, EvaluationError>
    where
        I: IntoIterator<Item = Source>,
    {
        ensure_metrics_described();
        let t0 = std::time::Instant::now();

        let sources: BTreeSet<Source> = sources.into_iter().collect();
        if sources.is_empty() {
            return Err(EvaluationError::NoSources);
        }
        counter!("evaluation_requests_total").increment(1);
        counter!("evaluation_sources_total").increment(sources.len() as u64);

        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let mut aggregator =
            AbortOnDrop(tokio::spawn(Aggregator::new(MatchRules::from(&self.config)).run(rx)));

        // Dropping the set (the caller gave up on this evaluation) aborts
        // every reader still running.
        let opts = ReaderOptions::from(&self.config);
        let mut readers = JoinSet::new();
        let mut names = HashMap::new();
        for src in sources {
            let reader = SourceReader::new(self.resolver.clone(), src.clone(), opts);
            let id = readers.spawn(reader.run(tx.clone())).id();
            names.insert(id, src);
        }
        // Only reader-held senders may keep the channel open.
        drop(tx);

        // Join barrier: every reader has returned (and dropped its sender).
        let mut aborted = Vec::new();
        let mut failed_sources = 0usize;
        while let Some(joined) = readers.join_next().await {
            match joined {
                Ok(outcome) => failed_sources += usize::from(outcome.failed),
                Err(e) => {
                    let src = names.remove(&e.id());
                    tracing::error!(source = ?src, error = %e, "reader task aborted");
                    aborted.extend(src);
                }
            }
        }

        let mut agg = (&mut aggregator.0).await?;
        aborted.sort();
        for src in aborted {
            agg.errors
                .push_message(format!("reader task for source '{src}' aborted"));
        }

        let stats = agg.stats;
        let snapshot = Snapshot::assemble(agg);

        let elapsed_ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("evaluation_duration_ms").record(elapsed_ms);
        tracing::info!(
            target: "evaluation",
            records = stats.records,
            record_errors = stats.record_errors,
            failed_sources,
            errors = snapshot.errors.len(),
            elapsed_ms,
            "evaluation finished"
        );

        Ok(snapshot)
    }
}
