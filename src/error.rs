// src/error.rs
//! Error taxonomy of one evaluation.
//!
//! None of these abort an evaluation: each is recovered per line or per
//! source and surfaces only as its `Display` text in the snapshot's error list.

use crate::ingest::types::Source;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestError {
    /// The source could not be reached or opened.
    #[error("cannot open source '{origin}': {cause}")]
    SourceOpen { origin: Source, cause: String },

    /// The stream failed partway; lines read before the failure stay valid.
    #[error("read from source '{origin}' failed: {cause}")]
    SourceRead { origin: Source, cause: String },

    /// The per-source deadline elapsed before the stream ended.
    #[error("source '{origin}' timed out after {secs}s")]
    SourceTimeout { origin: Source, secs: u64 },

    /// A line did not split into exactly four fields.
    #[error("malformed record: expected 4 fields, found {found}. source: '{origin}' line: '{line}'")]
    RecordShape {
        origin: Source,
        line: String,
        found: usize,
    },

    /// The count field was not a valid integer.
    #[error("malformed count '{value}'. source: '{origin}' line: '{line}'")]
    RecordFormat {
        origin: Source,
        line: String,
        value: String,
    },
}

/// Conditions that prevent an evaluation from producing a snapshot at all.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("no sources to evaluate")]
    NoSources,
    #[error("aggregator task failed: {0}")]
    Aggregator(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_source_and_line() {
        let e = IngestError::RecordShape {
            origin: Source::new("http://a/x.csv"),
            line: "A,B".into(),
            found: 2,
        };
        let s = e.to_string();
        assert!(s.contains("http://a/x.csv"), "{s}");
        assert!(s.contains("'A,B'"), "{s}");

        let t = IngestError::SourceTimeout {
            origin: Source::new("s"),
            secs: 3,
        };
        assert_eq!(t.to_string(), "source 's' timed out after 3s");
    }
}
