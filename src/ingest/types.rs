// src/ingest/types.rs
use anyhow::Result;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::fmt;

use crate::error::IngestError;

/// Opaque identifier of one line stream (usually a URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Source(String);

impl Source {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Source {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Source {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One unparsed record line plus its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    pub text: String,
    pub source: Source,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    Open(String),
    Read(String),
    Timeout { secs: u64 },
}

/// Terminal failure of one source. At most one is emitted per source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    pub source: Source,
    pub kind: FailureKind,
}

impl From<SourceFailure> for IngestError {
    fn from(f: SourceFailure) -> Self {
        match f.kind {
            FailureKind::Open(cause) => IngestError::SourceOpen {
                origin: f.source,
                cause,
            },
            FailureKind::Read(cause) => IngestError::SourceRead {
                origin: f.source,
                cause,
            },
            FailureKind::Timeout { secs } => IngestError::SourceTimeout {
                origin: f.source,
                secs,
            },
        }
    }
}

/// What flows through the merge channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestEvent {
    Line(RawLine),
    Failure(SourceFailure),
}

/// Raw body chunks of an opened source.
pub type ChunkStream = BoxStream<'static, Result<Bytes>>;

/// Resolves a [`Source`] into a stream of body chunks.
#[async_trait::async_trait]
pub trait SourceResolver: Send + Sync {
    /// Open the source. An `Err` here is a source-open failure.
    async fn open(&self, source: &Source) -> Result<ChunkStream>;
    fn name(&self) -> &'static str;
}
