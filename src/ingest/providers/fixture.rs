// src/ingest/providers/fixture.rs
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;

use crate::ingest::types::{ChunkStream, Source, SourceResolver};

#[derive(Debug, Clone)]
enum Fixture {
    Body(String),
    // Body followed by a read error.
    Broken { body: String, cause: String },
    // Body followed by a stream that never ends.
    Stalled(String),
    OpenError(String),
}

/// In-memory sources. Bodies are served in small chunks so line splitting
/// across chunk boundaries is exercised. Unregistered sources fail to open.
#[derive(Debug, Clone)]
pub struct FixtureResolver {
    fixtures: HashMap<Source, Fixture>,
    chunk_size: usize,
}

impl Default for FixtureResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureResolver {
    pub fn new() -> Self {
        Self {
            fixtures: HashMap::new(),
            chunk_size: 16,
        }
    }

    pub fn with_chunk_size(mut self, n: usize) -> Self {
        self.chunk_size = n.max(1);
        self
    }

    pub fn with_body(mut self, source: impl Into<Source>, body: impl Into<String>) -> Self {
        self.fixtures.insert(source.into(), Fixture::Body(body.into()));
        self
    }

    pub fn with_broken_body(
        mut self,
        source: impl Into<Source>,
        body: impl Into<String>,
        cause: impl Into<String>,
    ) -> Self {
        self.fixtures.insert(
            source.into(),
            Fixture::Broken {
                body: body.into(),
                cause: cause.into(),
            },
        );
        self
    }

    pub fn with_stalled_body(mut self, source: impl Into<Source>, body: impl Into<String>) -> Self {
        self.fixtures.insert(source.into(), Fixture::Stalled(body.into()));
        self
    }

    pub fn with_open_error(mut self, source: impl Into<Source>, cause: impl Into<String>) -> Self {
        self.fixtures.insert(source.into(), Fixture::OpenError(cause.into()));
        self
    }

    fn chunks(&self, body: &str) -> Vec<Result<Bytes>> {
        body.as_bytes()
            .chunks(self.chunk_size)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect()
    }
}

#[async_trait]
impl SourceResolver for FixtureResolver {
    async fn open(&self, source: &Source) -> Result<ChunkStream> {
        let fixture = self
            .fixtures
            .get(source)
            .ok_or_else(|| anyhow!("no fixture registered"))?;

        let out = match fixture {
            Fixture::Body(body) => stream::iter(self.chunks(body)).boxed(),
            Fixture::Broken { body, cause } => {
                let cause = cause.clone();
                stream::iter(self.chunks(body))
                    .chain(stream::once(async move { Err(anyhow!(cause)) }))
                    .boxed()
            }
            Fixture::Stalled(body) => stream::iter(self.chunks(body))
                .chain(stream::pending())
                .boxed(),
            Fixture::OpenError(cause) => return Err(anyhow!(cause.clone())),
        };
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
