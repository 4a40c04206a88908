// src/ingest/providers/http.rs
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use metrics::histogram;

use crate::ingest::types::{ChunkStream, Source, SourceResolver};

/// Treats every source as a URL and streams the response body.
#[derive(Debug, Clone)]
pub struct HttpResolver {
    client: reqwest::Client,
}

impl HttpResolver {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SourceResolver for HttpResolver {
    async fn open(&self, source: &Source) -> Result<ChunkStream> {
        let t0 = std::time::Instant::now();
        let resp = self
            .client
            .get(source.as_str())
            .send()
            .await
            .context("http get")?;
        histogram!("evaluation_source_open_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        let status = resp.status();
        if !status.is_success() {
            bail!("unexpected http status {status}");
        }

        Ok(resp
            .bytes_stream()
            .map(|chunk| chunk.context("http body"))
            .boxed())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
