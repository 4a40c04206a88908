// src/config/evaluation.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const ENV_CONFIG_PATH: &str = "EVALUATION_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/evaluation.toml";

const ENV_TARGET_YEAR: &str = "EVALUATION_TARGET_YEAR";
const ENV_TARGET_TOPIC: &str = "EVALUATION_TARGET_TOPIC";
const ENV_DELIMITER: &str = "EVALUATION_DELIMITER";
const ENV_SOURCE_TIMEOUT_SECS: &str = "EVALUATION_SOURCE_TIMEOUT_SECS";
const ENV_CHANNEL_CAPACITY: &str = "EVALUATION_CHANNEL_CAPACITY";
const ENV_MAX_LINE_BYTES: &str = "EVALUATION_MAX_LINE_BYTES";
const ENV_BIND_ADDR: &str = "BIND_ADDR";

/// Knobs of the ingestion pipeline. Defaults reproduce the classic evaluation
/// (speeches in 2013, topic "Innere Sicherheit", comma-separated).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub target_year: String,
    pub target_topic: String,
    pub delimiter: String,
    /// Deadline per source. Unset or 0 waits forever.
    pub source_timeout_secs: Option<u64>,
    pub channel_capacity: usize,
    pub max_line_bytes: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            target_year: "2013".to_string(),
            target_topic: "Innere Sicherheit".to_string(),
            delimiter: ",".to_string(),
            source_timeout_secs: None,
            channel_capacity: 1024,
            max_line_bytes: 64 * 1024,
        }
    }
}

impl EvaluationConfig {
    pub fn source_timeout(&self) -> Option<Duration> {
        self.source_timeout_secs
            .filter(|&s| s > 0)
            .map(Duration::from_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.delimiter.is_empty() {
            bail!("delimiter must not be empty");
        }
        if self.channel_capacity == 0 {
            bail!("channel_capacity must be at least 1");
        }
        if self.max_line_bytes == 0 {
            bail!("max_line_bytes must be at least 1");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub evaluation: EvaluationConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: AppConfig = toml::from_str(s).context("parsing evaluation config toml")?;
        Ok(cfg)
    }

    /// Load from an explicit TOML file. No env overrides are applied.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg = Self::from_toml_str(&content)?;
        cfg.evaluation.validate()?;
        Ok(cfg)
    }

    /// Load using env var + fallbacks, then apply per-key env overrides:
    /// 1) $EVALUATION_CONFIG_PATH
    /// 2) config/evaluation.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
            if fallback.exists() {
                Self::load_from(&fallback)?
            } else {
                Self::default()
            }
        };

        cfg.apply_env_overrides()?;
        cfg.evaluation.validate()?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        let ev = &mut self.evaluation;
        if let Some(v) = env_string(ENV_TARGET_YEAR) {
            ev.target_year = v;
        }
        if let Some(v) = env_string(ENV_TARGET_TOPIC) {
            ev.target_topic = v;
        }
        if let Some(v) = env_string(ENV_DELIMITER) {
            ev.delimiter = v;
        }
        if let Some(v) = env_parse::<u64>(ENV_SOURCE_TIMEOUT_SECS)? {
            ev.source_timeout_secs = Some(v);
        }
        if let Some(v) = env_parse::<usize>(ENV_CHANNEL_CAPACITY)? {
            ev.channel_capacity = v;
        }
        if let Some(v) = env_parse::<usize>(ENV_MAX_LINE_BYTES)? {
            ev.max_line_bytes = v;
        }
        if let Some(v) = env_string(ENV_BIND_ADDR) {
            self.server.bind_addr = v;
        }
        Ok(())
    }
}

// Unset and empty are both "not overridden".
fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env_string(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("invalid value for {name}: '{raw}'"))
        })
        .transpose()
}
