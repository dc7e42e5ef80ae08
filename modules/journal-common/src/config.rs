use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_SARCASM_MODEL: &str = "helinivan/english-sarcasm-detector";
pub const DEFAULT_EMOTION_MODEL: &str = "j-hartmann/emotion-english-distilroberta-base";
pub const DEFAULT_NER_MODEL: &str = "dslim/bert-base-NER";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Web server
    pub web_host: String,
    pub web_port: u16,

    // CORS (empty = any origin)
    pub allowed_origins: Vec<String>,

    // Worker pool
    pub worker_threads: usize,
    pub analysis_timeout: Option<Duration>,

    // Pipeline
    pub keyword_limit: usize,
    pub enable_entities: bool,
    pub sarcasm_threshold: f32,

    // Models (HuggingFace Hub repo ids)
    pub sarcasm_model: String,
    pub emotion_model: String,
    pub ner_model: String,
    pub preload_models: bool,
    pub serialize_inference: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (env, map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_secs: u64 = parse_or(&lookup, "ANALYSIS_TIMEOUT_SECS", 120)?;

        Ok(Self {
            web_host: lookup("WEB_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            web_port: parse_or(&lookup, "WEB_PORT", 8000)?,
            allowed_origins: lookup("ALLOWED_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect(),
            worker_threads: parse_or::<usize, _>(&lookup, "WORKER_THREADS", 2)?.max(1),
            analysis_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            keyword_limit: parse_or(&lookup, "KEYWORD_LIMIT", 10)?,
            enable_entities: parse_or(&lookup, "ENABLE_ENTITIES", true)?,
            sarcasm_threshold: parse_or(&lookup, "SARCASM_THRESHOLD", 0.6)?,
            sarcasm_model: lookup("SARCASM_MODEL")
                .unwrap_or_else(|| DEFAULT_SARCASM_MODEL.to_string()),
            emotion_model: lookup("EMOTION_MODEL")
                .unwrap_or_else(|| DEFAULT_EMOTION_MODEL.to_string()),
            ner_model: lookup("NER_MODEL").unwrap_or_else(|| DEFAULT_NER_MODEL.to_string()),
            preload_models: parse_or(&lookup, "PRELOAD_MODELS", false)?,
            serialize_inference: parse_or(&lookup, "SERIALIZE_INFERENCE", false)?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.web_host, self.web_port)
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        _ => Ok(default),
    }
}
