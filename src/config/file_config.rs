use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Upstream API
    pub api_base_url: Option<String>,
    pub auth_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub request_timeout_sec: Option<u64>,
    pub page_size: Option<u32>,

    // Lookup batching
    pub tracks_chunk_size: Option<usize>,
    pub artists_chunk_size: Option<usize>,
    pub features_chunk_size: Option<usize>,

    // Outputs
    pub output_dir: Option<String>,
    pub id_lists_dir: Option<String>,
    pub db_path: Option<String>,
    pub metrics_file: Option<String>,

    pub retry: Option<RetryConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: Option<u32>,
    pub initial_backoff_ms: Option<u64>,
    pub max_backoff_ms: Option<u64>,
    pub backoff_multiplier: Option<f64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
