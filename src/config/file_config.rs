use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    /// Directory holding `<credential>.json` listening-history snapshots.
    pub snapshot_dir: Option<String>,

    pub llm: Option<LlmConfig>,
    pub lastfm: Option<LastFmConfig>,
    pub pipeline: Option<PipelineConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub enabled: Option<bool>,
    /// OpenAI-compatible API root, e.g. "https://api.openai.com/v1".
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    /// Environment variable holding the key. An empty string disables auth.
    pub api_key_env: Option<String>,
    pub timeout_secs: Option<u64>,
    pub extraction_temperature: Option<f32>,
    pub fallback_temperature: Option<f32>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct LastFmConfig {
    pub api_key: Option<String>,
    pub requests_per_second: Option<u32>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct PipelineConfig {
    pub default_duration_minutes: Option<f64>,
    pub avg_song_minutes: Option<f64>,
    pub min_song_count: Option<usize>,
    pub tempo_low: Option<f64>,
    pub tempo_high: Option<f64>,
    pub release_year_low: Option<i32>,
    pub release_year_high: Option<i32>,
    pub fuzzy_match_threshold: Option<f64>,
    pub max_concurrent_lookups: Option<usize>,
    pub placeholder_artwork_url: Option<String>,
    pub genre_cache_ttl_secs: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
