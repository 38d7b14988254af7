mod file_config;

pub use file_config::{FileConfig, LastFmConfig, LlmConfig, PipelineConfig};

use crate::llm::ApiKeySource;
use crate::playlist::PipelineSettings;
use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_SNAPSHOT_DIR: &str = "snapshots";
pub const DEFAULT_LASTFM_REQUESTS_PER_SECOND: u32 = 5;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub snapshot_dir: Option<PathBuf>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub lastfm_api_key: Option<String>,
    pub disable_llm: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub snapshot_dir: PathBuf,
    /// `None` runs extraction and fallback without a completion backend.
    pub llm: Option<LlmSettings>,
    /// `None` leaves similarity, genre and catalog lookups unavailable.
    pub lastfm: Option<LastFmSettings>,
    pub pipeline: PipelineSettings,
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: ApiKeySource,
}

#[derive(Debug, Clone)]
pub struct LastFmSettings {
    pub api_key: String,
    pub requests_per_second: u32,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let snapshot_dir = file
            .snapshot_dir
            .map(PathBuf::from)
            .or_else(|| cli.snapshot_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_DIR));

        let llm_file = file.llm.unwrap_or_default();
        let llm_enabled = llm_file.enabled.unwrap_or(!cli.disable_llm);
        let llm = if llm_enabled {
            let api_key = match (&llm_file.api_key, &llm_file.api_key_env) {
                (Some(key), _) => ApiKeySource::Static(key.clone()),
                (None, Some(var)) if var.trim().is_empty() => ApiKeySource::None,
                (None, Some(var)) => ApiKeySource::Env(var.clone()),
                (None, None) => ApiKeySource::Env(DEFAULT_API_KEY_ENV.to_string()),
            };
            Some(LlmSettings {
                base_url: llm_file
                    .base_url
                    .clone()
                    .or_else(|| cli.llm_base_url.clone())
                    .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
                model: llm_file
                    .model
                    .clone()
                    .or_else(|| cli.llm_model.clone())
                    .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
                api_key,
            })
        } else {
            None
        };

        let lastfm_file = file.lastfm.unwrap_or_default();
        let requests_per_second = lastfm_file
            .requests_per_second
            .unwrap_or(DEFAULT_LASTFM_REQUESTS_PER_SECOND);
        if requests_per_second == 0 {
            bail!("lastfm.requests_per_second must be at least 1");
        }
        let lastfm = lastfm_file
            .api_key
            .or_else(|| cli.lastfm_api_key.clone())
            .filter(|key| !key.trim().is_empty())
            .map(|api_key| LastFmSettings {
                api_key,
                requests_per_second,
            });

        // Pipeline settings - merge file config with defaults
        let defaults = PipelineSettings::default();
        let p = file.pipeline.unwrap_or_default();
        let pipeline = PipelineSettings {
            default_duration_minutes: p
                .default_duration_minutes
                .unwrap_or(defaults.default_duration_minutes),
            avg_song_minutes: p.avg_song_minutes.unwrap_or(defaults.avg_song_minutes),
            min_song_count: p.min_song_count.unwrap_or(defaults.min_song_count),
            tempo_low: p.tempo_low.unwrap_or(defaults.tempo_low),
            tempo_high: p.tempo_high.unwrap_or(defaults.tempo_high),
            release_year_low: p.release_year_low.unwrap_or(defaults.release_year_low),
            release_year_high: p.release_year_high.unwrap_or(defaults.release_year_high),
            fuzzy_match_threshold: p
                .fuzzy_match_threshold
                .unwrap_or(defaults.fuzzy_match_threshold),
            max_concurrent_lookups: p
                .max_concurrent_lookups
                .unwrap_or(defaults.max_concurrent_lookups),
            placeholder_artwork_url: p
                .placeholder_artwork_url
                .unwrap_or(defaults.placeholder_artwork_url),
            genre_cache_ttl: p
                .genre_cache_ttl_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.genre_cache_ttl),
            extraction_temperature: llm_file
                .extraction_temperature
                .unwrap_or(defaults.extraction_temperature),
            fallback_temperature: llm_file
                .fallback_temperature
                .unwrap_or(defaults.fallback_temperature),
            completion_timeout: llm_file
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.completion_timeout),
        };
        if let Err(e) = pipeline.validate() {
            bail!("Invalid pipeline configuration: {}", e);
        }
        for (name, value) in [
            ("llm.extraction_temperature", pipeline.extraction_temperature),
            ("llm.fallback_temperature", pipeline.fallback_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                bail!("{} must be between 0 and 2, got {}", name, value);
            }
        }

        Ok(Self {
            snapshot_dir,
            llm,
            lastfm,
            pipeline,
        })
    }
}
