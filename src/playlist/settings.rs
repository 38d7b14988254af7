//! Tunables for one pipeline instance.

use crate::llm::CompletionOptions;
use std::time::Duration;

pub const DEFAULT_PLACEHOLDER_ARTWORK: &str = "https://via.placeholder.com/200";

/// Numeric defaults and limits consumed by the pipeline stages.
///
/// Built by the config layer; every field has a default so tests can use
/// `PipelineSettings::default()` and override what they care about.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub default_duration_minutes: f64,
    pub avg_song_minutes: f64,
    pub min_song_count: usize,
    pub tempo_low: f64,
    pub tempo_high: f64,
    pub release_year_low: i32,
    pub release_year_high: i32,
    /// Both title and artist ratios must be strictly greater than this.
    pub fuzzy_match_threshold: f64,
    /// Upper bound on in-flight per-candidate lookups.
    pub max_concurrent_lookups: usize,
    pub placeholder_artwork_url: String,
    pub genre_cache_ttl: Duration,
    pub extraction_temperature: f32,
    pub fallback_temperature: f32,
    /// Transport timeout handed to every completion call.
    pub completion_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            default_duration_minutes: 60.0,
            avg_song_minutes: 4.0,
            min_song_count: 5,
            tempo_low: 60.0,
            tempo_high: 130.0,
            release_year_low: 2019,
            release_year_high: 2024,
            fuzzy_match_threshold: 0.7,
            max_concurrent_lookups: 8,
            placeholder_artwork_url: DEFAULT_PLACEHOLDER_ARTWORK.to_string(),
            genre_cache_ttl: Duration::from_secs(3600),
            extraction_temperature: 0.2,
            fallback_temperature: 0.7,
            completion_timeout: Duration::from_secs(120),
        }
    }
}

impl PipelineSettings {
    /// Reject settings that would break constraint invariants downstream.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.default_duration_minutes > 0.0) {
            return Err("default_duration_minutes must be positive".to_string());
        }
        if !(self.avg_song_minutes > 0.0) {
            return Err("avg_song_minutes must be positive".to_string());
        }
        if self.min_song_count == 0 {
            return Err("min_song_count must be at least 1".to_string());
        }
        if self.tempo_low > self.tempo_high {
            return Err(format!(
                "tempo_low ({}) must not exceed tempo_high ({})",
                self.tempo_low, self.tempo_high
            ));
        }
        if self.release_year_low > self.release_year_high {
            return Err(format!(
                "release_year_low ({}) must not exceed release_year_high ({})",
                self.release_year_low, self.release_year_high
            ));
        }
        if !(self.fuzzy_match_threshold > 0.0 && self.fuzzy_match_threshold <= 1.0) {
            return Err("fuzzy_match_threshold must be in (0, 1]".to_string());
        }
        if self.max_concurrent_lookups == 0 {
            return Err("max_concurrent_lookups must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn completion_options(&self, temperature: f32) -> CompletionOptions {
        CompletionOptions {
            timeout: self.completion_timeout,
            ..CompletionOptions::default()
        }
        .with_temperature(temperature)
    }
}
