//! Generative top-up for a short candidate pool.
//!
//! One completion call asks for exactly the missing number of songs. The
//! answer is trusted structurally only: items without a title and artist are
//! skipped, nothing is fact-checked.

use super::constraints::PlaylistConstraints;
use super::settings::PipelineSettings;
use super::trace::{ReasoningLogger, ReasoningStepType};
use super::track::{exclude_artist, CandidateTrack, TrackSource};
use crate::llm::json::{self, NumberOrText};
use crate::llm::LlmProvider;
use serde::Deserialize;
use tracing::{debug, warn};

pub const GENERATIVE_REASON: &str = "Suggested by the model to fit the requested style";

const FALLBACK_SYSTEM_PROMPT: &str = "You are a music expert that builds playlists from real, \
existing songs. Respond with a JSON array and nothing else.";

#[derive(Debug, Deserialize)]
struct GeneratedTrack {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    artist: Option<String>,
    #[serde(default)]
    bpm: Option<NumberOrText>,
    #[serde(default)]
    release_year: Option<NumberOrText>,
    #[serde(default)]
    mood: Option<String>,
}

impl GeneratedTrack {
    fn into_candidate(self) -> Option<CandidateTrack> {
        let title = self.title.filter(|t| !t.trim().is_empty())?;
        let artist = self.artist.filter(|a| !a.trim().is_empty())?;
        let mut candidate = CandidateTrack::new(
            title.trim(),
            artist.trim(),
            TrackSource::Generative,
            GENERATIVE_REASON,
        );
        candidate.tempo = self.bpm.as_ref().and_then(NumberOrText::as_f64);
        candidate.release_year = self
            .release_year
            .as_ref()
            .and_then(NumberOrText::as_f64)
            .map(|y| y as i32);
        if let Some(mood) = self.mood.filter(|m| !m.trim().is_empty()) {
            candidate.mood = mood.trim().to_lowercase();
        }
        Some(candidate)
    }
}

/// Parse a completion into candidates, skipping malformed items.
pub fn parse_generated_tracks(text: &str) -> Result<Vec<CandidateTrack>, String> {
    let array = json::extract_json_array(text).ok_or("no JSON array in completion")?;
    let items: Vec<serde_json::Value> =
        serde_json::from_str(array).map_err(|e| format!("invalid track JSON: {}", e))?;
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<GeneratedTrack>(item).ok())
        .filter_map(GeneratedTrack::into_candidate)
        .collect())
}

fn fallback_prompt(
    constraints: &PlaylistConstraints,
    count: usize,
    already_chosen: &[CandidateTrack],
) -> String {
    let (low, high) = constraints.tempo_range.bounds();
    let tempo = if constraints.gradual_tempo {
        format!("{} to {} BPM, gradually increasing", low, high)
    } else {
        format!("{} to {} BPM", low, high)
    };
    let mut lines = vec![
        format!("Suggest exactly {} songs for a playlist with these constraints:", count),
        format!("- Genres: {}", constraints.genres.join(", ")),
        format!("- Tempo: {}", tempo),
        format!(
            "- Release years: {} to {}",
            constraints.release_year_range.low, constraints.release_year_range.high
        ),
    ];
    if !constraints.mood_tags.is_empty() {
        lines.push(format!("- Moods: {}", constraints.mood_tags.join(", ")));
    }
    if let Some(instrument) = &constraints.instrument_hint {
        lines.push(format!("- Prefer songs featuring {}", instrument));
    }
    if let Some(reference) = &constraints.reference_track {
        lines.push(format!("- Should sound like: {}", reference));
    }
    if let Some(artist) = &constraints.exclude_artist {
        lines.push(format!("- Do not include any song by {}", artist));
    }
    if !already_chosen.is_empty() {
        let chosen: Vec<String> = already_chosen
            .iter()
            .map(|c| format!("{} by {}", c.title, c.artist))
            .collect();
        lines.push(format!("- Already in the playlist, do not repeat: {}", chosen.join("; ")));
    }
    lines.push(String::new());
    lines.push(
        r#"Respond with a JSON array like [{"title": "...", "artist": "...", "bpm": 120, "release_year": 2021, "mood": "..."}]"#
            .to_string(),
    );
    lines.join("\n")
}

pub struct GenerativeFallback<'a> {
    llm: &'a dyn LlmProvider,
    settings: &'a PipelineSettings,
}

impl<'a> GenerativeFallback<'a> {
    pub fn new(llm: &'a dyn LlmProvider, settings: &'a PipelineSettings) -> Self {
        Self { llm, settings }
    }

    /// Ask for `shortfall` songs. Any failure yields an empty list.
    pub async fn fill(
        &self,
        constraints: &PlaylistConstraints,
        shortfall: usize,
        already_chosen: &[CandidateTrack],
        trace: &mut ReasoningLogger,
    ) -> Vec<CandidateTrack> {
        if shortfall == 0 {
            return Vec::new();
        }

        let options = self
            .settings
            .completion_options(self.settings.fallback_temperature);
        let prompt = fallback_prompt(constraints, shortfall, already_chosen);
        let text = match self
            .llm
            .complete_text(FALLBACK_SYSTEM_PROMPT, &prompt, &options)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(provider = self.llm.name(), "Fallback completion failed: {}", e);
                trace.log_with(ReasoningStepType::Warning, || {
                    format!("Fallback: model unavailable ({}); {} slots stay empty.", e, shortfall)
                });
                return Vec::new();
            }
        };

        let generated = match parse_generated_tracks(&text) {
            Ok(tracks) => tracks,
            Err(reason) => {
                warn!("Discarding fallback completion: {}", reason);
                trace.log_with(ReasoningStepType::Warning, || {
                    format!("Fallback: unusable answer ({}); {} slots stay empty.", reason, shortfall)
                });
                return Vec::new();
            }
        };

        let received = generated.len();
        let mut tracks = exclude_artist(generated, constraints.exclude_artist.as_deref());
        tracks.truncate(shortfall);
        debug!(requested = shortfall, received, kept = tracks.len(), "Generative fallback");
        trace.log_with(ReasoningStepType::Fallback, || {
            format!(
                "Fallback: asked the model for {} songs, kept {} of {} suggestions.",
                shortfall,
                tracks.len(),
                received
            )
        });
        tracks
    }
}
