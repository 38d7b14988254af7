//! Natural-language request to [`PlaylistConstraints`].
//!
//! Precedence, highest first: keyword heuristics, the structured completion
//! call, then regex fallbacks ("sounds like X but") and built-in defaults.
//! A failed or unparseable completion silently leaves the heuristics in
//! charge.

use super::constraints::{ConstraintDraft, PlaylistConstraints, TempoRange, YearRange};
use super::heuristics::{self, DurationHint};
use super::settings::PipelineSettings;
use super::trace::{ReasoningLogger, ReasoningStepType};
use crate::llm::json::{self, NumberOrText};
use crate::llm::LlmProvider;
use crate::services::SimilarityService;
use serde::Deserialize;
use tracing::{debug, warn};

const EXTRACTION_SYSTEM_PROMPT: &str = "You turn music playlist requests into structured \
constraints. Respond with a single JSON object and nothing else.";

/// Shape of the JSON object the completion call is asked for.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GeneratedConstraints {
    duration_minutes: Option<f64>,
    song_count: Option<NumberOrText>,
    bpm_range: Option<BpmRange>,
    genres: Option<Vec<String>>,
    release_year_range: Option<[NumberOrText; 2]>,
    mood_constraints: Option<Vec<String>>,
    use_only_user_songs: Option<bool>,
    reference_track: Option<String>,
    requires_bpm: Option<bool>,
    gradual_bpm: Option<bool>,
    instrument: Option<String>,
    exclude_artist: Option<ExcludeArtist>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BpmRange {
    Pair([f64; 2]),
    Span {
        start: f64,
        end: f64,
        #[serde(default)]
        gradual_increase: bool,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExcludeArtist {
    Flag(bool),
    Name(String),
}

impl GeneratedConstraints {
    /// Only values the model actually supplied become `Some`.
    fn into_draft(self) -> ConstraintDraft {
        let mut draft = ConstraintDraft {
            explicit_song_count: self
                .song_count
                .and_then(|n| n.as_f64())
                .filter(|n| *n >= 1.0)
                .map(|n| n as usize),
            duration_minutes: self.duration_minutes.filter(|d| *d > 0.0),
            genres: self.genres.filter(|g| !g.is_empty()),
            release_year_range: self.release_year_range.and_then(|[low, high]| {
                Some(YearRange::new(low.as_f64()? as i32, high.as_f64()? as i32))
            }),
            mood_tags: self.mood_constraints.filter(|m| !m.is_empty()),
            use_only_personal_library: self.use_only_user_songs,
            reference_track: self.reference_track.filter(|r| !r.trim().is_empty()),
            requires_tempo_check: self.requires_bpm,
            gradual_tempo: self.gradual_bpm,
            instrument_hint: self.instrument.filter(|i| !i.trim().is_empty()),
            ..Default::default()
        };

        draft.tempo_range = self.bpm_range.map(|range| match range {
            BpmRange::Pair([low, high]) => TempoRange::Fixed { low, high },
            BpmRange::Span {
                start,
                end,
                gradual_increase: true,
            } => TempoRange::Gradual { start, end },
            BpmRange::Span { start, end, .. } => TempoRange::Fixed {
                low: start,
                high: end,
            },
        });
        if draft.tempo_range.is_some_and(|r| r.is_gradual()) {
            draft.gradual_tempo = Some(true);
        }

        match self.exclude_artist {
            Some(ExcludeArtist::Flag(flag)) => draft.exclude_reference_artist = Some(flag),
            Some(ExcludeArtist::Name(name)) if !name.trim().is_empty() => {
                draft.exclude_reference_artist = Some(true);
                draft.exclude_artist = Some(name);
            }
            _ => {}
        }
        draft
    }
}

fn parse_generated(text: &str) -> Result<ConstraintDraft, String> {
    let object = json::extract_json_object(text).ok_or("no JSON object in completion")?;
    let generated: GeneratedConstraints =
        serde_json::from_str(object).map_err(|e| format!("invalid constraint JSON: {}", e))?;
    Ok(generated.into_draft())
}

fn extraction_prompt(query: &str, detected: &ConstraintDraft) -> String {
    let findings = serde_json::to_string(detected).unwrap_or_else(|_| "{}".to_string());
    format!(
        r#"Playlist request: "{query}"

Keyword analysis already found: {findings}

Return a JSON object with these keys (use null for anything the request does not imply):
- "duration_minutes": number
- "song_count": integer, only if the request names a number of songs
- "bpm_range": [low, high], or {{"start": n, "end": n, "gradual_increase": true}} for a rising tempo
- "genres": list of lowercase genre names
- "release_year_range": [first_year, last_year]
- "mood_constraints": list of lowercase moods
- "use_only_user_songs": true if only the user's own liked or top songs may be used
- "reference_track": "title" or "title by artist" the playlist should resemble
- "requires_bpm": true if the request cares about exact tempo
- "gradual_bpm": true if tempo should increase over the playlist
- "instrument": a featured instrument
- "exclude_artist": true to avoid the reference track's artist, or an artist name to avoid"#
    )
}

/// Stateless extractor bound to one request's collaborators.
pub struct ConstraintExtractor<'a> {
    llm: &'a dyn LlmProvider,
    similarity: &'a dyn SimilarityService,
    settings: &'a PipelineSettings,
}

impl<'a> ConstraintExtractor<'a> {
    pub fn new(
        llm: &'a dyn LlmProvider,
        similarity: &'a dyn SimilarityService,
        settings: &'a PipelineSettings,
    ) -> Self {
        Self {
            llm,
            similarity,
            settings,
        }
    }

    /// Extract constraints, returning the trace sentences when `explain` is set.
    pub async fn extract_with_trace(
        &self,
        query: &str,
        explain: bool,
    ) -> (PlaylistConstraints, Option<Vec<String>>) {
        let mut trace = ReasoningLogger::new(explain);
        let constraints = self.extract(query, &mut trace).await;
        (constraints, trace.into_lines())
    }

    pub async fn extract(&self, query: &str, trace: &mut ReasoningLogger) -> PlaylistConstraints {
        let mut detected = ConstraintDraft::default();
        let mut fallback = ConstraintDraft::default();

        self.detect_size(query, &mut detected, trace);
        self.detect_genres(query, &mut detected, trace);
        self.detect_flags(query, &mut detected, trace);

        if let Some(reference) = heuristics::detect_reference(query) {
            trace.log_with(ReasoningStepType::Extraction, || {
                format!("Reference: the request sounds like \"{}\".", reference)
            });
            fallback.reference_track = Some(reference);
        } else {
            trace.log(ReasoningStepType::Extraction, "Reference: none found.");
        }

        let generated = self.generate(query, &detected, trace).await;
        let merged = detected.merge_fill(generated).merge_fill(fallback);
        let merged = self.resolve_exclusion(merged, trace).await;

        let constraints = merged.resolve(self.settings);
        debug!(
            target_count = constraints.target_count,
            personal_only = constraints.use_only_personal_library,
            reference = ?constraints.reference_track,
            "Constraints extracted"
        );
        constraints
    }

    fn detect_size(&self, query: &str, draft: &mut ConstraintDraft, trace: &mut ReasoningLogger) {
        match heuristics::detect_duration(query) {
            Some(DurationHint::Explicit(minutes)) => {
                draft.duration_minutes = Some(minutes);
                trace.log_with(ReasoningStepType::Extraction, || {
                    format!("Duration: the request asks for {} minutes.", minutes)
                });
            }
            Some(DurationHint::Scenario { phrase, minutes }) => {
                draft.duration_minutes = Some(minutes);
                trace.log_with(ReasoningStepType::Extraction, || {
                    format!("Duration: \"{}\" suggests {} minutes.", phrase, minutes)
                });
            }
            None => trace.log_with(ReasoningStepType::Extraction, || {
                format!(
                    "Duration: nothing explicit, {} minutes unless the model infers one.",
                    self.settings.default_duration_minutes
                )
            }),
        }

        if let Some(count) = heuristics::detect_song_count(query) {
            draft.explicit_song_count = Some(count);
            trace.log_with(ReasoningStepType::Extraction, || {
                format!("Song count: exactly {} songs requested.", count)
            });
        }

        if let Some((low, high)) = heuristics::detect_tempo_range(query) {
            draft.tempo_range = Some(TempoRange::Fixed { low, high });
            trace.log_with(ReasoningStepType::Extraction, || {
                format!("Tempo: explicit range {} to {} BPM.", low, high)
            });
        }
    }

    fn detect_genres(&self, query: &str, draft: &mut ConstraintDraft, trace: &mut ReasoningLogger) {
        if let Some(theme) = heuristics::detect_theme(query) {
            draft.genres = Some(theme.genres.iter().map(|g| g.to_string()).collect());
            draft.mood_tags = Some(theme.moods.iter().map(|m| m.to_string()).collect());
            trace.log_with(ReasoningStepType::Extraction, || {
                format!(
                    "Theme: {} request, genres {} and moods {}.",
                    theme.name,
                    theme.genres.join(", "),
                    theme.moods.join(", ")
                )
            });
        } else if let Some(genre) = heuristics::detect_known_genre(query) {
            draft.genres = Some(vec![genre.to_string()]);
            trace.log_with(ReasoningStepType::Extraction, || {
                format!("Genre: the request mentions {}.", genre)
            });
        } else {
            trace.log(
                ReasoningStepType::Extraction,
                "Genre: no theme or known genre mentioned.",
            );
        }
    }

    fn detect_flags(&self, query: &str, draft: &mut ConstraintDraft, trace: &mut ReasoningLogger) {
        let flags = heuristics::detect_flags(query);
        let mut notes = Vec::new();

        if flags.personal_only {
            draft.use_only_personal_library = Some(true);
            notes.push("only the personal library".to_string());
        }
        if flags.gradual {
            draft.gradual_tempo = Some(true);
            notes.push("gradually increasing tempo".to_string());
        }
        if let Some(instrument) = flags.instrument {
            draft.instrument_hint = Some(instrument.to_string());
            notes.push(format!("featuring {}", instrument));
        }
        if flags.tempo_sensitive {
            draft.requires_tempo_check = Some(true);
            notes.push("tempo-sensitive".to_string());
        }
        if flags.exclude_reference_artist {
            draft.exclude_reference_artist = Some(true);
            notes.push("excluding the reference artist".to_string());
        }

        if notes.is_empty() {
            trace.log(ReasoningStepType::Extraction, "Flags: none detected.");
        } else {
            trace.log_with(ReasoningStepType::Extraction, || {
                format!("Flags: {}.", notes.join("; "))
            });
        }
    }

    async fn generate(
        &self,
        query: &str,
        detected: &ConstraintDraft,
        trace: &mut ReasoningLogger,
    ) -> ConstraintDraft {
        let options = self
            .settings
            .completion_options(self.settings.extraction_temperature);
        let prompt = extraction_prompt(query, detected);

        let text = match self
            .llm
            .complete_text(EXTRACTION_SYSTEM_PROMPT, &prompt, &options)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(provider = self.llm.name(), "Constraint completion failed: {}", e);
                trace.log_with(ReasoningStepType::Warning, || {
                    format!("Model extraction unavailable ({}); keeping keyword analysis.", e)
                });
                return ConstraintDraft::default();
            }
        };

        match parse_generated(&text) {
            Ok(draft) => {
                trace.log_with(ReasoningStepType::Extraction, || {
                    let fields = draft.populated_fields();
                    if fields.is_empty() {
                        "Model extraction added nothing.".to_string()
                    } else {
                        format!("Model extraction supplied: {}.", fields.join(", "))
                    }
                });
                draft
            }
            Err(reason) => {
                warn!("Discarding constraint completion: {}", reason);
                trace.log_with(ReasoningStepType::Warning, || {
                    format!("Model extraction unusable ({}); keeping keyword analysis.", reason)
                });
                ConstraintDraft::default()
            }
        }
    }

    async fn resolve_exclusion(
        &self,
        mut draft: ConstraintDraft,
        trace: &mut ReasoningLogger,
    ) -> ConstraintDraft {
        if let Some(artist) = &draft.exclude_artist {
            trace.log_with(ReasoningStepType::Extraction, || {
                format!("Exclusion: the model named {} to avoid.", artist.trim())
            });
            return draft;
        }
        if draft.exclude_reference_artist != Some(true) {
            trace.log(ReasoningStepType::Extraction, "Exclusion: not requested.");
            return draft;
        }
        let Some(reference) = draft.reference_track.clone() else {
            trace.log(
                ReasoningStepType::Extraction,
                "Exclusion: asked to avoid the reference artist, but there is no reference.",
            );
            return draft;
        };

        let artist = match self.similarity.resolve_reference(&reference).await {
            Ok(Some(track)) => {
                trace.log_with(ReasoningStepType::Extraction, || {
                    format!(
                        "Exclusion: \"{}\" resolves to {}, who is excluded.",
                        reference, track.artist
                    )
                });
                track.artist
            }
            Ok(None) => {
                trace.log_with(ReasoningStepType::Extraction, || {
                    format!("Exclusion: \"{}\" did not resolve; excluding it verbatim.", reference)
                });
                reference
            }
            Err(e) => {
                warn!(reference = %reference, "Reference resolution failed: {}", e);
                trace.log_with(ReasoningStepType::Warning, || {
                    format!("Exclusion: lookup of \"{}\" failed; excluding it verbatim.", reference)
                });
                reference
            }
        };
        draft.exclude_artist = Some(artist);
        draft
    }
}
