//! Structured playlist constraints and the draft they are resolved from.
//!
//! Extraction produces several [`ConstraintDraft`]s (keyword heuristics, the
//! completion call, regex fallbacks). They are combined with
//! [`ConstraintDraft::merge_fill`], where the receiver wins and the argument
//! only fills fields the receiver left empty, and then turned into an
//! immutable [`PlaylistConstraints`] by [`ConstraintDraft::resolve`].

use super::settings::PipelineSettings;
use crate::similarity::normalize;
use serde::{Deserialize, Serialize};

/// Requested tempo, in BPM.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TempoRange {
    Fixed { low: f64, high: f64 },
    /// Tempo should climb from `start` to `end` across the playlist.
    Gradual { start: f64, end: f64 },
}

impl TempoRange {
    pub fn bounds(&self) -> (f64, f64) {
        match *self {
            TempoRange::Fixed { low, high } => (low, high),
            TempoRange::Gradual { start, end } => (start, end),
        }
    }

    pub fn midpoint(&self) -> f64 {
        let (low, high) = self.bounds();
        (low + high) / 2.0
    }

    pub fn contains(&self, tempo: f64) -> bool {
        let (low, high) = self.bounds();
        tempo >= low && tempo <= high
    }

    pub fn is_gradual(&self) -> bool {
        matches!(self, TempoRange::Gradual { .. })
    }

    /// Same range with low <= high.
    fn ordered(self) -> Self {
        match self {
            TempoRange::Fixed { low, high } if low > high => TempoRange::Fixed {
                low: high,
                high: low,
            },
            TempoRange::Gradual { start, end } if start > end => TempoRange::Gradual {
                start: end,
                end: start,
            },
            other => other,
        }
    }

    fn into_gradual(self) -> Self {
        let (start, end) = self.bounds();
        TempoRange::Gradual { start, end }
    }
}

impl std::fmt::Display for TempoRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TempoRange::Fixed { low, high } => write!(f, "{low}-{high} BPM"),
            TempoRange::Gradual { start, end } => write!(f, "{start}->{end} BPM (gradual)"),
        }
    }
}

/// Inclusive release year window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub low: i32,
    pub high: i32,
}

impl YearRange {
    pub fn new(low: i32, high: i32) -> Self {
        if low > high {
            Self {
                low: high,
                high: low,
            }
        } else {
            Self { low, high }
        }
    }
}

pub const ANY_GENRE: &str = "any";

/// Partially known constraints. Every field is optional; `None` means the
/// producing stage had no opinion.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConstraintDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explicit_song_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tempo_range: Option<TempoRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_year_range: Option<YearRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood_tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_only_personal_library: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_track: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_tempo_check: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gradual_tempo: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrument_hint: Option<String>,
    /// The request asked to avoid the reference track's artist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_reference_artist: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_artist: Option<String>,
}

impl ConstraintDraft {
    /// Keep every field already set on `self`; take the rest from `other`.
    pub fn merge_fill(self, other: ConstraintDraft) -> ConstraintDraft {
        ConstraintDraft {
            explicit_song_count: self.explicit_song_count.or(other.explicit_song_count),
            duration_minutes: self.duration_minutes.or(other.duration_minutes),
            tempo_range: self.tempo_range.or(other.tempo_range),
            genres: self.genres.or(other.genres),
            release_year_range: self.release_year_range.or(other.release_year_range),
            mood_tags: self.mood_tags.or(other.mood_tags),
            use_only_personal_library: self
                .use_only_personal_library
                .or(other.use_only_personal_library),
            reference_track: self.reference_track.or(other.reference_track),
            requires_tempo_check: self.requires_tempo_check.or(other.requires_tempo_check),
            gradual_tempo: self.gradual_tempo.or(other.gradual_tempo),
            instrument_hint: self.instrument_hint.or(other.instrument_hint),
            exclude_reference_artist: self
                .exclude_reference_artist
                .or(other.exclude_reference_artist),
            exclude_artist: self.exclude_artist.or(other.exclude_artist),
        }
    }

    /// Names of the fields this draft sets, in declaration order.
    pub fn populated_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        let flags = [
            ("explicit_song_count", self.explicit_song_count.is_some()),
            ("duration_minutes", self.duration_minutes.is_some()),
            ("tempo_range", self.tempo_range.is_some()),
            ("genres", self.genres.is_some()),
            ("release_year_range", self.release_year_range.is_some()),
            ("mood_tags", self.mood_tags.is_some()),
            (
                "use_only_personal_library",
                self.use_only_personal_library.is_some(),
            ),
            ("reference_track", self.reference_track.is_some()),
            ("requires_tempo_check", self.requires_tempo_check.is_some()),
            ("gradual_tempo", self.gradual_tempo.is_some()),
            ("instrument_hint", self.instrument_hint.is_some()),
            (
                "exclude_reference_artist",
                self.exclude_reference_artist.is_some(),
            ),
            ("exclude_artist", self.exclude_artist.is_some()),
        ];
        for (name, set) in flags {
            if set {
                fields.push(name);
            }
        }
        fields
    }

    /// Apply defaults and normalize into final constraints.
    pub fn resolve(self, settings: &PipelineSettings) -> PlaylistConstraints {
        let explicit_song_count = self.explicit_song_count.filter(|n| *n >= 1);
        let duration_minutes = self
            .duration_minutes
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(settings.default_duration_minutes);

        let mut tempo_range = self
            .tempo_range
            .filter(|r| {
                let (low, high) = r.bounds();
                low.is_finite() && high.is_finite()
            })
            .unwrap_or(TempoRange::Fixed {
                low: settings.tempo_low,
                high: settings.tempo_high,
            })
            .ordered();
        let gradual_tempo = self.gradual_tempo.unwrap_or(false) || tempo_range.is_gradual();
        if gradual_tempo {
            tempo_range = tempo_range.into_gradual();
        }

        let mut genres = normalize_tags(self.genres.unwrap_or_default());
        if genres.is_empty() {
            genres.push(ANY_GENRE.to_string());
        }

        let release_year_range = self
            .release_year_range
            .map(|r| YearRange::new(r.low, r.high))
            .unwrap_or_else(|| {
                YearRange::new(settings.release_year_low, settings.release_year_high)
            });

        let target_count = explicit_song_count.unwrap_or_else(|| {
            let derived = (duration_minutes / settings.avg_song_minutes).round_ties_even();
            settings.min_song_count.max(derived as usize)
        });

        PlaylistConstraints {
            explicit_song_count,
            duration_minutes,
            tempo_range,
            genres,
            release_year_range,
            mood_tags: normalize_tags(self.mood_tags.unwrap_or_default()),
            use_only_personal_library: self.use_only_personal_library.unwrap_or(false),
            reference_track: non_empty(self.reference_track.as_deref().map(str::trim)),
            requires_tempo_check: self.requires_tempo_check.unwrap_or(false),
            gradual_tempo,
            instrument_hint: non_empty(self.instrument_hint.as_deref().map(normalize).as_deref()),
            exclude_artist: non_empty(self.exclude_artist.as_deref().map(normalize).as_deref()),
            target_count,
        }
    }
}

/// Final, normalized constraints for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistConstraints {
    pub explicit_song_count: Option<usize>,
    pub duration_minutes: f64,
    pub tempo_range: TempoRange,
    /// Never empty; `["any"]` when unconstrained.
    pub genres: Vec<String>,
    pub release_year_range: YearRange,
    pub mood_tags: Vec<String>,
    pub use_only_personal_library: bool,
    pub reference_track: Option<String>,
    pub requires_tempo_check: bool,
    pub gradual_tempo: bool,
    pub instrument_hint: Option<String>,
    /// Lowercased and trimmed.
    pub exclude_artist: Option<String>,
    pub target_count: usize,
}

impl PlaylistConstraints {
    pub fn genres_unconstrained(&self) -> bool {
        self.genres.iter().any(|g| g == ANY_GENRE)
    }

    /// One-line description used as the validation trace header.
    pub fn summary(&self) -> String {
        let mut parts = vec![
            format!("{} tracks", self.target_count),
            format!("{} min", self.duration_minutes),
            format!("tempo {}", self.tempo_range),
            format!("genres [{}]", self.genres.join(", ")),
            format!(
                "years {}-{}",
                self.release_year_range.low, self.release_year_range.high
            ),
        ];
        if !self.mood_tags.is_empty() {
            parts.push(format!("moods [{}]", self.mood_tags.join(", ")));
        }
        if self.use_only_personal_library {
            parts.push("personal library only".to_string());
        }
        if let Some(reference) = &self.reference_track {
            parts.push(format!("reference \"{reference}\""));
        }
        if let Some(instrument) = &self.instrument_hint {
            parts.push(format!("instrument {instrument}"));
        }
        if let Some(artist) = &self.exclude_artist {
            parts.push(format!("excluding {artist}"));
        }
        parts.join(" | ")
    }
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = normalize(&tag);
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}
