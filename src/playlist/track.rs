//! Candidate and finalized track types.

use crate::similarity::normalize;
use serde::{Deserialize, Serialize};

/// Where a candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackSource {
    Personal,
    ExternalSimilarity,
    Generative,
    Unknown,
}

impl std::fmt::Display for TrackSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackSource::Personal => write!(f, "personal"),
            TrackSource::ExternalSimilarity => write!(f, "external_similarity"),
            TrackSource::Generative => write!(f, "generative"),
            TrackSource::Unknown => write!(f, "unknown"),
        }
    }
}

/// Normalized (title, artist) identity of a track.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackKey {
    pub title: String,
    pub artist: String,
}

impl TrackKey {
    pub fn new(title: &str, artist: &str) -> Self {
        Self {
            title: normalize(title),
            artist: normalize(artist),
        }
    }
}

pub const UNKNOWN_MOOD: &str = "unknown";

/// A track under consideration, not yet part of the playlist.
///
/// `None` tempo or release year means "unknown".
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateTrack {
    pub title: String,
    pub artist: String,
    pub tempo: Option<f64>,
    pub release_year: Option<i32>,
    pub mood: String,
    pub is_personal_favorite: bool,
    pub source: TrackSource,
    pub selection_reason: String,
    pub artwork_url: Option<String>,
    pub playable_uri: Option<String>,
}

impl CandidateTrack {
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        source: TrackSource,
        selection_reason: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            tempo: None,
            release_year: None,
            mood: UNKNOWN_MOOD.to_string(),
            is_personal_favorite: false,
            source,
            selection_reason: selection_reason.into(),
            artwork_url: None,
            playable_uri: None,
        }
    }

    pub fn with_favorite(mut self, favorite: bool) -> Self {
        self.is_personal_favorite = favorite;
        self
    }

    pub fn key(&self) -> TrackKey {
        TrackKey::new(&self.title, &self.artist)
    }

    /// Case-insensitive, trimmed comparison against a normalized artist name.
    pub fn is_by(&self, normalized_artist: &str) -> bool {
        normalize(&self.artist) == normalized_artist
    }

    pub fn needs_catalog_data(&self) -> bool {
        self.artwork_url.is_none() || self.playable_uri.is_none()
    }
}

/// A track as it appears in the final playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistTrack {
    pub title: String,
    pub artist: String,
    pub tempo: f64,
    pub liked: bool,
    pub mood: String,
    pub source: TrackSource,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playable_uri: Option<String>,
}

impl PlaylistTrack {
    /// Finalize a candidate whose tempo has already been backfilled.
    pub fn finalize(candidate: CandidateTrack, tempo: f64) -> Self {
        Self {
            title: candidate.title,
            artist: candidate.artist,
            tempo,
            liked: candidate.is_personal_favorite,
            mood: candidate.mood,
            source: candidate.source,
            reason: candidate.selection_reason,
            release_year: candidate.release_year,
            artwork_url: candidate.artwork_url,
            playable_uri: candidate.playable_uri,
        }
    }
}

/// Terminal value of a successful pipeline run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaylistResult {
    pub tracks: Vec<PlaylistTrack>,
    /// Present only in explain mode.
    pub reasoning_trace: Option<Vec<String>>,
}

/// Wire shape returned to callers: `{tracks, reasoning?}` or `{error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlaylistResponse {
    Playlist {
        tracks: Vec<PlaylistTrack>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reasoning: Option<Vec<String>>,
    },
    Error {
        error: String,
    },
}

impl PlaylistResponse {
    pub fn is_error(&self) -> bool {
        matches!(self, PlaylistResponse::Error { .. })
    }

    pub fn tracks(&self) -> &[PlaylistTrack] {
        match self {
            PlaylistResponse::Playlist { tracks, .. } => tracks,
            PlaylistResponse::Error { .. } => &[],
        }
    }
}

impl From<PlaylistResult> for PlaylistResponse {
    fn from(result: PlaylistResult) -> Self {
        PlaylistResponse::Playlist {
            tracks: result.tracks,
            reasoning: result.reasoning_trace,
        }
    }
}

/// Drop later duplicates by normalized (title, artist), keeping first occurrence.
pub fn dedup_candidates(candidates: Vec<CandidateTrack>) -> Vec<CandidateTrack> {
    let mut seen = std::collections::HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.key()))
        .collect()
}

/// Drop candidates whose artist equals the normalized `artist`.
pub fn exclude_artist(candidates: Vec<CandidateTrack>, artist: Option<&str>) -> Vec<CandidateTrack> {
    match artist {
        Some(artist) => candidates.into_iter().filter(|c| !c.is_by(artist)).collect(),
        None => candidates,
    }
}
