//! Snapshot fixtures and the wired-up pipeline used by the e2e tests.

#![allow(dead_code)]

use super::stubs::{InMemorySnapshots, ScriptedLlm, StubCatalog, StubGenres, StubSimilarity};
use playlist_composer::playlist::{PipelineSettings, PlaylistAssembler, PlaylistTrack};
use playlist_composer::services::{SnapshotTrack, UserSnapshot};
use std::sync::Arc;

pub const CREDENTIAL: &str = "test-user";

/// Five distinct library tracks; "Levitating" appears in both lists.
pub fn library_snapshot() -> UserSnapshot {
    UserSnapshot {
        top_artists: vec!["The Weeknd".to_string(), "Dua Lipa".to_string()],
        top_genres: vec!["pop".to_string()],
        liked_tracks: vec![
            SnapshotTrack::new("Blinding Lights", "The Weeknd")
                .with_artwork("https://img.example/bl.jpg")
                .with_uri("track:blinding-lights"),
            SnapshotTrack::new("Levitating", "Dua Lipa").with_uri("track:levitating"),
            SnapshotTrack::new("Save Your Tears", "The Weeknd"),
        ],
        top_tracks: vec![
            SnapshotTrack::new("HUMBLE.", "Kendrick Lamar")
                .with_artwork("https://img.example/humble.jpg"),
            SnapshotTrack::new("Starboy", "The Weeknd"),
            SnapshotTrack::new("Levitating", "Dua Lipa"),
        ],
    }
}

fn library_genres() -> StubGenres {
    StubGenres::new(&[
        ("the weeknd", &["pop", "r&b"]),
        ("dua lipa", &["pop", "dance"]),
        ("kendrick lamar", &["hip hop", "rap"]),
    ])
}

/// JSON array in the shape the generative fallback asks for.
pub fn generated_tracks_json(tracks: &[(&str, &str, Option<f64>)]) -> String {
    let items: Vec<serde_json::Value> = tracks
        .iter()
        .map(|(title, artist, bpm)| {
            serde_json::json!({
                "title": title,
                "artist": artist,
                "bpm": bpm,
                "release_year": 2021,
                "mood": "Energetic",
            })
        })
        .collect();
    serde_json::Value::Array(items).to_string()
}

pub fn normalized_artists(tracks: &[PlaylistTrack]) -> Vec<String> {
    tracks
        .iter()
        .map(|t| t.artist.trim().to_lowercase())
        .collect()
}

/// Stubs plus the assembler built over them. The stubs stay reachable so
/// tests can inspect what the pipeline asked for.
pub struct TestPipeline {
    pub llm: Arc<ScriptedLlm>,
    pub similarity: Arc<StubSimilarity>,
    pub genres: Arc<StubGenres>,
    pub catalog: Arc<StubCatalog>,
    pub snapshots: Arc<InMemorySnapshots>,
    pub settings: PipelineSettings,
}

impl TestPipeline {
    /// Library snapshot under [`CREDENTIAL`], library genres, no similarity
    /// data and an empty catalog.
    pub fn new(llm: ScriptedLlm) -> Self {
        Self {
            llm: Arc::new(llm),
            similarity: Arc::new(StubSimilarity::new()),
            genres: Arc::new(library_genres()),
            catalog: Arc::new(StubCatalog::new()),
            snapshots: Arc::new(
                InMemorySnapshots::new().with_snapshot(CREDENTIAL, library_snapshot()),
            ),
            settings: PipelineSettings::default(),
        }
    }

    pub fn with_similarity(mut self, similarity: StubSimilarity) -> Self {
        self.similarity = Arc::new(similarity);
        self
    }

    pub fn with_catalog(mut self, catalog: StubCatalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    pub fn with_snapshot(mut self, snapshot: UserSnapshot) -> Self {
        self.snapshots = Arc::new(InMemorySnapshots::new().with_snapshot(CREDENTIAL, snapshot));
        self
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn assembler(&self) -> PlaylistAssembler {
        PlaylistAssembler::new(
            self.llm.clone(),
            self.similarity.clone(),
            self.genres.clone(),
            self.snapshots.clone(),
            self.settings.clone(),
        )
        .with_catalog(self.catalog.clone())
    }
}
