//! Scripted and in-memory stand-ins for the pipeline's collaborators.

#![allow(dead_code)]

use async_trait::async_trait;
use playlist_composer::llm::{CompletionOptions, CompletionResponse, LlmError, LlmProvider, Message};
use playlist_composer::services::{
    CatalogLookup, CatalogMatch, GenreLookup, ServiceError, SimilarityService, SnapshotProvider,
    TrackRef, UserSnapshot,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// One completion request as seen by [`ScriptedLlm`].
#[derive(Debug, Clone)]
pub struct RecordedPrompt {
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

/// Completion backend answering from a queue. Once the queue is empty,
/// every call fails with a connection error.
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<RecordedPrompt>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(Ok(text.into()));
        self
    }

    pub fn fail(self, reason: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(Err(reason.into()));
        self
    }

    pub fn prompts(&self) -> Vec<RecordedPrompt> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<CompletionResponse, LlmError> {
        let content_of = |index: usize| {
            messages
                .get(index)
                .map(|m| m.content.clone())
                .unwrap_or_default()
        };
        self.prompts.lock().unwrap().push(RecordedPrompt {
            system: content_of(0),
            user: content_of(1),
            temperature: options.temperature,
        });

        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(CompletionResponse::text(text)),
            Some(Err(reason)) => Err(LlmError::Connection(reason)),
            None => Err(LlmError::Connection("no scripted reply left".to_string())),
        }
    }
}

/// Similarity service backed by fixed tables.
#[derive(Default)]
pub struct StubSimilarity {
    references: HashMap<String, TrackRef>,
    similar: Vec<TrackRef>,
    failing: bool,
    similar_requests: Mutex<Vec<(String, String, usize)>>,
}

impl StubSimilarity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn with_reference(mut self, text: &str, title: &str, artist: &str) -> Self {
        self.references
            .insert(text.trim().to_lowercase(), TrackRef::new(title, artist));
        self
    }

    pub fn with_similar(mut self, tracks: &[(&str, &str)]) -> Self {
        self.similar = tracks
            .iter()
            .map(|(title, artist)| TrackRef::new(*title, *artist))
            .collect();
        self
    }

    /// (title, artist, limit) of every similar-track request.
    pub fn similar_requests(&self) -> Vec<(String, String, usize)> {
        self.similar_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SimilarityService for StubSimilarity {
    async fn resolve_reference(&self, text: &str) -> Result<Option<TrackRef>, ServiceError> {
        if self.failing {
            return Err(ServiceError::Http("similarity down".to_string()));
        }
        Ok(self.references.get(&text.trim().to_lowercase()).cloned())
    }

    async fn similar_tracks(
        &self,
        title: &str,
        artist: &str,
        limit: usize,
    ) -> Result<Vec<TrackRef>, ServiceError> {
        self.similar_requests
            .lock()
            .unwrap()
            .push((title.to_string(), artist.to_string(), limit));
        if self.failing {
            return Err(ServiceError::Http("similarity down".to_string()));
        }
        Ok(self.similar.iter().take(limit).cloned().collect())
    }
}

/// Genre lookup keyed by normalized artist name. Unknown artists fail.
#[derive(Default)]
pub struct StubGenres {
    genres: HashMap<String, Vec<String>>,
    calls: AtomicUsize,
}

impl StubGenres {
    pub fn new(entries: &[(&str, &[&str])]) -> Self {
        Self {
            genres: entries
                .iter()
                .map(|(artist, genres)| {
                    (
                        artist.to_lowercase(),
                        genres.iter().map(|g| g.to_string()).collect(),
                    )
                })
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenreLookup for StubGenres {
    async fn artist_genres(&self, artist: &str) -> Result<HashSet<String>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.genres
            .get(&artist.trim().to_lowercase())
            .map(|genres| genres.iter().cloned().collect())
            .ok_or_else(|| ServiceError::InvalidResponse(format!("unknown artist {}", artist)))
    }
}

/// Catalog keyed by normalized (title, artist).
#[derive(Default)]
pub struct StubCatalog {
    tracks: HashMap<(String, String), CatalogMatch>,
    calls: AtomicUsize,
}

impl StubCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_track(mut self, title: &str, artist: &str, artwork: &str, uri: &str) -> Self {
        self.tracks.insert(
            (title.to_lowercase(), artist.to_lowercase()),
            CatalogMatch {
                artwork_url: Some(artwork.to_string()),
                playable_uri: Some(uri.to_string()),
            },
        );
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogLookup for StubCatalog {
    async fn find_track(
        &self,
        title: &str,
        artist: &str,
    ) -> Result<Option<CatalogMatch>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .tracks
            .get(&(title.trim().to_lowercase(), artist.trim().to_lowercase()))
            .cloned())
    }
}

/// Snapshots by credential. Unknown credentials fail like a missing file.
#[derive(Default)]
pub struct InMemorySnapshots {
    snapshots: HashMap<String, UserSnapshot>,
}

impl InMemorySnapshots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(mut self, credential: &str, snapshot: UserSnapshot) -> Self {
        self.snapshots.insert(credential.to_string(), snapshot);
        self
    }
}

#[async_trait]
impl SnapshotProvider for InMemorySnapshots {
    async fn get_user_snapshot(
        &self,
        credential: &str,
        _explain: bool,
    ) -> Result<UserSnapshot, ServiceError> {
        self.snapshots
            .get(credential)
            .cloned()
            .ok_or_else(|| ServiceError::NotConfigured(format!("no snapshot for {}", credential)))
    }
}
