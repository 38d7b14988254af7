//! User preference snapshot and the file-backed provider.
//!
//! The snapshot is refreshed by whatever talks to the streaming service;
//! this crate only reads it.

use super::traits::{ServiceError, SnapshotProvider};
use crate::playlist::TrackKey;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info};

/// A track as reported by the streaming service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotTrack {
    pub name: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl SnapshotTrack {
    pub fn new(name: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            artist: artist.into(),
            artwork_url: None,
            uri: None,
        }
    }

    pub fn with_artwork(mut self, url: impl Into<String>) -> Self {
        self.artwork_url = Some(url.into());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn key(&self) -> TrackKey {
        TrackKey::new(&self.name, &self.artist)
    }
}

/// Read model of the user's listening history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSnapshot {
    pub top_artists: Vec<String>,
    pub top_genres: Vec<String>,
    pub top_tracks: Vec<SnapshotTrack>,
    pub liked_tracks: Vec<SnapshotTrack>,
}

impl UserSnapshot {
    /// Liked tracks followed by top tracks, in snapshot order.
    pub fn library_tracks(&self) -> impl Iterator<Item = &SnapshotTrack> {
        self.liked_tracks.iter().chain(self.top_tracks.iter())
    }

    /// Normalized (title, artist) keys of every library track.
    pub fn library_keys(&self) -> HashSet<TrackKey> {
        self.library_tracks().map(SnapshotTrack::key).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.liked_tracks.is_empty() && self.top_tracks.is_empty()
    }
}

/// Reads `<dir>/<credential>.json` snapshots written by the refresh job.
pub struct FileSnapshotProvider {
    dir: PathBuf,
}

impl FileSnapshotProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn snapshot_path(&self, credential: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_credential(credential)))
    }
}

/// Keep file names to a safe character set.
fn sanitize_credential(credential: &str) -> String {
    credential
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl SnapshotProvider for FileSnapshotProvider {
    async fn get_user_snapshot(
        &self,
        credential: &str,
        explain: bool,
    ) -> Result<UserSnapshot, ServiceError> {
        let path = self.snapshot_path(credential);
        debug!(path = ?path, explain, "Loading user snapshot");

        let content = tokio::fs::read_to_string(&path).await?;
        let snapshot: UserSnapshot = serde_json::from_str(&content).map_err(|e| {
            ServiceError::InvalidResponse(format!("Failed to parse snapshot {:?}: {}", path, e))
        })?;

        info!(
            liked = snapshot.liked_tracks.len(),
            top = snapshot.top_tracks.len(),
            "Loaded user snapshot"
        );
        Ok(snapshot)
    }
}
