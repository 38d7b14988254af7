//! Contracts of the external collaborators the playlist pipeline consumes.

use super::snapshot::UserSnapshot;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Errors raised by external collaborators.
///
/// The pipeline never surfaces these to its caller; every call site turns
/// them into the "no result" case for the candidate or stage at hand.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited")]
    RateLimited,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        ServiceError::Http(e.to_string())
    }
}

/// A (title, artist) pair as returned by search and similarity lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRef {
    pub title: String,
    pub artist: String,
}

impl TrackRef {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
        }
    }
}

/// Catalog data found for a track outside the user's library.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogMatch {
    pub artwork_url: Option<String>,
    pub playable_uri: Option<String>,
}

/// Similar-track recommendation service.
#[async_trait]
pub trait SimilarityService: Send + Sync {
    /// Resolve free text ("title" or "title by artist") to a canonical track.
    async fn resolve_reference(&self, text: &str) -> Result<Option<TrackRef>, ServiceError>;

    /// Up to `limit` tracks similar to the given one.
    async fn similar_tracks(
        &self,
        title: &str,
        artist: &str,
        limit: usize,
    ) -> Result<Vec<TrackRef>, ServiceError>;
}

/// Per-artist genre lookup.
#[async_trait]
pub trait GenreLookup: Send + Sync {
    async fn artist_genres(&self, artist: &str) -> Result<HashSet<String>, ServiceError>;
}

/// Catalog search used to backfill artwork and playable identifiers.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    async fn find_track(
        &self,
        title: &str,
        artist: &str,
    ) -> Result<Option<CatalogMatch>, ServiceError>;
}

/// Provider of the externally refreshed listening-history snapshot.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    async fn get_user_snapshot(
        &self,
        credential: &str,
        explain: bool,
    ) -> Result<UserSnapshot, ServiceError>;
}

/// Stand-in for a collaborator that is not configured.
///
/// Every call fails with [`ServiceError::NotConfigured`], which the pipeline
/// treats like any other lookup failure.
pub struct Unavailable(pub &'static str);

impl Unavailable {
    fn error(&self) -> ServiceError {
        ServiceError::NotConfigured(self.0.to_string())
    }
}

#[async_trait]
impl SimilarityService for Unavailable {
    async fn resolve_reference(&self, _text: &str) -> Result<Option<TrackRef>, ServiceError> {
        Err(self.error())
    }

    async fn similar_tracks(
        &self,
        _title: &str,
        _artist: &str,
        _limit: usize,
    ) -> Result<Vec<TrackRef>, ServiceError> {
        Err(self.error())
    }
}

#[async_trait]
impl GenreLookup for Unavailable {
    async fn artist_genres(&self, _artist: &str) -> Result<HashSet<String>, ServiceError> {
        Err(self.error())
    }
}

#[async_trait]
impl CatalogLookup for Unavailable {
    async fn find_track(
        &self,
        _title: &str,
        _artist: &str,
    ) -> Result<Option<CatalogMatch>, ServiceError> {
        Err(self.error())
    }
}
