//! Last.fm API client.
//!
//! Serves as similarity service (`track.search`, `track.getsimilar`),
//! genre lookup (`artist.gettoptags`) and catalog lookup (`track.getInfo`).
//! Requests are spaced according to the configured rate.

use super::traits::{
    CatalogLookup, CatalogMatch, GenreLookup, ServiceError, SimilarityService, TrackRef,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

const LASTFM_API_BASE: &str = "https://ws.audioscrobbler.com/2.0/";
const MAX_GENRE_TAGS: usize = 10;

pub struct LastFmClient {
    client: Client,
    api_key: String,
    base_url: String,
    min_interval: Duration,
    last_request: Mutex<Instant>,
}

impl LastFmClient {
    /// Create a client spacing requests to `requests_per_second`.
    pub fn new(api_key: &str, requests_per_second: u32) -> Result<Self, ServiceError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        let min_interval = Duration::from_millis(1000 / u64::from(requests_per_second.max(1)));

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: LASTFM_API_BASE.to_string(),
            min_interval,
            last_request: Mutex::new(
                Instant::now()
                    .checked_sub(min_interval)
                    .unwrap_or_else(Instant::now),
            ),
        })
    }

    /// Point the client at a different endpoint (proxies, mirrors).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        let elapsed = last.elapsed();
        if elapsed < self.min_interval {
            tokio::time::sleep(self.min_interval - elapsed).await;
        }
        *last = Instant::now();
    }

    async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ServiceError> {
        self.rate_limit().await;

        let mut url = format!(
            "{}?method={}&api_key={}&format=json",
            self.base_url, method, self.api_key
        );
        for (name, value) in params {
            url.push_str(&format!("&{}={}", name, urlencoding::encode(value)));
        }

        debug!(method, "Calling Last.fm");
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ServiceError::RateLimited);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response.json::<T>().await.map_err(|e| {
            ServiceError::InvalidResponse(format!("Failed to parse Last.fm {}: {}", method, e))
        })
    }
}

/// Split "title by artist" into its parts.
fn split_reference(text: &str) -> (String, Option<String>) {
    let split_at = text
        .char_indices()
        .rev()
        .map(|(i, _)| i)
        .find(|&i| {
            text.get(i..i + 4)
                .is_some_and(|s| s.eq_ignore_ascii_case(" by "))
        });
    match split_at {
        Some(idx) => {
            let title = text[..idx].trim();
            let artist = text[idx + 4..].trim();
            if title.is_empty() || artist.is_empty() {
                (text.trim().to_string(), None)
            } else {
                (title.to_string(), Some(artist.to_string()))
            }
        }
        None => (text.trim().to_string(), None),
    }
}

#[async_trait]
impl SimilarityService for LastFmClient {
    async fn resolve_reference(&self, text: &str) -> Result<Option<TrackRef>, ServiceError> {
        let (title, artist) = split_reference(text);
        let mut params = vec![("track", title.as_str()), ("limit", "1")];
        if let Some(artist) = artist.as_deref() {
            params.push(("artist", artist));
        }

        let body: TrackSearchResponse = self.call("track.search", &params).await?;
        let found = body
            .results
            .and_then(|r| r.trackmatches)
            .and_then(|m| m.track)
            .and_then(|tracks| tracks.into_iter().next())
            .map(|t| TrackRef::new(t.name, t.artist));

        Ok(found)
    }

    async fn similar_tracks(
        &self,
        title: &str,
        artist: &str,
        limit: usize,
    ) -> Result<Vec<TrackRef>, ServiceError> {
        let limit = limit.to_string();
        let body: SimilarTracksResponse = self
            .call(
                "track.getsimilar",
                &[("track", title), ("artist", artist), ("limit", limit.as_str())],
            )
            .await?;

        let tracks = body
            .similartracks
            .and_then(|s| s.track)
            .unwrap_or_default()
            .into_iter()
            .map(|t| TrackRef::new(t.name, t.artist.name))
            .collect();

        Ok(tracks)
    }
}

#[async_trait]
impl GenreLookup for LastFmClient {
    async fn artist_genres(&self, artist: &str) -> Result<HashSet<String>, ServiceError> {
        let body: TopTagsResponse = self
            .call("artist.gettoptags", &[("artist", artist)])
            .await?;

        let genres = body
            .toptags
            .and_then(|t| t.tag)
            .unwrap_or_default()
            .into_iter()
            .take(MAX_GENRE_TAGS)
            .map(|tag| tag.name.trim().to_lowercase())
            .filter(|name| !name.is_empty())
            .collect();

        Ok(genres)
    }
}

#[async_trait]
impl CatalogLookup for LastFmClient {
    async fn find_track(
        &self,
        title: &str,
        artist: &str,
    ) -> Result<Option<CatalogMatch>, ServiceError> {
        let body: TrackInfoResponse = self
            .call("track.getInfo", &[("track", title), ("artist", artist)])
            .await?;

        let Some(track) = body.track else {
            return Ok(None);
        };

        // Last.fm lists images smallest first
        let artwork_url = track
            .album
            .and_then(|a| a.image)
            .unwrap_or_default()
            .into_iter()
            .rev()
            .map(|i| i.url)
            .find(|url| !url.is_empty());

        if artwork_url.is_none() && track.url.is_none() {
            warn!(title, artist, "Last.fm track has neither artwork nor URL");
            return Ok(None);
        }

        Ok(Some(CatalogMatch {
            artwork_url,
            playable_uri: track.url,
        }))
    }
}

// Last.fm response types

#[derive(Deserialize)]
struct TrackSearchResponse {
    results: Option<TrackSearchResults>,
}

#[derive(Deserialize)]
struct TrackSearchResults {
    trackmatches: Option<TrackMatches>,
}

#[derive(Deserialize)]
struct TrackMatches {
    track: Option<Vec<SearchTrack>>,
}

#[derive(Deserialize)]
struct SearchTrack {
    name: String,
    artist: String,
}

#[derive(Deserialize)]
struct SimilarTracksResponse {
    similartracks: Option<SimilarTracksContainer>,
}

#[derive(Deserialize)]
struct SimilarTracksContainer {
    track: Option<Vec<SimilarTrack>>,
}

#[derive(Deserialize)]
struct SimilarTrack {
    name: String,
    artist: NamedArtist,
}

#[derive(Deserialize)]
struct NamedArtist {
    name: String,
}

#[derive(Deserialize)]
struct TopTagsResponse {
    toptags: Option<TopTags>,
}

#[derive(Deserialize)]
struct TopTags {
    tag: Option<Vec<Tag>>,
}

#[derive(Deserialize)]
struct Tag {
    name: String,
}

#[derive(Deserialize)]
struct TrackInfoResponse {
    track: Option<TrackInfo>,
}

#[derive(Deserialize)]
struct TrackInfo {
    url: Option<String>,
    album: Option<AlbumInfo>,
}

#[derive(Deserialize)]
struct AlbumInfo {
    image: Option<Vec<Image>>,
}

#[derive(Deserialize)]
struct Image {
    #[serde(rename = "#text")]
    url: String,
}
