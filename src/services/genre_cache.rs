//! In-process TTL cache in front of a genre lookup.

use super::traits::{GenreLookup, ServiceError};
use crate::similarity::normalize;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

/// Caches successful `artist_genres` answers for `ttl`.
///
/// Failures are not cached, so a transient error costs one more call next
/// time instead of hiding the artist's genres until expiry.
pub struct CachedGenreLookup {
    inner: Arc<dyn GenreLookup>,
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, HashSet<String>)>>,
}

impl CachedGenreLookup {
    pub fn new(inner: Arc<dyn GenreLookup>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, key: &str) -> Option<HashSet<String>> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some((stored_at, genres)) if stored_at.elapsed() < self.ttl => Some(genres.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn store(&self, key: String, genres: HashSet<String>) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key, (Instant::now(), genres));
    }
}

#[async_trait]
impl GenreLookup for CachedGenreLookup {
    async fn artist_genres(&self, artist: &str) -> Result<HashSet<String>, ServiceError> {
        let key = normalize(artist);
        if let Some(genres) = self.cached(&key) {
            debug!(artist = %key, "Genre cache hit");
            return Ok(genres);
        }

        let genres = self.inner.artist_genres(artist).await?;
        self.store(key, genres.clone());
        Ok(genres)
    }
}
