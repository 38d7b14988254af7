//! Backfill of liked status, artwork and playable URIs.
//!
//! Only missing fields are ever filled, so enriching an already enriched
//! pool changes nothing.

use super::settings::PipelineSettings;
use super::trace::{ReasoningLogger, ReasoningStepType};
use super::track::{CandidateTrack, TrackKey};
use crate::services::{fan_out, CatalogLookup, SnapshotTrack, UserSnapshot};
use crate::similarity::is_fuzzy_match;
use tracing::{debug, warn};

pub struct CandidateEnricher<'a> {
    catalog: Option<&'a dyn CatalogLookup>,
    settings: &'a PipelineSettings,
}

impl<'a> CandidateEnricher<'a> {
    pub fn new(catalog: Option<&'a dyn CatalogLookup>, settings: &'a PipelineSettings) -> Self {
        Self { catalog, settings }
    }

    pub async fn enrich(
        &self,
        mut candidates: Vec<CandidateTrack>,
        snapshot: &UserSnapshot,
        trace: &mut ReasoningLogger,
    ) -> Vec<CandidateTrack> {
        let library: Vec<&SnapshotTrack> = snapshot.library_tracks().collect();

        let mut library_matches = 0;
        for candidate in candidates.iter_mut().filter(|c| c.needs_catalog_data()) {
            if let Some(track) = self.fuzzy_find(candidate, &library) {
                if fill_missing(candidate, track.artwork_url.as_deref(), track.uri.as_deref()) {
                    library_matches += 1;
                }
            }
        }

        let catalog_matches = match self.catalog {
            Some(catalog) => self.fill_from_catalog(catalog, &mut candidates).await,
            None => 0,
        };

        let liked = snapshot.library_keys();
        let mut liked_count = 0;
        for candidate in candidates.iter_mut() {
            candidate.is_personal_favorite = liked.contains(&candidate.key());
            if candidate.is_personal_favorite {
                liked_count += 1;
            }
            if candidate.artwork_url.is_none() {
                candidate.artwork_url = Some(self.settings.placeholder_artwork_url.clone());
            }
        }

        debug!(
            library_matches,
            catalog_matches,
            liked = liked_count,
            "Candidates enriched"
        );
        trace.log_with(ReasoningStepType::Enrichment, || {
            format!(
                "Enrichment: {} candidates took artwork or links from your library, {} from the catalog; {} are in your library.",
                library_matches, catalog_matches, liked_count
            )
        });
        candidates
    }

    fn fuzzy_find<'s>(
        &self,
        candidate: &CandidateTrack,
        library: &[&'s SnapshotTrack],
    ) -> Option<&'s SnapshotTrack> {
        library.iter().copied().find(|track| {
            is_fuzzy_match(
                &candidate.title,
                &candidate.artist,
                &track.name,
                &track.artist,
                self.settings.fuzzy_match_threshold,
            )
        })
    }

    /// Look up every candidate still missing data, at most
    /// `max_concurrent_lookups` at a time. Returns how many gained a field.
    async fn fill_from_catalog(
        &self,
        catalog: &dyn CatalogLookup,
        candidates: &mut [CandidateTrack],
    ) -> usize {
        let keys: Vec<TrackKey> = candidates
            .iter()
            .filter(|c| c.needs_catalog_data())
            .map(CandidateTrack::key)
            .collect();
        if keys.is_empty() {
            return 0;
        }

        let found = fan_out(keys, self.settings.max_concurrent_lookups, |key| async move {
            match catalog.find_track(&key.title, &key.artist).await {
                Ok(found) => found,
                Err(e) => {
                    warn!(title = %key.title, artist = %key.artist, "Catalog lookup failed: {}", e);
                    None
                }
            }
        })
        .await;

        let mut filled = 0;
        for candidate in candidates.iter_mut().filter(|c| c.needs_catalog_data()) {
            if let Some(Some(hit)) = found.get(&candidate.key()) {
                if fill_missing(candidate, hit.artwork_url.as_deref(), hit.playable_uri.as_deref()) {
                    filled += 1;
                }
            }
        }
        filled
    }
}

/// Set artwork and URI only where absent. Returns whether anything changed.
fn fill_missing(candidate: &mut CandidateTrack, artwork: Option<&str>, uri: Option<&str>) -> bool {
    let mut changed = false;
    if candidate.artwork_url.is_none() {
        if let Some(artwork) = artwork {
            candidate.artwork_url = Some(artwork.to_string());
            changed = true;
        }
    }
    if candidate.playable_uri.is_none() {
        if let Some(uri) = uri {
            candidate.playable_uri = Some(uri.to_string());
            changed = true;
        }
    }
    changed
}
