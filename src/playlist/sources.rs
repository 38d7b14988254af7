//! Candidate source selection.
//!
//! First matching branch wins:
//! 1. personal library only (filtered by reference artist or genre)
//! 2. similar tracks seeded by a reference track
//! 3. nothing, leaving the whole playlist to the generative fallback

use super::constraints::PlaylistConstraints;
use super::error::PipelineError;
use super::settings::PipelineSettings;
use super::trace::{ReasoningLogger, ReasoningStepType};
use super::track::{dedup_candidates, exclude_artist, CandidateTrack, TrackSource};
use crate::services::{fan_out, GenreLookup, SimilarityService, TrackRef, UserSnapshot};
use crate::similarity::normalize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

pub const UNKNOWN_ARTIST: &str = "unknown";

/// Which sourcing branch produced the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourcingBranch {
    PersonalOnly,
    ReferenceTrack,
    PureGenerative,
}

#[derive(Debug, Clone)]
pub struct SourceSelection {
    pub branch: SourcingBranch,
    pub candidates: Vec<CandidateTrack>,
}

pub struct CandidateSourceSelector<'a> {
    similarity: &'a dyn SimilarityService,
    genres: &'a dyn GenreLookup,
    settings: &'a PipelineSettings,
}

impl<'a> CandidateSourceSelector<'a> {
    pub fn new(
        similarity: &'a dyn SimilarityService,
        genres: &'a dyn GenreLookup,
        settings: &'a PipelineSettings,
    ) -> Self {
        Self {
            similarity,
            genres,
            settings,
        }
    }

    pub async fn select_candidates(
        &self,
        constraints: &PlaylistConstraints,
        snapshot: &UserSnapshot,
        trace: &mut ReasoningLogger,
    ) -> Result<SourceSelection, PipelineError> {
        let (branch, candidates) = if constraints.use_only_personal_library {
            let pool = self.personal_pool(constraints, snapshot, trace).await;
            (SourcingBranch::PersonalOnly, pool)
        } else if let Some(reference) = &constraints.reference_track {
            let pool = self.similar_pool(reference, constraints.target_count, trace).await;
            (SourcingBranch::ReferenceTrack, pool)
        } else {
            trace.log(
                ReasoningStepType::Sourcing,
                "Sourcing: no personal-only request or reference track; the model picks every song.",
            );
            (SourcingBranch::PureGenerative, Vec::new())
        };

        let before = candidates.len();
        let candidates = exclude_artist(candidates, constraints.exclude_artist.as_deref());
        if candidates.len() < before {
            trace.log_with(ReasoningStepType::Sourcing, || {
                format!(
                    "Sourcing: dropped {} candidates by the excluded artist.",
                    before - candidates.len()
                )
            });
        }

        if branch == SourcingBranch::PersonalOnly && candidates.is_empty() {
            info!("Personal-only request has no matching library tracks");
            return Err(PipelineError::PersonalLibraryExhausted);
        }

        debug!(?branch, count = candidates.len(), "Candidates selected");
        Ok(SourceSelection { branch, candidates })
    }

    async fn personal_pool(
        &self,
        constraints: &PlaylistConstraints,
        snapshot: &UserSnapshot,
        trace: &mut ReasoningLogger,
    ) -> Vec<CandidateTrack> {
        let liked = snapshot.liked_tracks.iter().map(|t| (t, "your liked songs"));
        let top = snapshot.top_tracks.iter().map(|t| (t, "your top tracks"));
        let pool: Vec<CandidateTrack> = liked
            .chain(top)
            .map(|(track, origin)| {
                let mut candidate = CandidateTrack::new(
                    track.name.clone(),
                    track.artist.clone(),
                    TrackSource::Personal,
                    format!("From {}", origin),
                )
                .with_favorite(true);
                candidate.artwork_url = track.artwork_url.clone();
                candidate.playable_uri = track.uri.clone();
                candidate
            })
            .collect();
        let pool = dedup_candidates(pool);
        trace.log_with(ReasoningStepType::Sourcing, || {
            format!(
                "Sourcing: personal library only, {} liked and top tracks available.",
                pool.len()
            )
        });

        if let Some(reference) = &constraints.reference_track {
            if let Some(track) = self.resolve(reference).await {
                let artist = normalize(&track.artist);
                let filtered: Vec<_> = pool.into_iter().filter(|c| c.is_by(&artist)).collect();
                trace.log_with(ReasoningStepType::Sourcing, || {
                    format!(
                        "Sourcing: kept {} library tracks by {}, the artist of \"{}\".",
                        filtered.len(),
                        track.artist,
                        reference
                    )
                });
                return filtered;
            }
        }

        if constraints.genres_unconstrained() {
            return pool;
        }
        self.filter_by_genre(pool, &constraints.genres, trace).await
    }

    /// Keep candidates whose artist shares a genre with the request.
    async fn filter_by_genre(
        &self,
        pool: Vec<CandidateTrack>,
        genres: &[String],
        trace: &mut ReasoningLogger,
    ) -> Vec<CandidateTrack> {
        let wanted: HashSet<String> = genres.iter().map(|g| normalize(g)).collect();
        let artists: Vec<String> = pool.iter().map(|c| normalize(&c.artist)).collect();

        let lookup = self.genres;
        let by_artist = fan_out(artists, self.settings.max_concurrent_lookups, |artist| async move {
            let result = lookup.artist_genres(&artist).await;
            if let Err(e) = &result {
                warn!(artist = %artist, "Genre lookup failed: {}", e);
            }
            result
        })
        .await;

        let filtered: Vec<CandidateTrack> = pool
            .into_iter()
            .filter(|c| match by_artist.get(&normalize(&c.artist)) {
                Some(Ok(artist_genres)) => artist_genres.iter().any(|g| wanted.contains(&normalize(g))),
                _ => false,
            })
            .collect();

        trace.log_with(ReasoningStepType::Sourcing, || {
            format!(
                "Sourcing: {} library tracks match genres {} ({} artists looked up).",
                filtered.len(),
                genres.join(", "),
                by_artist.len()
            )
        });
        filtered
    }

    async fn similar_pool(
        &self,
        reference: &str,
        limit: usize,
        trace: &mut ReasoningLogger,
    ) -> Vec<CandidateTrack> {
        let seed = match self.resolve(reference).await {
            Some(track) => track,
            None => {
                trace.log_with(ReasoningStepType::Sourcing, || {
                    format!("Sourcing: \"{}\" did not resolve; searching with it as a title.", reference)
                });
                TrackRef::new(reference, UNKNOWN_ARTIST)
            }
        };

        let similar = match self
            .similarity
            .similar_tracks(&seed.title, &seed.artist, limit)
            .await
        {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!(title = %seed.title, artist = %seed.artist, "Similar track lookup failed: {}", e);
                trace.log_with(ReasoningStepType::Warning, || {
                    format!("Sourcing: similar-track lookup failed ({}).", e)
                });
                Vec::new()
            }
        };

        let reason = format!("Similar to {} by {}", seed.title, seed.artist);
        let pool: Vec<CandidateTrack> = similar
            .into_iter()
            .take(limit)
            .map(|t| CandidateTrack::new(t.title, t.artist, TrackSource::ExternalSimilarity, reason.clone()))
            .collect();
        trace.log_with(ReasoningStepType::Sourcing, || {
            format!(
                "Sourcing: {} tracks similar to {} by {}.",
                pool.len(),
                seed.title,
                seed.artist
            )
        });
        pool
    }

    /// Best-effort reference resolution; failures read as unresolved.
    async fn resolve(&self, reference: &str) -> Option<TrackRef> {
        match self.similarity.resolve_reference(reference).await {
            Ok(track) => track,
            Err(e) => {
                warn!(reference = %reference, "Reference resolution failed: {}", e);
                None
            }
        }
    }
}
