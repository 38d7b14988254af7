//! Playlist assembler: drives one request through the pipeline states.

use super::constraints::PlaylistConstraints;
use super::enforcer::enforce;
use super::enricher::CandidateEnricher;
use super::error::PipelineError;
use super::extractor::ConstraintExtractor;
use super::fallback::GenerativeFallback;
use super::settings::PipelineSettings;
use super::sources::{CandidateSourceSelector, SourcingBranch};
use super::state::{needs_fallback, PipelineState, PlaylistBranch};
use super::trace::{lines, ReasoningLogger, ReasoningStep, ReasoningStepType};
use super::track::{dedup_candidates, CandidateTrack, PlaylistResponse, PlaylistResult, PlaylistTrack};
use crate::llm::LlmProvider;
use crate::services::{
    CatalogLookup, GenreLookup, SimilarityService, SnapshotProvider, UserSnapshot,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-request inputs. The assembler itself keeps no request state.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Opaque handle the snapshot provider uses to find the user's history.
    pub credential: String,
    pub explain: bool,
}

impl RequestContext {
    pub fn new(credential: impl Into<String>, explain: bool) -> Self {
        Self {
            credential: credential.into(),
            explain,
        }
    }
}

/// Everything a finished run produced, including how it got there.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub result: PlaylistResult,
    pub constraints: PlaylistConstraints,
    pub branch: PlaylistBranch,
    /// States in the order they were entered, ending with `Done`.
    pub states: Vec<PipelineState>,
    /// Typed trace steps; empty unless the request asked for an explanation.
    pub steps: Vec<ReasoningStep>,
}

/// Pool being carried between states.
struct Pool {
    constraints: PlaylistConstraints,
    snapshot: UserSnapshot,
    branch: SourcingBranch,
    candidates: Vec<CandidateTrack>,
    sourced: usize,
    generated: usize,
}

/// State plus the data it needs.
enum Stage {
    Extracting,
    Sourcing(PlaylistConstraints),
    GenerativeFallback(Pool),
    Enriching(Pool),
    Enforcing(Pool),
    Done {
        tracks: Vec<PlaylistTrack>,
        constraints: PlaylistConstraints,
        branch: PlaylistBranch,
    },
    Error(PipelineError),
}

impl Stage {
    fn state(&self) -> PipelineState {
        match self {
            Stage::Extracting => PipelineState::Extracting,
            Stage::Sourcing(_) => PipelineState::Sourcing,
            Stage::GenerativeFallback(_) => PipelineState::GenerativeFallback,
            Stage::Enriching(_) => PipelineState::Enriching,
            Stage::Enforcing(_) => PipelineState::Enforcing,
            Stage::Done { .. } => PipelineState::Done,
            Stage::Error(_) => PipelineState::Error,
        }
    }
}

/// Orchestrates extraction, sourcing, fallback, enrichment and enforcement.
pub struct PlaylistAssembler {
    llm: Arc<dyn LlmProvider>,
    similarity: Arc<dyn SimilarityService>,
    genres: Arc<dyn GenreLookup>,
    catalog: Option<Arc<dyn CatalogLookup>>,
    snapshots: Arc<dyn SnapshotProvider>,
    settings: PipelineSettings,
}

impl PlaylistAssembler {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        similarity: Arc<dyn SimilarityService>,
        genres: Arc<dyn GenreLookup>,
        snapshots: Arc<dyn SnapshotProvider>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            llm,
            similarity,
            genres,
            catalog: None,
            snapshots,
            settings,
        }
    }

    /// Enable catalog lookups for artwork and playable URIs during enrichment.
    pub fn with_catalog(mut self, catalog: Arc<dyn CatalogLookup>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Public entry point: `{tracks, reasoning?}` or `{error}`.
    pub async fn generate_playlist(
        &self,
        raw_query: &str,
        credential: &str,
        explain: bool,
    ) -> PlaylistResponse {
        let ctx = RequestContext::new(credential, explain);
        match self.run(raw_query, &ctx).await {
            Ok(run) => run.result.into(),
            Err(e) => PlaylistResponse::Error {
                error: e.to_string(),
            },
        }
    }

    /// Run the state machine to completion.
    pub async fn run(
        &self,
        raw_query: &str,
        ctx: &RequestContext,
    ) -> Result<PipelineRun, PipelineError> {
        info!(explain = ctx.explain, "Generating playlist for \"{}\"", raw_query);
        let mut trace = ReasoningLogger::new(ctx.explain);
        let mut stage = Stage::Extracting;
        let mut states = vec![stage.state()];

        loop {
            match stage {
                Stage::Done {
                    tracks,
                    constraints,
                    branch,
                } => {
                    info!(tracks = tracks.len(), ?branch, "Playlist ready");
                    let steps = trace.into_steps();
                    return Ok(PipelineRun {
                        result: PlaylistResult {
                            tracks,
                            reasoning_trace: steps.clone().map(lines),
                        },
                        constraints,
                        branch,
                        states,
                        steps: steps.unwrap_or_default(),
                    });
                }
                Stage::Error(e) => {
                    warn!("Playlist generation failed: {}", e);
                    return Err(e);
                }
                current => {
                    let from = current.state();
                    stage = self.step(current, raw_query, ctx, &mut trace).await;
                    let to = stage.state();
                    debug_assert!(from.can_transition_to(to), "{:?} -> {:?}", from, to);
                    debug!(?from, ?to, "Pipeline transition");
                    states.push(to);
                }
            }
        }
    }

    /// Advance one state.
    async fn step(
        &self,
        stage: Stage,
        raw_query: &str,
        ctx: &RequestContext,
        trace: &mut ReasoningLogger,
    ) -> Stage {
        match stage {
            Stage::Extracting => {
                let extractor =
                    ConstraintExtractor::new(self.llm.as_ref(), self.similarity.as_ref(), &self.settings);
                Stage::Sourcing(extractor.extract(raw_query, trace).await)
            }

            Stage::Sourcing(constraints) => {
                let snapshot = self.load_snapshot(ctx, trace).await;
                let selector = CandidateSourceSelector::new(
                    self.similarity.as_ref(),
                    self.genres.as_ref(),
                    &self.settings,
                );
                let selection = match selector
                    .select_candidates(&constraints, &snapshot, trace)
                    .await
                {
                    Ok(selection) => selection,
                    Err(e) => return Stage::Error(e),
                };

                let candidates = dedup_candidates(selection.candidates);
                let pool = Pool {
                    sourced: candidates.len(),
                    generated: 0,
                    branch: selection.branch,
                    candidates,
                    constraints,
                    snapshot,
                };
                if needs_fallback(pool.branch, pool.sourced, pool.constraints.target_count) {
                    Stage::GenerativeFallback(pool)
                } else {
                    Stage::Enriching(pool)
                }
            }

            Stage::GenerativeFallback(mut pool) => {
                let shortfall = pool.constraints.target_count.saturating_sub(pool.candidates.len());
                let fallback = GenerativeFallback::new(self.llm.as_ref(), &self.settings);
                let generated = fallback
                    .fill(&pool.constraints, shortfall, &pool.candidates, trace)
                    .await;

                let before = pool.candidates.len();
                pool.candidates.extend(generated);
                pool.candidates = dedup_candidates(pool.candidates);
                pool.generated = pool.candidates.len() - before;
                Stage::Enriching(pool)
            }

            Stage::Enriching(mut pool) => {
                let enricher = CandidateEnricher::new(self.catalog.as_deref(), &self.settings);
                pool.candidates = enricher.enrich(pool.candidates, &pool.snapshot, trace).await;
                Stage::Enforcing(pool)
            }

            Stage::Enforcing(pool) => {
                let target_count = pool.constraints.target_count;
                let tracks = enforce(pool.candidates, &pool.constraints, target_count, trace);
                Stage::Done {
                    tracks,
                    branch: PlaylistBranch::classify(pool.branch, pool.sourced, pool.generated),
                    constraints: pool.constraints,
                }
            }

            terminal @ (Stage::Done { .. } | Stage::Error(_)) => terminal,
        }
    }

    /// Snapshot for the request; an unavailable one reads as empty.
    async fn load_snapshot(&self, ctx: &RequestContext, trace: &mut ReasoningLogger) -> UserSnapshot {
        match self
            .snapshots
            .get_user_snapshot(&ctx.credential, ctx.explain)
            .await
        {
            Ok(snapshot) => {
                if snapshot.is_empty() {
                    debug!(credential = %ctx.credential, "Listening history has no tracks");
                }
                snapshot
            }
            Err(e) => {
                warn!(credential = %ctx.credential, "Listening history unavailable: {}", e);
                trace.log_with(ReasoningStepType::Warning, || {
                    format!("Listening history unavailable ({}); continuing without it.", e)
                });
                UserSnapshot::default()
            }
        }
    }
}
