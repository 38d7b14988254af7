//! Natural-language playlist pipeline.
//!
//! A request flows one way through:
//! - [`extractor`]: raw text to [`PlaylistConstraints`]
//! - [`sources`]: personal library, similar tracks, or nothing
//! - [`fallback`]: generative top-up when the pool is short
//! - [`enricher`]: liked status, artwork and playable URIs
//! - [`enforcer`]: exclusion, tempo backfill and ordering, truncation
//!
//! [`PlaylistAssembler`] drives these as an explicit state machine.

mod assembler;
pub mod constraints;
pub mod enforcer;
pub mod enricher;
mod error;
pub mod extractor;
pub mod fallback;
pub mod heuristics;
mod settings;
pub mod sources;
pub mod state;
pub mod trace;
mod track;

pub use assembler::{PipelineRun, PlaylistAssembler, RequestContext};
pub use constraints::{ConstraintDraft, PlaylistConstraints, TempoRange, YearRange};
pub use error::PipelineError;
pub use settings::{PipelineSettings, DEFAULT_PLACEHOLDER_ARTWORK};
pub use state::{PipelineState, PlaylistBranch};
pub use trace::{ReasoningLogger, ReasoningStep, ReasoningStepType};
pub use track::{
    dedup_candidates, exclude_artist, CandidateTrack, PlaylistResponse, PlaylistResult,
    PlaylistTrack, TrackKey, TrackSource, UNKNOWN_MOOD,
};
