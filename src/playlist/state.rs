//! Pipeline state definitions.

use super::sources::SourcingBranch;
use serde::{Deserialize, Serialize};

/// Stage of a playlist request.
///
/// `Extracting -> Sourcing -> (GenerativeFallback) -> Enriching -> Enforcing -> Done`,
/// with `Error` reachable from sourcing. Extraction always produces
/// constraints, but the table still admits `Extracting -> Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Extracting,
    Sourcing,
    GenerativeFallback,
    Enriching,
    Enforcing,
    Done,
    Error,
}

impl PipelineState {
    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (*self, next),
            (Extracting, Sourcing)
                | (Extracting, Error)
                | (Sourcing, GenerativeFallback)
                | (Sourcing, Enriching)
                | (Sourcing, Error)
                | (GenerativeFallback, Enriching)
                | (Enriching, Enforcing)
                | (Enforcing, Done)
        )
    }
}

/// Whether `Sourcing` should hand over to `GenerativeFallback`.
///
/// Personal-only requests never fall back; anything else does when the pool
/// is short of the target.
pub fn needs_fallback(branch: SourcingBranch, pool_size: usize, target_count: usize) -> bool {
    branch != SourcingBranch::PersonalOnly && pool_size < target_count
}

/// Where the final pool came from, for reporting and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaylistBranch {
    PersonalOnly,
    ReferenceTrack,
    PureGenerative,
    /// Similar tracks topped up by the generative fallback.
    Mixed,
}

impl PlaylistBranch {
    pub fn classify(sourcing: SourcingBranch, sourced: usize, generated: usize) -> Self {
        match sourcing {
            SourcingBranch::PersonalOnly => PlaylistBranch::PersonalOnly,
            SourcingBranch::PureGenerative => PlaylistBranch::PureGenerative,
            SourcingBranch::ReferenceTrack if sourced > 0 && generated > 0 => PlaylistBranch::Mixed,
            SourcingBranch::ReferenceTrack => PlaylistBranch::ReferenceTrack,
        }
    }
}
