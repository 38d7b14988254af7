//! Playlist Composer Library
//!
//! Turns a free-text playlist request into an ordered, enriched track list,
//! blending the user's listening history, similar-track recommendations and
//! generative suggestions.

pub mod config;
pub mod llm;
pub mod playlist;
pub mod services;
pub mod similarity;

// Re-export commonly used types for convenience
pub use config::{AppConfig, CliConfig, FileConfig};
pub use llm::{LlmProvider, OpenAIProvider};
pub use playlist::{
    PipelineError, PipelineSettings, PlaylistAssembler, PlaylistConstraints, PlaylistResponse,
    PlaylistTrack, RequestContext,
};
pub use services::{FileSnapshotProvider, LastFmClient, UserSnapshot};
