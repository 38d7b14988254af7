use thiserror::Error;

/// Errors that end a pipeline run.
///
/// Every external-call failure is absorbed at its call site and extraction
/// always falls back to defaults, so this is the only outcome surfaced to
/// the caller as `{error}`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Personal-library-only request with nothing left after filtering.
    #[error("You requested only your songs, but no matching songs were found.")]
    PersonalLibraryExhausted,
}
