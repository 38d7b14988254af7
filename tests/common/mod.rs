//! Common test infrastructure
//!
//! In-memory collaborators and fixtures for end-to-end pipeline tests.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{ScriptedLlm, TestPipeline, CREDENTIAL};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let pipeline = TestPipeline::new(ScriptedLlm::new().fail("down"));
//!     let response = pipeline.assembler().generate_playlist("rock", CREDENTIAL, false).await;
//!     assert!(!response.is_error());
//! }
//! ```

mod fixtures;
mod stubs;

// Public API - this is what tests import
#[allow(unused_imports)]
pub use fixtures::{
    generated_tracks_json, library_snapshot, normalized_artists, TestPipeline, CREDENTIAL,
};
#[allow(unused_imports)]
pub use stubs::{
    InMemorySnapshots, RecordedPrompt, ScriptedLlm, StubCatalog, StubGenres, StubSimilarity,
};
