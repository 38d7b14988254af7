//! External collaborators consumed by the playlist pipeline.
//!
//! - Snapshot provider: the user's listening history (read-only)
//! - Last.fm: reference resolution, similar tracks, artist genres, artwork
//! - Genre cache and bounded fan-out used around per-artist lookups

pub mod fanout;
pub mod genre_cache;
pub mod lastfm;
pub mod snapshot;
mod traits;

pub use fanout::fan_out;
pub use genre_cache::CachedGenreLookup;
pub use lastfm::LastFmClient;
pub use snapshot::{FileSnapshotProvider, SnapshotTrack, UserSnapshot};
pub use traits::{
    CatalogLookup, CatalogMatch, GenreLookup, ServiceError, SimilarityService, SnapshotProvider,
    TrackRef, Unavailable,
};
