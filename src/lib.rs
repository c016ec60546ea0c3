//! Filesystem redundancy detection engine.
//!
//! `dupescan` walks a set of root paths, indexes every surviving entry and
//! runs a series of analyzers over the index: exact duplicates (two-phase
//! content hashing), duplicate names, empty files/folders and near-duplicate
//! images/videos (perceptual hashing). Analyzers stream progress events
//! through a [`ProgressSink`] and report per-item failures as [`Warning`]s
//! instead of aborting the run.
//!
//! Image and video decoding are collaborator seams: the [`media::ImageDecoder`]
//! trait has a default implementation backed by the `image` crate, while a
//! [`media::VideoDecoder`] must be supplied by the caller.

pub mod analyze;
pub mod core;
pub mod media;

pub use crate::core::engine::{Engine, Preset};
pub use crate::core::group::{
    remove_by_paths, retain_by_paths, DuplicateHash, DuplicateName, IndexedObjectsGroup,
    SimilarGroup,
};
pub use crate::core::indexer::index;
pub use crate::core::model::{FileCategory, IndexedObject, Warning};
pub use crate::core::parallel::CancelFlag;
pub use crate::core::progress::{IndexingStage, ProgressSink};
pub use crate::core::EngineError;

pub use crate::analyze::content_hash::analyze_duplicate_hashes;
pub use crate::analyze::empty::analyze_empty;
pub use crate::analyze::names::analyze_duplicate_names;
pub use crate::analyze::similar_images::analyze_similar_images;
pub use crate::analyze::similar_videos::analyze_similar_videos;
pub use crate::analyze::Target;
