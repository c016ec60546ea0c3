pub mod content_hash;
pub mod empty;
pub mod names;
pub mod similar_images;
pub mod similar_videos;

/// Which slice of the index an analyzer inspects. The file and folder flows
/// are identical apart from this filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Target {
    Files,
    Folders,
}
