use thiserror::Error;

pub mod engine;
pub mod group;
pub mod indexer;
pub mod model;
pub mod parallel;
pub mod progress;

/// Structural failures that abort a whole operation. Per-item failures never
/// surface here; they become [`model::Warning`]s and the run continues.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Operation cancelled")]
    Cancelled,
}

#[cfg(test)]
pub(crate) mod testutil {
    use crate::core::model::{FileCategory, IndexedObject};
    use chrono::{TimeZone, Utc};
    use std::path::{Path, PathBuf};

    /// Fabricate an indexed entry without touching the filesystem. The
    /// creation minute doubles as a deterministic ordering knob.
    pub(crate) fn fake_object(path: &str, size: u64, created_minute: u32) -> IndexedObject {
        fake_categorized(path, size, created_minute, FileCategory::Document)
    }

    pub(crate) fn fake_folder(path: &str, created_minute: u32) -> IndexedObject {
        fake_categorized(path, 0, created_minute, FileCategory::Folder)
    }

    pub(crate) fn fake_categorized(
        path: &str,
        size: u64,
        created_minute: u32,
        category: FileCategory,
    ) -> IndexedObject {
        let stamp = Utc
            .with_ymd_and_hms(2020, 1, 1, 1, created_minute, 0)
            .unwrap();
        IndexedObject {
            path: PathBuf::from(path),
            parent_path: Path::new(path).parent().and_then(|p| {
                (!p.as_os_str().is_empty()).then(|| p.to_path_buf())
            }),
            size_bytes: size,
            category,
            created_at: stamp,
            modified_at: stamp,
        }
    }
}
