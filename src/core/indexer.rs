//! Filesystem traversal and stat phase.
//!
//! Walks each include root bottom-up, applies the path and extension rules,
//! then stats surviving entries under the shared concurrency cap. Per-item
//! I/O failures become warnings; the walk itself only fails on cancellation.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::core::model::{FileCategory, IndexedObject, Warning};
use crate::core::parallel::{bounded_parallel_map, CancelFlag};
use crate::core::progress::{IndexingStage, ProgressSink};
use crate::core::EngineError;

/// Index every entry reachable from `root_paths` that survives the exclusion
/// and extension rules. Returns the indexed entries together with the
/// warnings accumulated along the way; a vanished or unreadable root is a
/// warning, not a failure.
pub async fn index(
    root_paths: &[PathBuf],
    excluded_paths: &[PathBuf],
    included_extensions: &[String],
    excluded_extensions: &[String],
    max_threads: usize,
    cancel: &CancelFlag,
    progress: &ProgressSink,
) -> Result<(Vec<IndexedObject>, Vec<Warning>), EngineError> {
    let included_extensions = normalize_extensions(included_extensions);
    let excluded_extensions = normalize_extensions(excluded_extensions);

    let mut warnings = Vec::new();
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut pending: Vec<(PathBuf, bool)> = Vec::new();

    for root in root_paths {
        // Contents-first so children are seen before their parent directory.
        for entry in WalkDir::new(root).contents_first(true) {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    let path = error
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| root.clone());
                    warnings.push(Warning::from_error(path, &error));
                    continue;
                }
            };

            let path = entry.path();
            let is_dir = entry.file_type().is_dir();
            if is_under_any(path, excluded_paths) {
                continue;
            }
            if is_dir {
                progress.send(IndexingStage::Walking {
                    path: path.to_path_buf(),
                });
            } else if !extension_allowed(path, &included_extensions, &excluded_extensions) {
                continue;
            }
            // A path reachable from two roots is indexed once.
            if seen.insert(path.to_path_buf()) {
                pending.push((path.to_path_buf(), is_dir));
            }
        }
    }

    let roots: Arc<HashSet<PathBuf>> = Arc::new(root_paths.iter().cloned().collect());
    let sink = progress.clone();
    let results = bounded_parallel_map(pending, max_threads, cancel, move |(path, is_dir), p| {
        let roots = Arc::clone(&roots);
        let sink = sink.clone();
        async move {
            let object = stat_entry(&path, is_dir, &roots).await?;
            sink.send(IndexingStage::Indexing {
                progress: p,
                item: object.clone(),
            });
            Ok(object)
        }
    })
    .await?;

    let mut objects = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(object) => objects.push(object),
            Err(warning) => warnings.push(warning),
        }
    }
    objects.sort_by(|a, b| a.path.cmp(&b.path));

    log::debug!(
        "Indexed {} entries from {} root(s) with {} warning(s)",
        objects.len(),
        root_paths.len(),
        warnings.len()
    );
    Ok((objects, warnings))
}

async fn stat_entry(
    path: &Path,
    is_dir: bool,
    roots: &HashSet<PathBuf>,
) -> Result<IndexedObject, Warning> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| Warning::from_error(path, &e))?;

    let modified_at = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());
    // Creation time is unavailable on some filesystems; fall back to mtime.
    let created_at = metadata
        .created()
        .map(DateTime::<Utc>::from)
        .unwrap_or(modified_at);

    Ok(IndexedObject {
        path: path.to_path_buf(),
        parent_path: if roots.contains(path) {
            None
        } else {
            path.parent().map(Path::to_path_buf)
        },
        size_bytes: if is_dir { 0 } else { metadata.len() },
        category: FileCategory::categorize(path, is_dir),
        created_at,
        modified_at,
    })
}

fn is_under_any(path: &Path, excluded: &[PathBuf]) -> bool {
    excluded.iter().any(|prefix| path.starts_with(prefix))
}

fn extension_allowed(
    path: &Path,
    included: &HashSet<String>,
    excluded: &HashSet<String>,
) -> bool {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if excluded.contains(&extension) {
        return false;
    }
    included.is_empty() || included.contains(&extension)
}

fn normalize_extensions(extensions: &[String]) -> HashSet<String> {
    extensions
        .iter()
        .map(|ext| ext.trim_start_matches('.').to_lowercase())
        .collect()
}
