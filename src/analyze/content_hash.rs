//! Exact duplicate detection by content hash.
//!
//! Two-phase to avoid reading full content of files that cannot possibly
//! match: candidates are pre-grouped by size, a cheap hash over the leading
//! bytes splits them further, and only survivors get a full-content hash.

use std::collections::HashMap;
use std::hash::Hasher;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use twox_hash::XxHash64;

use crate::core::group::{sort_duplicates, DuplicateHash};
use crate::core::model::{FileCategory, IndexedObject, Warning};
use crate::core::parallel::{bounded_parallel_map, CancelFlag};
use crate::core::progress::{IndexingStage, ProgressSink};
use crate::core::EngineError;

/// Leading byte window hashed in phase 1.
pub const DEFAULT_SAMPLE_SIZE: u64 = 8192;

const MAX_BUFFER_SIZE: usize = 8192;

/// Group files with identical content. `sample_size` bounds the phase-1 read
/// window. Returns the groups plus warnings for files that could not be read.
pub async fn analyze_duplicate_hashes(
    objects: &[IndexedObject],
    sample_size: u64,
    max_threads: usize,
    cancel: &CancelFlag,
    progress: &ProgressSink,
) -> Result<(Vec<DuplicateHash>, Vec<Warning>), EngineError> {
    let mut warnings = Vec::new();

    // Files that match must have equal size; size-0 files are reported by the
    // empty analyzer instead.
    let mut by_size: HashMap<u64, Vec<IndexedObject>> = HashMap::new();
    for object in objects {
        if object.category != FileCategory::Folder && object.size_bytes > 0 {
            by_size.entry(object.size_bytes).or_default().push(object.clone());
        }
    }
    let candidates: Vec<IndexedObject> = by_size
        .into_values()
        .filter(|group| group.len() > 1)
        .flatten()
        .collect();

    // Phase 1: partial hash over the leading window.
    let empty = empty_hash();
    let sink = progress.clone();
    let results = bounded_parallel_map(candidates, max_threads, cancel, move |object, p| {
        let sink = sink.clone();
        async move {
            let hash = hash_file(&object.path, sample_size)
                .await
                .map_err(|e| Warning::from_error(&object.path, &e))?;
            sink.send(IndexingStage::DuplicateHashesAnalyzing {
                progress: p,
                item: object.clone(),
            });
            Ok((hash, object))
        }
    })
    .await?;

    let mut by_partial: HashMap<u64, Vec<IndexedObject>> = HashMap::new();
    for result in results {
        match result {
            // A hash of zero read bytes carries no information; skip it.
            Ok((hash, _)) if hash == empty => {}
            Ok((hash, object)) => by_partial.entry(hash).or_default().push(object),
            Err(warning) => warnings.push(warning),
        }
    }

    // Phase 2: full-content hash of the survivors.
    let survivors: Vec<IndexedObject> = by_partial
        .into_values()
        .filter(|group| group.len() > 1)
        .flatten()
        .collect();

    let sink = progress.clone();
    let results = bounded_parallel_map(survivors, max_threads, cancel, move |object, p| {
        let sink = sink.clone();
        async move {
            let hash = hash_file(&object.path, u64::MAX)
                .await
                .map_err(|e| Warning::from_error(&object.path, &e))?;
            sink.send(IndexingStage::DuplicateHashesComputingFullHash {
                progress: p,
                item: object.clone(),
            });
            Ok((hash, object))
        }
    })
    .await?;

    let mut by_full: HashMap<u64, Vec<IndexedObject>> = HashMap::new();
    for result in results {
        match result {
            Ok((hash, object)) => by_full.entry(hash).or_default().push(object),
            Err(warning) => warnings.push(warning),
        }
    }

    let mut groups: Vec<DuplicateHash> = by_full
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(hash, mut members)| {
            sort_duplicates(&mut members);
            let total_size_bytes = members.iter().map(|m| m.size_bytes).sum();
            DuplicateHash {
                duplicates: members,
                total_size_bytes,
                hash,
            }
        })
        .collect();
    groups.sort_by(|a, b| {
        b.duplicates
            .len()
            .cmp(&a.duplicates.len())
            .then_with(|| a.hash.cmp(&b.hash))
    });

    Ok((groups, warnings))
}

/// XxHash64 of the first `limit` bytes, streamed in fixed-size chunks.
/// `u64::MAX` hashes the whole file.
async fn hash_file(path: &Path, limit: u64) -> std::io::Result<u64> {
    let mut file = File::open(path).await?;
    let mut hasher = XxHash64::with_seed(0);
    let mut buffer = vec![0u8; MAX_BUFFER_SIZE];
    let mut remaining = limit;
    while remaining > 0 {
        let want = buffer.len().min(remaining.min(usize::MAX as u64) as usize);
        let read = file.read(&mut buffer[..want]).await?;
        if read == 0 {
            break;
        }
        hasher.write(&buffer[..read]);
        remaining -= read as u64;
    }
    Ok(hasher.finish())
}

fn empty_hash() -> u64 {
    XxHash64::with_seed(0).finish()
}
