//! Near-duplicate video detection.
//!
//! Each video is reduced to a fingerprint: the dihedral hash sets of its
//! sampled frames, with near-static runs pruned. Fingerprints are then
//! compared with an asymmetric containment metric, so an excerpt or re-encode
//! of a longer video still matches it. Extraction runs one video at a time;
//! the decoder gets the thread cap for its internal parallelism instead.

use std::collections::HashSet;
use std::sync::Arc;

use crate::core::group::{clean_up, into_similar_groups, push_duplicate, Adjacency, SimilarGroup};
use crate::core::model::{FileCategory, IndexedObject};
use crate::core::parallel::CancelFlag;
use crate::core::progress::{IndexingStage, ProgressSink};
use crate::core::EngineError;
use crate::media::pdq::{hash_luma_plane, Hash256};
use crate::media::video::{sample_frames, FrameStream, VideoDecoder};

/// A sampled frame this close to the previous kept frame is redundant.
const PRUNE_DISTANCE: u32 = 2;

/// Group videos whose frame fingerprints overlap. A video that fails to open
/// or decode is logged and skipped; the run itself only fails on
/// cancellation.
pub async fn analyze_similar_videos(
    objects: &[IndexedObject],
    min_hash_similarity: f32,
    min_frame_similarity: f32,
    fps: f64,
    max_threads: usize,
    decoder: Arc<dyn VideoDecoder>,
    cancel: &CancelFlag,
    progress: &ProgressSink,
) -> Result<Vec<SimilarGroup>, EngineError> {
    let mut videos: Vec<IndexedObject> = objects
        .iter()
        .filter(|o| o.category == FileCategory::Video)
        .cloned()
        .collect();
    videos.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.path.cmp(&b.path)));

    let mut fingerprints: Vec<(IndexedObject, HashSet<Hash256>)> = Vec::new();
    let total = videos.len();
    for (i, video) in videos.into_iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        progress.send(IndexingStage::ComputingHash {
            progress: (i + 1) as f32 / total as f32,
            item: video.clone(),
        });

        let mut stream = match decoder.open(&video.path, max_threads) {
            Ok(stream) => stream,
            Err(error) => {
                log::warn!("Skipping video {}: {error}", video.path.display());
                continue;
            }
        };
        match fingerprint_stream(stream.as_mut(), fps) {
            Ok(fingerprint) if !fingerprint.is_empty() => {
                fingerprints.push((video, fingerprint));
            }
            Ok(_) => log::warn!("No frames sampled from {}", video.path.display()),
            Err(error) => {
                log::warn!("Skipping video {}: {error}", video.path.display());
            }
        }
    }

    let mut adjacency: Adjacency = Vec::new();
    let total = fingerprints.len();
    for (i, (video, fingerprint)) in fingerprints.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        progress.send(IndexingStage::SimilarVideosComparing {
            progress: (i + 1) as f32 / total as f32,
            item: video.clone(),
        });
        for (candidate, candidate_fingerprint) in
            fingerprints.iter().filter(|(c, _)| c.path != video.path)
        {
            let score =
                frame_sets_similarity(fingerprint, candidate_fingerprint, min_hash_similarity);
            if score >= min_frame_similarity {
                push_duplicate(&mut adjacency, candidate, video.clone());
                break;
            }
        }
    }

    Ok(into_similar_groups(clean_up(adjacency)))
}

/// Sample the stream at `fps` and collect the dihedral hash sets of the kept
/// frames. A frame within [`PRUNE_DISTANCE`] of any variant of the previous
/// kept frame is dropped as near-static.
pub(crate) fn fingerprint_stream(
    stream: &mut dyn FrameStream,
    fps: f64,
) -> Result<HashSet<Hash256>, crate::media::video::VideoError> {
    let mut fingerprint = HashSet::new();
    let mut previous: Option<[Hash256; 8]> = None;

    sample_frames(stream, fps, |frame| {
        let hashes = hash_luma_plane(&frame.luma, frame.width, frame.height);
        if let Some(kept) = &previous {
            let primary = hashes.primary();
            if kept
                .iter()
                .any(|variant| variant.hamming_distance(&primary) <= PRUNE_DISTANCE)
            {
                return;
            }
        }
        fingerprint.extend(hashes.variants().iter().copied());
        previous = Some(*hashes.variants());
    })?;

    Ok(fingerprint)
}

/// Fraction of `test`'s frames with at least one sufficiently similar frame
/// in `base`. Asymmetric: it measures how much of `test` is contained in
/// `base`.
fn frame_sets_similarity(
    base: &HashSet<Hash256>,
    test: &HashSet<Hash256>,
    min_hash_similarity: f32,
) -> f32 {
    if test.is_empty() {
        return 0.0;
    }
    let contained = test
        .iter()
        .filter(|frame| {
            base.iter()
                .any(|other| frame.distance_normalized(other) > min_hash_similarity)
        })
        .count();
    contained as f32 / test.len() as f32
}
