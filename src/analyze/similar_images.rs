//! Near-duplicate image detection.
//!
//! Every image gets a descriptor (8 dihedral perceptual hashes plus an
//! optional luminance histogram) under the concurrency cap, then a greedy
//! single-threaded pass groups images whose combined similarity clears the
//! threshold. First match wins; scan order is ascending creation time, so the
//! grouping is reproducible run to run.

use image::RgbImage;
use std::sync::Arc;

use crate::core::group::{clean_up, into_similar_groups, push_duplicate, Adjacency, SimilarGroup};
use crate::core::model::{FileCategory, IndexedObject, Warning};
use crate::core::parallel::{bounded_parallel_map, CancelFlag};
use crate::core::progress::{IndexingStage, ProgressSink};
use crate::core::EngineError;
use crate::media::image::ImageDecoder;
use crate::media::pdq::{hash_rgb_image, DihedralHashes};

const HISTOGRAM_BINS: usize = 256;
/// High power so color only nudges the score for near-identical
/// distributions, capped well below the hash contribution.
const COLOR_EXPONENT: i32 = 12;
const COLOR_WEIGHT: f32 = 0.3;

struct ImageDescriptor {
    object: IndexedObject,
    hashes: DihedralHashes,
    histogram: Option<Vec<f32>>,
}

/// Group perceptually similar images. `min_similarity` is the combined
/// hash-plus-color threshold in `[0, 1]`; images that fail to decode become
/// warnings and stay out of the comparison.
pub async fn analyze_similar_images(
    objects: &[IndexedObject],
    min_similarity: f32,
    compare_colors: bool,
    max_threads: usize,
    decoder: Arc<dyn ImageDecoder>,
    cancel: &CancelFlag,
    progress: &ProgressSink,
) -> Result<(Vec<SimilarGroup>, Vec<Warning>), EngineError> {
    let mut images: Vec<IndexedObject> = objects
        .iter()
        .filter(|o| o.category == FileCategory::Image)
        .cloned()
        .collect();
    images.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.path.cmp(&b.path)));

    let sink = progress.clone();
    let results = bounded_parallel_map(images, max_threads, cancel, move |object, p| {
        let decoder = Arc::clone(&decoder);
        let sink = sink.clone();
        async move {
            let pixels = decoder
                .decode(&object.path)
                .map_err(|e| Warning::from_error(&object.path, &*e))?;
            let hashes = hash_rgb_image(&pixels);
            let histogram = compare_colors.then(|| luminance_histogram(&pixels));
            sink.send(IndexingStage::ComputingHash {
                progress: p,
                item: object.clone(),
            });
            Ok(ImageDescriptor {
                object,
                hashes,
                histogram,
            })
        }
    })
    .await?;

    let mut warnings = Vec::new();
    let mut descriptors = Vec::new();
    for result in results {
        match result {
            Ok(descriptor) => descriptors.push(descriptor),
            Err(warning) => warnings.push(warning),
        }
    }
    // The map returns in completion order; restore the scan order the greedy
    // match depends on.
    descriptors.sort_by(|a, b| {
        a.object
            .created_at
            .cmp(&b.object.created_at)
            .then_with(|| a.object.path.cmp(&b.object.path))
    });

    let mut adjacency: Adjacency = Vec::new();
    let total = descriptors.len();
    for (i, base) in descriptors.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        progress.send(IndexingStage::SimilarImagesComparing {
            progress: (i + 1) as f32 / total as f32,
            item: base.object.clone(),
        });
        // First candidate above the threshold wins, not the best one.
        for candidate in descriptors.iter().filter(|c| c.object.path != base.object.path) {
            if similarity(base, candidate) >= min_similarity {
                push_duplicate(&mut adjacency, &candidate.object, base.object.clone());
                break;
            }
        }
    }

    let groups = into_similar_groups(clean_up(adjacency));
    Ok((groups, warnings))
}

fn similarity(a: &ImageDescriptor, b: &ImageDescriptor) -> f32 {
    let hash = hash_similarity(&a.hashes, &b.hashes);
    let color = match (&a.histogram, &b.histogram) {
        (Some(first), Some(second)) => {
            let correlation = normalized_cross_correlation(first, second);
            correlation.powi(COLOR_EXPONENT) * COLOR_WEIGHT
        }
        _ => 0.0,
    };
    (hash + color).min(1.0)
}

/// Best normalized similarity across all 8x8 dihedral combinations.
fn hash_similarity(a: &DihedralHashes, b: &DihedralHashes) -> f32 {
    let mut best = 0.0f32;
    for first in a.variants() {
        for second in b.variants() {
            let score = first.distance_normalized(second);
            if score >= 1.0 {
                return 1.0;
            }
            if score > best {
                best = score;
            }
        }
    }
    best
}

/// 256-bin histogram of Rec.709 luminance, scaled so the max bin is 255.
fn luminance_histogram(image: &RgbImage) -> Vec<f32> {
    let mut bins = vec![0.0f32; HISTOGRAM_BINS];
    for pixel in image.pixels() {
        let luminance =
            0.2126 * pixel.0[0] as f32 + 0.7152 * pixel.0[1] as f32 + 0.0722 * pixel.0[2] as f32;
        bins[(luminance as usize).min(HISTOGRAM_BINS - 1)] += 1.0;
    }
    let max = bins.iter().cloned().fold(0.0f32, f32::max);
    if max > 0.0 {
        for bin in &mut bins {
            *bin = *bin / max * 255.0;
        }
    }
    bins
}

/// Pearson cross-correlation mapped from [-1, 1] to [0, 1].
fn normalized_cross_correlation(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len() as f32;
    let mean_a = a.iter().sum::<f32>() / n;
    let mean_b = b.iter().sum::<f32>() / n;

    let mut covariance = 0.0f32;
    let mut variance_a = 0.0f32;
    let mut variance_b = 0.0f32;
    for (&x, &y) in a.iter().zip(b.iter()) {
        covariance += (x - mean_a) * (y - mean_b);
        variance_a += (x - mean_a).powi(2);
        variance_b += (y - mean_b).powi(2);
    }

    let denominator = (variance_a * variance_b).sqrt();
    if denominator == 0.0 {
        return 0.0;
    }
    (covariance / denominator + 1.0) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testutil::fake_categorized;
    use crate::media::image::StdImageDecoder;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn gradient_image() -> RgbImage {
        RgbImage::from_fn(64, 64, |x, y| {
            let v = ((x * 3 + y * 7) % 251) as u8;
            image::Rgb([v, v / 2, v / 3])
        })
    }

    fn checkerboard_image() -> RgbImage {
        RgbImage::from_fn(64, 64, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 {
                image::Rgb([255, 255, 255])
            } else {
                image::Rgb([0, 0, 0])
            }
        })
    }

    fn image_object(path: &Path, created_minute: u32) -> IndexedObject {
        fake_categorized(path.to_str().unwrap(), 100, created_minute, FileCategory::Image)
    }

    async fn analyze(
        objects: &[IndexedObject],
        min_similarity: f32,
        compare_colors: bool,
    ) -> (Vec<SimilarGroup>, Vec<Warning>) {
        analyze_similar_images(
            objects,
            min_similarity,
            compare_colors,
            4,
            Arc::new(StdImageDecoder),
            &CancelFlag::new(),
            &ProgressSink::disabled(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn identical_images_group_and_outlier_stays_out() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.png");
        let b = temp_dir.path().join("b.png");
        let c = temp_dir.path().join("c.png");
        gradient_image().save(&a).unwrap();
        gradient_image().save(&b).unwrap();
        checkerboard_image().save(&c).unwrap();

        let objects = vec![image_object(&a, 0), image_object(&b, 1), image_object(&c, 2)];
        let (groups, warnings) = analyze(&objects, 0.95, false).await;

        assert!(warnings.is_empty());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].duplicates.len(), 2);
        let paths: Vec<&PathBuf> = groups[0].duplicates.iter().map(|m| &m.path).collect();
        assert!(paths.contains(&&a));
        assert!(paths.contains(&&b));
        assert_eq!(groups[0].total_size_bytes, 200);
    }

    #[tokio::test]
    async fn rotated_copy_matches_through_dihedral_variants() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.png");
        let b = temp_dir.path().join("b.png");
        let base = gradient_image();
        base.save(&a).unwrap();
        image::imageops::rotate90(&base).save(&b).unwrap();

        let objects = vec![image_object(&a, 0), image_object(&b, 1)];
        let (groups, _) = analyze(&objects, 0.95, false).await;

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].duplicates.len(), 2);
    }

    #[tokio::test]
    async fn color_comparison_keeps_identical_images_together() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.png");
        let b = temp_dir.path().join("b.png");
        gradient_image().save(&a).unwrap();
        gradient_image().save(&b).unwrap();

        let objects = vec![image_object(&a, 0), image_object(&b, 1)];
        let (groups, _) = analyze(&objects, 0.95, true).await;

        assert_eq!(groups.len(), 1);
    }

    #[tokio::test]
    async fn undecodable_image_becomes_a_warning() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.png");
        let b = temp_dir.path().join("b.png");
        let broken = temp_dir.path().join("broken.png");
        gradient_image().save(&a).unwrap();
        gradient_image().save(&b).unwrap();
        std::fs::write(&broken, b"not a png").unwrap();

        let objects = vec![
            image_object(&a, 0),
            image_object(&b, 1),
            image_object(&broken, 2),
        ];
        let (groups, warnings) = analyze(&objects, 0.95, false).await;

        assert_eq!(groups.len(), 1);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].path, broken);
    }

    #[tokio::test]
    async fn non_image_entries_are_ignored() {
        let objects = vec![
            fake_categorized("/a/movie.mp4", 10, 0, FileCategory::Video),
            fake_categorized("/a/doc.txt", 10, 1, FileCategory::Document),
        ];
        let (groups, warnings) = analyze(&objects, 0.9, false).await;
        assert!(groups.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn histogram_is_normalized_to_peak_255() {
        let histogram = luminance_histogram(&checkerboard_image());
        let max = histogram.iter().cloned().fold(0.0f32, f32::max);
        assert_eq!(max, 255.0);
    }

    #[test]
    fn cross_correlation_bounds() {
        let a: Vec<f32> = (0..256).map(|i| i as f32).collect();
        let reversed: Vec<f32> = a.iter().rev().cloned().collect();
        assert!((normalized_cross_correlation(&a, &a) - 1.0).abs() < 1e-5);
        assert!(normalized_cross_correlation(&a, &reversed) < 1e-5);
        // Zero variance yields no correlation signal.
        let flat = vec![1.0f32; 256];
        assert_eq!(normalized_cross_correlation(&a, &flat), 0.0);
    }
}
