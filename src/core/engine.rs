//! Run configuration and the orchestrating engine.
//!
//! The [`Engine`] owns the authoritative index, the flat warning list and
//! every computed group list. Phases run strictly sequentially; analyzer
//! workers return results and the engine aggregates, so nothing here is
//! mutated concurrently.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::analyze::content_hash::{analyze_duplicate_hashes, DEFAULT_SAMPLE_SIZE};
use crate::analyze::empty::analyze_empty;
use crate::analyze::names::analyze_duplicate_names;
use crate::analyze::similar_images::analyze_similar_images;
use crate::analyze::similar_videos::analyze_similar_videos;
use crate::analyze::Target;
use crate::core::group::{remove_by_paths, retain_by_paths, DuplicateHash, DuplicateName, SimilarGroup};
use crate::core::indexer::index;
use crate::core::model::{IndexedObject, Warning};
use crate::core::parallel::CancelFlag;
use crate::core::progress::ProgressSink;
use crate::core::EngineError;
use crate::media::image::{ImageDecoder, StdImageDecoder};
use crate::media::video::VideoDecoder;

/// Everything one scan needs: paths, filters, thresholds and per-analyzer
/// toggles. Serializable so callers can persist named presets as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Preset {
    pub root_paths: Vec<PathBuf>,
    pub excluded_paths: Vec<PathBuf>,
    /// Allow-list; empty means every extension is admitted.
    pub included_extensions: Vec<String>,
    pub excluded_extensions: Vec<String>,
    pub max_threads: usize,
    pub sample_size_bytes: u64,
    pub find_duplicate_hashes: bool,
    pub find_duplicate_names: bool,
    pub find_empty: bool,
    pub find_similar_images: bool,
    pub find_similar_videos: bool,
    pub min_image_similarity: f32,
    pub compare_image_colors: bool,
    pub min_video_hash_similarity: f32,
    pub min_video_frame_similarity: f32,
    pub video_samples_per_second: f64,
}

impl Default for Preset {
    fn default() -> Self {
        Self {
            root_paths: Vec::new(),
            excluded_paths: Vec::new(),
            included_extensions: Vec::new(),
            excluded_extensions: Vec::new(),
            max_threads: num_cpus::get(),
            sample_size_bytes: DEFAULT_SAMPLE_SIZE,
            find_duplicate_hashes: true,
            find_duplicate_names: true,
            find_empty: true,
            find_similar_images: true,
            find_similar_videos: true,
            min_image_similarity: 0.9,
            compare_image_colors: true,
            min_video_hash_similarity: 0.9,
            min_video_frame_similarity: 0.5,
            video_samples_per_second: 1.0,
        }
    }
}

impl Preset {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Orchestrates a full scan and holds its results.
#[derive(Default)]
pub struct Engine {
    image_decoder: Option<Arc<dyn ImageDecoder>>,
    video_decoder: Option<Arc<dyn VideoDecoder>>,
    cancel: CancelFlag,

    index: Vec<IndexedObject>,
    warnings: Vec<Warning>,
    duplicate_hashes: Vec<DuplicateHash>,
    duplicate_file_names: Vec<DuplicateName>,
    duplicate_folder_names: Vec<DuplicateName>,
    empty_files: Vec<IndexedObject>,
    empty_folders: Vec<IndexedObject>,
    similar_images: Vec<SimilarGroup>,
    similar_videos: Vec<SimilarGroup>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image_decoder(mut self, decoder: Arc<dyn ImageDecoder>) -> Self {
        self.image_decoder = Some(decoder);
        self
    }

    /// Video decoding has no default backend; without one the similar-videos
    /// phase is skipped.
    pub fn with_video_decoder(mut self, decoder: Arc<dyn VideoDecoder>) -> Self {
        self.video_decoder = Some(decoder);
        self
    }

    /// Handle for cancelling an in-flight [`run`](Self::run) from another
    /// task.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Index the configured roots and run every enabled analyzer in
    /// sequence. Previous results are replaced wholesale; warnings accumulate
    /// across all phases of this run.
    pub async fn run(&mut self, preset: &Preset, progress: &ProgressSink) -> Result<(), EngineError> {
        self.cancel.reset();
        self.clear();

        let (objects, warnings) = index(
            &preset.root_paths,
            &preset.excluded_paths,
            &preset.included_extensions,
            &preset.excluded_extensions,
            preset.max_threads,
            &self.cancel,
            progress,
        )
        .await?;
        self.index = objects;
        self.warnings = warnings;

        if preset.find_duplicate_hashes {
            let (groups, warnings) = analyze_duplicate_hashes(
                &self.index,
                preset.sample_size_bytes,
                preset.max_threads,
                &self.cancel,
                progress,
            )
            .await?;
            self.duplicate_hashes = groups;
            self.warnings.extend(warnings);
        }

        if preset.find_duplicate_names {
            self.duplicate_file_names =
                analyze_duplicate_names(&self.index, Target::Files, progress);
            self.duplicate_folder_names =
                analyze_duplicate_names(&self.index, Target::Folders, progress);
        }

        if preset.find_empty {
            self.empty_files = analyze_empty(&self.index, Target::Files, progress);
            self.empty_folders = analyze_empty(&self.index, Target::Folders, progress);
        }

        if preset.find_similar_images {
            let decoder = self
                .image_decoder
                .clone()
                .unwrap_or_else(|| Arc::new(StdImageDecoder));
            let (groups, warnings) = analyze_similar_images(
                &self.index,
                preset.min_image_similarity,
                preset.compare_image_colors,
                preset.max_threads,
                decoder,
                &self.cancel,
                progress,
            )
            .await?;
            self.similar_images = groups;
            self.warnings.extend(warnings);
        }

        if preset.find_similar_videos {
            match self.video_decoder.clone() {
                Some(decoder) => {
                    self.similar_videos = analyze_similar_videos(
                        &self.index,
                        preset.min_video_hash_similarity,
                        preset.min_video_frame_similarity,
                        preset.video_samples_per_second,
                        preset.max_threads,
                        decoder,
                        &self.cancel,
                        progress,
                    )
                    .await?;
                }
                None => log::warn!("No video decoder configured, skipping similar videos"),
            }
        }

        Ok(())
    }

    pub fn index(&self) -> &[IndexedObject] {
        &self.index
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn duplicate_hashes(&self) -> &[DuplicateHash] {
        &self.duplicate_hashes
    }

    pub fn duplicate_names(&self, target: Target) -> &[DuplicateName] {
        match target {
            Target::Files => &self.duplicate_file_names,
            Target::Folders => &self.duplicate_folder_names,
        }
    }

    pub fn empty(&self, target: Target) -> &[IndexedObject] {
        match target {
            Target::Files => &self.empty_files,
            Target::Folders => &self.empty_folders,
        }
    }

    pub fn similar_images(&self) -> &[SimilarGroup] {
        &self.similar_images
    }

    pub fn similar_videos(&self) -> &[SimilarGroup] {
        &self.similar_videos
    }

    /// Drop index entries at or under any of `paths` (the caller deleted or
    /// trashed them) and revalidate every group list against what is left.
    pub fn remove_paths(&mut self, paths: &HashSet<PathBuf>) {
        self.index
            .retain(|object| !paths.iter().any(|prefix| object.path.starts_with(prefix)));
        self.duplicate_hashes = remove_by_paths(std::mem::take(&mut self.duplicate_hashes), paths);
        self.duplicate_file_names =
            remove_by_paths(std::mem::take(&mut self.duplicate_file_names), paths);
        self.duplicate_folder_names =
            remove_by_paths(std::mem::take(&mut self.duplicate_folder_names), paths);
        self.similar_images = remove_by_paths(std::mem::take(&mut self.similar_images), paths);
        self.similar_videos = remove_by_paths(std::mem::take(&mut self.similar_videos), paths);
        self.sync_groups();
    }

    /// Re-filter every result list to members still present in the index.
    pub fn sync_groups(&mut self) {
        let alive: HashSet<PathBuf> = self.index.iter().map(|o| o.path.clone()).collect();
        self.duplicate_hashes = retain_by_paths(std::mem::take(&mut self.duplicate_hashes), &alive);
        self.duplicate_file_names =
            retain_by_paths(std::mem::take(&mut self.duplicate_file_names), &alive);
        self.duplicate_folder_names =
            retain_by_paths(std::mem::take(&mut self.duplicate_folder_names), &alive);
        self.similar_images = retain_by_paths(std::mem::take(&mut self.similar_images), &alive);
        self.similar_videos = retain_by_paths(std::mem::take(&mut self.similar_videos), &alive);
        self.empty_files.retain(|o| alive.contains(&o.path));
        self.empty_folders.retain(|o| alive.contains(&o.path));
    }

    pub fn discard_warning(&mut self, position: usize) -> bool {
        discard(&mut self.warnings, position)
    }

    pub fn discard_duplicate_hash(&mut self, position: usize) -> bool {
        discard(&mut self.duplicate_hashes, position)
    }

    pub fn discard_duplicate_name(&mut self, target: Target, position: usize) -> bool {
        match target {
            Target::Files => discard(&mut self.duplicate_file_names, position),
            Target::Folders => discard(&mut self.duplicate_folder_names, position),
        }
    }

    pub fn discard_empty(&mut self, target: Target, position: usize) -> bool {
        match target {
            Target::Files => discard(&mut self.empty_files, position),
            Target::Folders => discard(&mut self.empty_folders, position),
        }
    }

    pub fn discard_similar_image_group(&mut self, position: usize) -> bool {
        discard(&mut self.similar_images, position)
    }

    pub fn discard_similar_video_group(&mut self, position: usize) -> bool {
        discard(&mut self.similar_videos, position)
    }

    fn clear(&mut self) {
        self.index.clear();
        self.warnings.clear();
        self.duplicate_hashes.clear();
        self.duplicate_file_names.clear();
        self.duplicate_folder_names.clear();
        self.empty_files.clear();
        self.empty_folders.clear();
        self.similar_images.clear();
        self.similar_videos.clear();
    }
}

fn discard<T>(items: &mut Vec<T>, position: usize) -> bool {
    if position < items.len() {
        items.remove(position);
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn scan_preset(root: &Path) -> Preset {
        Preset {
            root_paths: vec![root.to_path_buf()],
            max_threads: 4,
            // No media in these fixtures.
            find_similar_images: false,
            find_similar_videos: false,
            ..Preset::default()
        }
    }

    fn fixture_tree() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("one.txt"), b"same content").unwrap();
        fs::write(root.join("two.txt"), b"same content").unwrap();
        fs::write(root.join("other.txt"), b"different....").unwrap();
        fs::write(root.join("empty.txt"), b"").unwrap();
        fs::create_dir(root.join("hollow")).unwrap();
        fs::create_dir(root.join("full")).unwrap();
        fs::write(root.join("full/one.txt"), b"x").unwrap();
        temp_dir
    }

    #[tokio::test]
    async fn full_run_populates_every_enabled_result_list() {
        let temp_dir = fixture_tree();
        let root = temp_dir.path();
        let mut engine = Engine::new();

        engine
            .run(&scan_preset(root), &ProgressSink::disabled())
            .await
            .unwrap();

        assert_eq!(engine.duplicate_hashes().len(), 1);
        assert_eq!(engine.duplicate_hashes()[0].duplicates.len(), 2);

        // one.txt exists at the root and inside full/.
        assert_eq!(engine.duplicate_names(Target::Files).len(), 1);
        assert_eq!(engine.duplicate_names(Target::Files)[0].name, "one.txt");
        assert!(engine.duplicate_names(Target::Folders).is_empty());

        let empty_files: Vec<&PathBuf> =
            engine.empty(Target::Files).iter().map(|o| &o.path).collect();
        assert_eq!(empty_files, vec![&root.join("empty.txt")]);
        let empty_folders: Vec<&PathBuf> =
            engine.empty(Target::Folders).iter().map(|o| &o.path).collect();
        assert_eq!(empty_folders, vec![&root.join("hollow")]);

        assert!(engine.warnings().is_empty());
    }

    #[tokio::test]
    async fn disabled_analyzers_leave_their_lists_empty() {
        let temp_dir = fixture_tree();
        let preset = Preset {
            find_duplicate_hashes: false,
            find_duplicate_names: false,
            find_empty: false,
            ..scan_preset(temp_dir.path())
        };
        let mut engine = Engine::new();

        engine.run(&preset, &ProgressSink::disabled()).await.unwrap();

        assert!(!engine.index().is_empty());
        assert!(engine.duplicate_hashes().is_empty());
        assert!(engine.duplicate_names(Target::Files).is_empty());
        assert!(engine.empty(Target::Files).is_empty());
    }

    #[tokio::test]
    async fn remove_paths_shrinks_index_and_groups() {
        let temp_dir = fixture_tree();
        let root = temp_dir.path();
        let mut engine = Engine::new();
        engine
            .run(&scan_preset(root), &ProgressSink::disabled())
            .await
            .unwrap();
        assert_eq!(engine.duplicate_hashes().len(), 1);

        engine.remove_paths(&HashSet::from([root.join("two.txt")]));

        assert!(engine.index().iter().all(|o| o.path != root.join("two.txt")));
        // The surviving half of the pair is no longer a duplicate.
        assert!(engine.duplicate_hashes().is_empty());
    }

    #[tokio::test]
    async fn remove_paths_by_directory_prefix() {
        let temp_dir = fixture_tree();
        let root = temp_dir.path();
        let mut engine = Engine::new();
        engine
            .run(&scan_preset(root), &ProgressSink::disabled())
            .await
            .unwrap();

        engine.remove_paths(&HashSet::from([root.join("full")]));

        assert!(engine
            .index()
            .iter()
            .all(|o| !o.path.starts_with(root.join("full"))));
        assert!(engine.duplicate_names(Target::Files).is_empty());
    }

    #[tokio::test]
    async fn rerun_replaces_previous_results() {
        let temp_dir = fixture_tree();
        let root = temp_dir.path();
        let mut engine = Engine::new();
        engine
            .run(&scan_preset(root), &ProgressSink::disabled())
            .await
            .unwrap();

        fs::remove_file(root.join("two.txt")).unwrap();
        engine
            .run(&scan_preset(root), &ProgressSink::disabled())
            .await
            .unwrap();

        assert!(engine.duplicate_hashes().is_empty());
        assert!(engine.index().iter().all(|o| o.path != root.join("two.txt")));
    }

    #[tokio::test]
    async fn run_resets_a_previously_cancelled_flag() {
        let temp_dir = fixture_tree();
        let mut engine = Engine::new();
        let preset = scan_preset(temp_dir.path());

        engine.cancel_flag().cancel();
        // A fresh run resets the flag first, so this run completes.
        engine.run(&preset, &ProgressSink::disabled()).await.unwrap();
        assert!(!engine.index().is_empty());
    }

    #[tokio::test]
    async fn discards_are_positional_and_bounded() {
        let temp_dir = fixture_tree();
        let mut engine = Engine::new();
        engine
            .run(&scan_preset(temp_dir.path()), &ProgressSink::disabled())
            .await
            .unwrap();

        assert!(engine.discard_duplicate_hash(0));
        assert!(engine.duplicate_hashes().is_empty());
        assert!(!engine.discard_duplicate_hash(0));
        assert!(engine.discard_empty(Target::Folders, 0));
        assert!(!engine.discard_warning(5));
    }

    #[test]
    fn preset_round_trips_through_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("preset.json");
        let preset = Preset {
            root_paths: vec![PathBuf::from("/data")],
            excluded_extensions: vec!["tmp".into()],
            min_image_similarity: 0.8,
            ..Preset::default()
        };

        preset.save(&path).unwrap();
        let loaded = Preset::load(&path).unwrap();

        assert_eq!(loaded.root_paths, preset.root_paths);
        assert_eq!(loaded.excluded_extensions, preset.excluded_extensions);
        assert_eq!(loaded.min_image_similarity, preset.min_image_similarity);
    }

    #[test]
    fn missing_preset_fields_fall_back_to_defaults() {
        let parsed: Preset = serde_json::from_str(r#"{"root_paths":["/data"]}"#).unwrap();
        assert_eq!(parsed.root_paths, vec![PathBuf::from("/data")]);
        assert!(parsed.find_duplicate_hashes);
        assert!(parsed.max_threads >= 1);
    }
}
