//! Empty file and empty folder detection.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::analyze::Target;
use crate::core::model::{FileCategory, IndexedObject};
use crate::core::progress::{IndexingStage, ProgressSink};

/// Report empty entries. Files are empty when their size is zero. A folder is
/// empty when no indexed entry names it as a parent, which includes folders
/// whose children were all filtered out by indexing rules.
pub fn analyze_empty(
    objects: &[IndexedObject],
    target: Target,
    progress: &ProgressSink,
) -> Vec<IndexedObject> {
    match target {
        Target::Files => empty_files(objects, progress),
        Target::Folders => empty_folders(objects, progress),
    }
}

fn empty_files(objects: &[IndexedObject], progress: &ProgressSink) -> Vec<IndexedObject> {
    let files: Vec<&IndexedObject> = objects
        .iter()
        .filter(|o| o.category != FileCategory::Folder)
        .collect();
    let total = files.len();
    files
        .into_iter()
        .enumerate()
        .inspect(|(i, object)| {
            progress.send(IndexingStage::EmptyFilesAnalyzing {
                progress: (i + 1) as f32 / total as f32,
                item: (*object).clone(),
            });
        })
        .filter(|(_, object)| object.size_bytes == 0)
        .map(|(_, object)| object.clone())
        .collect()
}

fn empty_folders(objects: &[IndexedObject], progress: &ProgressSink) -> Vec<IndexedObject> {
    let parents: HashSet<&PathBuf> =
        objects.iter().filter_map(|o| o.parent_path.as_ref()).collect();

    let folders: Vec<&IndexedObject> = objects
        .iter()
        .filter(|o| o.category == FileCategory::Folder)
        .collect();
    let total = folders.len();
    folders
        .into_iter()
        .enumerate()
        .inspect(|(i, object)| {
            progress.send(IndexingStage::EmptyFoldersAnalyzing {
                progress: (i + 1) as f32 / total as f32,
                item: (*object).clone(),
            });
        })
        .filter(|(_, object)| !parents.contains(&object.path))
        .map(|(_, object)| object.clone())
        .collect()
}
