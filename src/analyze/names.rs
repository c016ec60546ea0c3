//! Duplicate name detection for files or folders.

use std::collections::HashMap;

use crate::analyze::Target;
use crate::core::group::{sort_duplicates, DuplicateName};
use crate::core::model::{FileCategory, IndexedObject};
use crate::core::progress::{IndexingStage, ProgressSink};

/// Group entries sharing a lower-cased name. Pure index pass, no I/O.
pub fn analyze_duplicate_names(
    objects: &[IndexedObject],
    target: Target,
    progress: &ProgressSink,
) -> Vec<DuplicateName> {
    let filtered: Vec<&IndexedObject> = objects
        .iter()
        .filter(|object| match target {
            Target::Files => object.category != FileCategory::Folder,
            Target::Folders => object.category == FileCategory::Folder,
        })
        .collect();

    let mut by_name: HashMap<String, Vec<IndexedObject>> = HashMap::new();
    let total = filtered.len();
    for (i, object) in filtered.into_iter().enumerate() {
        progress.send(IndexingStage::DuplicateNamesAnalyzing {
            progress: (i + 1) as f32 / total as f32,
            item: object.clone(),
        });
        by_name
            .entry(object.file_name_lowercase())
            .or_default()
            .push(object.clone());
    }

    let mut groups: Vec<DuplicateName> = by_name
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(name, mut members)| {
            sort_duplicates(&mut members);
            let total_size_bytes = members.iter().map(|m| m.size_bytes).sum();
            DuplicateName {
                duplicates: members,
                total_size_bytes,
                name,
            }
        })
        .collect();
    groups.sort_by(|a, b| {
        b.duplicates
            .len()
            .cmp(&a.duplicates.len())
            .then_with(|| a.name.cmp(&b.name))
    });
    groups
}
