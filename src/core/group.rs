use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::core::model::IndexedObject;

/// Common shape of every emitted problem group. Invariant: at least two
/// members and `total_size_bytes` equal to the sum of member sizes.
pub trait IndexedObjectsGroup: Sized {
    fn duplicates(&self) -> &[IndexedObject];
    fn total_size_bytes(&self) -> u64;
    fn with_duplicates(self, duplicates: Vec<IndexedObject>, total_size_bytes: u64) -> Self;
}

/// Files with identical content, keyed by full-content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateHash {
    pub duplicates: Vec<IndexedObject>,
    pub total_size_bytes: u64,
    pub hash: u64,
}

/// Entries sharing a lower-cased file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateName {
    pub duplicates: Vec<IndexedObject>,
    pub total_size_bytes: u64,
    pub name: String,
}

/// Perceptually similar images or videos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarGroup {
    pub duplicates: Vec<IndexedObject>,
    pub total_size_bytes: u64,
}

macro_rules! impl_group {
    ($ty:ty) => {
        impl IndexedObjectsGroup for $ty {
            fn duplicates(&self) -> &[IndexedObject] {
                &self.duplicates
            }

            fn total_size_bytes(&self) -> u64 {
                self.total_size_bytes
            }

            fn with_duplicates(
                mut self,
                duplicates: Vec<IndexedObject>,
                total_size_bytes: u64,
            ) -> Self {
                self.duplicates = duplicates;
                self.total_size_bytes = total_size_bytes;
                self
            }
        }
    };
}

impl_group!(DuplicateHash);
impl_group!(DuplicateName);
impl_group!(SimilarGroup);

/// Sort members the way every group stores them: ascending creation time,
/// path as the deterministic tie-break.
pub(crate) fn sort_duplicates(duplicates: &mut [IndexedObject]) {
    duplicates.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.path.cmp(&b.path)));
}

/// Keep only group members whose path is in `paths`. Groups shrinking below
/// two members are dropped; the group list is re-sorted descending by member
/// count.
pub fn retain_by_paths<G: IndexedObjectsGroup>(groups: Vec<G>, paths: &HashSet<PathBuf>) -> Vec<G> {
    filter_groups(groups, |member| paths.contains(&member.path))
}

/// Drop group members whose path is in `paths` or sits under one of them
/// (directory-style removal by prefix). Groups shrinking below two members
/// are dropped; the group list is re-sorted descending by member count.
pub fn remove_by_paths<G: IndexedObjectsGroup>(groups: Vec<G>, paths: &HashSet<PathBuf>) -> Vec<G> {
    filter_groups(groups, |member| !is_under_any(&member.path, paths))
}

fn is_under_any(path: &Path, removed: &HashSet<PathBuf>) -> bool {
    removed.iter().any(|prefix| path.starts_with(prefix))
}

fn filter_groups<G, P>(groups: Vec<G>, keep: P) -> Vec<G>
where
    G: IndexedObjectsGroup,
    P: Fn(&IndexedObject) -> bool,
{
    let mut filtered: Vec<G> = groups
        .into_iter()
        .map(|group| {
            let mut duplicates: Vec<IndexedObject> =
                group.duplicates().iter().filter(|m| keep(m)).cloned().collect();
            sort_duplicates(&mut duplicates);
            let total = duplicates.iter().map(|m| m.size_bytes).sum();
            group.with_duplicates(duplicates, total)
        })
        .filter(|group| group.duplicates().len() > 1)
        .collect();
    filtered.sort_by(|a, b| b.duplicates().len().cmp(&a.duplicates().len()));
    filtered
}

/// Representative-to-duplicates adjacency built by the greedy similarity
/// matchers. Insertion order is preserved so cleanup stays deterministic.
pub(crate) type Adjacency = Vec<(IndexedObject, Vec<IndexedObject>)>;

pub(crate) fn push_duplicate(
    adjacency: &mut Adjacency,
    representative: &IndexedObject,
    duplicate: IndexedObject,
) {
    match adjacency.iter_mut().find(|(r, _)| r.path == representative.path) {
        Some((_, duplicates)) => duplicates.push(duplicate),
        None => adjacency.push((representative.clone(), vec![duplicate])),
    }
}

/// Remove the redundant reverse edges the greedy match leaves behind when two
/// items pick each other, then drop representatives with no duplicates left.
///
/// Sorted descending by duplicate count first, so the bigger group of a
/// symmetric pair wins. Only existing adjacency entries are inspected.
pub(crate) fn clean_up(mut adjacency: Adjacency) -> Adjacency {
    adjacency.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

    for i in 0..adjacency.len() {
        if adjacency[i].1.is_empty() {
            continue;
        }
        let base = adjacency[i].0.path.clone();
        let duplicate_paths: Vec<PathBuf> =
            adjacency[i].1.iter().map(|d| d.path.clone()).collect();

        for duplicate_path in duplicate_paths {
            let Some(reversed) = adjacency
                .iter_mut()
                .find(|(r, _)| r.path == duplicate_path)
                .map(|(_, d)| d)
            else {
                continue;
            };
            if let Some(position) = reversed.iter().position(|o| o.path == base) {
                reversed.remove(position);
            }
        }
    }

    adjacency.retain(|(_, duplicates)| !duplicates.is_empty());
    adjacency
}

/// Turn a cleaned adjacency into final groups: representative plus its
/// duplicates, sorted by path, sizes summed.
pub(crate) fn into_similar_groups(adjacency: Adjacency) -> Vec<SimilarGroup> {
    adjacency
        .into_iter()
        .map(|(representative, mut duplicates)| {
            duplicates.push(representative);
            duplicates.sort_by(|a, b| a.path.cmp(&b.path));
            let total_size_bytes = duplicates.iter().map(|m| m.size_bytes).sum();
            SimilarGroup {
                duplicates,
                total_size_bytes,
            }
        })
        .collect()
}
