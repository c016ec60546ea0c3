use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::core::model::IndexedObject;

/// Progress event emitted while indexing and analyzing. One variant per
/// phase; `progress` is a fraction in `[0, 1]`. Transient, never persisted.
#[derive(Debug, Clone, Serialize)]
pub enum IndexingStage {
    /// Entering a directory during traversal.
    Walking { path: PathBuf },
    Indexing { progress: f32, item: IndexedObject },
    DuplicateHashesAnalyzing { progress: f32, item: IndexedObject },
    DuplicateHashesComputingFullHash { progress: f32, item: IndexedObject },
    DuplicateNamesAnalyzing { progress: f32, item: IndexedObject },
    EmptyFilesAnalyzing { progress: f32, item: IndexedObject },
    EmptyFoldersAnalyzing { progress: f32, item: IndexedObject },
    /// Computing perceptual hashes for an image or video.
    ComputingHash { progress: f32, item: IndexedObject },
    SimilarImagesComparing { progress: f32, item: IndexedObject },
    SimilarVideosComparing { progress: f32, item: IndexedObject },
}

impl IndexingStage {
    /// Progress fraction carried by the event, if the phase reports one.
    pub fn progress(&self) -> Option<f32> {
        match self {
            IndexingStage::Walking { .. } => None,
            IndexingStage::Indexing { progress, .. }
            | IndexingStage::DuplicateHashesAnalyzing { progress, .. }
            | IndexingStage::DuplicateHashesComputingFullHash { progress, .. }
            | IndexingStage::DuplicateNamesAnalyzing { progress, .. }
            | IndexingStage::EmptyFilesAnalyzing { progress, .. }
            | IndexingStage::EmptyFoldersAnalyzing { progress, .. }
            | IndexingStage::ComputingHash { progress, .. }
            | IndexingStage::SimilarImagesComparing { progress, .. }
            | IndexingStage::SimilarVideosComparing { progress, .. } => Some(*progress),
        }
    }
}

/// Where progress events go. The engine stays decoupled from rendering: a
/// sink either forwards to an unbounded channel or drops events. Send never
/// blocks and a closed receiver is not an error.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    sender: Option<mpsc::UnboundedSender<IndexingStage>>,
}

impl ProgressSink {
    pub fn new(sender: mpsc::UnboundedSender<IndexingStage>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// A sink that drops every event, for headless runs and tests.
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    pub fn send(&self, stage: IndexingStage) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(stage);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::FileCategory;
    use chrono::Utc;

    fn dummy_item() -> IndexedObject {
        IndexedObject {
            path: PathBuf::from("a.txt"),
            parent_path: None,
            size_bytes: 1,
            category: FileCategory::Document,
            created_at: Utc::now(),
            modified_at: Utc::now(),
        }
    }

    #[test]
    fn sink_forwards_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = ProgressSink::new(tx);
        sink.send(IndexingStage::Indexing {
            progress: 0.5,
            item: dummy_item(),
        });
        let stage = rx.try_recv().unwrap();
        assert_eq!(stage.progress(), Some(0.5));
    }

    #[test]
    fn disabled_sink_drops_events() {
        let sink = ProgressSink::disabled();
        sink.send(IndexingStage::Walking {
            path: PathBuf::from("/"),
        });
    }

    #[test]
    fn send_after_receiver_dropped_is_not_an_error() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sink = ProgressSink::new(tx);
        sink.send(IndexingStage::Walking {
            path: PathBuf::from("/"),
        });
    }
}
