#![allow(dead_code)]

pub mod mock_model;
pub mod mock_speech;

use lingua_tutor::lessons::LessonManager;
use lingua_tutor::progress::ProgressStore;
use tempfile::TempDir;

/// Isolated data directory with a fresh store and seeded lessons
pub struct TestContext {
    pub temp_dir: TempDir,
    pub store: ProgressStore,
    pub lessons: LessonManager,
}

impl TestContext {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = ProgressStore::open(temp_dir.path().join("progress.db"))
            .expect("Failed to open progress store");
        let lessons = LessonManager::open(temp_dir.path().join("lessons"))
            .expect("Failed to seed lessons");
        Self {
            temp_dir,
            store,
            lessons,
        }
    }
}
