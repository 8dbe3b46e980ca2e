//! Lesson manager
//!
//! Static lesson content lives in one JSON file per category
//! (`conversation_lessons.json`, ...), each mapping a difficulty to a list of
//! lessons. Every file is parsed and checked when the manager opens, so a
//! malformed file fails at startup rather than mid-lesson.

use crate::error::{TutorError, TutorResult};
use crate::model::{Difficulty, LessonCategory, LessonId, LessonKind};
use crate::utils::fuzzy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Minimum similarity for the fuzzy topic fallback
const FUZZY_CUTOFF: f64 = 0.7;

const BUNDLED: [(LessonCategory, &str); 3] = [
    (
        LessonCategory::Conversation,
        include_str!("../assets/lessons/conversation_lessons.json"),
    ),
    (
        LessonCategory::Grammar,
        include_str!("../assets/lessons/grammar_lessons.json"),
    ),
    (
        LessonCategory::Vocabulary,
        include_str!("../assets/lessons/vocabulary_lessons.json"),
    ),
];

/// Broad topics offered to learners when picking a lesson
pub const TOPIC_CATALOG: &[&str] = &[
    "Basic Conversation",
    "Travel & Tourism",
    "Business Communication",
    "Academic Discussion",
    "Cultural Topics",
    "Daily Life",
    "Food & Dining",
    "Shopping",
    "Health & Medical",
    "Technology",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleDialogue {
    pub scenario: String,
    pub dialogue: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    #[serde(rename = "type")]
    pub kind: String,
    pub question: String,
    pub answer: String,
}

/// A lesson as stored in the content files.
///
/// `difficulty` and `category` are implied by where the lesson sits in the
/// files, so they are not serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub topics: BTreeSet<String>,
    #[serde(default)]
    pub vocabulary: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sample_dialogues: Vec<SampleDialogue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exercises: Vec<Exercise>,
    #[serde(skip)]
    pub difficulty: Difficulty,
    #[serde(skip)]
    pub category: LessonCategory,
    /// Added at runtime and not yet written to disk
    #[serde(skip)]
    pub custom: bool,
}

impl Lesson {
    fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("lesson id is empty".to_string());
        }
        if self.title.trim().is_empty() {
            return Err(format!("lesson '{}' has an empty title", self.id));
        }
        if self.topics.iter().all(|t| t.trim().is_empty()) {
            return Err(format!("lesson '{}' has no topics", self.id));
        }
        Ok(())
    }

    fn matches_topic(&self, topic: &str) -> bool {
        let wanted = fuzzy::normalize_text(topic);
        if wanted.is_empty() {
            return false;
        }
        let contains = |field: &str| fuzzy::normalize_text(field).contains(&wanted);
        contains(&self.id)
            || contains(&self.title)
            || self.category.as_str() == wanted
            || self.topics.iter().any(|t| {
                let normalized = fuzzy::normalize_text(t);
                normalized.contains(&wanted) || (!normalized.is_empty() && wanted.contains(&normalized))
            })
    }
}

/// Loads, searches and extends lesson content
#[derive(Debug)]
pub struct LessonManager {
    lessons_dir: PathBuf,
    lessons: Vec<Lesson>,
}

impl LessonManager {
    /// Open the lesson directory, writing bundled content for any missing
    /// category, then load and check every category file.
    pub fn open(lessons_dir: impl Into<PathBuf>) -> TutorResult<Self> {
        let lessons_dir = lessons_dir.into();
        std::fs::create_dir_all(&lessons_dir)?;

        for (category, content) in BUNDLED {
            let path = lessons_dir.join(category.file_name());
            if !path.exists() {
                debug!("Writing default {} lessons to {}", category, path.display());
                std::fs::write(&path, content)?;
            }
        }

        let mut lessons = Vec::new();
        for entry in WalkDir::new(&lessons_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            let Some(stem) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix("_lessons.json"))
            else {
                continue;
            };
            match stem.parse::<LessonCategory>() {
                Ok(category) => lessons.extend(load_category_file(path, category)?),
                Err(_) => warn!("⚠️ Ignoring lesson file with unknown category: {}", path.display()),
            }
        }

        info!("📚 Loaded {} lessons from {}", lessons.len(), lessons_dir.display());
        Ok(Self {
            lessons_dir,
            lessons,
        })
    }

    pub fn lessons_dir(&self) -> &Path {
        &self.lessons_dir
    }

    /// Find the best lesson for a topic at a difficulty.
    ///
    /// Substring matches on id, title, category or topics win; otherwise the
    /// closest title or topic by edit distance is used.
    pub fn get_lesson(&self, topic: &str, difficulty: Difficulty) -> TutorResult<&Lesson> {
        let at_level: Vec<&Lesson> = self
            .lessons
            .iter()
            .filter(|l| l.difficulty == difficulty)
            .collect();

        if let Some(lesson) = at_level.iter().copied().find(|l| l.matches_topic(topic)) {
            return Ok(lesson);
        }

        let candidates: Vec<String> = at_level
            .iter()
            .flat_map(|l| std::iter::once(l.title.clone()).chain(l.topics.iter().cloned()))
            .collect();
        if let Some(best) = fuzzy::find_best_match(topic, &candidates, FUZZY_CUTOFF) {
            debug!("Fuzzy lesson match '{}' -> '{}' ({:.2})", topic, best.value, best.score);
            if let Some(lesson) = at_level
                .iter()
                .copied()
                .find(|l| l.title == best.value || l.topics.contains(&best.value))
            {
                return Ok(lesson);
            }
        }

        Err(TutorError::LessonNotFound {
            topic: topic.to_string(),
            difficulty: difficulty.to_string(),
        })
    }

    /// All lessons of a category at a difficulty, in file order
    pub fn lessons(&self, category: LessonCategory, difficulty: Difficulty) -> Vec<&Lesson> {
        self.lessons
            .iter()
            .filter(|l| l.category == category && l.difficulty == difficulty)
            .collect()
    }

    /// Lessons backing a session's lesson kind; empty for kinds without content
    pub fn lessons_for_kind(&self, kind: LessonKind, difficulty: Difficulty) -> Vec<&Lesson> {
        match kind.category() {
            Some(category) => self.lessons(category, difficulty),
            None => Vec::new(),
        }
    }

    pub fn lesson_by_id(&self, id: &str) -> Option<&Lesson> {
        self.lessons.iter().find(|l| l.id == id)
    }

    pub fn topic_catalog(&self) -> &'static [&'static str] {
        TOPIC_CATALOG
    }

    /// Add a lesson for the rest of this process.
    ///
    /// Only the required keys are checked. A missing `id` is generated. The
    /// lesson is not written to disk until [`Self::persist_custom_lessons`].
    pub fn create_custom_lesson(
        &mut self,
        category: LessonCategory,
        difficulty: Difficulty,
        mut lesson_data: serde_json::Value,
    ) -> TutorResult<LessonId> {
        let path = self.lessons_dir.join(category.file_name());
        let content_error = |reason: String| TutorError::Content {
            path: path.clone(),
            reason,
        };

        let object = lesson_data
            .as_object_mut()
            .ok_or_else(|| content_error("custom lesson must be a JSON object".to_string()))?;
        if !object.contains_key("id") {
            let id = self.next_custom_id(category);
            object.insert("id".to_string(), serde_json::Value::String(id));
        }

        let mut lesson: Lesson =
            serde_json::from_value(lesson_data).map_err(|e| content_error(e.to_string()))?;
        lesson.validate().map_err(content_error)?;
        if self.lesson_by_id(&lesson.id).is_some() {
            return Err(content_error(format!("lesson id '{}' already exists", lesson.id)));
        }

        lesson.difficulty = difficulty;
        lesson.category = category;
        lesson.custom = true;
        let id = lesson.id.clone();
        info!("➕ Added custom {} lesson '{}' ({})", category, id, difficulty);
        self.lessons.push(lesson);
        Ok(id)
    }

    /// Write a category file including its custom lessons
    pub fn persist_custom_lessons(&mut self, category: LessonCategory) -> TutorResult<PathBuf> {
        let mut grouped: BTreeMap<&'static str, Vec<&Lesson>> = BTreeMap::new();
        for difficulty in Difficulty::ALL {
            let lessons = self.lessons(category, difficulty);
            if !lessons.is_empty() {
                grouped.insert(difficulty.as_str(), lessons);
            }
        }

        let path = self.lessons_dir.join(category.file_name());
        let content = serde_json::to_string_pretty(&grouped)?;
        std::fs::write(&path, content)?;

        for lesson in self.lessons.iter_mut().filter(|l| l.category == category) {
            lesson.custom = false;
        }
        info!("💾 Saved {} lessons to {}", category, path.display());
        Ok(path)
    }

    fn next_custom_id(&self, category: LessonCategory) -> LessonId {
        let mut n = self.lessons.iter().filter(|l| l.custom).count() + 1;
        loop {
            let id = format!("custom_{}_{}", category, n);
            if self.lesson_by_id(&id).is_none() {
                return id;
            }
            n += 1;
        }
    }
}

fn load_category_file(path: &Path, category: LessonCategory) -> TutorResult<Vec<Lesson>> {
    let content_error = |reason: String| TutorError::Content {
        path: path.to_path_buf(),
        reason,
    };

    let raw = std::fs::read_to_string(path)?;
    let by_level: BTreeMap<String, Vec<Lesson>> =
        serde_json::from_str(&raw).map_err(|e| content_error(e.to_string()))?;

    let mut lessons = Vec::new();
    for (level, entries) in by_level {
        let difficulty: Difficulty = level
            .parse()
            .map_err(|_| content_error(format!("unknown difficulty '{level}'")))?;
        for mut lesson in entries {
            lesson.validate().map_err(&content_error)?;
            lesson.difficulty = difficulty;
            lesson.category = category;
            lessons.push(lesson);
        }
    }
    Ok(lessons)
}
