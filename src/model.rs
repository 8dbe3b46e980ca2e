//! Shared domain vocabulary
//!
//! Difficulty levels, lesson kinds and conversation roles used by the lesson
//! manager, the progress store and the tutor.

use crate::error::{TutorError, TutorResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Row id of a tutoring session
pub type SessionId = i64;

/// Row id of a logged interaction
pub type InteractionId = i64;

/// Identifier of a lesson inside the lesson content files
pub type LessonId = String;

/// Learner level
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [
        Difficulty::Beginner,
        Difficulty::Intermediate,
        Difficulty::Advanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }

    /// Capitalized name for menus and prompts
    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "Beginner",
            Difficulty::Intermediate => "Intermediate",
            Difficulty::Advanced => "Advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = TutorError;

    fn from_str(s: &str) -> TutorResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            other => Err(TutorError::Config(format!("unknown difficulty '{other}'"))),
        }
    }
}

/// Category of static lesson content, one JSON file per category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonCategory {
    #[default]
    Conversation,
    Grammar,
    Vocabulary,
}

impl LessonCategory {
    pub const ALL: [LessonCategory; 3] = [
        LessonCategory::Conversation,
        LessonCategory::Grammar,
        LessonCategory::Vocabulary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LessonCategory::Conversation => "conversation",
            LessonCategory::Grammar => "grammar",
            LessonCategory::Vocabulary => "vocabulary",
        }
    }

    /// Name of the content file holding this category
    pub fn file_name(&self) -> String {
        format!("{}_lessons.json", self.as_str())
    }
}

impl fmt::Display for LessonCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LessonCategory {
    type Err = TutorError;

    fn from_str(s: &str) -> TutorResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "conversation" => Ok(LessonCategory::Conversation),
            "grammar" => Ok(LessonCategory::Grammar),
            "vocabulary" => Ok(LessonCategory::Vocabulary),
            other => Err(TutorError::Config(format!(
                "unknown lesson category '{other}'"
            ))),
        }
    }
}

/// What kind of lesson a session practices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LessonKind {
    Conversation,
    Grammar,
    Vocabulary,
    Pronunciation,
    Reading,
    Writing,
}

impl LessonKind {
    pub const ALL: [LessonKind; 6] = [
        LessonKind::Conversation,
        LessonKind::Grammar,
        LessonKind::Vocabulary,
        LessonKind::Pronunciation,
        LessonKind::Reading,
        LessonKind::Writing,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            LessonKind::Conversation => "Conversation Practice",
            LessonKind::Grammar => "Grammar Lessons",
            LessonKind::Vocabulary => "Vocabulary Building",
            LessonKind::Pronunciation => "Pronunciation Practice",
            LessonKind::Reading => "Reading Comprehension",
            LessonKind::Writing => "Writing Practice",
        }
    }

    /// Static content backing this kind, if any
    pub fn category(&self) -> Option<LessonCategory> {
        match self {
            LessonKind::Conversation => Some(LessonCategory::Conversation),
            LessonKind::Grammar => Some(LessonCategory::Grammar),
            LessonKind::Vocabulary => Some(LessonCategory::Vocabulary),
            _ => None,
        }
    }
}

impl fmt::Display for LessonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LessonKind {
    type Err = TutorError;

    fn from_str(s: &str) -> TutorResult<Self> {
        let wanted = s.trim().to_lowercase();
        LessonKind::ALL
            .into_iter()
            .find(|kind| {
                let label = kind.label().to_lowercase();
                label == wanted || label.split_whitespace().next() == Some(wanted.as_str())
            })
            .ok_or_else(|| TutorError::Config(format!("unknown lesson type '{s}'")))
    }
}

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Tutor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Tutor => "tutor",
        }
    }
}

impl FromStr for Role {
    type Err = TutorError;

    fn from_str(s: &str) -> TutorResult<Self> {
        match s {
            "user" => Ok(Role::User),
            "tutor" => Ok(Role::Tutor),
            other => Err(TutorError::Storage(format!("unknown role '{other}'"))),
        }
    }
}

/// Analysis of one learner turn, attached to the user interaction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    /// 0 to 10
    #[serde(default)]
    pub grammar_score: Option<f64>,
    #[serde(default)]
    pub vocabulary_level: Option<String>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    /// 0.0 to 1.0
    #[serde(default)]
    pub confidence: Option<f64>,
}
