//! Lingua Tutor Error Types
//!
//! One error type for the whole tutor core. Interfaces decide how to present
//! each variant; nothing in the core retries.

use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the tutor
#[derive(Error, Debug)]
pub enum TutorError {
    #[error("Missing credential: {0} is required for the selected provider")]
    MissingCredential(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No lesson found for topic '{topic}' at {difficulty} level")]
    LessonNotFound { topic: String, difficulty: String },

    #[error("Invalid lesson content in {}: {reason}", .path.display())]
    Content { path: PathBuf, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Model provider error: {0}")]
    ModelProvider(String),

    #[error("Speech provider error: {0}")]
    SpeechProvider(String),

    #[error("Input is empty")]
    EmptyInput,

    #[error("Session {0} is closed")]
    SessionClosed(i64),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias for tutor operations
pub type TutorResult<T> = Result<T, TutorError>;

/// SQLite failures always surface as storage errors
impl From<rusqlite::Error> for TutorError {
    fn from(err: rusqlite::Error) -> Self {
        TutorError::Storage(err.to_string())
    }
}
