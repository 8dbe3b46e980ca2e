//! Lingua Tutor Library
//!
//! Core modules for the conversational language tutor: configuration,
//! lesson content, progress tracking, model and speech providers.

pub mod config;
pub mod core;
pub mod error;
pub mod lessons;
pub mod model;
pub mod progress;
pub mod speech;
pub mod tutor;
pub mod utils;

pub use error::{TutorError, TutorResult};
