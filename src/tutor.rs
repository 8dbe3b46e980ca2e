//! Conversational tutor
//!
//! One [`Tutor`] drives one session: it keeps a bounded window of recent
//! exchanges for the prompt, forwards it to the chat model and writes every
//! turn to the progress store. The window only bounds what is sent; the
//! store keeps the full log.

use crate::core::{extract_json, ChatMessage, ChatModel, ChatRequest};
use crate::error::{TutorError, TutorResult};
use crate::lessons::Lesson;
use crate::model::{Difficulty, Feedback, LessonKind, Role, SessionId};
use crate::progress::ProgressStore;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};

const ANALYSIS_SYSTEM: &str =
    "You are a language analysis expert. Respond only with valid JSON.";

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TutorState {
    /// Session created, no exchange yet
    Idle,
    /// At least one successful exchange
    Active,
    Closed,
}

/// What the learner is studying in this session
#[derive(Debug, Clone)]
pub struct LearningContext {
    pub language: String,
    pub difficulty: Difficulty,
    pub lesson_kind: LessonKind,
    pub lesson: Option<Lesson>,
}

impl LearningContext {
    pub fn new(language: impl Into<String>, difficulty: Difficulty, lesson_kind: LessonKind) -> Self {
        Self {
            language: language.into(),
            difficulty,
            lesson_kind,
            lesson: None,
        }
    }

    pub fn with_lesson(mut self, lesson: Lesson) -> Self {
        self.lesson = Some(lesson);
        self
    }
}

/// A reply together with the analysis of the learner's turn
#[derive(Debug, Clone, PartialEq)]
pub struct TutorReply {
    pub response: String,
    pub feedback: Feedback,
}

/// A generated practice task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeExercise {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub expected_response: String,
}

/// End-of-lesson recap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonSummary {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub achievements: Vec<String>,
    #[serde(default)]
    pub areas_to_improve: Vec<String>,
    #[serde(default)]
    pub next_steps: Vec<String>,
}

/// A single user message and the tutor's answer
#[derive(Debug, Clone)]
struct Exchange {
    user: String,
    tutor: String,
}

/// Conversational tutor bound to one session
#[derive(Debug)]
pub struct Tutor {
    model: Arc<dyn ChatModel>,
    store: ProgressStore,
    context: LearningContext,
    session_id: SessionId,
    history: VecDeque<Exchange>,
    /// Maximum exchanges kept in the prompt window
    history_cap: usize,
    state: TutorState,
}

impl Tutor {
    /// Create the session row and return an idle tutor
    pub fn start(
        model: Arc<dyn ChatModel>,
        store: ProgressStore,
        context: LearningContext,
        history_cap: usize,
    ) -> TutorResult<Self> {
        let session_id =
            store.create_session(&context.language, context.difficulty, context.lesson_kind)?;
        info!(
            "📚 Session {} started: {} / {} / {} (model: {})",
            session_id,
            context.language,
            context.difficulty,
            context.lesson_kind,
            model.name()
        );

        Ok(Self {
            model,
            store,
            context,
            session_id,
            history: VecDeque::new(),
            history_cap,
            state: TutorState::Idle,
        })
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn state(&self) -> TutorState {
        self.state
    }

    pub fn context(&self) -> &LearningContext {
        &self.context
    }

    /// System instruction derived from the learning context
    pub fn system_prompt(&self) -> String {
        let ctx = &self.context;
        let language = &ctx.language;
        let level = ctx.difficulty.as_str();

        let mut prompt = format!(
            "You are an expert language tutor for {language}. Your student is at a {level} level \
             and is working on {kind}.\n\n\
             Be encouraging and patient, correct mistakes constructively and adapt to the \
             student's level. Keep the conversation practical and interactive.\n\n\
             Respond in a mix of {language} and English appropriate for the {level} level:\n\
             - For beginners: use more English with simple {language} phrases\n\
             - For intermediate: use more {language} with English explanations when needed\n\
             - For advanced: use primarily {language} with minimal English\n\n\
             When the student makes a mistake, gently correct it, explain why and give the \
             correct version. Encourage the student to practice and ask questions.",
            kind = ctx.lesson_kind.label(),
        );

        if let Some(lesson) = &ctx.lesson {
            let topics: Vec<&str> = lesson.topics.iter().map(String::as_str).collect();
            prompt.push_str(&format!("\n\nCurrent lesson topics: {}", topics.join(", ")));
            if !lesson.vocabulary.is_empty() {
                prompt.push_str(&format!(
                    "\n\nKey vocabulary to practice: {}",
                    lesson.vocabulary.join(", ")
                ));
            }
            if !lesson.sample_dialogues.is_empty() {
                prompt.push_str(
                    "\n\nYou can reference these sample dialogues for context and practice.",
                );
            }
        }
        prompt
    }

    /// History messages that the next request would carry, oldest first
    pub fn context_messages(&self) -> Vec<ChatMessage> {
        self.history
            .iter()
            .flat_map(|ex| [ChatMessage::user(&ex.user), ChatMessage::tutor(&ex.tutor)])
            .collect()
    }

    /// Answer one learner turn
    pub async fn respond(&mut self, user_text: &str) -> TutorResult<String> {
        let reply = self.exchange(user_text, false).await?;
        Ok(reply.response)
    }

    /// Answer one learner turn and analyze it
    ///
    /// The analysis is stored as the user interaction's metrics. A malformed
    /// or failed analysis falls back to a neutral default.
    pub async fn respond_with_feedback(&mut self, user_text: &str) -> TutorResult<TutorReply> {
        self.exchange(user_text, true).await
    }

    async fn exchange(&mut self, user_text: &str, analyze: bool) -> TutorResult<TutorReply> {
        self.ensure_open()?;
        let user_text = user_text.trim();
        if user_text.is_empty() {
            return Err(TutorError::EmptyInput);
        }

        let mut messages = self.context_messages();
        messages.push(ChatMessage::user(user_text));
        let request = ChatRequest {
            system: self.system_prompt(),
            messages,
        };
        debug!(
            "💬 Sending {} message(s) to {}",
            request.messages.len(),
            self.model.name()
        );

        let response = self.model.complete(&request).await?;

        let feedback = if analyze {
            Some(self.analyze(user_text).await)
        } else {
            None
        };

        self.history.push_back(Exchange {
            user: user_text.to_string(),
            tutor: response.clone(),
        });
        while self.history.len() > self.history_cap {
            self.history.pop_front();
        }
        if self.state == TutorState::Idle {
            self.state = TutorState::Active;
        }

        self.log_turn(Role::User, user_text, feedback.as_ref());
        self.log_turn(Role::Tutor, &response, None);

        Ok(TutorReply {
            response,
            feedback: feedback.unwrap_or_default(),
        })
    }

    async fn analyze(&self, user_text: &str) -> Feedback {
        let question = format!(
            "Analyze this {language} text from a {level} level student: \"{user_text}\"\n\n\
             Provide analysis in JSON format:\n\
             {{\n  \"grammar_score\": 0-10,\n  \"vocabulary_level\": \"beginner/intermediate/advanced\",\n  \
             \"errors\": [\"list of specific errors if any\"],\n  \
             \"strengths\": [\"list of things done well\"],\n  \
             \"suggestions\": [\"specific improvement suggestions\"],\n  \
             \"confidence\": 0.0-1.0\n}}\n\n\
             Focus on constructive feedback appropriate for their level.",
            language = self.context.language,
            level = self.context.difficulty.as_str(),
        );

        match self
            .model
            .complete(&ChatRequest::single(ANALYSIS_SYSTEM, question))
            .await
        {
            Ok(reply) => extract_json(&reply).unwrap_or_else(|| {
                warn!("⚠️ Feedback analysis was not valid JSON, using default");
                self.default_feedback()
            }),
            Err(e) => {
                warn!("⚠️ Feedback analysis failed: {}", e);
                self.default_feedback()
            }
        }
    }

    fn default_feedback(&self) -> Feedback {
        Feedback {
            grammar_score: Some(7.0),
            vocabulary_level: Some(self.context.difficulty.as_str().to_string()),
            errors: Vec::new(),
            strengths: vec!["Participated in the conversation".to_string()],
            suggestions: vec!["Keep practicing!".to_string()],
            confidence: Some(0.7),
        }
    }

    /// Opening message for the lesson, logged as a tutor turn
    pub async fn introduction(&mut self) -> TutorResult<String> {
        self.ensure_open()?;
        let ctx = &self.context;
        let mut question = format!(
            "Generate a friendly introduction for a {level} level {language} lesson on {kind}.\n\n\
             Welcome the student with a real greeting (no placeholder names or brackets), \
             briefly explain what they'll learn, set expectations for the lesson and end with \
             a question to start the conversation.",
            level = ctx.difficulty.as_str(),
            language = ctx.language,
            kind = ctx.lesson_kind.label(),
        );
        if let Some(lesson) = &ctx.lesson {
            question.push_str(&format!("\n\nSpecific lesson: {}", lesson.title));
            if !lesson.description.is_empty() {
                question.push_str(&format!("\nDescription: {}", lesson.description));
            }
        }

        let intro = self
            .model
            .complete(&ChatRequest::single(self.system_prompt(), question))
            .await?;
        self.log_turn(Role::Tutor, &intro, None);
        Ok(intro)
    }

    /// Generate a practice task for the current lesson
    pub async fn practice_exercise(&self) -> TutorResult<PracticeExercise> {
        self.ensure_open()?;
        let ctx = &self.context;
        let mut question = format!(
            "Create a practice exercise for a {level} level {language} student studying {kind}.\n\n\
             Format as JSON:\n\
             {{\n  \"type\": \"conversation/fill_blank/translation/role_play\",\n  \
             \"title\": \"Exercise title\",\n  \
             \"instructions\": \"Clear instructions for the student\",\n  \
             \"content\": \"Exercise content\",\n  \
             \"expected_response\": \"What kind of response you expect\"\n}}",
            level = ctx.difficulty.as_str(),
            language = ctx.language,
            kind = ctx.lesson_kind.label(),
        );
        if let Some(lesson) = &ctx.lesson {
            let topics: Vec<&str> = lesson.topics.iter().map(String::as_str).collect();
            question.push_str(&format!("\n\nFocus on these topics: {}", topics.join(", ")));
        }

        let reply = self
            .model
            .complete(&ChatRequest::single(self.system_prompt(), question))
            .await?;
        Ok(extract_json(&reply).unwrap_or_else(|| {
            warn!("⚠️ Exercise reply was not valid JSON, using free practice");
            PracticeExercise {
                kind: "conversation".to_string(),
                title: "Free Practice".to_string(),
                instructions: format!(
                    "Let's have a conversation in {}. Try to use what we've learned today!",
                    ctx.language
                ),
                content: "Tell me about your day or ask me a question.".to_string(),
                expected_response: "Natural conversation".to_string(),
            }
        }))
    }

    /// Recap of the conversation so far
    ///
    /// Makes no model call when nothing has been said yet.
    pub async fn lesson_summary(&self) -> TutorResult<LessonSummary> {
        if self.history.is_empty() {
            return Ok(LessonSummary {
                summary: "No conversation yet".to_string(),
                achievements: Vec::new(),
                areas_to_improve: Vec::new(),
                next_steps: Vec::new(),
            });
        }

        let mut messages = self.context_messages();
        messages.push(ChatMessage::user(
            "Based on our conversation, provide a lesson summary in JSON format:\n\
             {\n  \"summary\": \"Brief summary of what we covered\",\n  \
             \"achievements\": [\"List of things the student did well\"],\n  \
             \"areas_to_improve\": [\"Areas where the student can improve\"],\n  \
             \"next_steps\": [\"Suggestions for continued learning\"]\n}",
        ));
        let request = ChatRequest {
            system: self.system_prompt(),
            messages,
        };

        let reply = self.model.complete(&request).await?;
        Ok(extract_json(&reply).unwrap_or_else(|| LessonSummary {
            summary: "We had a good practice session today!".to_string(),
            achievements: vec!["Participated actively in the lesson".to_string()],
            areas_to_improve: vec!["Continue practicing regularly".to_string()],
            next_steps: vec!["Try the next lesson when ready".to_string()],
        }))
    }

    /// Close the session. Further calls are no-ops.
    pub fn close(&mut self, score: Option<i64>) -> TutorResult<()> {
        if self.state == TutorState::Closed {
            return Ok(());
        }
        self.store.close_session_with_score(self.session_id, score)?;
        self.state = TutorState::Closed;
        info!("🏁 Session {} closed", self.session_id);
        Ok(())
    }

    fn ensure_open(&self) -> TutorResult<()> {
        if self.state == TutorState::Closed {
            return Err(TutorError::SessionClosed(self.session_id));
        }
        Ok(())
    }

    fn log_turn(&self, role: Role, text: &str, feedback: Option<&Feedback>) {
        if let Err(e) = self
            .store
            .log_interaction(self.session_id, role, text, feedback)
        {
            warn!(
                "⚠️ Could not log {} turn for session {}: {}",
                role.as_str(),
                self.session_id,
                e
            );
        }
    }
}

/// Feedback line for a transcription confidence in `0.0..=1.0`
pub fn pronunciation_feedback(confidence: f64) -> &'static str {
    if confidence > 0.9 {
        "Excellent pronunciation! Very clear and understandable."
    } else if confidence > 0.7 {
        "Good pronunciation! Try to speak a bit more clearly for some words."
    } else if confidence > 0.5 {
        "Your pronunciation needs some work. Try to speak more slowly and clearly."
    } else {
        "I had difficulty understanding. Let's practice pronunciation of key words together."
    }
}
