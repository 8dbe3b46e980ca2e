//! Mock chat model for testing
//!
//! Records every request and answers from a script.

use async_trait::async_trait;
use lingua_tutor::core::{ChatModel, ChatRequest};
use lingua_tutor::error::{TutorError, TutorResult};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug)]
pub struct MockModel {
    /// All requests received, in order
    pub requests: Arc<Mutex<Vec<ChatRequest>>>,
    /// Scripted replies; when empty, replies echo the turn number
    pub replies: Arc<Mutex<VecDeque<String>>>,
    /// Simulate provider failure
    pub should_fail: Arc<Mutex<bool>>,
}

impl MockModel {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            replies: Arc::new(Mutex::new(VecDeque::new())),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_replies(replies: &[&str]) -> Self {
        let model = Self::new();
        model
            .replies
            .lock()
            .unwrap()
            .extend(replies.iter().map(|r| r.to_string()));
        model
    }

    pub fn set_failing(&self, fail: bool) {
        *self.should_fail.lock().unwrap() = fail;
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatModel for MockModel {
    async fn complete(&self, request: &ChatRequest) -> TutorResult<String> {
        let mut requests = self.requests.lock().unwrap();
        requests.push(request.clone());
        if *self.should_fail.lock().unwrap() {
            return Err(TutorError::ModelProvider("Mock provider failure".to_string()));
        }
        let n = requests.len();
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| format!("reply {n}")))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
