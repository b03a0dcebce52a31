//! Scripted generation backend for deterministic testing.
//!
//! Replies are served in the order they were scripted; once the script runs
//! out every call gets the default reply. Latency uses `tokio::time`, so it is
//! instantaneous under `#[tokio::test(start_paused = true)]`.
//!
//! ## Usage
//!
//! ```rust
//! use studia_core::{Error, GenerationBackend};
//! use studia_inference::mock::{valid_reply, ScriptedBackend};
//!
//! # async fn demo() {
//! let backend = ScriptedBackend::new()
//!     .then_err(Error::ServerError("503".into()))
//!     .then_ok(valid_reply(1.0));
//!
//! assert!(backend.generate("sys", "prompt").await.is_err());
//! assert!(backend.generate("sys", "prompt").await.is_ok());
//! assert_eq!(backend.call_count(), 2);
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use studia_core::{Error, GenerationBackend, QuestionType, Result};

use crate::prompt::ContentTargets;

/// One recorded `generate` call.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub system: String,
    pub prompt: String,
    pub at: tokio::time::Instant,
}

/// Generation backend that replays a script of outcomes.
#[derive(Clone)]
pub struct ScriptedBackend {
    model: String,
    script: Arc<Mutex<VecDeque<Result<String>>>>,
    default_response: String,
    latency: Duration,
    calls: Arc<Mutex<Vec<MockCall>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            model: "scripted-mock".to_string(),
            script: Arc::new(Mutex::new(VecDeque::new())),
            default_response: valid_reply(1.0),
            latency: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queue a successful reply.
    pub fn then_ok(self, reply: impl Into<String>) -> Self {
        self.script.lock().unwrap().push_back(Ok(reply.into()));
        self
    }

    /// Queue a failure.
    pub fn then_err(self, error: Error) -> Self {
        self.script.lock().unwrap().push_back(Err(error));
        self
    }

    /// Reply used once the script is exhausted.
    pub fn with_default_response(mut self, reply: impl Into<String>) -> Self {
        self.default_response = reply.into();
        self
    }

    /// Simulated service latency for every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Get all logged calls for assertion.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Highest number of calls that were in flight at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Scripted outcomes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String> {
        self.calls.lock().unwrap().push(MockCall {
            system: system.to_string(),
            prompt: prompt.to_string(),
            at: tokio::time::Instant::now(),
        });
        let outcome = self.script.lock().unwrap().pop_front();

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        outcome.unwrap_or_else(|| Ok(self.default_response.clone()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// A reply that parses and validates for content of the given duration.
pub fn valid_reply(duration_hours: f64) -> String {
    let targets = ContentTargets::for_duration(duration_hours);

    let bullets: Vec<String> = (1..=targets.quick_bullets)
        .map(|i| format!("Segment {i} introduces the next idea in the discussion."))
        .collect();
    let paragraphs: Vec<String> = (1..=targets.full_paragraphs)
        .map(|i| {
            format!(
                "Part {i} of the conversation develops the argument with examples \
                 and ties it back to the main theme."
            )
        })
        .collect();
    let questions: Vec<serde_json::Value> = (0..targets.question_count)
        .map(|i| {
            json!({
                "id": format!("q{}", i + 1),
                "content": format!("What point does segment {} make about the topic?", i + 1),
                "type": QuestionType::ALL[i % QuestionType::ALL.len()],
                "difficultyLevel": (i % 5) + 1,
                "estimatedTimeSeconds": 20,
                "confidence": "medium",
                "metadata": {"keywords": ["topic"]}
            })
        })
        .collect();

    json!({
        "quickSummary": bullets,
        "fullSummary": paragraphs,
        "questions": questions,
    })
    .to_string()
}
