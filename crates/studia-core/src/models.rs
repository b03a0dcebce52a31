//! Data models for content generation requests, jobs and generated content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

use crate::{Error, Result};

// =============================================================================
// INPUT
// =============================================================================

/// Kind of long-form source a transcript came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentSource {
    Podcast,
    Video,
    Interview,
    Lecture,
    #[default]
    Other,
}

impl ContentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentSource::Podcast => "podcast",
            ContentSource::Video => "video",
            ContentSource::Interview => "interview",
            ContentSource::Lecture => "lecture",
            ContentSource::Other => "other",
        }
    }
}

/// A registered content item awaiting generation. Read-only to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentGenerationRequest {
    pub content_id: String,
    pub title: String,
    pub transcript: String,
    pub duration_hours: f64,
    #[serde(default)]
    pub source: ContentSource,
}

impl ContentGenerationRequest {
    pub fn new(
        content_id: impl Into<String>,
        title: impl Into<String>,
        transcript: impl Into<String>,
        duration_hours: f64,
        source: ContentSource,
    ) -> Self {
        Self {
            content_id: content_id.into(),
            title: title.into(),
            transcript: transcript.into(),
            duration_hours,
            source,
        }
    }

    /// Reject requests that cannot produce a meaningful prompt.
    pub fn validate(&self) -> Result<()> {
        if !self.duration_hours.is_finite() || self.duration_hours <= 0.0 {
            return Err(Error::InvalidRequest(format!(
                "duration_hours must be positive, got {}",
                self.duration_hours
            )));
        }
        if self.transcript.trim().is_empty() {
            return Err(Error::InvalidRequest(format!(
                "transcript for {} is empty",
                self.content_id
            )));
        }
        Ok(())
    }
}

// =============================================================================
// JOBS
// =============================================================================

/// Lifecycle state of a processing job inside the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Retrying,
}

impl JobStatus {
    /// Completed and failed jobs never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Pending, processing and retrying jobs block a new submission for the same content.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Status as seen by the storage collaborator.
    pub fn storage_status(&self) -> ProcessingStatus {
        match self {
            JobStatus::Pending => ProcessingStatus::Pending,
            JobStatus::Processing | JobStatus::Retrying => ProcessingStatus::Processing,
            JobStatus::Completed => ProcessingStatus::Completed,
            JobStatus::Failed => ProcessingStatus::Failed,
        }
    }
}

/// Processing status exchanged with content storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// One submission to the processing queue, including its retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingJob {
    pub id: Uuid,
    pub content_id: String,
    pub status: JobStatus,
    /// 0-100; only reaches 100 together with `Completed`.
    pub progress: u8,
    /// When the job was submitted.
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Last failure message.
    pub error: Option<String>,
    pub retry_count: u32,
    pub estimated_completion_at: Option<DateTime<Utc>>,
}

impl ProcessingJob {
    pub fn new(content_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content_id: content_id.into(),
            status: JobStatus::Pending,
            progress: 0,
            started_at: now,
            completed_at: None,
            error: None,
            retry_count: 0,
            estimated_completion_at: None,
        }
    }
}

/// Queue statistics summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: usize,
    pub processing: usize,
    pub retrying: usize,
    pub completed: usize,
    pub failed: usize,
    pub halted: bool,
}

// =============================================================================
// GENERATED CONTENT
// =============================================================================

/// Pedagogical category of a self-assessment question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Conceptual,
    Factual,
    Application,
    Reflection,
}

impl QuestionType {
    pub const ALL: [QuestionType; 4] = [
        QuestionType::Conceptual,
        QuestionType::Factual,
        QuestionType::Application,
        QuestionType::Reflection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Conceptual => "conceptual",
            QuestionType::Factual => "factual",
            QuestionType::Application => "application",
            QuestionType::Reflection => "reflection",
        }
    }
}

/// Model's confidence that a question is answerable from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Free-form question annotations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionMetadata {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, alias = "conceptArea", skip_serializing_if = "Option::is_none")]
    pub concept_area: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub content: String,
    /// `None` when the service omitted it; rejected by validation.
    pub question_type: Option<QuestionType>,
    /// Valid range is 1..=5; kept wide so validation can report violations.
    pub difficulty_level: i64,
    pub estimated_time_seconds: u32,
    pub confidence: Option<Confidence>,
    #[serde(default)]
    pub metadata: QuestionMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentMetadata {
    pub processing_time_ms: u64,
    pub content_version: u32,
    pub model_identifier: String,
}

/// Learning material produced by one successful attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContent {
    /// Newline-joined bulleted lines.
    pub quick_summary: String,
    /// Blank-line-joined paragraphs.
    pub full_summary: String,
    pub questions: Vec<Question>,
    pub metadata: ContentMetadata,
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Advisory quality scores; never gate acceptance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub clarity_score: f64,
    pub relevance_score: f64,
    /// Question counts for difficulty levels 1 through 5.
    pub difficulty_distribution: [usize; 5],
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub quality: QualityReport,
}

impl ValidationResult {
    /// Convert a failed verdict into `Error::ValidationFailed`.
    pub fn into_result(self) -> Result<Self> {
        if self.is_valid {
            Ok(self)
        } else {
            Err(Error::ValidationFailed(self.errors))
        }
    }
}
