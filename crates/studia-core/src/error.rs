//! Error types for the studia pipeline.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias using studia's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for studia operations.
///
/// Variants double as the failure taxonomy for content generation: the
/// processor classifies every failure into one of these and the queue decides
/// what to do based on [`Error::is_retryable`] alone.
#[derive(Error, Debug)]
pub enum Error {
    /// The service rejected the request as malformed (HTTP 400)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Credentials were rejected (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (HTTP 403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The service throttled the call despite local pacing (HTTP 429)
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// The service failed internally (HTTP 5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// The service's policy filters refused the content
    #[error("Blocked by safety filter: {0}")]
    SafetyBlocked(String),

    /// The prompt exceeds the model's context window
    #[error("Context too long: {0}")]
    ContextTooLong(String),

    /// The reply could not be parsed against the expected schema
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The service returned no content
    #[error("Empty response from generation service")]
    EmptyResponse,

    /// Parsed content did not meet structural targets
    #[error("Validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),

    /// Local daily quota exhausted
    #[error("Daily quota of {limit} requests exhausted")]
    QuotaExceeded { limit: u32 },

    /// Transport failure before any reply was received
    #[error("Request error: {0}")]
    Request(String),

    /// Content storage collaborator failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Content item not found in storage
    #[error("Content not found: {0}")]
    ContentNotFound(String),

    /// Job not found in the queue
    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    /// The content item already has an active job
    #[error("Content {content_id} already has an active job {job_id}")]
    DuplicateJob { content_id: String, job_id: Uuid },

    /// The job was cancelled before its result was accepted
    #[error("Job cancelled")]
    Cancelled,

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the failure is transient and eligible for another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::RateLimitExceeded(_)
                | Error::ServerError(_)
                | Error::Request(_)
                | Error::Storage(_)
        )
    }

    /// Whether the failure invalidates every job, not just the current one.
    pub fn halts_pipeline(&self) -> bool {
        matches!(self, Error::Unauthorized(_))
    }

    /// Short machine-readable kind, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidRequest(_) => "invalid_request",
            Error::Unauthorized(_) => "unauthorized",
            Error::Forbidden(_) => "forbidden",
            Error::RateLimitExceeded(_) => "rate_limit_exceeded",
            Error::ServerError(_) => "server_error",
            Error::SafetyBlocked(_) => "safety_blocked",
            Error::ContextTooLong(_) => "context_too_long",
            Error::MalformedResponse(_) => "malformed_response",
            Error::EmptyResponse => "empty_response",
            Error::ValidationFailed(_) => "validation_failed",
            Error::QuotaExceeded { .. } => "quota_exceeded",
            Error::Request(_) => "request",
            Error::Storage(_) => "storage",
            Error::ContentNotFound(_) => "content_not_found",
            Error::JobNotFound(_) => "job_not_found",
            Error::DuplicateJob { .. } => "duplicate_job",
            Error::Cancelled => "cancelled",
            Error::Serialization(_) => "serialization",
            Error::Config(_) => "config",
            Error::Internal(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
