//! Centralized default constants for the studia pipeline.
//!
//! **This module is the single source of truth** for shared default values.
//! Config structs in the other crates reference these constants instead of
//! defining their own magic numbers.

// =============================================================================
// JOB PROCESSING
// =============================================================================

/// Default number of jobs allowed in `processing` at once.
pub const JOB_MAX_CONCURRENT: usize = 3;

/// Default retry budget for retryable failures.
pub const JOB_MAX_RETRIES: u32 = 3;

/// Default base delay for exponential retry backoff (2s, 4s, 8s, ...).
pub const JOB_RETRY_BASE_DELAY_MS: u64 = 2_000;

/// Default estimate of one attempt's wall-clock time, for `estimated_completion_at`.
pub const JOB_ESTIMATED_SECS: i64 = 60;

/// Default queue event broadcast channel capacity.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// RATE LIMITING
// =============================================================================

/// Default cap on generation calls within any trailing 60 seconds.
pub const RATE_LIMIT_PER_MINUTE: u32 = 15;

/// Default cap on generation calls per UTC calendar day.
pub const RATE_LIMIT_PER_DAY: u32 = 1_500;

/// Length of the sliding rate-limit window in milliseconds.
pub const RATE_LIMIT_WINDOW_MS: u64 = 60_000;

// =============================================================================
// CONTENT TARGETS
// =============================================================================

/// Quick-summary bullets per hour of source (one per ~15 minutes).
pub const BULLETS_PER_HOUR: f64 = 4.0;

/// Minimum quick-summary bullets regardless of duration.
pub const MIN_BULLETS: usize = 4;

/// Full-summary paragraphs per hour of source (one per ~30 minutes).
pub const PARAGRAPHS_PER_HOUR: f64 = 2.0;

/// Minimum full-summary paragraphs regardless of duration.
pub const MIN_PARAGRAPHS: usize = 2;

/// Questions per hour of source.
pub const QUESTIONS_PER_HOUR: f64 = 12.0;

/// Minimum question count regardless of duration.
pub const MIN_QUESTIONS: usize = 10;

/// Fraction of each target the generated content must reach.
pub const TARGET_TOLERANCE: f64 = 0.8;

/// Paragraphs at or below this many characters do not count toward the target.
pub const MIN_PARAGRAPH_CHARS: usize = 50;

/// Minimum characters of question prompt text.
pub const MIN_QUESTION_CHARS: usize = 10;

/// Distinct difficulty levels below which the validator warns.
pub const MIN_DISTINCT_DIFFICULTIES: usize = 3;

/// Estimated answer time assigned when the service omits it.
pub const QUESTION_TIME_SECS: u32 = 20;

/// Baseline for heuristic quality scores.
pub const QUALITY_BASELINE: f64 = 0.9;

/// Version stamped into generated content metadata.
pub const CONTENT_VERSION: u32 = 1;

// =============================================================================
// INFERENCE
// =============================================================================

/// Default OpenAI-compatible API endpoint.
pub const OPENAI_URL: &str = "https://api.openai.com/v1";

/// Default generation model.
pub const GEN_MODEL: &str = "gpt-4o-mini";

/// Timeout for generation requests in seconds.
pub const GEN_TIMEOUT_SECS: u64 = 120;

/// Sampling temperature for content generation.
pub const GEN_TEMPERATURE: f32 = 0.4;
