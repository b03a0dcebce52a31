//! Core traits for the collaborators the pipeline talks to.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::{ContentGenerationRequest, GeneratedContent, ProcessingStatus, Result};

// =============================================================================
// STORAGE TRAITS
// =============================================================================

/// Persistence boundary for content items, keyed by content id.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch the generation request registered for a content item.
    ///
    /// Returns `Error::ContentNotFound` if the id is unknown.
    async fn fetch_request(&self, content_id: &str) -> Result<ContentGenerationRequest>;

    /// Store generated summaries/questions and mark the item completed.
    async fn save_generated(&self, content_id: &str, content: &GeneratedContent) -> Result<()>;

    /// Record a processing status change, with the failure message for `Failed`.
    async fn update_status(
        &self,
        content_id: &str,
        status: ProcessingStatus,
        error: Option<&str>,
    ) -> Result<()>;
}

// =============================================================================
// INFERENCE TRAITS
// =============================================================================

/// Backend for structured text generation (LLM).
///
/// Implementations classify failures into the `Error` taxonomy so callers can
/// decide on retries from `Error::is_retryable` alone.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate a reply to `prompt` under the given system instructions.
    async fn generate(&self, system: &str, prompt: &str) -> Result<String>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

// =============================================================================
// TIME
// =============================================================================

/// Authoritative wall clock. Daily quotas roll over on `today()`.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Current UTC calendar date.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Clock backed by the system time, in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Used by tests that cross day boundaries.
#[derive(Debug)]
pub struct ManualClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Mutex::new(start),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_system_clock_today_is_utc_date() {
        let clock = SystemClock;
        let today = clock.today();
        assert_eq!(today, Utc::now().date_naive());
    }

    #[test]
    fn test_manual_clock_advances_across_midnight() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 23, 59, 30).unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());

        clock.advance(chrono::Duration::seconds(45));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
    }

    #[test]
    fn test_manual_clock_set() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        let later = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
        clock.set(later);
        assert_eq!(clock.now(), later);
    }
}
