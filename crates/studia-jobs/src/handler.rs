//! Job handler abstraction used by the processing queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use studia_core::Result;

/// Progress callback type for job handlers.
pub type ProgressCallback = Box<dyn Fn(u8, Option<&str>) + Send + Sync>;

/// Context provided to job handlers.
pub struct JobContext {
    /// The job being processed.
    pub job_id: Uuid,
    /// Content item the job generates material for.
    pub content_id: String,
    /// Number of retries already consumed before this run.
    pub attempt: u32,
    progress_callback: Option<ProgressCallback>,
    cancelled: Arc<AtomicBool>,
}

impl JobContext {
    /// Create a new job context.
    pub fn new(job_id: Uuid, content_id: impl Into<String>) -> Self {
        Self {
            job_id,
            content_id: content_id.into(),
            attempt: 0,
            progress_callback: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    /// Set the progress callback.
    pub fn with_progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(u8, Option<&str>) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
        self
    }

    /// Share a cancellation flag with whoever may cancel this job.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = flag;
        self
    }

    /// Report progress to the callback.
    pub fn report_progress(&self, percent: u8, message: Option<&str>) {
        if let Some(ref callback) = self.progress_callback {
            callback(percent, message);
        }
    }

    /// Whether cancellation was requested while the job was running.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Trait for job handlers.
///
/// Handlers classify failures through the returned `Error`; retry decisions
/// belong to the queue.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Execute the job.
    async fn execute(&self, ctx: JobContext) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_job_context_defaults() {
        let id = Uuid::new_v4();
        let ctx = JobContext::new(id, "ep-1");
        assert_eq!(ctx.job_id, id);
        assert_eq!(ctx.content_id, "ep-1");
        assert_eq!(ctx.attempt, 0);
        assert!(!ctx.is_cancelled());
        // No callback set: reporting is a no-op.
        ctx.report_progress(50, None);
    }

    #[test]
    fn test_progress_callback_receives_updates() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let ctx = JobContext::new(Uuid::new_v4(), "ep-1").with_progress_callback(move |p, m| {
            sink.lock().unwrap().push((p, m.map(String::from)));
        });

        ctx.report_progress(10, Some("Fetching"));
        ctx.report_progress(80, None);

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![(10, Some("Fetching".to_string())), (80, None)]
        );
    }

    #[test]
    fn test_cancel_flag_is_shared() {
        let flag = Arc::new(AtomicBool::new(false));
        let ctx = JobContext::new(Uuid::new_v4(), "ep-1")
            .with_attempt(2)
            .with_cancel_flag(flag.clone());
        assert_eq!(ctx.attempt, 2);
        assert!(!ctx.is_cancelled());

        flag.store(true, Ordering::SeqCst);
        assert!(ctx.is_cancelled());
    }
}
