//! Bounded-concurrency processing queue with retry scheduling.
//!
//! Jobs are started in FIFO order, at most `max_concurrent` at a time.
//! Retryable failures are re-inserted at the front after an exponential
//! backoff; everything else is terminal. Bookkeeping lives behind a
//! synchronous mutex that is never held across an `.await`.
//!
//! Status changes reach the [`ContentStore`] through a single writer task.
//! Writes are queued while the bookkeeping lock is held, so the store sees
//! them in the same order the queue made the transitions.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use studia_core::defaults::{
    EVENT_BUS_CAPACITY, JOB_ESTIMATED_SECS, JOB_MAX_CONCURRENT, JOB_MAX_RETRIES,
    JOB_RETRY_BASE_DELAY_MS,
};
use studia_core::{
    Clock, ContentStore, Error, JobStatus, ProcessingJob, ProcessingStatus, QueueStats, Result,
    SystemClock,
};

use crate::handler::{JobContext, JobHandler};

const CANCELLED: &str = "cancelled";

/// Configuration for the processing queue.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum number of jobs processing at once.
    pub max_concurrent: usize,
    /// Retryable failures allowed before a job fails for good.
    pub max_retries: u32,
    /// First retry delay; doubles on each further retry.
    pub base_delay_ms: u64,
    /// Expected duration of one attempt, for completion estimates.
    pub estimated_job_secs: i64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent: JOB_MAX_CONCURRENT,
            max_retries: JOB_MAX_RETRIES,
            base_delay_ms: JOB_RETRY_BASE_DELAY_MS,
            estimated_job_secs: JOB_ESTIMATED_SECS,
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `GEN_MAX_CONCURRENT` | `3` | Max jobs processing at once |
    /// | `GEN_MAX_RETRIES` | `3` | Retry budget per job |
    /// | `GEN_RETRY_BASE_DELAY_MS` | `2000` | First backoff delay |
    pub fn from_env() -> Self {
        let max_concurrent = std::env::var("GEN_MAX_CONCURRENT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(JOB_MAX_CONCURRENT)
            .max(1);

        let max_retries = std::env::var("GEN_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(JOB_MAX_RETRIES);

        let base_delay_ms = std::env::var("GEN_RETRY_BASE_DELAY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(JOB_RETRY_BASE_DELAY_MS);

        Self {
            max_concurrent,
            max_retries,
            base_delay_ms,
            ..Self::default()
        }
    }

    /// Set maximum concurrent jobs.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_base_delay_ms(mut self, ms: u64) -> Self {
        self.base_delay_ms = ms;
        self
    }

    pub fn with_estimated_job_secs(mut self, secs: i64) -> Self {
        self.estimated_job_secs = secs;
        self
    }

    /// Backoff before the `retry_count`-th retry: `base * 2^(retry_count - 1)`.
    pub fn retry_delay(&self, retry_count: u32) -> Duration {
        let exponent = retry_count.saturating_sub(1).min(31);
        Duration::from_millis(self.base_delay_ms.saturating_mul(1u64 << exponent))
    }
}

/// Event emitted by the processing queue.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum QueueEvent {
    JobQueued {
        job_id: Uuid,
        content_id: String,
    },
    JobStarted {
        job_id: Uuid,
        content_id: String,
        retry_count: u32,
    },
    JobProgress {
        job_id: Uuid,
        percent: u8,
        message: Option<String>,
    },
    JobCompleted {
        job_id: Uuid,
        content_id: String,
        duration_ms: u64,
    },
    RetryScheduled {
        job_id: Uuid,
        retry_count: u32,
        delay_ms: u64,
        error: String,
    },
    JobFailed {
        job_id: Uuid,
        content_id: String,
        error: String,
    },
    /// No new jobs start until `resume()`.
    QueueHalted {
        reason: String,
    },
    QueueResumed,
}

struct JobEntry {
    job: ProcessingJob,
    cancel: Arc<AtomicBool>,
}

#[derive(Default)]
struct QueueState {
    jobs: HashMap<Uuid, JobEntry>,
    order: Vec<Uuid>,
    pending: VecDeque<Uuid>,
    active_by_content: HashMap<String, Uuid>,
    running: usize,
    halted: bool,
}

impl QueueState {
    fn release_content(&mut self, content_id: &str, job_id: Uuid) {
        if self.active_by_content.get(content_id) == Some(&job_id) {
            self.active_by_content.remove(content_id);
        }
    }
}

enum Outcome {
    Completed,
    Retry {
        retry_count: u32,
        delay: Duration,
        error: String,
        kind: &'static str,
    },
    Failed {
        error: String,
        kind: &'static str,
        halt: bool,
    },
}

/// Message for the status writer task.
enum StatusWrite {
    Update {
        job_id: Uuid,
        content_id: String,
        status: ProcessingStatus,
        error: Option<String>,
        done: Option<oneshot::Sender<()>>,
    },
    /// Acknowledged once every earlier write has been applied.
    Flush(oneshot::Sender<()>),
}

/// Apply status writes one at a time, in the order they were queued.
async fn write_statuses(store: Arc<dyn ContentStore>, mut rx: mpsc::UnboundedReceiver<StatusWrite>) {
    while let Some(write) = rx.recv().await {
        match write {
            StatusWrite::Update {
                job_id,
                content_id,
                status,
                error,
                done,
            } => {
                if let Err(e) = store
                    .update_status(&content_id, status, error.as_deref())
                    .await
                {
                    error!(
                        %job_id,
                        %content_id,
                        ?status,
                        error = %e,
                        error_kind = e.kind(),
                        "Failed to record content status"
                    );
                }
                if let Some(done) = done {
                    let _ = done.send(());
                }
            }
            StatusWrite::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

struct Shared {
    config: QueueConfig,
    handler: Arc<dyn JobHandler>,
    clock: Arc<dyn Clock>,
    state: Mutex<QueueState>,
    event_tx: broadcast::Sender<QueueEvent>,
    status_tx: mpsc::UnboundedSender<StatusWrite>,
}

/// In-memory job queue feeding a [`JobHandler`].
///
/// Cheap to clone; clones share the same queue.
#[derive(Clone)]
pub struct ProcessingQueue {
    inner: Arc<Shared>,
}

impl ProcessingQueue {
    pub fn new(
        config: QueueConfig,
        handler: Arc<dyn JobHandler>,
        store: Arc<dyn ContentStore>,
    ) -> Self {
        Self::with_clock(config, handler, store, Arc::new(SystemClock))
    }

    /// Must be called from within a tokio runtime; the status writer is spawned here.
    pub fn with_clock(
        config: QueueConfig,
        handler: Arc<dyn JobHandler>,
        store: Arc<dyn ContentStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        tokio::spawn(write_statuses(store, status_rx));
        info!(
            max_concurrent = config.max_concurrent,
            max_retries = config.max_retries,
            base_delay_ms = config.base_delay_ms,
            "Processing queue created"
        );
        Self {
            inner: Arc::new(Shared {
                config,
                handler,
                clock,
                state: Mutex::new(QueueState::default()),
                event_tx,
                status_tx,
            }),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    /// Queue generation for a content item and return the new job id.
    ///
    /// Rejects the submission with `DuplicateJob` while another job for the
    /// same content is pending, processing or retrying.
    pub fn submit(&self, content_id: impl Into<String>) -> Result<Uuid> {
        let content_id = content_id.into();
        let job_id = {
            let mut state = self.inner.state();
            if let Some(&existing) = state.active_by_content.get(&content_id) {
                debug!(%content_id, job_id = %existing, "Rejected duplicate submission");
                return Err(Error::DuplicateJob {
                    content_id,
                    job_id: existing,
                });
            }

            let now = self.inner.clock.now();
            let mut job = ProcessingJob::new(content_id.clone(), now);
            job.estimated_completion_at =
                Some(now + chrono::Duration::seconds(self.inner.config.estimated_job_secs));
            let job_id = job.id;
            self.inner.record_status(&job);

            state.jobs.insert(
                job_id,
                JobEntry {
                    job,
                    cancel: Arc::new(AtomicBool::new(false)),
                },
            );
            state.order.push(job_id);
            state.pending.push_back(job_id);
            state.active_by_content.insert(content_id.clone(), job_id);
            job_id
        };

        info!(%job_id, %content_id, "Job queued");
        self.inner.emit(QueueEvent::JobQueued {
            job_id,
            content_id,
        });
        self.inner.drain();
        Ok(job_id)
    }

    /// Current snapshot of a job.
    pub fn status(&self, job_id: Uuid) -> Result<ProcessingJob> {
        self.inner
            .state()
            .jobs
            .get(&job_id)
            .map(|e| e.job.clone())
            .ok_or(Error::JobNotFound(job_id))
    }

    /// All jobs in submission order.
    pub fn jobs(&self) -> Vec<ProcessingJob> {
        let state = self.inner.state();
        state
            .order
            .iter()
            .filter_map(|id| state.jobs.get(id))
            .map(|e| e.job.clone())
            .collect()
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.inner.state();
        let mut stats = QueueStats {
            halted: state.halted,
            ..QueueStats::default()
        };
        for entry in state.jobs.values() {
            match entry.job.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Processing => stats.processing += 1,
                JobStatus::Retrying => stats.retrying += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }

    /// Get a receiver for queue events.
    pub fn events(&self) -> broadcast::Receiver<QueueEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Resolve once the job reaches a terminal state and that state has
    /// been written to the content store.
    pub async fn wait(&self, job_id: Uuid) -> Result<ProcessingJob> {
        let mut events = self.events();
        loop {
            let job = self.status(job_id)?;
            if job.status.is_terminal() {
                self.inner.flush().await;
                return Ok(job);
            }
            match events.recv().await {
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => {
                    return Err(Error::Internal("Queue event bus closed".to_string()))
                }
            }
        }
    }

    /// Cancel a job.
    ///
    /// Pending and retrying jobs fail immediately. A processing job is flagged
    /// and fails once its in-flight call returns. Terminal jobs are left as is.
    pub async fn cancel(&self, job_id: Uuid) -> Result<ProcessingJob> {
        let (job, failed_now) = {
            let mut state = self.inner.state();
            let now = self.inner.clock.now();
            let entry = state
                .jobs
                .get_mut(&job_id)
                .ok_or(Error::JobNotFound(job_id))?;

            match entry.job.status {
                JobStatus::Pending | JobStatus::Retrying => {
                    entry.job.status = JobStatus::Failed;
                    entry.job.error = Some(CANCELLED.to_string());
                    entry.job.completed_at = Some(now);
                    entry.job.estimated_completion_at = None;
                    let job = entry.job.clone();
                    self.inner.record_status(&job);
                    state.pending.retain(|id| *id != job_id);
                    state.release_content(&job.content_id, job_id);
                    (job, true)
                }
                JobStatus::Processing => {
                    entry.cancel.store(true, Ordering::SeqCst);
                    (entry.job.clone(), false)
                }
                JobStatus::Completed | JobStatus::Failed => (entry.job.clone(), false),
            }
        };

        if failed_now {
            info!(%job_id, content_id = %job.content_id, "Job cancelled");
            self.inner.emit(QueueEvent::JobFailed {
                job_id,
                content_id: job.content_id.clone(),
                error: CANCELLED.to_string(),
            });
            self.inner.flush().await;
        } else if job.status == JobStatus::Processing {
            info!(%job_id, content_id = %job.content_id, "Cancellation requested for running job");
        }
        Ok(job)
    }

    pub fn is_halted(&self) -> bool {
        self.inner.state().halted
    }

    /// Clear a halt and start pending jobs again.
    pub fn resume(&self) {
        let was_halted = std::mem::replace(&mut self.inner.state().halted, false);
        if was_halted {
            info!("Processing queue resumed");
            self.inner.emit(QueueEvent::QueueResumed);
        }
        self.inner.drain();
    }
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: QueueEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Queue a status write for `job`. Call with the state lock held.
    fn record_status(&self, job: &ProcessingJob) {
        self.send_status(job, None);
    }

    /// Like `record_status`, resolving once the write has been applied.
    fn record_status_acked(&self, job: &ProcessingJob) -> oneshot::Receiver<()> {
        let (done, applied) = oneshot::channel();
        self.send_status(job, Some(done));
        applied
    }

    fn send_status(&self, job: &ProcessingJob, done: Option<oneshot::Sender<()>>) {
        let status = job.status.storage_status();
        let error = match status {
            ProcessingStatus::Failed => job.error.clone(),
            _ => None,
        };
        let write = StatusWrite::Update {
            job_id: job.id,
            content_id: job.content_id.clone(),
            status,
            error,
            done,
        };
        if self.status_tx.send(write).is_err() {
            error!(job_id = %job.id, content_id = %job.content_id, "Status writer stopped");
        }
    }

    /// Wait until every status write queued so far has been applied.
    async fn flush(&self) {
        let (done, applied) = oneshot::channel();
        if self.status_tx.send(StatusWrite::Flush(done)).is_ok() {
            let _ = applied.await;
        }
    }

    fn estimate_from(&self, now: chrono::DateTime<chrono::Utc>, delay: Duration) -> chrono::DateTime<chrono::Utc> {
        let delay = chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero());
        now + delay + chrono::Duration::seconds(self.config.estimated_job_secs)
    }

    /// Start pending jobs while there is capacity and the queue is not halted.
    fn drain(self: &Arc<Self>) {
        loop {
            let next = {
                let mut state = self.state();
                if state.halted || state.running >= self.config.max_concurrent {
                    return;
                }
                let Some(job_id) = state.pending.pop_front() else {
                    return;
                };
                let now = self.clock.now();
                let estimate = self.estimate_from(now, Duration::ZERO);
                let Some(entry) = state.jobs.get_mut(&job_id) else {
                    continue;
                };
                if entry.job.status.is_terminal() {
                    continue;
                }
                entry.job.status = JobStatus::Processing;
                entry.job.progress = 0;
                entry.job.estimated_completion_at = Some(estimate);
                let recorded = self.record_status_acked(&entry.job);
                let next = (
                    job_id,
                    entry.job.content_id.clone(),
                    entry.job.retry_count,
                    entry.cancel.clone(),
                    recorded,
                );
                state.running += 1;
                next
            };

            let shared = Arc::clone(self);
            tokio::spawn(async move {
                let (job_id, content_id, retry_count, cancel, recorded) = next;
                shared
                    .run_job(job_id, content_id, retry_count, cancel, recorded)
                    .await;
            });
        }
    }

    async fn run_job(
        self: Arc<Self>,
        job_id: Uuid,
        content_id: String,
        retry_count: u32,
        cancel: Arc<AtomicBool>,
        recorded: oneshot::Receiver<()>,
    ) {
        let start = Instant::now();
        info!(%job_id, %content_id, retry_count, "Processing job");
        self.emit(QueueEvent::JobStarted {
            job_id,
            content_id: content_id.clone(),
            retry_count,
        });
        // The handler persists results itself; it must not overtake this write.
        let _ = recorded.await;

        let progress = Arc::clone(&self);
        let ctx = JobContext::new(job_id, content_id.clone())
            .with_attempt(retry_count)
            .with_cancel_flag(cancel)
            .with_progress_callback(move |percent, message| {
                progress.set_progress(job_id, percent, message);
            });

        let handler = Arc::clone(&self.handler);
        let result = match tokio::spawn(async move { handler.execute(ctx).await }).await {
            Ok(result) => result,
            Err(e) => {
                error!(%job_id, error = ?e, "Job task panicked");
                Err(Error::Internal(format!("Job task panicked: {}", e)))
            }
        };

        self.finish(job_id, &content_id, result, start.elapsed());
    }

    fn set_progress(&self, job_id: Uuid, percent: u8, message: Option<&str>) {
        // 100 is reserved for completion.
        let percent = percent.min(99);
        {
            let mut state = self.state();
            match state.jobs.get_mut(&job_id) {
                Some(entry) if entry.job.status == JobStatus::Processing => {
                    entry.job.progress = entry.job.progress.max(percent);
                }
                _ => return,
            }
        }
        self.emit(QueueEvent::JobProgress {
            job_id,
            percent,
            message: message.map(String::from),
        });
    }

    fn finish(
        self: &Arc<Self>,
        job_id: Uuid,
        content_id: &str,
        result: Result<()>,
        elapsed: Duration,
    ) {
        let outcome = {
            let mut state = self.state();
            state.running = state.running.saturating_sub(1);
            let now = self.clock.now();
            let max_retries = self.config.max_retries;
            let retry_estimate = |retry_count: u32| {
                let delay = self.config.retry_delay(retry_count);
                (delay, self.estimate_from(now, delay))
            };

            let Some(entry) = state.jobs.get_mut(&job_id) else {
                error!(%job_id, "Finished job missing from queue");
                drop(state);
                self.drain();
                return;
            };
            let cancelled = entry.cancel.load(Ordering::SeqCst);

            let outcome = match result {
                Ok(()) => {
                    entry.job.status = JobStatus::Completed;
                    entry.job.progress = 100;
                    entry.job.completed_at = Some(now);
                    entry.job.error = None;
                    entry.job.estimated_completion_at = None;
                    Outcome::Completed
                }
                Err(e) if cancelled || matches!(e, Error::Cancelled) => {
                    entry.job.status = JobStatus::Failed;
                    entry.job.completed_at = Some(now);
                    entry.job.error = Some(CANCELLED.to_string());
                    entry.job.estimated_completion_at = None;
                    Outcome::Failed {
                        error: CANCELLED.to_string(),
                        kind: Error::Cancelled.kind(),
                        halt: false,
                    }
                }
                Err(e) if e.is_retryable() && entry.job.retry_count + 1 < max_retries => {
                    entry.job.retry_count += 1;
                    let retry_count = entry.job.retry_count;
                    let (delay, estimate) = retry_estimate(retry_count);
                    entry.job.status = JobStatus::Retrying;
                    entry.job.error = Some(e.to_string());
                    entry.job.estimated_completion_at = Some(estimate);
                    Outcome::Retry {
                        retry_count,
                        delay,
                        error: e.to_string(),
                        kind: e.kind(),
                    }
                }
                Err(e) => {
                    if e.is_retryable() {
                        entry.job.retry_count += 1;
                    }
                    let halt = e.halts_pipeline();
                    entry.job.status = JobStatus::Failed;
                    entry.job.completed_at = Some(now);
                    entry.job.error = Some(e.to_string());
                    entry.job.estimated_completion_at = None;
                    Outcome::Failed {
                        error: e.to_string(),
                        kind: e.kind(),
                        halt,
                    }
                }
            };

            // Completion is persisted by the handler; failures are written
            // here, before the content can be submitted again.
            if entry.job.status == JobStatus::Failed {
                self.record_status(&entry.job);
            }
            if entry.job.status.is_terminal() {
                state.release_content(content_id, job_id);
            }
            if let Outcome::Failed { halt: true, .. } = outcome {
                state.halted = true;
            }
            outcome
        };

        let duration_ms = elapsed.as_millis() as u64;
        match outcome {
            Outcome::Completed => {
                info!(%job_id, content_id, duration_ms, "Job completed successfully");
                self.emit(QueueEvent::JobCompleted {
                    job_id,
                    content_id: content_id.to_string(),
                    duration_ms,
                });
            }
            Outcome::Retry {
                retry_count,
                delay,
                error,
                kind,
            } => {
                let delay_ms = delay.as_millis() as u64;
                warn!(
                    %job_id,
                    content_id,
                    retry_count,
                    max_retries = self.config.max_retries,
                    delay_ms,
                    %error,
                    error_kind = kind,
                    "Job failed, retrying with backoff"
                );
                self.emit(QueueEvent::RetryScheduled {
                    job_id,
                    retry_count,
                    delay_ms,
                    error,
                });
                self.schedule_retry(job_id, delay);
            }
            Outcome::Failed { error, kind, halt } => {
                warn!(%job_id, content_id, %error, error_kind = kind, duration_ms, "Job failed");
                if halt {
                    warn!(%job_id, "Authorization failure, halting queue until resumed");
                    self.emit(QueueEvent::QueueHalted {
                        reason: error.clone(),
                    });
                }
                self.emit(QueueEvent::JobFailed {
                    job_id,
                    content_id: content_id.to_string(),
                    error,
                });
            }
        }

        self.drain();
    }

    fn schedule_retry(self: &Arc<Self>, job_id: Uuid, delay: Duration) {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            sleep(delay).await;
            {
                let mut state = shared.state();
                let still_retrying = state
                    .jobs
                    .get(&job_id)
                    .is_some_and(|e| e.job.status == JobStatus::Retrying);
                if !still_retrying {
                    return;
                }
                state.pending.push_front(job_id);
            }
            debug!(%job_id, "Retry re-queued");
            shared.drain();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use studia_core::InMemoryContentStore;

    /// Handler that fails with the scripted errors, then succeeds.
    struct Scripted {
        failures: Mutex<VecDeque<Error>>,
        calls: AtomicUsize,
        latency: Duration,
    }

    impl Scripted {
        fn new(failures: Vec<Error>) -> Self {
            Self {
                failures: Mutex::new(failures.into()),
                calls: AtomicUsize::new(0),
                latency: Duration::from_millis(100),
            }
        }
    }

    #[async_trait]
    impl JobHandler for Scripted {
        async fn execute(&self, ctx: JobContext) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ctx.report_progress(50, Some("working"));
            sleep(self.latency).await;
            if ctx.is_cancelled() {
                return Err(Error::Cancelled);
            }
            match self.failures.lock().unwrap().pop_front() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
    }

    fn queue(handler: Scripted, config: QueueConfig) -> (ProcessingQueue, Arc<Scripted>) {
        let handler = Arc::new(handler);
        let queue = ProcessingQueue::new(
            config,
            handler.clone(),
            Arc::new(InMemoryContentStore::new()),
        );
        (queue, handler)
    }

    #[test]
    fn test_queue_config_default() {
        let config = QueueConfig::default();
        assert_eq!(config.max_concurrent, 3);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.base_delay_ms, 2000);
        assert_eq!(config.estimated_job_secs, 60);
    }

    #[test]
    fn test_queue_config_builder() {
        let config = QueueConfig::default()
            .with_max_concurrent(0)
            .with_max_retries(5)
            .with_base_delay_ms(10)
            .with_estimated_job_secs(30);
        assert_eq!(config.max_concurrent, 1);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.base_delay_ms, 10);
        assert_eq!(config.estimated_job_secs, 30);
    }

    #[test]
    fn test_retry_delay_doubles() {
        let config = QueueConfig::default();
        assert_eq!(config.retry_delay(1), Duration::from_millis(2000));
        assert_eq!(config.retry_delay(2), Duration::from_millis(4000));
        assert_eq!(config.retry_delay(3), Duration::from_millis(8000));
        assert!(config.retry_delay(200) >= config.retry_delay(3));
    }

    #[test]
    fn test_queue_event_serializes_with_tag() {
        let event = QueueEvent::RetryScheduled {
            job_id: Uuid::nil(),
            retry_count: 1,
            delay_ms: 2000,
            error: "Server error: 503".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "retry_scheduled");
        assert_eq!(json["delay_ms"], 2000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_sets_progress_100() {
        let (queue, _) = queue(Scripted::new(vec![]), QueueConfig::default());
        let id = queue.submit("ep-1").unwrap();

        let job = queue.wait(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert!(job.completed_at.is_some());
        assert!(job.error.is_none());
        assert_eq!(job.retry_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_unknown_job() {
        let (queue, _) = queue(Scripted::new(vec![]), QueueConfig::default());
        let missing = Uuid::new_v4();
        assert!(matches!(queue.status(missing), Err(Error::JobNotFound(id)) if id == missing));
        assert!(matches!(queue.cancel(missing).await, Err(Error::JobNotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_job_estimate() {
        let (queue, _) = queue(Scripted::new(vec![]), QueueConfig::default());
        let id = queue.submit("ep-1").unwrap();
        let job = queue.status(id).unwrap();
        let estimate = job.estimated_completion_at.unwrap();
        assert!(estimate >= job.started_at + chrono::Duration::seconds(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_exhausted() {
        let failures = (0..5).map(|_| Error::ServerError("503".into())).collect();
        let (queue, handler) = queue(Scripted::new(failures), QueueConfig::default());
        let id = queue.submit("ep-1").unwrap();

        let job = queue.wait(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.retry_count, 3);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 3);
        assert!(job.error.unwrap().contains("503"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_fails_immediately() {
        let (queue, handler) = queue(
            Scripted::new(vec![Error::MalformedResponse("bad".into())]),
            QueueConfig::default(),
        );
        let id = queue.submit("ep-1").unwrap();

        let job = queue.wait(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.retry_count, 0);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_submission_rejected_while_active() {
        let (queue, _) = queue(Scripted::new(vec![]), QueueConfig::default());
        let first = queue.submit("ep-1").unwrap();

        match queue.submit("ep-1") {
            Err(Error::DuplicateJob { content_id, job_id }) => {
                assert_eq!(content_id, "ep-1");
                assert_eq!(job_id, first);
            }
            other => panic!("Expected DuplicateJob, got {:?}", other),
        }

        queue.wait(first).await.unwrap();
        let second = queue.submit("ep-1").unwrap();
        assert_ne!(first, second);
        assert_eq!(queue.jobs().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_events_are_clamped() {
        let (queue, _) = queue(Scripted::new(vec![]), QueueConfig::default());
        let mut events = queue.events();
        let id = queue.submit("ep-1").unwrap();
        queue.wait(id).await.unwrap();

        let mut saw_progress = false;
        while let Ok(event) = events.try_recv() {
            if let QueueEvent::JobProgress { percent, .. } = event {
                assert!(percent <= 99);
                saw_progress = true;
            }
        }
        assert!(saw_progress);
    }
}
