//! # studia-jobs
//!
//! Asynchronous processing pipeline for content generation.
//!
//! This crate provides:
//! - A sliding-window and daily-quota rate limiter for the generation service
//! - The per-job processor (fetch, prompt, generate, parse, validate, persist)
//! - A bounded-concurrency queue with exponential-backoff retries
//! - Lifecycle notifications via broadcast channels
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use studia_core::{InMemoryContentStore, SystemClock};
//! use studia_inference::OpenAIBackend;
//! use studia_jobs::{ContentProcessor, ProcessingQueue, QueueConfig, RateLimiter, RateLimiterConfig};
//!
//! let store = Arc::new(InMemoryContentStore::new());
//! let limiter = Arc::new(RateLimiter::new(RateLimiterConfig::from_env(), Arc::new(SystemClock)));
//! let processor = ContentProcessor::new(store.clone(), Arc::new(OpenAIBackend::from_env()?), limiter);
//! let queue = ProcessingQueue::new(QueueConfig::from_env(), Arc::new(processor), store);
//!
//! let job_id = queue.submit("episode-42")?;
//! let job = queue.wait(job_id).await?;
//! println!("{:?} after {} retries", job.status, job.retry_count);
//! ```

pub mod handler;
pub mod processor;
pub mod queue;
pub mod rate_limiter;

pub use handler::{JobContext, JobHandler, ProgressCallback};
pub use processor::ContentProcessor;
pub use queue::{ProcessingQueue, QueueConfig, QueueEvent};
pub use rate_limiter::{RateLimiter, RateLimiterConfig, RateLimiterStats};
