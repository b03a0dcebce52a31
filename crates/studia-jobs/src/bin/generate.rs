//! Studia content generator
//!
//! Runs a batch of content items through the generation pipeline and prints
//! the resulting jobs and generated material as JSON on stdout.
//!
//! Usage:
//!   studia-generate requests.json
//!   studia-generate requests.json --concurrency 2 --pretty
//!
//! `requests.json` holds an array of objects with `content_id`, `title`,
//! `transcript`, `duration_hours` and optional `source`.
//!
//! Environment:
//!   OPENAI_BASE_URL, OPENAI_API_KEY, OPENAI_GEN_MODEL, OPENAI_TIMEOUT,
//!   OPENAI_TEMPERATURE, GEN_MAX_CONCURRENT, GEN_MAX_RETRIES,
//!   GEN_RETRY_BASE_DELAY_MS, GEN_RATE_LIMIT_PER_MINUTE, GEN_RATE_LIMIT_PER_DAY,
//!   GEN_VALIDATION_TOLERANCE,
//!   LOG_FORMAT ("json" or "text"), RUST_LOG

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use studia_core::{ContentGenerationRequest, InMemoryContentStore, JobStatus, SystemClock};
use studia_inference::{ContentValidator, OpenAIBackend};
use studia_jobs::{
    ContentProcessor, ProcessingQueue, QueueConfig, QueueEvent, RateLimiter, RateLimiterConfig,
};

#[derive(Debug, Default)]
struct Args {
    input: Option<PathBuf>,
    concurrency: Option<usize>,
    pretty: bool,
}

fn parse_args() -> anyhow::Result<Args> {
    let args: Vec<String> = env::args().collect();
    let mut result = Args::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--concurrency" | "-c" => {
                i += 1;
                let value = args.get(i).context("--concurrency needs a value")?;
                result.concurrency = Some(
                    value
                        .parse()
                        .with_context(|| format!("Invalid concurrency: {}", value))?,
                );
            }
            "--pretty" | "-p" => result.pretty = true,
            "--help" | "-h" => {
                println!("Usage: studia-generate <requests.json> [--concurrency N] [--pretty]");
                std::process::exit(0);
            }
            other if other.starts_with('-') => bail!("Unknown option: {}", other),
            path => result.input = Some(PathBuf::from(path)),
        }
        i += 1;
    }

    Ok(result)
}

fn init_logging() {
    // LOG_FORMAT - "json" or "text" (default: "text")
    // RUST_LOG   - standard env filter (default: info for the studia crates)
    let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "studia_core=info,studia_inference=info,studia_jobs=info,studia_generate=info".into()
    });

    let registry = tracing_subscriber::registry().with(env_filter);
    if log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let args = parse_args()?;
    let Some(input) = args.input else {
        bail!("Usage: studia-generate <requests.json> [--concurrency N] [--pretty]");
    };

    let raw = std::fs::read_to_string(&input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let requests: Vec<ContentGenerationRequest> =
        serde_json::from_str(&raw).context("Input must be a JSON array of content requests")?;
    for request in &requests {
        request
            .validate()
            .with_context(|| format!("Invalid request {}", request.content_id))?;
    }
    info!(count = requests.len(), input = %input.display(), "Loaded content requests");

    let mut queue_config = QueueConfig::from_env();
    if let Some(n) = args.concurrency {
        queue_config = queue_config.with_max_concurrent(n);
    }

    let store = Arc::new(InMemoryContentStore::with_requests(requests.clone()));
    let backend = Arc::new(OpenAIBackend::from_env()?);
    let limiter = Arc::new(RateLimiter::new(
        RateLimiterConfig::from_env(),
        Arc::new(SystemClock),
    ));
    let processor = ContentProcessor::new(store.clone(), backend, limiter.clone())
        .with_validator(ContentValidator::from_env());
    let queue = ProcessingQueue::new(queue_config, Arc::new(processor), store.clone());

    // Jobs queued behind a halt never start; fail them.
    let mut events = queue.events();
    let watcher = {
        let queue = queue.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(QueueEvent::QueueHalted { reason }) => {
                        warn!(%reason, "Queue halted, cancelling remaining jobs");
                        for job in queue.jobs().into_iter().filter(|j| j.status.is_active()) {
                            let _ = queue.cancel(job.id).await;
                        }
                    }
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                }
            }
        })
    };

    let mut job_ids = Vec::with_capacity(requests.len());
    for request in &requests {
        match queue.submit(request.content_id.clone()) {
            Ok(id) => job_ids.push(id),
            Err(e) => warn!(content_id = %request.content_id, error = %e, "Skipping request"),
        }
    }

    let mut jobs = Vec::with_capacity(job_ids.len());
    for id in job_ids {
        jobs.push(queue.wait(id).await?);
    }

    watcher.abort();

    let mut content = BTreeMap::new();
    for job in jobs.iter().filter(|j| j.status == JobStatus::Completed) {
        if let Some(generated) = store.generated(&job.content_id).await {
            content.insert(job.content_id.clone(), generated);
        }
    }

    let stats = queue.stats();
    info!(
        completed = stats.completed,
        failed = stats.failed,
        halted = stats.halted,
        "Batch finished"
    );

    let output = json!({
        "jobs": jobs,
        "content": content,
        "stats": stats,
        "rate_limit": limiter.snapshot().await,
    });
    let rendered = if args.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{}", rendered);

    if stats.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
