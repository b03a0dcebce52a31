//! Single-job pipeline: fetch, prompt, pace, generate, parse, validate, persist.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use studia_core::defaults::CONTENT_VERSION;
use studia_core::{ContentMetadata, ContentStore, Error, GenerationBackend, Result};
use studia_inference::{ContentValidator, PromptBuilder, ResponseParser};

use crate::handler::{JobContext, JobHandler};
use crate::rate_limiter::RateLimiter;

/// Runs one generation attempt for a content item.
///
/// Failures are returned as typed errors and never retried here.
pub struct ContentProcessor {
    store: Arc<dyn ContentStore>,
    backend: Arc<dyn GenerationBackend>,
    limiter: Arc<RateLimiter>,
    prompts: PromptBuilder,
    parser: ResponseParser,
    validator: ContentValidator,
}

impl ContentProcessor {
    pub fn new(
        store: Arc<dyn ContentStore>,
        backend: Arc<dyn GenerationBackend>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            store,
            backend,
            limiter,
            prompts: PromptBuilder::new(),
            parser: ResponseParser::new(),
            validator: ContentValidator::new(),
        }
    }

    pub fn with_validator(mut self, validator: ContentValidator) -> Self {
        self.validator = validator;
        self
    }
}

#[async_trait]
impl JobHandler for ContentProcessor {
    async fn execute(&self, ctx: JobContext) -> Result<()> {
        let start = Instant::now();
        let job_id = ctx.job_id;
        let attempt = ctx.attempt;
        let content_id = ctx.content_id.as_str();

        ctx.report_progress(10, Some("Fetching content"));
        let request = self.store.fetch_request(content_id).await?;
        request.validate()?;

        ctx.report_progress(20, Some("Building prompt"));
        let prompt = self.prompts.build(&request);
        debug!(%job_id, content_id, attempt, prompt_len = prompt.len(), "Prompt built");

        ctx.report_progress(30, Some("Waiting for rate limit"));
        self.limiter.acquire().await?;

        debug!(
            %job_id,
            content_id,
            attempt,
            model = self.backend.model_name(),
            "Calling generation service"
        );
        let reply = self.backend.generate(&prompt.system, &prompt.user).await?;

        ctx.report_progress(80, Some("Parsing response"));
        let mut content = self.parser.parse(&reply)?;

        ctx.report_progress(85, Some("Validating content"));
        let report = self
            .validator
            .validate(&content, request.duration_hours)
            .into_result()
            .inspect_err(|e| {
                warn!(%job_id, content_id, attempt, error = %e, "Generated content rejected")
            })?;
        for warning in &report.warnings {
            debug!(%job_id, content_id, warning = %warning, "Validation warning");
        }

        ctx.report_progress(90, Some("Saving content"));
        content.metadata = ContentMetadata {
            processing_time_ms: start.elapsed().as_millis() as u64,
            content_version: CONTENT_VERSION,
            model_identifier: self.backend.model_name().to_string(),
        };

        if ctx.is_cancelled() {
            info!(%job_id, content_id, attempt, "Job cancelled, discarding result");
            return Err(Error::Cancelled);
        }
        self.store.save_generated(content_id, &content).await?;
        ctx.report_progress(95, Some("Saved"));

        info!(
            %job_id,
            content_id,
            attempt,
            questions = content.questions.len(),
            clarity = report.quality.clarity_score,
            relevance = report.quality.relevance_score,
            duration_ms = content.metadata.processing_time_ms,
            "Content generated"
        );
        Ok(())
    }
}
