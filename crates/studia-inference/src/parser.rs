//! Strict parsing of the generation service's structured reply.
//!
//! The reply is untrusted: its top-level shape is checked by deserializing
//! into private raw types, and only then converted into `GeneratedContent`.
//! Per-question structural rules are left to the validator so that every
//! violation is reported, not just the first.

use serde::Deserialize;
use tracing::debug;

use studia_core::defaults::QUESTION_TIME_SECS;
use studia_core::{
    Confidence, ContentMetadata, Error, GeneratedContent, Question, QuestionMetadata,
    QuestionType, Result,
};

use crate::text::is_bulleted_line;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawContent {
    #[serde(alias = "quick_summary")]
    quick_summary: Vec<String>,
    #[serde(alias = "full_summary")]
    full_summary: Vec<String>,
    questions: Vec<RawQuestion>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    content: String,
    #[serde(default, rename = "type", alias = "questionType")]
    question_type: Option<QuestionType>,
    #[serde(default, alias = "difficulty_level", alias = "difficulty")]
    difficulty_level: i64,
    #[serde(default, alias = "estimated_time_seconds")]
    estimated_time_seconds: Option<u32>,
    #[serde(default)]
    confidence: Option<Confidence>,
    #[serde(default)]
    metadata: Option<QuestionMetadata>,
}

/// Parses raw replies into `GeneratedContent`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseParser;

impl ResponseParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a reply.
    ///
    /// # Errors
    /// - `EmptyResponse` if the reply is blank.
    /// - `MalformedResponse` if it is not a JSON object with `quickSummary`,
    ///   `fullSummary` and `questions` of the expected types.
    pub fn parse(&self, raw: &str) -> Result<GeneratedContent> {
        let body = strip_code_fence(strip_reasoning(raw));
        if body.is_empty() {
            return Err(Error::EmptyResponse);
        }
        let body = outer_object(body);

        let parsed: RawContent =
            serde_json::from_str(body).map_err(|e| Error::MalformedResponse(e.to_string()))?;

        let quick_summary = parsed
            .quick_summary
            .iter()
            // One bullet per line, whatever whitespace the model put inside it.
            .map(|b| b.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|b| !b.is_empty())
            .map(|b| {
                if is_bulleted_line(&b) {
                    b
                } else {
                    format!("• {b}")
                }
            })
            .collect::<Vec<_>>()
            .join("\n");

        let full_summary = parsed
            .full_summary
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

        let questions: Vec<Question> = parsed
            .questions
            .into_iter()
            .enumerate()
            .map(|(i, q)| Question {
                id: q
                    .id
                    .map(|id| id.trim().to_string())
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| format!("q{}", i + 1)),
                content: q.content.trim().to_string(),
                question_type: q.question_type,
                difficulty_level: q.difficulty_level,
                estimated_time_seconds: q.estimated_time_seconds.unwrap_or(QUESTION_TIME_SECS),
                confidence: q.confidence,
                metadata: q.metadata.unwrap_or_default(),
            })
            .collect();

        debug!(
            response_len = raw.len(),
            questions = questions.len(),
            "Parsed generation response"
        );

        Ok(GeneratedContent {
            quick_summary,
            full_summary,
            questions,
            metadata: ContentMetadata::default(),
        })
    }
}

/// Drop a leading `<think>...</think>` block emitted by reasoning models.
fn strip_reasoning(raw: &str) -> &str {
    let trimmed = raw.trim_start();
    if trimmed.starts_with("<think>") {
        if let Some(end) = trimmed.find("</think>") {
            return &trimmed[end + "</think>".len()..];
        }
    }
    raw
}

/// Unwrap a single surrounding Markdown code fence, with or without a language tag.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest
        .strip_prefix("json")
        .or_else(|| rest.strip_prefix("JSON"))
        .unwrap_or(rest);
    match rest.trim_end().strip_suffix("```") {
        Some(inner) => inner.trim(),
        None => trimmed,
    }
}

/// Slice from the first `{` to the last `}`, dropping prose around the object.
fn outer_object(body: &str) -> &str {
    match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => body,
    }
}
