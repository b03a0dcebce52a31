//! Prompt construction for structured learning-material generation.
//!
//! The builder is a pure function of the request: the same request always
//! yields byte-identical prompts, so a reply can be parsed deterministically
//! against the schema described in the system prompt.

use studia_core::defaults::{
    BULLETS_PER_HOUR, MIN_BULLETS, MIN_PARAGRAPHS, MIN_QUESTIONS, PARAGRAPHS_PER_HOUR,
    QUESTIONS_PER_HOUR,
};
use studia_core::ContentGenerationRequest;

/// Duration-derived structural targets for one content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentTargets {
    pub quick_bullets: usize,
    pub full_paragraphs: usize,
    pub question_count: usize,
}

impl ContentTargets {
    /// `max(min, ceil(hours * per_hour))` for each of bullets, paragraphs and questions.
    pub fn for_duration(duration_hours: f64) -> Self {
        Self {
            quick_bullets: scaled(duration_hours, BULLETS_PER_HOUR, MIN_BULLETS),
            full_paragraphs: scaled(duration_hours, PARAGRAPHS_PER_HOUR, MIN_PARAGRAPHS),
            question_count: scaled(duration_hours, QUESTIONS_PER_HOUR, MIN_QUESTIONS),
        }
    }

    /// Requested question counts per type, following the 40/30/20/10 mix.
    pub fn type_mix(&self) -> TypeMix {
        let n = self.question_count;
        let conceptual = share(n, 0.4);
        let factual = share(n, 0.3);
        let application = share(n, 0.2);
        TypeMix {
            conceptual,
            factual,
            application,
            reflection: n.saturating_sub(conceptual + factual + application),
        }
    }

    /// Requested question counts per difficulty band, following the 20/60/20 mix.
    pub fn difficulty_mix(&self) -> DifficultyMix {
        let n = self.question_count;
        let easy = share(n, 0.2);
        let hard = share(n, 0.2);
        DifficultyMix {
            easy,
            medium: n.saturating_sub(easy + hard),
            hard,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMix {
    pub conceptual: usize,
    pub factual: usize,
    pub application: usize,
    pub reflection: usize,
}

/// Easy is levels 1-2, medium levels 3-4, hard level 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifficultyMix {
    pub easy: usize,
    pub medium: usize,
    pub hard: usize,
}

fn scaled(hours: f64, per_hour: f64, min: usize) -> usize {
    let raw = (hours * per_hour).ceil();
    if raw.is_finite() && raw > 0.0 {
        (raw as usize).max(min)
    } else {
        min
    }
}

fn share(total: usize, fraction: f64) -> usize {
    (total as f64 * fraction).round() as usize
}

/// System and user messages for one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    /// Combined byte length, for logging.
    pub fn len(&self) -> usize {
        self.system.len() + self.user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.system.is_empty() && self.user.is_empty()
    }
}

const OUTPUT_SCHEMA: &str = r#"{
  "quickSummary": ["<one-sentence bullet>", "..."],
  "fullSummary": ["<paragraph>", "..."],
  "questions": [
    {
      "id": "q1",
      "content": "<question text>",
      "type": "conceptual | factual | application | reflection",
      "difficultyLevel": 3,
      "estimatedTimeSeconds": 20,
      "confidence": "high | medium | low",
      "metadata": { "keywords": ["<keyword>"], "conceptArea": "<topic>" }
    }
  ]
}"#;

const SYSTEM_RULES: &str = "\
You are an expert educator who turns long-form transcripts into study material.

Rules:
- Base every bullet, paragraph and question strictly on the transcript.
- Quick-summary bullets are single sentences covering consecutive parts of the content in order.
- Full-summary paragraphs are at least three sentences each and read as a narrative.
- Questions must be answerable from the transcript and phrased as complete questions.
- Question type mix: about 40% conceptual, 30% factual, 20% application, 10% reflection.
- Difficulty mix: about 20% at levels 1-2, 60% at levels 3-4, 20% at level 5.
- estimatedTimeSeconds is the time to answer, typically between 15 and 30.";

/// Builds generation prompts from content requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Targets the prompt will request for this content.
    pub fn targets(&self, request: &ContentGenerationRequest) -> ContentTargets {
        ContentTargets::for_duration(request.duration_hours)
    }

    pub fn build(&self, request: &ContentGenerationRequest) -> Prompt {
        let targets = self.targets(request);
        let types = targets.type_mix();
        let difficulty = targets.difficulty_mix();

        let system = format!(
            "{SYSTEM_RULES}\n\nRespond with a single JSON object and nothing else, \
             matching this schema:\n{OUTPUT_SCHEMA}"
        );

        let user = format!(
            "Title: {title}\n\
             Source: {source}\n\
             Duration: {hours} hours\n\
             \n\
             Produce exactly:\n\
             - {bullets} quickSummary bullets (one per ~15 minutes of content)\n\
             - {paragraphs} fullSummary paragraphs (one per ~30 minutes of content)\n\
             - {questions} questions: {conceptual} conceptual, {factual} factual, \
             {application} application, {reflection} reflection\n\
             - Difficulty: {easy} at levels 1-2, {medium} at levels 3-4, {hard} at level 5\n\
             \n\
             Transcript:\n\
             \"\"\"\n\
             {transcript}\n\
             \"\"\"",
            title = request.title.trim(),
            source = request.source.as_str(),
            hours = request.duration_hours,
            bullets = targets.quick_bullets,
            paragraphs = targets.full_paragraphs,
            questions = targets.question_count,
            conceptual = types.conceptual,
            factual = types.factual,
            application = types.application,
            reflection = types.reflection,
            easy = difficulty.easy,
            medium = difficulty.medium,
            hard = difficulty.hard,
            transcript = request.transcript.trim(),
        );

        Prompt { system, user }
    }
}
