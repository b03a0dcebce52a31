//! Structural and quality validation of generated learning material.
//!
//! Every rule runs independently and contributes its own diagnostics; a
//! failing rule never hides the others. Quality scores are advisory and never
//! affect `is_valid`.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use studia_core::defaults::{
    MIN_DISTINCT_DIFFICULTIES, MIN_PARAGRAPH_CHARS, MIN_QUESTIONS, MIN_QUESTION_CHARS,
    QUALITY_BASELINE, TARGET_TOLERANCE,
};
use studia_core::{GeneratedContent, QualityReport, QuestionType, ValidationResult};

use crate::prompt::ContentTargets;
use crate::text::{count_bullets, count_paragraphs};

const STRUCTURE_PENALTY: f64 = 0.1;
const QUESTION_COUNT_PENALTY: f64 = 0.2;
const INVALID_QUESTION_PENALTY: f64 = 0.05;
const SPREAD_PENALTY: f64 = 0.05;

/// Checks generated content against duration-derived expectations.
#[derive(Debug, Clone, Copy)]
pub struct ContentValidator {
    tolerance: f64,
}

impl Default for ContentValidator {
    fn default() -> Self {
        Self {
            tolerance: TARGET_TOLERANCE,
        }
    }
}

impl ContentValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a validator from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `GEN_VALIDATION_TOLERANCE` | `0.8` | Fraction of each target that must be met |
    pub fn from_env() -> Self {
        let tolerance = std::env::var("GEN_VALIDATION_TOLERANCE")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|t| t.is_finite())
            .unwrap_or(TARGET_TOLERANCE);
        Self::new().with_tolerance(tolerance)
    }

    /// Fraction of each target that must be met (default 0.8).
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance.clamp(0.0, 1.0);
        self
    }

    pub fn validate(&self, content: &GeneratedContent, duration_hours: f64) -> ValidationResult {
        let targets = ContentTargets::for_duration(duration_hours);
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut clarity = QUALITY_BASELINE;
        let mut relevance = QUALITY_BASELINE;

        let bullets = count_bullets(&content.quick_summary);
        if self.below_target(bullets, targets.quick_bullets) {
            errors.push(format!(
                "Quick summary has {} bullet points, expected at least {:.0}% of {}",
                bullets,
                self.tolerance * 100.0,
                targets.quick_bullets
            ));
            clarity -= STRUCTURE_PENALTY;
        }

        let paragraphs = count_paragraphs(&content.full_summary, MIN_PARAGRAPH_CHARS);
        if self.below_target(paragraphs, targets.full_paragraphs) {
            errors.push(format!(
                "Full summary has {} paragraphs over {} characters, expected at least {:.0}% of {}",
                paragraphs,
                MIN_PARAGRAPH_CHARS,
                self.tolerance * 100.0,
                targets.full_paragraphs
            ));
            clarity -= STRUCTURE_PENALTY;
        }

        let question_count = content.questions.len();
        if self.below_target(question_count, targets.question_count) {
            errors.push(format!(
                "Generated {} questions, expected at least {:.0}% of {}",
                question_count,
                self.tolerance * 100.0,
                targets.question_count
            ));
            relevance -= QUESTION_COUNT_PENALTY;
        }

        let mut distribution = [0usize; 5];
        let mut type_counts: HashMap<QuestionType, usize> = HashMap::new();
        let mut seen_ids = HashSet::new();

        for question in &content.questions {
            let mut question_errors = Vec::new();
            let length = question.content.trim().chars().count();

            if length == 0 {
                question_errors.push(format!("Question {} has empty content", question.id));
            } else if length < MIN_QUESTION_CHARS {
                question_errors.push(format!(
                    "Question {} content is shorter than {} characters",
                    question.id, MIN_QUESTION_CHARS
                ));
            }

            match question.question_type {
                Some(kind) => *type_counts.entry(kind).or_default() += 1,
                None => question_errors.push(format!("Question {} is missing a type", question.id)),
            }

            match question.difficulty_level {
                level @ 1..=5 => distribution[(level - 1) as usize] += 1,
                level => question_errors.push(format!(
                    "Question {} has difficulty level {}, expected 1-5",
                    question.id, level
                )),
            }

            if !seen_ids.insert(question.id.as_str()) {
                warnings.push(format!("Duplicate question id {}", question.id));
            }

            if !question_errors.is_empty() {
                relevance -= INVALID_QUESTION_PENALTY;
                errors.extend(question_errors);
            }
        }

        let distinct_levels = distribution.iter().filter(|&&n| n > 0).count();
        if !content.questions.is_empty() && distinct_levels < MIN_DISTINCT_DIFFICULTIES {
            warnings.push(format!(
                "Questions span {} difficulty levels, expected at least {}",
                distinct_levels, MIN_DISTINCT_DIFFICULTIES
            ));
            relevance -= SPREAD_PENALTY;
        }

        if question_count >= MIN_QUESTIONS {
            for kind in QuestionType::ALL {
                if !type_counts.contains_key(&kind) {
                    warnings.push(format!("No {} questions generated", kind.as_str()));
                }
            }
        }

        let result = ValidationResult {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            quality: QualityReport {
                clarity_score: clarity.clamp(0.0, 1.0),
                relevance_score: relevance.clamp(0.0, 1.0),
                difficulty_distribution: distribution,
            },
        };

        debug!(
            is_valid = result.is_valid,
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            bullets,
            paragraphs,
            questions = question_count,
            "Validated generated content"
        );

        result
    }

    fn below_target(&self, actual: usize, target: usize) -> bool {
        (actual as f64) < target as f64 * self.tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studia_core::{ContentMetadata, Question, QuestionMetadata};

    const LEVELS: [i64; 12] = [1, 2, 3, 3, 3, 4, 4, 4, 3, 4, 5, 5];
    const TYPES: [QuestionType; 4] = QuestionType::ALL;

    fn question(i: usize, level: i64) -> Question {
        Question {
            id: format!("q{}", i + 1),
            content: format!("What is the main idea of section {}?", i + 1),
            question_type: Some(TYPES[i % TYPES.len()]),
            difficulty_level: level,
            estimated_time_seconds: 20,
            confidence: None,
            metadata: QuestionMetadata::default(),
        }
    }

    fn paragraph(n: usize) -> String {
        format!("Paragraph {n} walks through the argument in enough detail to be useful.")
    }

    fn content(bullets: usize, paragraphs: usize, questions: Vec<Question>) -> GeneratedContent {
        GeneratedContent {
            quick_summary: (1..=bullets)
                .map(|i| format!("• Point {i}"))
                .collect::<Vec<_>>()
                .join("\n"),
            full_summary: (1..=paragraphs)
                .map(paragraph)
                .collect::<Vec<_>>()
                .join("\n\n"),
            questions,
            metadata: ContentMetadata::default(),
        }
    }

    fn twelve_questions() -> Vec<Question> {
        LEVELS
            .iter()
            .enumerate()
            .map(|(i, &level)| question(i, level))
            .collect()
    }

    #[test]
    fn test_one_hour_exact_targets_are_valid() {
        let result = ContentValidator::new().validate(&content(4, 2, twelve_questions()), 1.0);
        assert!(result.is_valid, "errors: {:?}", result.errors);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty(), "warnings: {:?}", result.warnings);
        assert_eq!(result.quality.clarity_score, QUALITY_BASELINE);
        assert_eq!(result.quality.relevance_score, QUALITY_BASELINE);
        assert_eq!(result.quality.difficulty_distribution, [1, 1, 4, 4, 2]);
    }

    #[test]
    fn test_half_the_bullets_is_rejected() {
        let result = ContentValidator::new().validate(&content(2, 2, twelve_questions()), 1.0);
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("2 bullet points"));
        assert!(result.errors[0].contains("of 4"));
        assert!(result.quality.clarity_score < QUALITY_BASELINE);
    }

    #[test]
    fn test_eighty_percent_is_enough() {
        // 2h: 8 bullets, 4 paragraphs, 24 questions; 80% = 6.4, 3.2, 19.2
        let questions: Vec<Question> = (0..20).map(|i| question(i, (i % 5 + 1) as i64)).collect();
        let result = ContentValidator::new().validate(&content(7, 4, questions), 2.0);
        assert!(result.is_valid, "errors: {:?}", result.errors);

        let questions: Vec<Question> = (0..19).map(|i| question(i, (i % 5 + 1) as i64)).collect();
        let result = ContentValidator::new().validate(&content(6, 3, questions), 2.0);
        assert_eq!(result.errors.len(), 3, "errors: {:?}", result.errors);
    }

    #[test]
    fn test_short_paragraphs_do_not_count() {
        let mut c = content(4, 0, twelve_questions());
        c.full_summary = "Too short.\n\nAlso short.".to_string();
        let result = ContentValidator::new().validate(&c, 1.0);
        assert!(!result.is_valid);
        assert!(result.errors[0].contains("0 paragraphs"));
    }

    #[test]
    fn test_all_rules_are_collected() {
        let mut questions = twelve_questions();
        questions.truncate(5);
        questions[0].content = String::new();
        questions[1].question_type = None;
        questions[2].difficulty_level = 7;
        questions[3].content = "Why?".to_string();

        let result = ContentValidator::new().validate(&content(1, 1, questions), 1.0);
        assert!(!result.is_valid);
        let joined = result.errors.join("\n");
        assert!(joined.contains("bullet points"));
        assert!(joined.contains("paragraphs"));
        assert!(joined.contains("Generated 5 questions"));
        assert!(joined.contains("q1 has empty content"));
        assert!(joined.contains("q2 is missing a type"));
        assert!(joined.contains("q3 has difficulty level 7"));
        assert!(joined.contains("q4 content is shorter than 10 characters"));
        assert_eq!(result.errors.len(), 7);
    }

    #[test]
    fn test_narrow_difficulty_spread_is_a_warning() {
        let questions: Vec<Question> = (0..12).map(|i| question(i, 3 + (i % 2) as i64)).collect();
        let result = ContentValidator::new().validate(&content(4, 2, questions), 1.0);
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("2 difficulty levels"));
        assert!(result.quality.relevance_score < QUALITY_BASELINE);
    }

    #[test]
    fn test_missing_question_type_is_a_warning() {
        let questions: Vec<Question> = twelve_questions()
            .into_iter()
            .map(|mut q| {
                if q.question_type == Some(QuestionType::Reflection) {
                    q.question_type = Some(QuestionType::Factual);
                }
                q
            })
            .collect();
        let result = ContentValidator::new().validate(&content(4, 2, questions), 1.0);
        assert!(result.is_valid);
        assert_eq!(result.warnings, vec!["No reflection questions generated"]);
    }

    #[test]
    fn test_duplicate_ids_are_a_warning() {
        let mut questions = twelve_questions();
        questions[1].id = "q1".to_string();
        let result = ContentValidator::new().validate(&content(4, 2, questions), 1.0);
        assert!(result.is_valid);
        assert_eq!(result.warnings, vec!["Duplicate question id q1"]);
    }

    #[test]
    fn test_scores_stay_in_unit_range() {
        let questions: Vec<Question> = (0..30)
            .map(|i| {
                let mut q = question(i, 9);
                q.content = String::new();
                q
            })
            .collect();
        let result = ContentValidator::new().validate(&content(0, 0, questions), 1.0);
        assert!(!result.is_valid);
        assert!((0.0..=1.0).contains(&result.quality.relevance_score));
        assert!((0.0..=1.0).contains(&result.quality.clarity_score));
        assert_eq!(result.quality.relevance_score, 0.0);
    }

    #[test]
    fn test_custom_tolerance() {
        let validator = ContentValidator::new().with_tolerance(0.5);
        let result = validator.validate(&content(2, 1, twelve_questions()[..6].to_vec()), 1.0);
        assert!(result.is_valid, "errors: {:?}", result.errors);
    }
}
