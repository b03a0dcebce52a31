//! # studia-inference
//!
//! Prompting, parsing and validation for structured learning-material
//! generation.
//!
//! This crate provides:
//! - Duration-derived content targets and deterministic prompt construction
//! - Strict parsing of the structured reply into `GeneratedContent`
//! - Structural validation with advisory quality scores
//! - OpenAI-compatible generation backend (feature `openai`)
//! - Scripted mock backend for tests (feature `mock`)
//!
//! # Feature Flags
//!
//! - `openai` (default): Enable OpenAI-compatible backend
//! - `mock`: Enable `ScriptedBackend` outside this crate's own tests
//!
//! # Example
//!
//! ```rust,no_run
//! use studia_core::{ContentGenerationRequest, ContentSource, GenerationBackend};
//! use studia_inference::{ContentValidator, OpenAIBackend, PromptBuilder, ResponseParser};
//!
//! #[tokio::main]
//! async fn main() {
//!     let request = ContentGenerationRequest::new(
//!         "ep-1", "Episode 1", "Transcript...", 1.0, ContentSource::Podcast,
//!     );
//!     let backend = OpenAIBackend::from_env().unwrap();
//!     let prompt = PromptBuilder::new().build(&request);
//!     let reply = backend.generate(&prompt.system, &prompt.user).await.unwrap();
//!     let content = ResponseParser::new().parse(&reply).unwrap();
//!     let report = ContentValidator::new().validate(&content, request.duration_hours);
//!     println!("valid: {}", report.is_valid);
//! }
//! ```

pub mod parser;
pub mod prompt;
pub mod validator;

mod text;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(feature = "openai")]
pub use openai::{OpenAIBackend, OpenAIConfig};

pub use parser::ResponseParser;
pub use prompt::{ContentTargets, DifficultyMix, Prompt, PromptBuilder, TypeMix};
pub use validator::ContentValidator;
