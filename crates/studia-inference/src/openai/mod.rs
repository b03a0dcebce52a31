//! OpenAI-compatible generation backend.
//!
//! Works with any endpoint that speaks the `/chat/completions` API, including
//! OpenAI itself, Azure OpenAI, Ollama in compatibility mode, vLLM and
//! LM Studio.
//!
//! # Example
//!
//! ```rust,no_run
//! use studia_inference::openai::{OpenAIBackend, OpenAIConfig};
//! use studia_core::GenerationBackend;
//!
//! #[tokio::main]
//! async fn main() {
//!     // From environment variables
//!     let backend = OpenAIBackend::from_env().unwrap();
//!
//!     // Or a local server without JSON mode
//!     let config = OpenAIConfig::default()
//!         .with_base_url("http://localhost:11434/v1")
//!         .with_model("llama3")
//!         .with_json_mode(false);
//!     let local = OpenAIBackend::new(config).unwrap();
//!
//!     let reply = local.generate("Reply with JSON.", "{}").await.unwrap();
//!     println!("{} says {}", backend.model_name(), reply);
//! }
//! ```

mod backend;
mod error;
mod types;

pub use backend::{OpenAIBackend, OpenAIConfig};
pub use error::{to_studia_error, OpenAIErrorCode};
pub use types::*;
