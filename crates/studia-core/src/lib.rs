//! # studia-core
//!
//! Core types, traits, and abstractions for the studia content pipeline.
//!
//! This crate provides the data model shared by the inference and job crates,
//! the error taxonomy used to classify generation failures, and the traits
//! for the collaborators the pipeline depends on (content storage, the
//! generation service, and the wall clock).

pub mod defaults;
pub mod error;
pub mod models;
pub mod store;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use store::InMemoryContentStore;
pub use traits::*;
