// src/llm/mod.rs
pub mod client;
pub mod models;

use std::future::Future;
use crate::utils::error::InferenceError;

pub use client::{GeminiClient, GeminiSettings};

/// A rendered prompt: the fixed role instruction plus the user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Text-generation backend used by the orchestrator.
///
/// Implementations own their retry policy; a returned error means the
/// attempts are exhausted.
pub trait InferenceClient {
    fn generate(&self, prompt: &Prompt) -> impl Future<Output = Result<String, InferenceError>>;
}
