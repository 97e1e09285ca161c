//! Text-generation client: prompt in, text out.
//!
//! The [`GenerationClient`] trait is the only way the rest of the workspace
//! talks to a model. [`OllamaClient`] implements it against an Ollama-style
//! `/api/generate` endpoint. Clients are stateless and never retry; retry is a
//! caller policy layered around [`GenerationClient::generate`].

mod ollama;
pub mod prompts;

use std::sync::Arc;

use async_trait::async_trait;
use notesgen_shared::Result;

pub use ollama::{OllamaClient, OllamaConfig};

/// A prompt-in/text-out generation service.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate text for `prompt`. Any failure maps to
    /// [`NotesError::GenerationClient`](notesgen_shared::NotesError::GenerationClient).
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[async_trait]
impl GenerationClient for Arc<dyn GenerationClient> {
    async fn generate(&self, prompt: &str) -> Result<String> {
        (**self).generate(prompt).await
    }
}
