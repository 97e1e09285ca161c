//! Syllabus parsing: free-form text → [`SyllabusTree`].
//!
//! Text that carries the `Topic: child, child. Leaf.` delimiters is parsed
//! locally. Anything else is sent to the structure model with a strict JSON
//! outline prompt, and the reply is decoded as the tree. Decode failures are
//! surfaced as [`NotesError::MalformedGenerationOutput`], never retried here.

mod heuristic;
mod structured;

use tracing::{debug, info, instrument};

use notesgen_generation::{GenerationClient, prompts};
use notesgen_shared::{NotesError, Result, SyllabusTree};

/// Which parser produced a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseSource {
    /// Delimiter-based local parser.
    Local,
    /// Outline returned by the generation service.
    Generated,
}

impl ParseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Generated => "generated",
        }
    }
}

/// A freshly parsed, unresolved tree.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub tree: SyllabusTree,
    pub source: ParseSource,
}

/// Parse a syllabus, falling back to the generation service when the text
/// lacks the delimiters the local parser needs.
///
/// `root_topic` names the root of locally parsed trees; generated outlines
/// carry their own topic.
#[instrument(skip_all, fields(text_len = text.len()))]
pub async fn parse_syllabus(
    text: &str,
    root_topic: &str,
    client: &dyn GenerationClient,
) -> Result<ParseOutcome> {
    let text = text.trim();
    if text.is_empty() {
        return Err(NotesError::parse("syllabus text is empty"));
    }

    if heuristic::looks_structured(text) {
        let tree = parse_local(text, root_topic);
        if !tree.children.is_empty() {
            info!(children = tree.children.len(), "syllabus parsed locally");
            return Ok(ParseOutcome {
                tree,
                source: ParseSource::Local,
            });
        }
        debug!("local parse produced no topics, falling back to generation");
    }

    let tree = parse_with_model(text, client).await?;
    info!(
        root_topic = %tree.root_topic,
        children = tree.children.len(),
        "syllabus structured by generation service"
    );
    Ok(ParseOutcome {
        tree,
        source: ParseSource::Generated,
    })
}

/// Parse delimited text without any service call.
pub fn parse_local(text: &str, root_topic: &str) -> SyllabusTree {
    heuristic::parse(text, root_topic)
}

/// Ask the generation service for a JSON outline and decode it.
pub async fn parse_with_model(text: &str, client: &dyn GenerationClient) -> Result<SyllabusTree> {
    let raw = client.generate(&prompts::structure_prompt(text)).await?;
    structured::decode_tree(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with a fixed outline and remembers the prompts it saw.
    struct CannedClient {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedClient {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.into(),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl GenerationClient for CannedClient {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn structured_text_never_calls_the_service() {
        let client = CannedClient::new("unused");
        let outcome = parse_syllabus("Variables: int, float. Loops.", "Introduction to Python", &client)
            .await
            .unwrap();

        assert_eq!(outcome.source, ParseSource::Local);
        assert_eq!(outcome.tree.root_topic, "Introduction to Python");
        assert_eq!(outcome.tree.children.len(), 2);
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn free_text_uses_generated_outline() {
        let client = CannedClient::new(
            r#"{"topic":"Graph Theory","subtopics":[{"topicName":"Basics","result":""}]}"#,
        );
        let outcome = parse_syllabus("A first course in graph theory", "ignored", &client)
            .await
            .unwrap();

        assert_eq!(outcome.source, ParseSource::Generated);
        assert_eq!(outcome.tree.root_topic, "Graph Theory");
        assert_eq!(client.calls(), 1);
        assert!(client.prompts.lock().unwrap()[0].contains("A first course in graph theory"));
    }

    #[tokio::test]
    async fn malformed_outline_is_surfaced() {
        let client = CannedClient::new("Sure! The syllabus covers graphs.");
        let err = parse_syllabus("A first course in graph theory", "x", &client)
            .await
            .unwrap_err();
        assert!(matches!(err, NotesError::MalformedGenerationOutput { .. }));
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn blank_input_is_a_parse_error() {
        let client = CannedClient::new("unused");
        let err = parse_syllabus("  \n ", "x", &client).await.unwrap_err();
        assert!(matches!(err, NotesError::Parse { .. }));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn delimiters_without_topics_fall_back() {
        let client = CannedClient::new(r#"{"topic":"Punctuation","subtopics":[]}"#);
        let outcome = parse_syllabus(": , .", "x", &client).await.unwrap();
        assert_eq!(outcome.source, ParseSource::Generated);
        assert_eq!(client.calls(), 1);
    }

    #[test]
    fn parse_source_labels() {
        assert_eq!(ParseSource::Local.as_str(), "local");
        assert_eq!(ParseSource::Generated.as_str(), "generated");
    }
}
