//! The two pipeline stages behind async seams.
//!
//! The orchestrator only sees [`IndexStage`] and [`ContentStage`]. The local
//! implementations here run in-process against a [`Storage`] handle; a remote
//! implementation (for example one that calls a service) can stand in for
//! either without touching the orchestrator.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use notesgen_generation::GenerationClient;
use notesgen_shared::{Result, TreeId};
use notesgen_storage::Storage;

use crate::engine::{self, GenerationOptions, GenerationProgress, GenerationReport};

/// Stage 1: turn syllabus text into a stored tree.
#[async_trait]
pub trait IndexStage: Send + Sync {
    async fn create_tree(&self, text: &str) -> Result<TreeId>;
}

/// Stage 2: fill every unresolved node of a stored tree.
#[async_trait]
pub trait ContentStage: Send + Sync {
    async fn generate(&self, id: &TreeId) -> Result<GenerationReport>;
}

/// Parses locally (or via the structure model) and stores the tree.
pub struct LocalIndexStage {
    storage: Arc<Storage>,
    client: Arc<dyn GenerationClient>,
    root_topic: String,
}

impl LocalIndexStage {
    pub fn new(
        storage: Arc<Storage>,
        client: Arc<dyn GenerationClient>,
        root_topic: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            client,
            root_topic: root_topic.into(),
        }
    }
}

#[async_trait]
impl IndexStage for LocalIndexStage {
    async fn create_tree(&self, text: &str) -> Result<TreeId> {
        let outcome =
            notesgen_syllabus::parse_syllabus(text, &self.root_topic, self.client.as_ref()).await?;
        let id = self.storage.create_tree(&outcome.tree).await?;
        info!(
            tree_id = %id,
            source = outcome.source.as_str(),
            nodes = outcome.tree.progress().total,
            "syllabus tree stored"
        );
        Ok(id)
    }
}

/// Runs the generation engine under the tree's run lease.
pub struct LocalContentStage {
    storage: Arc<Storage>,
    client: Arc<dyn GenerationClient>,
    options: GenerationOptions,
    progress: Arc<dyn GenerationProgress>,
}

impl LocalContentStage {
    pub fn new(
        storage: Arc<Storage>,
        client: Arc<dyn GenerationClient>,
        options: GenerationOptions,
        progress: Arc<dyn GenerationProgress>,
    ) -> Self {
        Self {
            storage,
            client,
            options,
            progress,
        }
    }
}

#[async_trait]
impl ContentStage for LocalContentStage {
    async fn generate(&self, id: &TreeId) -> Result<GenerationReport> {
        engine::generate_tree(
            id,
            &self.storage,
            self.client.as_ref(),
            &self.options,
            self.progress.as_ref(),
        )
        .await
    }
}
