//! Recursive notes generation over a syllabus tree.
//!
//! Visits every node in pre-order (node, then its children in order). Nodes
//! with a non-empty `result` are skipped; every other node gets one
//! generation call whose text is persisted through the targeted updater
//! before the walk moves on. A run that dies part-way therefore resumes at the
//! first unresolved node when started again.

use std::time::{Duration, Instant};

use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use notesgen_generation::{GenerationClient, prompts};
use notesgen_shared::{NodePath, NotesError, Result, SyllabusTree, TreeId};
use notesgen_storage::Storage;

/// Outcome of one generation run.
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub tree_id: TreeId,
    /// Nodes that received new notes during this run.
    pub generated: usize,
    /// Nodes that already had notes.
    pub skipped: usize,
    /// Nodes generated in memory whose targeted update matched nothing.
    pub update_misses: Vec<NodePath>,
    pub elapsed: Duration,
}

impl GenerationReport {
    fn new(tree_id: TreeId) -> Self {
        Self {
            tree_id,
            generated: 0,
            skipped: 0,
            update_misses: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Whether everything generated in this run reached storage.
    pub fn fully_persisted(&self) -> bool {
        self.update_misses.is_empty()
    }

    /// One [`NotesError::UpdateMiss`] per node whose notes never reached storage.
    pub fn update_miss_errors(&self) -> impl Iterator<Item = NotesError> + '_ {
        self.update_misses
            .iter()
            .map(|path| update_miss(&self.tree_id, path))
    }
}

fn update_miss(tree_id: &TreeId, path: &NodePath) -> NotesError {
    NotesError::UpdateMiss {
        tree_id: tree_id.to_string(),
        path: path.to_string(),
    }
}

/// Settings for [`generate_tree`].
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    /// Heartbeat age after which another run may take over the tree.
    pub lease_ttl: Duration,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            lease_ttl: Duration::from_secs(900),
        }
    }
}

// ---------------------------------------------------------------------------
// Progress trait
// ---------------------------------------------------------------------------

/// Per-node progress callbacks. `current` is 1-based over all nodes.
pub trait GenerationProgress: Send + Sync {
    fn node_started(&self, breadcrumb: &str, current: usize, total: usize);
    fn node_skipped(&self, breadcrumb: &str, current: usize, total: usize);
    fn node_generated(&self, breadcrumb: &str, current: usize, total: usize);
}

/// No-op generation progress.
pub struct SilentGenerationProgress;

impl GenerationProgress for SilentGenerationProgress {
    fn node_started(&self, _breadcrumb: &str, _current: usize, _total: usize) {}
    fn node_skipped(&self, _breadcrumb: &str, _current: usize, _total: usize) {}
    fn node_generated(&self, _breadcrumb: &str, _current: usize, _total: usize) {}
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Fill every unresolved node of an in-memory tree, persisting each result
/// as soon as it is produced.
///
/// The tree is updated in place, so on error the caller still holds every
/// result generated before the failure.
#[instrument(skip_all, fields(tree_id = %tree.id))]
pub async fn generate_notes(
    tree: &mut SyllabusTree,
    storage: &Storage,
    client: &dyn GenerationClient,
    progress: &dyn GenerationProgress,
) -> Result<GenerationReport> {
    walk(tree, storage, client, progress, None).await
}

/// Load a stored tree under its run lease and fill its unresolved nodes.
///
/// Fails with [`NotesError::TreeBusy`] when another live run holds the lease
/// and with [`NotesError::TreeNotFound`] for unknown identifiers.
#[instrument(skip_all, fields(tree_id = %id))]
pub async fn generate_tree(
    id: &TreeId,
    storage: &Storage,
    client: &dyn GenerationClient,
    options: &GenerationOptions,
    progress: &dyn GenerationProgress,
) -> Result<GenerationReport> {
    // Existence check first so unknown ids never create a lease row.
    storage.require_tree(id).await?;

    let holder = format!("run-{}", Uuid::now_v7());
    if !storage
        .acquire_run_lease(id, &holder, options.lease_ttl)
        .await?
    {
        return Err(NotesError::TreeBusy(id.to_string()));
    }
    debug!(%holder, "run lease acquired");

    // Re-read under the lease: a previous holder may have finished nodes.
    let outcome = match storage.require_tree(id).await {
        Ok(mut tree) => walk(&mut tree, storage, client, progress, Some(&holder)).await,
        Err(e) => Err(e),
    };

    if let Err(e) = storage.release_run_lease(id, &holder).await {
        warn!(error = %e, "failed to release run lease");
    }

    outcome
}

// ---------------------------------------------------------------------------
// Walk
// ---------------------------------------------------------------------------

async fn walk(
    tree: &mut SyllabusTree,
    storage: &Storage,
    client: &dyn GenerationClient,
    progress: &dyn GenerationProgress,
    lease_holder: Option<&str>,
) -> Result<GenerationReport> {
    let start = Instant::now();
    let mut report = GenerationReport::new(tree.id.clone());

    // The walk never reshapes the tree, so positions stay valid throughout.
    let positions = tree.preorder_positions();
    let total = positions.len();
    info!(root_topic = %tree.root_topic, nodes = total, "starting generation run");

    for (i, position) in positions.iter().enumerate() {
        let current = i + 1;
        let path = tree
            .node_path(position)
            .ok_or_else(|| NotesError::validation("node position out of range"))?;
        let breadcrumb = path.breadcrumb();

        if tree.result_at(position).is_some_and(|r| !r.is_empty()) {
            debug!(%breadcrumb, "skipping, already has notes");
            report.skipped += 1;
            progress.node_skipped(&breadcrumb, current, total);
            continue;
        }

        progress.node_started(&breadcrumb, current, total);
        info!(%breadcrumb, current, total, "generating notes");

        let text = match client.generate(&prompts::notes_prompt(&breadcrumb)).await {
            Ok(text) => text,
            Err(e) => {
                error!(%breadcrumb, error = %e, "generation failed, aborting run");
                return Err(e);
            }
        };

        let modified = storage.update_node_result(&tree.id, &path, &text).await?;
        if modified == 0 {
            let miss = update_miss(&tree.id, &path);
            warn!(error = %miss, "result kept in memory only");
            report.update_misses.push(path);
        }

        if let Some(slot) = tree.result_at_mut(position) {
            *slot = text;
        }
        report.generated += 1;
        progress.node_generated(&breadcrumb, current, total);

        if let Some(holder) = lease_holder {
            if !storage.renew_run_lease(&tree.id, holder).await? {
                error!(%holder, "run lease lost to another run");
                return Err(NotesError::TreeBusy(tree.id.to_string()));
            }
        }
    }

    report.elapsed = start.elapsed();
    info!(
        generated = report.generated,
        skipped = report.skipped,
        update_misses = report.update_misses.len(),
        elapsed_ms = report.elapsed.as_millis(),
        "generation run complete"
    );

    Ok(report)
}
