//! End-to-end `produce` pipeline: syllabus text → stored tree → generated notes.
//!
//! Two stages run strictly in order: stage 1 ([`IndexStage`]) creates the tree,
//! stage 2 ([`ContentStage`]) fills it. Stage 2 runs only when stage 1 returned
//! a usable identifier. Neither stage is retried; the first failure ends the
//! run and is handed back verbatim in the [`NotesOutcome`].
//!
//! Completion is synchronous: [`Orchestrator::produce_notes`] returns once
//! generation has finished or failed.

use std::time::{Duration, Instant};

use tracing::{error, info, instrument};

use notesgen_shared::{NotesError, Result, TreeId};

use crate::engine::GenerationReport;
use crate::stages::{ContentStage, IndexStage};

/// Final status reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotesStatus {
    Completed,
    CreateFailed,
    GenerationFailed,
}

impl NotesStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::CreateFailed => "create_failed",
            Self::GenerationFailed => "generation_failed",
        }
    }
}

impl std::fmt::Display for NotesStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orchestrator state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    TreeCreated,
    GenerationDispatched,
    Completed,
    CreateFailed,
    GenerationFailed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::CreateFailed | Self::GenerationFailed
        )
    }
}

/// What a `produce` or `resume` call ended with.
#[derive(Debug)]
pub struct NotesOutcome {
    /// Set once stage 1 has produced a usable identifier (or when resuming).
    pub tree_id: Option<TreeId>,
    pub status: NotesStatus,
    /// Present when stage 2 finished.
    pub report: Option<GenerationReport>,
    /// The first failure, unchanged.
    pub failure: Option<NotesError>,
    /// Every state visited, in order.
    pub history: Vec<PipelineState>,
    pub elapsed: Duration,
}

impl NotesOutcome {
    pub fn is_completed(&self) -> bool {
        self.status == NotesStatus::Completed
    }

    /// Collapse into a stage-level result.
    ///
    /// A stage 2 failure becomes [`NotesError::GenerationFailed`] naming the
    /// tree, so callers can resume it. Stage 1 failures are returned as
    /// [`NotesError::CreateFailed`] unless they already are one. The
    /// underlying error text is kept in the message.
    pub fn into_result(self) -> Result<GenerationReport> {
        match (self.failure, self.report) {
            (None, Some(report)) => Ok(report),
            (Some(e @ NotesError::CreateFailed(_)), _) => Err(e),
            (Some(e), _) => Err(match self.tree_id {
                Some(id) => NotesError::GenerationFailed(format!("tree {id}: {e}")),
                None => NotesError::CreateFailed(e.to_string()),
            }),
            (None, None) => Err(NotesError::GenerationFailed(
                "run finished without a generation report".into(),
            )),
        }
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once the run has reached a terminal state.
    fn done(&self, outcome: &NotesOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _outcome: &NotesOutcome) {}
}

/// Records transitions and logs each one.
struct StateLog {
    history: Vec<PipelineState>,
    start: Instant,
}

impl StateLog {
    fn new() -> Self {
        info!(state = ?PipelineState::Received, "pipeline state");
        Self {
            history: vec![PipelineState::Received],
            start: Instant::now(),
        }
    }

    fn enter(&mut self, state: PipelineState) {
        let from = self.history.last().copied();
        info!(?from, to = ?state, "pipeline state");
        self.history.push(state);
    }

    fn finish(
        mut self,
        tree_id: Option<TreeId>,
        report: Option<GenerationReport>,
        failure: Option<NotesError>,
    ) -> NotesOutcome {
        let (state, status) = match (&failure, &tree_id) {
            (None, _) => (PipelineState::Completed, NotesStatus::Completed),
            (Some(_), None) => (PipelineState::CreateFailed, NotesStatus::CreateFailed),
            (Some(_), Some(_)) => (PipelineState::GenerationFailed, NotesStatus::GenerationFailed),
        };
        self.enter(state);

        NotesOutcome {
            tree_id,
            status,
            report,
            failure,
            history: self.history,
            elapsed: self.start.elapsed(),
        }
    }
}

/// Runs the two stages in order.
pub struct Orchestrator<'a> {
    index: Option<&'a dyn IndexStage>,
    content: &'a dyn ContentStage,
}

impl<'a> Orchestrator<'a> {
    pub fn new(index: &'a dyn IndexStage, content: &'a dyn ContentStage) -> Self {
        Self {
            index: Some(index),
            content,
        }
    }

    /// An orchestrator that can only resume existing trees.
    ///
    /// [`produce_notes`](Self::produce_notes) on it ends in `CreateFailed`.
    pub fn resume_only(content: &'a dyn ContentStage) -> Self {
        Self {
            index: None,
            content,
        }
    }

    /// Create a tree from `text`, then generate notes for every node.
    #[instrument(skip_all, fields(text_len = text.len()))]
    pub async fn produce_notes(&self, text: &str, progress: &dyn ProgressReporter) -> NotesOutcome {
        let mut log = StateLog::new();

        let Some(index) = self.index else {
            error!("no index stage configured");
            return finish(
                log,
                None,
                None,
                Some(NotesError::CreateFailed("no index stage configured".into())),
                progress,
            );
        };

        progress.phase("Building syllabus tree");
        let id = match index.create_tree(text).await {
            Ok(id) if !id.is_nil() => id,
            Ok(_) => {
                error!("index stage returned a nil tree id");
                return finish(
                    log,
                    None,
                    None,
                    Some(NotesError::CreateFailed(
                        "index stage returned an empty identifier".into(),
                    )),
                    progress,
                );
            }
            Err(e) => {
                error!(error = %e, "tree creation failed");
                return finish(log, None, None, Some(e), progress);
            }
        };
        log.enter(PipelineState::TreeCreated);
        info!(tree_id = %id, "tree created");

        self.dispatch(log, id, progress).await
    }

    /// Generate the remaining notes of an existing tree, skipping stage 1.
    #[instrument(skip_all, fields(tree_id = %id))]
    pub async fn resume_notes(&self, id: &TreeId, progress: &dyn ProgressReporter) -> NotesOutcome {
        let log = StateLog::new();
        self.dispatch(log, id.clone(), progress).await
    }

    async fn dispatch(
        &self,
        mut log: StateLog,
        id: TreeId,
        progress: &dyn ProgressReporter,
    ) -> NotesOutcome {
        log.enter(PipelineState::GenerationDispatched);
        progress.phase("Generating notes");

        match self.content.generate(&id).await {
            Ok(report) => {
                info!(
                    tree_id = %id,
                    generated = report.generated,
                    skipped = report.skipped,
                    "notes produced"
                );
                finish(log, Some(id), Some(report), None, progress)
            }
            Err(e) => {
                error!(tree_id = %id, error = %e, "generation failed");
                finish(log, Some(id), None, Some(e), progress)
            }
        }
    }
}

fn finish(
    log: StateLog,
    tree_id: Option<TreeId>,
    report: Option<GenerationReport>,
    failure: Option<NotesError>,
    progress: &dyn ProgressReporter,
) -> NotesOutcome {
    let outcome = log.finish(tree_id, report, failure);
    progress.done(&outcome);
    outcome
}
