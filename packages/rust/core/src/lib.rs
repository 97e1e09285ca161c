//! Notes generation and pipeline orchestration for notesgen.
//!
//! [`engine`] walks a syllabus tree and fills each node's notes; [`stages`]
//! wraps parsing and generation behind async seams; [`pipeline`] runs the two
//! stages in order and reports a single outcome.

pub mod engine;
pub mod pipeline;
pub mod stages;

#[cfg(test)]
mod test_support;

pub use engine::{
    GenerationOptions, GenerationProgress, GenerationReport, SilentGenerationProgress,
    generate_notes, generate_tree,
};
pub use pipeline::{
    NotesOutcome, NotesStatus, Orchestrator, PipelineState, ProgressReporter, SilentProgress,
};
pub use stages::{ContentStage, IndexStage, LocalContentStage, LocalIndexStage};
