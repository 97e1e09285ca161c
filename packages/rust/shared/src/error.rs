//! Error types for the notes generator.
//!
//! Library crates use [`NotesError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all notesgen operations.
#[derive(Debug, thiserror::Error)]
pub enum NotesError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Syllabus text produced no usable tree.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// The structured-tree response from the generation service could not be decoded.
    #[error("malformed generation output: {message}")]
    MalformedGenerationOutput { message: String, raw: String },

    /// Transport or model failure while calling the generation service.
    #[error("generation client error: {0}")]
    GenerationClient(String),

    /// A targeted update matched zero nodes.
    #[error("update miss for tree {tree_id} at {path}")]
    UpdateMiss { tree_id: String, path: String },

    /// The identifier is unknown to storage.
    #[error("tree not found: {0}")]
    TreeNotFound(String),

    /// Another generation run holds the lease for this tree.
    #[error("tree {0} is busy: another generation run holds its lease")]
    TreeBusy(String),

    /// Stage 1 of the pipeline did not yield a usable identifier.
    #[error("tree creation failed: {0}")]
    CreateFailed(String),

    /// Stage 2 of the pipeline did not complete.
    #[error("generation failed: {0}")]
    GenerationFailed(String),

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad identifier, blank input, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, NotesError>;

impl NotesError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a malformed-output error, keeping the raw response for diagnostics.
    pub fn malformed(msg: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::MalformedGenerationOutput {
            message: msg.into(),
            raw: raw.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
