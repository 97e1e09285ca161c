//! Shared types, error model, and configuration for the notes generator.
//!
//! This crate is the foundation depended on by all other notesgen crates.
//! It provides:
//! - [`NotesError`]: the unified error type
//! - The topic tree model ([`SyllabusTree`], [`TopicNode`], [`TreeId`], [`NodePath`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, GenerationConfig, RunsConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, validate_config, validate_endpoint,
};
pub use error::{NotesError, Result};
pub use types::{
    BREADCRUMB_SEPARATOR, NodePath, PathStep, SyllabusTree, TopicNode, TreeId, TreeProgress,
};
