//! Application configuration for the notes generator.
//!
//! User config lives at `~/.notesgen/notesgen.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{NotesError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "notesgen.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".notesgen";

/// Default database file name inside the config directory.
const DB_FILE_NAME: &str = "notesgen.db";

// ---------------------------------------------------------------------------
// Config structs (matching notesgen.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Text-generation service settings.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Generation run coordination.
    #[serde(default)]
    pub runs: RunsConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Root topic assigned by the local syllabus parser.
    #[serde(default = "default_root_topic")]
    pub root_topic: String,

    /// Database path. Empty means `~/.notesgen/notesgen.db`.
    #[serde(default)]
    pub db_path: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            root_topic: default_root_topic(),
            db_path: String::new(),
        }
    }
}

fn default_root_topic() -> String {
    "Introduction to Python".into()
}

/// `[generation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Ollama-compatible `/api/generate` endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model used for per-topic notes.
    #[serde(default = "default_notes_model")]
    pub notes_model: String,

    /// Model used to turn free-form syllabi into a topic tree.
    #[serde(default = "default_structure_model")]
    pub structure_model: String,

    /// Per-request timeout. Local models can be slow on long notes.
    /// Must stay below `runs.lease_ttl_secs`.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            notes_model: default_notes_model(),
            structure_model: default_structure_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_endpoint() -> String {
    "http://localhost:11434/api/generate".into()
}
fn default_notes_model() -> String {
    "llama3.2".into()
}
fn default_structure_model() -> String {
    "llama3".into()
}
fn default_timeout_secs() -> u64 {
    300
}

/// `[runs]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunsConfig {
    /// Seconds without a heartbeat after which a run lease is considered abandoned.
    #[serde(default = "default_lease_ttl_secs")]
    pub lease_ttl_secs: u64,
}

impl Default for RunsConfig {
    fn default() -> Self {
        Self {
            lease_ttl_secs: default_lease_ttl_secs(),
        }
    }
}

fn default_lease_ttl_secs() -> u64 {
    900
}

impl AppConfig {
    /// Resolved database path: the configured one, or the default under the config dir.
    pub fn db_path(&self) -> Result<PathBuf> {
        if self.defaults.db_path.is_empty() {
            Ok(config_dir()?.join(DB_FILE_NAME))
        } else {
            Ok(PathBuf::from(&self.defaults.db_path))
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.notesgen/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| NotesError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.notesgen/notesgen.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| NotesError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| NotesError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| NotesError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content = toml::to_string_pretty(&config).map_err(|e| NotesError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| NotesError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the generation endpoint is an http(s) URL.
pub fn validate_endpoint(config: &AppConfig) -> Result<()> {
    let endpoint = &config.generation.endpoint;
    let url = url::Url::parse(endpoint)
        .map_err(|e| NotesError::config(format!("invalid generation endpoint '{endpoint}': {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(NotesError::config(format!(
            "generation endpoint must use http or https, got '{other}'"
        ))),
    }
}

/// Check everything a generation run depends on.
///
/// A single request may not outlive the run lease: a run blocked on one slow
/// call would stop heartbeating and could be taken over mid-call.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    validate_endpoint(config)?;

    let timeout = config.generation.timeout_secs;
    let ttl = config.runs.lease_ttl_secs;
    if timeout == 0 {
        return Err(NotesError::config("generation.timeout_secs must be positive"));
    }
    if timeout >= ttl {
        return Err(NotesError::config(format!(
            "generation.timeout_secs ({timeout}) must be below runs.lease_ttl_secs ({ttl})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("root_topic"));
        assert!(toml_str.contains("llama3.2"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.root_topic, "Introduction to Python");
        assert_eq!(parsed.generation.timeout_secs, 300);
        assert_eq!(parsed.runs.lease_ttl_secs, 900);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
root_topic = "Data Structures"
db_path = "/tmp/notes.db"

[generation]
notes_model = "mistral"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.root_topic, "Data Structures");
        assert_eq!(config.generation.notes_model, "mistral");
        assert_eq!(config.generation.structure_model, "llama3");
        assert_eq!(config.db_path().unwrap(), PathBuf::from("/tmp/notes.db"));
    }

    #[test]
    fn endpoint_validation() {
        let mut config = AppConfig::default();
        assert!(validate_endpoint(&config).is_ok());

        config.generation.endpoint = "not a url".into();
        assert!(validate_endpoint(&config).is_err());

        config.generation.endpoint = "ftp://localhost/api/generate".into();
        let err = validate_endpoint(&config).unwrap_err();
        assert!(err.to_string().contains("http or https"));
    }

    #[test]
    fn timeout_must_fit_inside_lease() {
        let mut config = AppConfig::default();
        assert!(validate_config(&config).is_ok());

        config.generation.timeout_secs = 900;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("lease_ttl_secs"));

        config.runs.lease_ttl_secs = 1800;
        assert!(validate_config(&config).is_ok());

        config.generation.timeout_secs = 0;
        assert!(validate_config(&config).is_err());

        config.generation.timeout_secs = 60;
        config.generation.endpoint = "file:///tmp/model".into();
        assert!(validate_config(&config).is_err());
    }
}
