//! Engine configuration loaded from environment or a TOML file.
//!
//! | Env | Default | Description |
//! |-----|---------|--------------|
//! | REVERIE_KNOWLEDGE_DIR | ./knowledge | Directory of per-category bank files. |
//! | REVERIE_FALLBACK_CATEGORY | unset | Bank substituted for missing categories. |
//! | REVERIE_MEMORY_WINDOW | 4 | Rolling-memory turns kept per session. |
//! | REVERIE_CLASSIFIER_API_URL | https://api.openai.com/v1 | OpenAI-compatible base URL. |
//! | REVERIE_CLASSIFIER_API_KEY | unset | Falls back to OPENAI_API_KEY / OPENROUTER_API_KEY. |
//! | REVERIE_CLASSIFIER_MODEL | gpt-4o-mini | Remote classifier model id. |

use crate::error::{ReverieError, ReverieResult};
use crate::session::DEFAULT_MEMORY_WINDOW;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default bank directory when nothing is configured.
pub const DEFAULT_KNOWLEDGE_DIR: &str = "./knowledge";

fn default_knowledge_dir() -> PathBuf {
    PathBuf::from(DEFAULT_KNOWLEDGE_DIR)
}

fn default_memory_window() -> usize {
    DEFAULT_MEMORY_WINDOW
}

fn default_classifier_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Engine settings. `from_env` for deployments, TOML for local overrides;
/// unset or invalid values mean defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReverieConfig {
    /// Directory holding per-category bank files.
    #[serde(default = "default_knowledge_dir")]
    pub knowledge_dir: PathBuf,
    /// Category whose bank stands in for missing ones. Unset = missing
    /// banks are an error.
    #[serde(default)]
    pub fallback_category: Option<String>,
    /// Rolling-memory turns kept per session.
    #[serde(default = "default_memory_window")]
    pub memory_window: usize,
    /// OpenAI-compatible base URL for the remote classifier.
    #[serde(default)]
    pub classifier_api_url: Option<String>,
    /// API key for the remote classifier. Unset = local lexicon classifier.
    #[serde(default)]
    pub classifier_api_key: Option<String>,
    /// Remote classifier model id.
    #[serde(default = "default_classifier_model")]
    pub classifier_model: String,
    /// Crisis phrase override (TOML only). Unset = built-in list.
    #[serde(default)]
    pub crisis_phrases: Option<Vec<String>>,
}

impl Default for ReverieConfig {
    fn default() -> Self {
        Self {
            knowledge_dir: default_knowledge_dir(),
            fallback_category: None,
            memory_window: DEFAULT_MEMORY_WINDOW,
            classifier_api_url: None,
            classifier_api_key: None,
            classifier_model: default_classifier_model(),
            crisis_phrases: None,
        }
    }
}

impl ReverieConfig {
    /// Load settings from environment. Unset or invalid => defaults.
    pub fn from_env() -> Self {
        Self {
            knowledge_dir: env_opt_string("REVERIE_KNOWLEDGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_knowledge_dir),
            fallback_category: env_opt_string("REVERIE_FALLBACK_CATEGORY"),
            memory_window: env_usize("REVERIE_MEMORY_WINDOW", DEFAULT_MEMORY_WINDOW),
            classifier_api_url: env_opt_string("REVERIE_CLASSIFIER_API_URL"),
            classifier_api_key: env_opt_string("REVERIE_CLASSIFIER_API_KEY")
                .or_else(|| env_opt_string("OPENAI_API_KEY"))
                .or_else(|| env_opt_string("OPENROUTER_API_KEY")),
            classifier_model: env_opt_string("REVERIE_CLASSIFIER_MODEL")
                .unwrap_or_else(default_classifier_model),
            crisis_phrases: None,
        }
    }

    /// Load settings from a TOML file.
    pub fn load_from_path(path: &Path) -> ReverieResult<Self> {
        let raw = fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| ReverieError::Config(e.to_string()))
    }
}

fn env_opt_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_usize(name: &str, default: usize) -> usize {
    match std::env::var(name) {
        Ok(v) => v.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}
