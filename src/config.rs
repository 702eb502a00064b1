//! Configuration file parsing for `stackline.toml`.
//!
//! Searches the current directory then its ancestors.  No file means defaults.

use crate::runtime::interpreter::session::DEFAULT_MAX_DEPTH;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The name of the configuration file searched for.
pub const CONFIG_FILE_NAME: &str = "stackline.toml";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct StacklineConfig {
    /// Prompt shown by the REPL.
    pub prompt: String,

    /// Prompt shown while a block or quotation is still open.
    pub continuation_prompt: String,

    /// Show prompts at all.  Prompts are only ever shown when stdin is a terminal.
    pub prompting: bool,

    /// Log each line of included files at info level.
    pub echo_includes: bool,

    /// Directories searched by `include` and file sources.
    pub search_paths: Vec<String>,

    /// Default tracing filter, overridden by `STACKLINE_LOG` and `--log`.
    pub log_filter: String,

    /// Where the REPL keeps its history, if anywhere.
    pub history_file: Option<PathBuf>,

    /// How deeply blocks, function calls and includes may nest.
    pub max_depth: usize,
}

impl Default for StacklineConfig {
    fn default() -> Self {
        StacklineConfig {
            prompt: "> ".to_string(),
            continuation_prompt: "... ".to_string(),
            prompting: true,
            echo_includes: false,
            search_paths: Vec::new(),
            log_filter: "warn".to_string(),
            history_file: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl StacklineConfig {
    /// Load config from `stackline.toml`, searching the current directory then its parents.
    /// Returns `Default` when no file is found.
    pub fn load() -> Result<Self, String> {
        match Self::find() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load config from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;

        toml::from_str(&content).map_err(|e| format!("invalid toml in '{}': {}", path.display(), e))
    }

    fn find() -> Option<PathBuf> {
        let mut dir = std::env::current_dir().ok()?;

        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);

            if config_path.exists() {
                return Some(config_path);
            }

            if !dir.pop() {
                return None;
            }
        }
    }
}
