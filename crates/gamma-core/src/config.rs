use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GammaError, Result};

/// Top-level Gamma configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Step budget for the think-act loop — the sole circuit-breaker
    /// against runaway runs.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            system_prompt: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Approximate token limit for the conversation buffer.
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,
    /// Number of most-recent messages summarization leaves untouched.
    #[serde(default = "default_keep_recent")]
    pub keep_recent: usize,
    #[serde(default = "default_enable_summarization")]
    pub enable_summarization: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            token_budget: default_token_budget(),
            keep_recent: default_keep_recent(),
            enable_summarization: default_enable_summarization(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// File backing the snapshot store.
    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: String,
    /// Key under which workflow executions are persisted.
    #[serde(default = "default_snapshot_key")]
    pub snapshot_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_file: default_snapshot_file(),
            snapshot_key: default_snapshot_key(),
        }
    }
}

fn default_max_steps() -> usize {
    30
}

fn default_token_budget() -> usize {
    4000
}

fn default_keep_recent() -> usize {
    5
}

fn default_enable_summarization() -> bool {
    true
}

fn default_snapshot_file() -> String {
    "gamma_state.json".to_string()
}

fn default_snapshot_key() -> String {
    "workflow_executions".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(GammaError::ConfigNotFound(path.display().to_string()));
        }
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| GammaError::Config(e.to_string()))
    }
}
