//! podbind.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// CPU reserved for the per-task executor shim.
pub const DEFAULT_EXECUTOR_CPUS: f64 = 0.25;
/// Memory (MB) reserved for the per-task executor shim.
pub const DEFAULT_EXECUTOR_MEM: f64 = 64.0;
/// Name stamped on every task descriptor.
pub const DEFAULT_TASK_NAME: &str = "PodTask";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BindConfig {
    pub executor: Option<ExecutorConfig>,
    pub task: Option<TaskConfig>,
}

/// Fixed footprint of the executor shim, not the pod's own requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    pub cpus: Option<f64>,
    pub mem: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    pub name: Option<String>,
}

impl BindConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// A config with every value filled in, for display.
    pub fn resolved(&self) -> Self {
        BindConfig {
            executor: Some(ExecutorConfig {
                cpus: Some(self.executor_cpus()),
                mem: Some(self.executor_mem()),
            }),
            task: Some(TaskConfig {
                name: Some(self.task_name().to_string()),
            }),
        }
    }

    pub fn executor_cpus(&self) -> f64 {
        self.executor
            .as_ref()
            .and_then(|e| e.cpus)
            .unwrap_or(DEFAULT_EXECUTOR_CPUS)
    }

    pub fn executor_mem(&self) -> f64 {
        self.executor
            .as_ref()
            .and_then(|e| e.mem)
            .unwrap_or(DEFAULT_EXECUTOR_MEM)
    }

    pub fn task_name(&self) -> &str {
        self.task
            .as_ref()
            .and_then(|t| t.name.as_deref())
            .unwrap_or(DEFAULT_TASK_NAME)
    }
}
