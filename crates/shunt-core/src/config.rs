use crate::error::{Result, ShuntError};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// TaskDef
// ---------------------------------------------------------------------------

/// One named, ordered stage of the pipeline. The task list is fixed for the
/// whole table: every row carries one status column per task, in this order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskDef {
    pub name: String,
    /// Shell command for the external executor. A task with no command is a
    /// configuration error at run time, not at load time — the row gets
    /// blocked with an explicit reason instead of the daemon crashing.
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default = "default_task_timeout")]
    pub timeout_seconds: u64,
}

fn default_task_timeout() -> u64 {
    3600
}

// ---------------------------------------------------------------------------
// ChannelConfig
// ---------------------------------------------------------------------------

/// Bot-API-shaped command channel settings. `api_base` exists so tests can
/// point the channel at a local mock server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub bot_token: String,
    pub chat_id: i64,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_poll_wait")]
    pub poll_wait_seconds: u64,
    #[serde(default = "default_poll_idle")]
    pub poll_idle_seconds: u64,
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_wait() -> u64 {
    25
}

fn default_poll_idle() -> u64 {
    2
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Path to the project table, relative to the root unless absolute.
    #[serde(default = "default_table")]
    pub table: PathBuf,
    #[serde(default)]
    pub tasks: Vec<TaskDef>,
    /// Interval between timer-triggered pipeline checks.
    #[serde(default = "default_timer_interval")]
    pub timer_interval_seconds: u64,
    /// Root for task-scoped resource directories handed to executors.
    /// Defaults to `.shunt/artifacts` under the project root.
    #[serde(default)]
    pub artifact_root: Option<PathBuf>,
    #[serde(default)]
    pub channel: Option<ChannelConfig>,
}

fn default_table() -> PathBuf {
    PathBuf::from("releases.csv")
}

fn default_timer_interval() -> u64 {
    300
}

impl Config {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(ShuntError::NotInitialized(root.display().to_string()));
        }
        let data = std::fs::read_to_string(&path)?;
        let config: Config = serde_yaml::from_str(&data)?;
        Ok(config)
    }

    pub fn table_path(&self, root: &Path) -> PathBuf {
        if self.table.is_absolute() {
            self.table.clone()
        } else {
            root.join(&self.table)
        }
    }

    /// The resource directory an executor receives for one (project, task)
    /// invocation.
    pub fn task_dir(&self, root: &Path, project: &str, task: &str) -> PathBuf {
        let base = match &self.artifact_root {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => root.join(p),
            None => paths::artifacts_dir(root),
        };
        base.join(project).join(task)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
