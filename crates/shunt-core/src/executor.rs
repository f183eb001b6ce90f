//! Subprocess invocation for external task executors.
//!
//! An executor is an externally supplied program that performs one task's
//! actual work and reports its outcome back through the shared table:
//! before exiting 0 it must have written DONE (work succeeded) or BLOCKED
//! (handled, reported failure) into its status column. The orchestrator
//! only interprets the exit status and the resulting column value.
//!
//! # Environment contract
//! - `SHUNT_PROJECT`      — the row's project key
//! - `SHUNT_TASK_COLUMN`  — the task's status column name
//! - `SHUNT_TASK_DIR`     — task-scoped resource directory
//! - `SHUNT_TABLE`        — path to the table file

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::error::{Result, ShuntError};

// ---------------------------------------------------------------------------
// ExecutorEnv / Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ExecutorEnv {
    pub project: String,
    pub task_column: String,
    pub task_dir: PathBuf,
    pub table: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Process exited; `None` means killed by a signal.
    Exited(Option<i32>),
    /// Timeout expired; the process was forcibly killed.
    TimedOut,
}

impl Outcome {
    pub fn success(self) -> bool {
        matches!(self, Outcome::Exited(Some(0)))
    }
}

// ---------------------------------------------------------------------------
// Invocation
// ---------------------------------------------------------------------------

/// Run one executor command to completion via `sh -c`, with the contract
/// environment and a hard timeout. Stdout/stderr are inherited so executor
/// output lands in the daemon log.
pub async fn run_executor(
    command: &str,
    env: &ExecutorEnv,
    timeout: Duration,
) -> Result<Outcome> {
    crate::io::ensure_dir(&env.task_dir)?;

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .env("SHUNT_PROJECT", &env.project)
        .env("SHUNT_TASK_COLUMN", &env.task_column)
        .env("SHUNT_TASK_DIR", &env.task_dir)
        .env("SHUNT_TABLE", &env.table)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| ShuntError::ExecutorSpawn {
            task: env.task_column.clone(),
            reason: e.to_string(),
        })?;

    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(status) => {
            let status = status?;
            Ok(Outcome::Exited(status.code()))
        }
        Err(_) => {
            tracing::warn!(
                task = %env.task_column,
                project = %env.project,
                "executor timed out after {}s, killing",
                timeout.as_secs()
            );
            let _ = child.start_kill();
            let _ = child.wait().await;
            Ok(Outcome::TimedOut)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
