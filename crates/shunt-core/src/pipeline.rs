use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::config::Config;
use crate::error::Result;
use crate::executor::{self, ExecutorEnv, Outcome};
use crate::lifecycle;
use crate::status::{Permission, RowStatus, TaskStatus};
use crate::table::{
    completed_at_column, Table, NOTES_COL, PERMISSION_COL, PROJECT_COL, ROW_STATUS_COL,
};

// ---------------------------------------------------------------------------
// Notify
// ---------------------------------------------------------------------------

/// Outbound notification seam. Implementations are best-effort and must
/// swallow transport failures — a notification must never block progress.
#[async_trait]
pub trait Notify: Send + Sync {
    async fn notify(&self, text: &str);
}

/// Notifier for setups without a command channel.
pub struct NullNotify;

#[async_trait]
impl Notify for NullNotify {
    async fn notify(&self, _text: &str) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Advances exactly one eligible row one full pipeline pass.
///
/// The table is reloaded fresh before every task so concurrent external
/// edits are observed; already-DONE tasks are always skipped, which makes a
/// pass safely restartable from any point (a crash mid-run leaves the row
/// RUNNING and the next pass resumes where it stopped).
pub struct Pipeline {
    root: PathBuf,
    config: Config,
    notifier: Arc<dyn Notify>,
}

impl Pipeline {
    pub fn new(root: impl Into<PathBuf>, config: Config, notifier: Arc<dyn Notify>) -> Self {
        Self {
            root: root.into(),
            config,
            notifier,
        }
    }

    /// One full pass. Succeeds trivially when no granted row exists.
    /// Task-level failures block the row and notify — they are not errors;
    /// only infrastructure failures (unreadable table, missing required
    /// columns) propagate.
    pub async fn run(&self) -> Result<()> {
        let table_path = self.config.table_path(&self.root);
        let mut table = Table::load(&table_path)?;
        let Some(row) = lifecycle::runnable_row(&table) else {
            tracing::debug!("no runnable row");
            return Ok(());
        };
        let project = table.get(row, PROJECT_COL).to_string();
        tracing::info!(%project, "starting pipeline pass");
        table.set(row, ROW_STATUS_COL, RowStatus::Running.as_str())?;
        table.save(&table_path)?;

        for task in &self.config.tasks {
            let table = Table::load(&table_path)?;
            let Some(row) = table.find_project(&project) else {
                tracing::warn!(%project, "row disappeared mid-run, aborting pass");
                return Ok(());
            };
            match table.task_status(row, &task.name) {
                TaskStatus::Done => {
                    tracing::debug!(%project, task = %task.name, "already DONE, skipping");
                    continue;
                }
                TaskStatus::Blocked => {
                    return self
                        .escalate(
                            &table_path,
                            &project,
                            Some(&task.name),
                            &format!("task '{}' is BLOCKED and needs manual attention", task.name),
                        )
                        .await;
                }
                _ => {}
            }

            let mut table = table;
            table.set(row, &task.name, TaskStatus::Running.as_str())?;
            table.save(&table_path)?;

            let Some(command) = task.command.as_deref() else {
                return self
                    .escalate(
                        &table_path,
                        &project,
                        Some(&task.name),
                        &format!("no executor command configured for task '{}'", task.name),
                    )
                    .await;
            };

            tracing::info!(%project, task = %task.name, "invoking executor");
            let env = ExecutorEnv {
                project: project.clone(),
                task_column: task.name.clone(),
                task_dir: self.config.task_dir(&self.root, &project, &task.name),
                table: table_path.clone(),
            };
            let outcome =
                match executor::run_executor(command, &env, Duration::from_secs(task.timeout_seconds))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        return self
                            .escalate(
                                &table_path,
                                &project,
                                Some(&task.name),
                                &format!("failed to start executor: {e}"),
                            )
                            .await;
                    }
                };
            match outcome {
                Outcome::Exited(Some(0)) => {}
                Outcome::Exited(code) => {
                    let code = code.map_or("signal".to_string(), |c| c.to_string());
                    return self
                        .escalate(
                            &table_path,
                            &project,
                            Some(&task.name),
                            &format!("executor exited with status {code}"),
                        )
                        .await;
                }
                Outcome::TimedOut => {
                    return self
                        .escalate(
                            &table_path,
                            &project,
                            Some(&task.name),
                            &format!("executor timed out after {}s", task.timeout_seconds),
                        )
                        .await;
                }
            }

            // Zero exit: the executor's own report in the table is
            // authoritative. It must have written DONE or BLOCKED.
            let mut table = Table::load(&table_path)?;
            let Some(row) = table.find_project(&project) else {
                tracing::warn!(%project, "row disappeared mid-run, aborting pass");
                return Ok(());
            };
            match table.task_status(row, &task.name) {
                TaskStatus::Blocked => {
                    return self
                        .escalate(
                            &table_path,
                            &project,
                            Some(&task.name),
                            &format!("executor reported task '{}' as BLOCKED", task.name),
                        )
                        .await;
                }
                TaskStatus::Done => {
                    let stamp_col = completed_at_column(&task.name);
                    if table.column_index(&stamp_col).is_some()
                        && table.get(row, &stamp_col).trim().is_empty()
                    {
                        table.set(row, &stamp_col, &Utc::now().to_rfc3339())?;
                        table.save(&table_path)?;
                    }
                }
                other => {
                    return self
                        .escalate(
                            &table_path,
                            &project,
                            Some(&task.name),
                            &format!(
                                "executor for task '{}' finished without DONE status (found '{}')",
                                task.name, other
                            ),
                        )
                        .await;
                }
            }
        }

        self.settle(&table_path, &project).await
    }

    /// After the loop ran to the end without escalation: the row is DONE
    /// only when every task column says so, and it goes back to PAUSE so a
    /// human has to approve the next row.
    async fn settle(&self, table_path: &Path, project: &str) -> Result<()> {
        let mut table = Table::load(table_path)?;
        let Some(row) = table.find_project(project) else {
            return Ok(());
        };
        let all_done = self
            .config
            .tasks
            .iter()
            .all(|t| table.task_status(row, &t.name) == TaskStatus::Done);
        if !all_done {
            return self
                .escalate(
                    table_path,
                    project,
                    None,
                    "lifecycle tasks ended but not all columns DONE",
                )
                .await;
        }
        table.set(row, ROW_STATUS_COL, RowStatus::Done.as_str())?;
        table.set(row, PERMISSION_COL, Permission::Pause.as_str())?;
        table.save(table_path)?;
        tracing::info!(%project, "row complete");
        self.notifier
            .notify(&format!(
                "Row complete: {project}. Reply YES to continue with the next row."
            ))
            .await;
        Ok(())
    }

    /// Record a blocked outcome in the table and notify. The reason goes
    /// into the optional `notes` column when present.
    async fn escalate(
        &self,
        table_path: &Path,
        project: &str,
        task: Option<&str>,
        reason: &str,
    ) -> Result<()> {
        let mut table = Table::load(table_path)?;
        if let Some(row) = table.find_project(project) {
            if let Some(task) = task {
                table.set(row, task, TaskStatus::Blocked.as_str())?;
            }
            table.set(row, ROW_STATUS_COL, RowStatus::Blocked.as_str())?;
            table.set_if_present(row, NOTES_COL, reason);
            table.save(table_path)?;
        }
        tracing::warn!(%project, reason, "pipeline blocked");
        let text = match task {
            Some(task) => format!("Blocked: {project} / {task}: {reason}"),
            None => format!("Blocked: {project}: {reason}"),
        };
        self.notifier.notify(&text).await;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
