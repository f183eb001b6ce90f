use anyhow::Context;
use shunt_core::config::Config;
use shunt_core::table::{NOTES_COL, PERMISSION_COL, PROJECT_COL, ROW_STATUS_COL};
use shunt_core::{io, paths};
use std::path::Path;

const STARTER_CONFIG: &str = r#"# shunt configuration
#
# The table is the source of truth: one row per project, one status column
# per task below, plus an optional <task>_completed_at column for timestamps.
table: releases.csv

# Seconds between timer-triggered pipeline checks.
timer_interval_seconds: 300

# Ordered pipeline stages. Each entry needs a matching column in the table.
# Example:
#   - name: build
#     command: ./scripts/build.sh
#     timeout_seconds: 1800
tasks: []

# Optional approval channel (Telegram bot). Without it the daemon runs
# timer-only and approvals happen by editing the table.
# channel:
#   bot_token: "123456:ABC-your-token"
#   chat_id: 123456789
"#;

pub fn run(root: &Path) -> anyhow::Result<()> {
    println!("Initializing shunt in: {}", root.display());

    io::ensure_dir(&paths::shunt_dir(root))
        .with_context(|| format!("failed to create {}", paths::shunt_dir(root).display()))?;
    io::ensure_dir(&paths::artifacts_dir(root))?;

    let config_path = paths::config_path(root);
    if !config_path.exists() {
        io::atomic_write(&config_path, STARTER_CONFIG.as_bytes())
            .context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
    } else {
        println!("  exists:  {}", paths::CONFIG_FILE);
    }

    // The table lives wherever the (possibly pre-existing) config points.
    let config = Config::load(root).context("failed to load config.yaml")?;
    let table_path = config.table_path(root);
    if !table_path.exists() {
        let mut header: Vec<&str> = vec![PROJECT_COL, ROW_STATUS_COL, PERMISSION_COL, NOTES_COL];
        let task_columns: Vec<String> = config.tasks.iter().map(|t| t.name.clone()).collect();
        header.extend(task_columns.iter().map(String::as_str));
        io::atomic_write(&table_path, format!("{}\n", header.join(",")).as_bytes())
            .context("failed to write table")?;
        println!("  created: {}", config.table.display());
    } else {
        println!("  exists:  {}", config.table.display());
    }

    println!("\nshunt initialized.");
    println!("Next: define tasks in {} and run: shunt up", paths::CONFIG_FILE);
    Ok(())
}
