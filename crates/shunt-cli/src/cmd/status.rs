use serde::Serialize;
use shunt_core::config::Config;
use shunt_core::paths;
use shunt_core::table::{Table, PERMISSION_COL, PROJECT_COL, ROW_STATUS_COL};
use shunt_daemon::lock;
use std::path::Path;

#[derive(Serialize)]
struct StatusReport {
    daemon_running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pid: Option<u32>,
    table: String,
    rows: Vec<RowReport>,
}

#[derive(Serialize)]
struct RowReport {
    project: String,
    status: String,
    permission: String,
    tasks: Vec<TaskReport>,
}

#[derive(Serialize)]
struct TaskReport {
    name: String,
    status: String,
}

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root)?;
    let table_path = config.table_path(root);
    let table = Table::load(&table_path)?;

    let pid = lock::read_pid(&paths::pid_path(root));
    let daemon_running = pid.map(lock::is_pid_alive).unwrap_or(false);

    let rows: Vec<RowReport> = (0..table.rows.len())
        .map(|row| RowReport {
            project: table.get(row, PROJECT_COL).to_string(),
            status: table.get(row, ROW_STATUS_COL).to_string(),
            permission: table.get(row, PERMISSION_COL).to_string(),
            tasks: config
                .tasks
                .iter()
                .map(|t| TaskReport {
                    name: t.name.clone(),
                    status: table.get(row, &t.name).to_string(),
                })
                .collect(),
        })
        .collect();

    let report = StatusReport {
        daemon_running,
        pid: if daemon_running { pid } else { None },
        table: table_path.display().to_string(),
        rows,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match report.pid {
        Some(pid) => println!("daemon: running (pid {pid})"),
        None => println!("daemon: stopped"),
    }
    println!("table:  {}", report.table);
    if report.rows.is_empty() {
        println!("\n(no rows)");
        return Ok(());
    }
    println!();
    for row in &report.rows {
        let tasks = row
            .tasks
            .iter()
            .map(|t| {
                let status = if t.status.is_empty() { "-" } else { &t.status };
                format!("{}={status}", t.name)
            })
            .collect::<Vec<_>>()
            .join(" ");
        let status = if row.status.is_empty() { "-" } else { &row.status };
        let permission = if row.permission.is_empty() {
            "-"
        } else {
            &row.permission
        };
        println!("  {:<20} {status:<8} {permission:<6} {tasks}", row.project);
    }
    Ok(())
}
