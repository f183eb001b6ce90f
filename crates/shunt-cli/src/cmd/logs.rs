use shunt_core::paths;
use std::path::Path;

/// Print the last `lines` lines of the daemon log.
pub fn run(root: &Path, lines: usize) -> anyhow::Result<()> {
    let log_path = paths::log_path(root);
    if !log_path.exists() {
        println!("no log file yet ({})", log_path.display());
        return Ok(());
    }
    let content = std::fs::read_to_string(&log_path)?;
    let all: Vec<&str> = content.lines().collect();
    let start = all.len().saturating_sub(lines);
    for line in &all[start..] {
        println!("{line}");
    }
    Ok(())
}
