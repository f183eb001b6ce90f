use anyhow::Context;
use shunt_core::paths;
use shunt_daemon::lock;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

const START_WAIT: Duration = Duration::from_secs(5);

/// Launch the daemon in the background and return immediately. The daemon
/// process is `shunt daemon` with stdout/stderr appended to the log file.
pub fn run(root: &Path) -> anyhow::Result<()> {
    // Config problems should surface here, not in a log file after a
    // silent background exit.
    shunt_core::config::Config::load(root)?;

    let pid_path = paths::pid_path(root);
    if let Some(pid) = lock::read_pid(&pid_path) {
        if lock::is_pid_alive(pid) {
            println!("daemon already running (pid {pid})");
            return Ok(());
        }
    }

    let log_path = paths::log_path(root);
    let log = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;
    let log_err = log.try_clone().context("failed to clone log handle")?;

    let exe = std::env::current_exe().context("cannot locate the shunt binary")?;
    let mut command = std::process::Command::new(exe);
    command
        .arg("daemon")
        .arg("--root")
        .arg(root)
        .stdin(Stdio::null())
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(log_err));
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Detach from the launching terminal's process group.
        command.process_group(0);
    }
    let child = command.spawn().context("failed to launch daemon")?;

    // Verify the daemon actually came up: it records its PID once the
    // lock is held.
    let deadline = Instant::now() + START_WAIT;
    while Instant::now() < deadline {
        if let Some(pid) = lock::read_pid(&pid_path) {
            if lock::is_pid_alive(pid) {
                println!("daemon started (pid {pid})");
                println!("logs: {}", log_path.display());
                return Ok(());
            }
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    anyhow::bail!(
        "daemon (pid {}) did not come up within {}s; check {}",
        child.id(),
        START_WAIT.as_secs(),
        log_path.display()
    );
}
