use shunt_core::paths;
use shunt_daemon::lock;
use std::path::Path;
use std::time::{Duration, Instant};

const STOP_WAIT: Duration = Duration::from_secs(10);

/// Signal the running daemon with SIGTERM and wait for it to exit.
pub fn run(root: &Path) -> anyhow::Result<()> {
    let pid_path = paths::pid_path(root);
    let Some(pid) = lock::read_pid(&pid_path) else {
        println!("daemon is not running");
        return Ok(());
    };
    if !lock::is_pid_alive(pid) {
        println!("daemon is not running (removing stale pid file)");
        let _ = std::fs::remove_file(&pid_path);
        return Ok(());
    }

    let status = std::process::Command::new("kill")
        .arg(pid.to_string())
        .status()?;
    if !status.success() {
        anyhow::bail!("failed to signal pid {pid}");
    }

    // The daemon removes its pid file on the way out.
    let deadline = Instant::now() + STOP_WAIT;
    while Instant::now() < deadline {
        if !lock::is_pid_alive(pid) {
            println!("daemon stopped (pid {pid})");
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(200));
    }

    // Grace window expired: force it.
    println!("daemon (pid {pid}) did not stop in {}s, sending SIGKILL", STOP_WAIT.as_secs());
    let _ = std::process::Command::new("kill")
        .args(["-9", &pid.to_string()])
        .status();
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if !lock::is_pid_alive(pid) {
            // SIGKILL skips the daemon's own cleanup.
            let _ = std::fs::remove_file(&pid_path);
            println!("daemon killed (pid {pid})");
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    anyhow::bail!("daemon (pid {pid}) survived SIGKILL");
}
