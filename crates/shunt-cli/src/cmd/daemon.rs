use std::path::Path;

/// Foreground daemon entry point. `shunt up` launches this with output
/// redirected into the log file; running it directly is useful under a
/// supervisor or when debugging.
pub fn run(root: &Path) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let started = runtime.block_on(shunt_daemon::daemon::run(root))?;
    if !started {
        println!("another instance is already running");
    }
    Ok(())
}
