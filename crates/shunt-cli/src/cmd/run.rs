use shunt_core::config::Config;
use shunt_core::pipeline::{NullNotify, Pipeline};
use shunt_daemon::lock::PidLock;
use std::path::Path;
use std::sync::Arc;

/// One foreground pipeline pass. Takes the same singleton lock as the
/// daemon, so it refuses to run next to a live instance.
pub fn run(root: &Path) -> anyhow::Result<()> {
    let config = Config::load(root)?;
    let Some(lock) = PidLock::acquire(root)? else {
        anyhow::bail!("daemon is running; stop it with `shunt down` before a manual pass");
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let pipeline = Pipeline::new(root, config, Arc::new(NullNotify));
    let result = runtime.block_on(pipeline.run());
    lock.release();
    result?;

    println!("pipeline pass complete");
    Ok(())
}
