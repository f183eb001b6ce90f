//! Daemon runtime: singleton lock, trigger wiring, and shutdown.
//!
//! One daemon instance per root. Triggers (startup, timer, approval) all
//! funnel through the scheduler, so at most one pipeline pass is ever in
//! flight and the table has a single writer.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use shunt_core::config::Config;
use shunt_core::pipeline::{Notify, NullNotify, Pipeline};

use crate::channel::{self, ChannelNotify, CommandChannel};
use crate::lock::PidLock;
use crate::scheduler::{self, RunPipeline, Scheduler};

// ---------------------------------------------------------------------------
// PipelineRunner
// ---------------------------------------------------------------------------

struct PipelineRunner(Pipeline);

#[async_trait]
impl RunPipeline for PipelineRunner {
    async fn run_once(&self) -> anyhow::Result<()> {
        self.0.run().await.map_err(Into::into)
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

/// Run the daemon for `root` until a shutdown signal or an infrastructure
/// failure. Returns `Ok(false)` without doing anything when another live
/// instance already holds the lock.
pub async fn run(root: &Path) -> anyhow::Result<bool> {
    let config = Config::load(root)?;
    let Some(lock) = PidLock::acquire(root)? else {
        return Ok(false);
    };
    tracing::info!(root = %root.display(), pid = std::process::id(), "daemon started");

    let command_channel = match &config.channel {
        Some(settings) => Some(Arc::new(CommandChannel::new(settings, root)?)),
        None => {
            tracing::info!("no command channel configured, running timer-only");
            None
        }
    };
    let notifier: Arc<dyn Notify> = match &command_channel {
        Some(ch) => Arc::new(ChannelNotify(ch.clone())),
        None => Arc::new(NullNotify),
    };

    let pipeline = Pipeline::new(root, config.clone(), notifier);
    let (scheduler, mut failures) = Scheduler::new(Arc::new(PipelineRunner(pipeline)));

    // A crash can leave the active row RUNNING with tasks half done; the
    // startup pass resumes it before any trigger fires.
    scheduler.request_run("startup").await;

    let mut timer = tokio::spawn(scheduler::timer_loop(
        scheduler.clone(),
        root.to_path_buf(),
        config.clone(),
    ));
    let mut poller = match command_channel {
        Some(ch) => tokio::spawn(channel::poll_loop(
            ch,
            scheduler.clone(),
            root.to_path_buf(),
            config.clone(),
        )),
        None => tokio::spawn(std::future::pending::<anyhow::Result<()>>()),
    };

    let outcome = tokio::select! {
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
            Ok(())
        }
        Some(e) = failures.recv() => Err(e),
        res = &mut timer => match res {
            Ok(()) => Err(anyhow::anyhow!("timer loop exited unexpectedly")),
            Err(e) => Err(anyhow::anyhow!("timer loop panicked: {e}")),
        },
        res = &mut poller => flatten(res, "command channel"),
    };

    timer.abort();
    poller.abort();
    lock.release();
    tracing::info!("daemon stopped");
    outcome.map(|()| true)
}

fn flatten(res: Result<anyhow::Result<()>, tokio::task::JoinError>, what: &str) -> anyhow::Result<()> {
    match res {
        Ok(inner) => inner,
        Err(e) => Err(anyhow::anyhow!("{what} panicked: {e}")),
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("cannot install SIGTERM handler: {e}");
                let _ = ctrl_c.await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
