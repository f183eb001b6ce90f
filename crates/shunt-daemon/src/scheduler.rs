//! Trigger arbitration: at most one pipeline run in flight.
//!
//! The timer and the command channel only ever *request* a run; the
//! scheduler serializes those requests. Runs execute on a dedicated worker
//! task, so requesting never blocks the caller's loop for the duration of
//! the run. A trigger arriving while a run is active sets a single queued
//! flag (not a counter), so any number of triggers during a run coalesce
//! into exactly one follow-up run. Run failures surface on a channel the
//! daemon selects on.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex, Notify};

use shunt_core::config::Config;
use shunt_core::{lifecycle, table::Table};

// ---------------------------------------------------------------------------
// RunPipeline
// ---------------------------------------------------------------------------

/// One serialized unit of work: a single pipeline pass.
#[async_trait]
pub trait RunPipeline: Send + Sync {
    async fn run_once(&self) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Flags {
    busy: bool,
    queued: bool,
}

pub struct Scheduler {
    flags: Mutex<Flags>,
    runner: Arc<dyn RunPipeline>,
    wake: Notify,
    failures: mpsc::Sender<anyhow::Error>,
}

impl Scheduler {
    /// Create the scheduler and spawn its worker task (must be called on a
    /// runtime). The returned receiver yields infrastructure errors from
    /// pipeline runs; the daemon selects on it and shuts down on the first.
    pub fn new(runner: Arc<dyn RunPipeline>) -> (Arc<Self>, mpsc::Receiver<anyhow::Error>) {
        let (tx, rx) = mpsc::channel(1);
        let scheduler = Arc::new(Self {
            flags: Mutex::new(Flags::default()),
            runner,
            wake: Notify::new(),
            failures: tx,
        });
        let worker = scheduler.clone();
        tokio::spawn(async move { worker.drain_loop().await });
        (scheduler, rx)
    }

    /// Request a pipeline run and return immediately. If a run is already
    /// in flight the request coalesces into at most one queued follow-up;
    /// otherwise the worker picks it up right away.
    pub async fn request_run(&self, reason: &str) {
        let mut flags = self.flags.lock().await;
        if flags.busy || flags.queued {
            if !flags.queued {
                tracing::debug!(reason, "run in flight, queueing one follow-up");
            }
            flags.queued = true;
            return;
        }
        flags.queued = true;
        drop(flags);
        tracing::info!(reason, "pipeline run requested");
        self.wake.notify_one();
    }

    /// Worker loop: run passes until the queued flag is clear, then wait for
    /// the next wakeup. `notify_one` stores a permit when nobody is waiting,
    /// so a request landing between passes is never lost.
    async fn drain_loop(&self) {
        loop {
            self.wake.notified().await;
            loop {
                {
                    let mut flags = self.flags.lock().await;
                    if !flags.queued {
                        break;
                    }
                    flags.queued = false;
                    flags.busy = true;
                }
                let result = self.runner.run_once().await;

                let mut flags = self.flags.lock().await;
                flags.busy = false;
                if let Err(e) = result {
                    flags.queued = false;
                    drop(flags);
                    let _ = self.failures.send(e).await;
                    break;
                }
                if flags.queued {
                    tracing::info!("running queued follow-up pass");
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Timer loop
// ---------------------------------------------------------------------------

/// Fires on a fixed interval and requests a run whenever a granted row
/// exists. Runs until the daemon shuts down.
pub async fn timer_loop(scheduler: Arc<Scheduler>, root: std::path::PathBuf, config: Config) {
    let period = std::time::Duration::from_secs(config.timer_interval_seconds.max(1));
    let mut interval = tokio::time::interval(period);
    // The first tick completes immediately; skip straight to the cadence.
    interval.tick().await;
    loop {
        interval.tick().await;
        let table_path = config.table_path(&root);
        let has_runnable = match Table::load(&table_path) {
            Ok(table) => lifecycle::runnable_row(&table).is_some(),
            Err(e) => {
                tracing::warn!("timer: cannot read table: {e}");
                continue;
            }
        };
        if has_runnable {
            scheduler.request_run("timer").await;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingRunner {
        runs: AtomicUsize,
        delay: Duration,
    }

    impl CountingRunner {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                runs: AtomicUsize::new(0),
                delay,
            })
        }

        fn count(&self) -> usize {
            self.runs.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RunPipeline for CountingRunner {
        async fn run_once(&self) -> anyhow::Result<()> {
            tokio::time::sleep(self.delay).await;
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while !cond() {
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {what}"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn idle_scheduler_starts_a_run_immediately() {
        let runner = CountingRunner::new(Duration::ZERO);
        let (scheduler, _failures) = Scheduler::new(runner.clone());
        scheduler.request_run("test").await;
        wait_until("first run", || runner.count() == 1).await;
    }

    #[tokio::test]
    async fn request_run_returns_while_the_run_is_in_flight() {
        let runner = CountingRunner::new(Duration::from_millis(200));
        let (scheduler, _failures) = Scheduler::new(runner.clone());

        let before = std::time::Instant::now();
        scheduler.request_run("slow").await;
        // The caller gets control back long before the run finishes, so the
        // requesting loop (poller or timer) keeps operating meanwhile.
        assert!(before.elapsed() < Duration::from_millis(100));
        assert_eq!(runner.count(), 0);
        wait_until("run completion", || runner.count() == 1).await;
    }

    #[tokio::test]
    async fn triggers_while_busy_coalesce_into_one_follow_up() {
        let runner = CountingRunner::new(Duration::from_millis(100));
        let (scheduler, _failures) = Scheduler::new(runner.clone());

        scheduler.request_run("first").await;
        // Let the first run get in flight, then pile on triggers.
        tokio::time::sleep(Duration::from_millis(20)).await;
        scheduler.request_run("second").await;
        scheduler.request_run("third").await;
        scheduler.request_run("fourth").await;

        wait_until("coalesced follow-up", || runner.count() == 2).await;
        // No third run materializes afterwards.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(runner.count(), 2, "one active run plus one coalesced follow-up");
    }

    #[tokio::test]
    async fn sequential_requests_each_run() {
        let runner = CountingRunner::new(Duration::ZERO);
        let (scheduler, _failures) = Scheduler::new(runner.clone());
        for n in 1..=3 {
            scheduler.request_run("again").await;
            wait_until("next run", || runner.count() == n).await;
        }
    }

    struct FailingRunner;

    #[async_trait]
    impl RunPipeline for FailingRunner {
        async fn run_once(&self) -> anyhow::Result<()> {
            anyhow::bail!("table unreadable")
        }
    }

    #[tokio::test]
    async fn runner_error_surfaces_on_the_failure_channel() {
        let (scheduler, mut failures) = Scheduler::new(Arc::new(FailingRunner));
        scheduler.request_run("a").await;
        let err = failures.recv().await.unwrap();
        assert!(err.to_string().contains("table unreadable"));

        // Flags were reset; a later request still attempts (and fails) a run.
        scheduler.request_run("b").await;
        assert!(failures.recv().await.is_some());
    }
}
