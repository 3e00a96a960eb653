//! Supervised background loops.
//!
//! A daemon is a named thread that sleeps for its interval, runs one cycle,
//! and repeats until the shared shutdown flag is raised. A cycle that
//! returns an error or panics is logged and counted; the loop keeps going.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::Context;
use tracing::{debug, error, warn};

/// Upper bound on how long a sleeping daemon takes to notice shutdown.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Cycle counters shared between a daemon thread and its owner.
#[derive(Debug, Default)]
pub struct DaemonStats {
    cycles: AtomicU64,
    failures: AtomicU64,
}

impl DaemonStats {
    /// Completed cycles, failed ones included.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Cycles that returned an error or panicked.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

/// Handle to a running daemon thread.
pub struct Daemon {
    name: String,
    stats: Arc<DaemonStats>,
    handle: JoinHandle<()>,
}

impl Daemon {
    /// Start `cycle` on a new thread named `name`, every `interval`.
    pub fn spawn<F>(
        name: &str,
        interval: Duration,
        shutdown: Arc<AtomicBool>,
        mut cycle: F,
    ) -> anyhow::Result<Self>
    where
        F: FnMut() -> anyhow::Result<()> + Send + 'static,
    {
        let stats = Arc::new(DaemonStats::default());
        let thread_stats = Arc::clone(&stats);
        let thread_name = name.to_string();

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                debug!(daemon = %thread_name, ?interval, "daemon started");
                while !shutdown.load(Ordering::Relaxed) {
                    if !sleep_unless_shutdown(interval, &shutdown) {
                        break;
                    }

                    match panic::catch_unwind(AssertUnwindSafe(&mut cycle)) {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            thread_stats.failures.fetch_add(1, Ordering::Relaxed);
                            warn!(daemon = %thread_name, error = %format!("{e:#}"), "cycle failed");
                        }
                        Err(payload) => {
                            thread_stats.failures.fetch_add(1, Ordering::Relaxed);
                            error!(
                                daemon = %thread_name,
                                panic = panic_message(payload.as_ref()),
                                "cycle panicked"
                            );
                        }
                    }
                    thread_stats.cycles.fetch_add(1, Ordering::Relaxed);
                }
                debug!(daemon = %thread_name, "daemon stopped");
            })
            .with_context(|| format!("failed to spawn daemon thread {name}"))?;

        Ok(Self {
            name: name.to_string(),
            stats,
            handle,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stats(&self) -> &Arc<DaemonStats> {
        &self.stats
    }

    /// Wait for the thread to exit. The shutdown flag must already be set.
    pub fn join(self) {
        if self.handle.join().is_err() {
            error!(daemon = %self.name, "daemon thread terminated abnormally");
        }
    }
}

/// Sleep for `total` in short slices. Returns `false` if shutdown was
/// requested meanwhile.
fn sleep_unless_shutdown(total: Duration, shutdown: &AtomicBool) -> bool {
    let deadline = Instant::now() + total;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
