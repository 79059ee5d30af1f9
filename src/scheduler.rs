// src/scheduler.rs
//! Periodic re-aggregation, pausable by an injected activity signal.
//!
//! Each job runs on its own timer. While the consumer is hidden the timer is
//! dropped entirely, not merely skipped; on return to visibility the job
//! fires exactly once as catch-up and then resumes its cadence. Missed ticks
//! are not queued: hidden for ten intervals still means one catch-up call.

use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

pub type JobCallback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Clone)]
pub struct JobSpec {
    pub name: String,
    pub interval: Duration,
    pub callback: JobCallback,
}

impl JobSpec {
    pub fn new(name: impl Into<String>, interval: Duration, callback: JobCallback) -> Self {
        Self {
            name: name.into(),
            interval,
            callback,
        }
    }
}

/// Sender half of the visibility signal. The host environment (a page, a TUI,
/// a test) flips this as the consumer appears and disappears.
pub struct ActivityHandle {
    tx: watch::Sender<bool>,
}

impl ActivityHandle {
    pub fn set_visible(&self, visible: bool) {
        let _ = self.tx.send(visible);
    }
}

/// Create the visibility channel, initially visible. The receiver is handed
/// to the scheduler; the handle stays with the host environment.
pub fn activity_signal() -> (ActivityHandle, watch::Receiver<bool>) {
    let (tx, rx) = watch::channel(true);
    (ActivityHandle { tx }, rx)
}

pub struct Scheduler {
    visibility: watch::Receiver<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(visibility: watch::Receiver<bool>) -> Self {
        Self {
            visibility,
            handles: Vec::new(),
        }
    }

    /// Start one independent periodic task per job.
    pub fn start(&mut self, jobs: Vec<JobSpec>) {
        for job in jobs {
            let vis = self.visibility.clone();
            tracing::info!(target: "scheduler", job = %job.name, interval_ms = job.interval.as_millis() as u64, "job scheduled");
            self.handles.push(tokio::spawn(run_job(job, vis)));
        }
    }

    /// Cancel all timers unconditionally.
    pub fn stop(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_job(job: JobSpec, mut vis: watch::Receiver<bool>) {
    loop {
        // Hidden: no timer exists. Park until the signal flips, then fire the
        // single catch-up invocation.
        while !*vis.borrow() {
            if vis.changed().await.is_err() {
                return; // host dropped the handle while hidden
            }
            if *vis.borrow() {
                (job.callback)().await;
            }
        }

        // Visible: fresh timer, first tick one full interval out.
        let mut ticker = interval_at(Instant::now() + job.interval, job.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    (job.callback)().await;
                }
                changed = vis.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    if !*vis.borrow() {
                        break; // drop the ticker
                    }
                    // spurious visible-while-visible signal: keep the cadence
                }
            }
        }
    }
}
