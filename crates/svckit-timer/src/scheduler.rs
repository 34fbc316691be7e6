//! Timer list, scan task, and dispatch types

use async_channel::Sender;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// An expired timer, delivered to the host's event queue.
///
/// The callback runs when the dispatch loop calls [`run`](Self::run), not
/// when the timer expires.
pub struct TimerFired {
    callback: Option<TimerCallback>,
    cancelled: Arc<AtomicBool>,
}

impl TimerFired {
    /// Runs the callback unless the timer was cancelled after expiry.
    pub fn run(mut self) {
        if self.cancelled.load(Ordering::Acquire) {
            return;
        }

        if let Some(callback) = self.callback.take() {
            callback();
        }
    }
}

impl fmt::Debug for TimerFired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerFired")
            .field("cancelled", &self.cancelled.load(Ordering::Relaxed))
            .finish()
    }
}

/// Handle for cancelling a scheduled timer.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
    /// Marks the timer invalid; the next scan removes it without firing.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether the timer has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

struct TimerEntry {
    deadline: Instant,
    callback: Option<TimerCallback>,
    cancelled: Arc<AtomicBool>,
}

/// Millisecond timer scheduler with a single background scan task.
pub struct TimerScheduler {
    entries: Arc<Mutex<Vec<TimerEntry>>>,
    shutdown: watch::Sender<bool>,
    scan_task: Option<JoinHandle<()>>,
}

impl TimerScheduler {
    /// Starts the scan task; expired timers are sent to `events`.
    pub fn start(scan_interval_ms: u64, events: Sender<TimerFired>) -> Self {
        let entries: Arc<Mutex<Vec<TimerEntry>>> = Arc::new(Mutex::new(Vec::new()));
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let scan_entries = Arc::clone(&entries);
        let scan_task = tokio::spawn(async move {
            let mut tick =
                tokio::time::interval(Duration::from_millis(scan_interval_ms.max(1)));
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        debug!("timer scan task shutting down");
                        break;
                    }
                    _ = tick.tick() => {
                        for fired in collect_expired(&scan_entries) {
                            if events.send(fired).await.is_err() {
                                warn!("timer event queue closed, dropping fired timer");
                            }
                        }
                    }
                }
            }
        });

        Self {
            entries,
            shutdown,
            scan_task: Some(scan_task),
        }
    }

    /// Schedules `callback` to fire after `delay`.
    pub fn schedule(
        &self,
        delay: Duration,
        callback: impl FnOnce() + Send + 'static,
    ) -> TimerHandle {
        let cancelled = Arc::new(AtomicBool::new(false));

        self.entries.lock().push(TimerEntry {
            deadline: Instant::now() + delay,
            callback: Some(Box::new(callback)),
            cancelled: Arc::clone(&cancelled),
        });

        TimerHandle { cancelled }
    }

    /// Schedules `callback` to fire after `delay_ms` milliseconds.
    pub fn schedule_ms(
        &self,
        delay_ms: u64,
        callback: impl FnOnce() + Send + 'static,
    ) -> TimerHandle {
        self.schedule(Duration::from_millis(delay_ms), callback)
    }

    /// Number of timers waiting to expire (cancelled entries included until
    /// the next scan removes them).
    pub fn pending(&self) -> usize {
        self.entries.lock().len()
    }

    /// Stops the scan task and waits for it to exit. Idempotent.
    pub async fn stop(&mut self) {
        let _ = self.shutdown.send(true);

        if let Some(task) = self.scan_task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "timer scan task ended abnormally");
            }
        }
    }
}

/// Removes cancelled entries and extracts expired ones.
fn collect_expired(entries: &Mutex<Vec<TimerEntry>>) -> Vec<TimerFired> {
    let now = Instant::now();
    let mut fired = Vec::new();

    entries.lock().retain_mut(|entry| {
        if entry.cancelled.load(Ordering::Acquire) {
            return false;
        }

        if entry.deadline <= now {
            fired.push(TimerFired {
                callback: entry.callback.take(),
                cancelled: Arc::clone(&entry.cancelled),
            });
            return false;
        }

        true
    });

    fired
}
