//! Delayed Task Scheduling
//!
//! Pair resolution and the end-of-game signal run after fixed delays. Both
//! schedulers here run tasks in order of due time, ties broken by the order
//! they were scheduled, so one session's long wait never holds back
//! another session's short one.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

/// A continuation to run once its delay has elapsed.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs callbacks after a delay.
pub trait Scheduler: Send + Sync {
    /// Run `task` once `delay` has elapsed. Scheduled tasks are never cancelled.
    fn schedule(&self, delay: Duration, task: Task);
}

// =============================================================================
// TOKIO SCHEDULER
// =============================================================================

struct TimerEntry {
    due: Instant,
    task: Task,
}

/// Timer queue drained by a single tokio task.
///
/// One worker means tasks never run concurrently with each other. The
/// worker keeps its queue keyed by `(due, arrival)` and wakes early when a
/// sooner task arrives.
pub struct TokioScheduler {
    tx: mpsc::UnboundedSender<TimerEntry>,
}

impl TokioScheduler {
    /// Start the worker on the current runtime.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn spawn() -> Self {
        Self::spawn_on(&Handle::current())
    }

    /// Start the worker on the given runtime.
    pub fn spawn_on(handle: &Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<TimerEntry>();
        handle.spawn(run_timer_loop(rx));
        Self { tx }
    }
}

async fn run_timer_loop(mut rx: mpsc::UnboundedReceiver<TimerEntry>) {
    let mut queue: BTreeMap<(Instant, u64), Task> = BTreeMap::new();
    let mut seq = 0u64;
    let mut open = true;

    loop {
        let head = queue.keys().next().map(|&(due, _)| due);

        let received = match head {
            None if !open => break,
            None => rx.recv().await,
            Some(due) => {
                tokio::select! {
                    // New entries are queued before anything runs.
                    biased;
                    entry = rx.recv(), if open => entry,
                    _ = tokio::time::sleep_until(due) => {
                        if let Some((_, task)) = queue.pop_first() {
                            task();
                        }
                        continue;
                    }
                }
            }
        };

        match received {
            Some(entry) => {
                queue.insert((entry.due, seq), entry.task);
                seq += 1;
            }
            None => open = false,
        }
    }

    debug!("Scheduler worker stopped");
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) {
        let entry = TimerEntry {
            due: Instant::now() + delay,
            task,
        };
        if self.tx.send(entry).is_err() {
            warn!("Scheduler worker is gone; dropping task due in {:?}", delay);
        }
    }
}

// =============================================================================
// MANUAL SCHEDULER
// =============================================================================

#[derive(Default)]
struct ManualQueue {
    now: Duration,
    next_seq: u64,
    entries: BTreeMap<(Duration, u64), Task>,
}

/// Scheduler driven by an explicit virtual clock.
///
/// Nothing runs until [`advance`](ManualScheduler::advance) is called.
/// Used by step-by-step drivers and tests.
#[derive(Default)]
pub struct ManualScheduler {
    queue: Mutex<ManualQueue>,
}

impl ManualScheduler {
    /// Create a scheduler at virtual time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.lock().now
    }

    /// Tasks waiting to run.
    pub fn pending_count(&self) -> usize {
        self.lock().entries.len()
    }

    /// Move the clock forward by `by`, running every task that falls due,
    /// earliest first.
    ///
    /// Tasks scheduled by a running task also run if they fall due inside
    /// the window. Returns the number of tasks run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.lock().now + by;
        let mut ran = 0;

        loop {
            // The queue lock is released before the task runs; tasks schedule.
            let task = {
                let mut queue = self.lock();
                let due = queue.entries.keys().next().map(|&(due, _)| due);
                match due {
                    Some(due) if due <= target => {
                        queue.now = queue.now.max(due);
                        queue.entries.pop_first().map(|(_, task)| task)
                    }
                    _ => {
                        queue.now = target;
                        None
                    }
                }
            };

            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    /// Run every queued task, including ones they schedule.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        loop {
            let remaining = {
                let queue = self.lock();
                queue
                    .entries
                    .keys()
                    .next_back()
                    .map(|&(latest, _)| latest.saturating_sub(queue.now))
            };
            match remaining {
                Some(wait) => ran += self.advance(wait),
                None => return ran,
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManualQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) {
        let mut queue = self.lock();
        let key = (queue.now + delay, queue.next_seq);
        queue.next_seq += 1;
        queue.entries.insert(key, task);
    }
}
