//! One-shot deferred tasks.
//!
//! Notification expiry is the only timed behaviour in the store. The
//! [`Scheduler`] trait lets it run on a tokio runtime in production and on
//! virtual time in tests. Scheduled tasks are never cancelled; whatever they
//! do must be safe to run late.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use store_core::clock::{Clock, ManualClock};

/// A unit of deferred work.
pub type ScheduledTask = Box<dyn FnOnce() + Send + 'static>;

/// Runs a task once after a delay.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: ScheduledTask);
}

// ── TokioScheduler ────────────────────────────────────────────────────────────

/// Spawns each task onto the current tokio runtime behind a `sleep`.
///
/// Outside a runtime the task is dropped with a warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: ScheduledTask) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    task();
                });
            }
            Err(_) => {
                tracing::warn!(
                    delay_ms = delay.as_millis() as u64,
                    "no tokio runtime; scheduled task dropped"
                );
            }
        }
    }
}

// ── ManualScheduler ───────────────────────────────────────────────────────────

struct PendingTask {
    due_ms: i64,
    seq: u64,
    task: ScheduledTask,
}

#[derive(Default)]
struct PendingQueue {
    tasks: Vec<PendingTask>,
    next_seq: u64,
}

/// Virtual-time scheduler driven by [`ManualScheduler::advance`].
///
/// Tasks are due relative to the shared [`ManualClock`]; advancing moves the
/// clock to each due time in turn and runs the task there, so a task sees
/// the time it was scheduled for.
pub struct ManualScheduler {
    clock: Arc<ManualClock>,
    pending: Mutex<PendingQueue>,
}

impl ManualScheduler {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            pending: Mutex::new(PendingQueue::default()),
        }
    }

    pub fn clock(&self) -> &Arc<ManualClock> {
        &self.clock
    }

    /// Number of tasks not yet run.
    pub fn pending(&self) -> usize {
        self.queue().tasks.len()
    }

    /// Move time forward by `delta_ms`, running every task that falls due,
    /// earliest first. Returns how many tasks ran.
    pub fn advance(&self, delta_ms: i64) -> usize {
        let target = self.clock.now_ms() + delta_ms;
        let mut ran = 0;

        while let Some(next) = self.pop_due(target) {
            if next.due_ms > self.clock.now_ms() {
                self.clock.set(next.due_ms);
            }
            // The queue lock is released here, so the task may schedule more.
            (next.task)();
            ran += 1;
        }

        if target > self.clock.now_ms() {
            self.clock.set(target);
        }
        ran
    }

    fn pop_due(&self, target: i64) -> Option<PendingTask> {
        let mut queue = self.queue();
        let idx = queue
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_ms <= target)
            .min_by_key(|(_, t)| (t.due_ms, t.seq))
            .map(|(idx, _)| idx)?;
        Some(queue.tasks.swap_remove(idx))
    }

    fn queue(&self) -> MutexGuard<'_, PendingQueue> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: ScheduledTask) {
        let delay_ms = i64::try_from(delay.as_millis()).unwrap_or(i64::MAX);
        let due_ms = self.clock.now_ms().saturating_add(delay_ms);
        let mut queue = self.queue();
        let seq = queue.next_seq;
        queue.next_seq += 1;
        queue.tasks.push(PendingTask { due_ms, seq, task });
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
