//! Named, cancelable timers owned by a single player instance
//!
//! Timer tasks never touch player state. They only post an event on the
//! player's channel; the controller applies it. Disposing the scheduler
//! aborts every task in one pass.
//!
//! Aborting a task cannot take back an event it already queued, so every
//! registration hands out a [`Ticket`]. Cancelling or re-arming a slot
//! retires the old ticket, and the consumer drops events whose ticket is
//! no longer current.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace};

/// Timer slots of the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskName {
    ControlsHide,
    DownloadProgress,
    DownloadReset,
    NoticeDismiss,
    ProgressPersist,
    FileSave,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskName::ControlsHide => write!(f, "controls-hide"),
            TaskName::DownloadProgress => write!(f, "download-progress"),
            TaskName::DownloadReset => write!(f, "download-reset"),
            TaskName::NoticeDismiss => write!(f, "notice-dismiss"),
            TaskName::ProgressPersist => write!(f, "progress-persist"),
            TaskName::FileSave => write!(f, "file-save"),
        }
    }
}

/// One registration of a timer slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub task: TaskName,
    pub generation: u64,
}

/// Scheduler delivering events of type `E`
pub struct Scheduler<E> {
    tasks: HashMap<TaskName, JoinHandle<()>>,
    generations: HashMap<TaskName, u64>,
    tx: Option<mpsc::UnboundedSender<E>>,
}

impl<E: Send + 'static> Scheduler<E> {
    /// Create a scheduler and the receiving end of its event channel
    pub fn new() -> (Self, mpsc::UnboundedReceiver<E>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tasks: HashMap::new(),
                generations: HashMap::new(),
                tx: Some(tx),
            },
            rx,
        )
    }

    /// Sender for events that do not come from a timer (media callbacks)
    pub fn sender(&self) -> Option<mpsc::UnboundedSender<E>> {
        self.tx.clone()
    }

    /// Deliver the event built by `event` once after `delay`
    pub fn after<F>(&mut self, task: TaskName, delay: Duration, event: F) -> Option<Ticket>
    where
        F: FnOnce(Ticket) -> E,
    {
        let (tx, ticket) = self.prepare(task)?;
        let event = event(ticket);
        // Deadline is fixed now, not when the task is first polled.
        let deadline = Instant::now() + delay;
        let handle = tokio::spawn(async move {
            time::sleep_until(deadline).await;
            trace!(task = %task, "Timer fired");
            let _ = tx.send(event);
        });
        self.tasks.insert(task, handle);
        Some(ticket)
    }

    /// Deliver the event built by `event` every `period`, first after one
    /// full period
    pub fn every<F>(&mut self, task: TaskName, period: Duration, event: F) -> Option<Ticket>
    where
        E: Clone,
        F: FnOnce(Ticket) -> E,
    {
        let (tx, ticket) = self.prepare(task)?;
        let event = event(ticket);
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let handle = tokio::spawn(async move {
            loop {
                interval.tick().await;
                trace!(task = %task, "Interval fired");
                if tx.send(event.clone()).is_err() {
                    break;
                }
            }
        });
        self.tasks.insert(task, handle);
        Some(ticket)
    }

    /// Run `work` and deliver its output as an event
    pub fn spawn<F>(&mut self, task: TaskName, work: F) -> Option<Ticket>
    where
        F: Future<Output = E> + Send + 'static,
    {
        let (tx, ticket) = self.prepare(task)?;
        let handle = tokio::spawn(async move {
            let event = work.await;
            let _ = tx.send(event);
        });
        self.tasks.insert(task, handle);
        Some(ticket)
    }

    /// Whether events carrying `ticket` should still be applied
    pub fn is_current(&self, ticket: Ticket) -> bool {
        !self.is_disposed() && self.generations.get(&ticket.task) == Some(&ticket.generation)
    }

    /// Cancel a task; returns true if it was still pending
    pub fn cancel(&mut self, task: TaskName) -> bool {
        self.retire(task);
        match self.tasks.remove(&task) {
            Some(handle) => {
                let pending = !handle.is_finished();
                handle.abort();
                if pending {
                    debug!(task = %task, "Task cancelled");
                }
                pending
            }
            None => false,
        }
    }

    /// Whether a task is registered and has not completed
    pub fn is_scheduled(&self, task: TaskName) -> bool {
        self.tasks.get(&task).is_some_and(|h| !h.is_finished())
    }

    /// Number of pending tasks
    pub fn active_count(&self) -> usize {
        self.tasks.values().filter(|h| !h.is_finished()).count()
    }

    /// Cancel every task and stop accepting new ones
    pub fn dispose(&mut self) {
        let cancelled = self.tasks.len();
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
        self.tx = None;
        debug!(cancelled, "Scheduler disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.tx.is_none()
    }

    /// Cancel any previous task in the slot and hand out a sender plus
    /// the ticket of the new registration
    fn prepare(&mut self, task: TaskName) -> Option<(mpsc::UnboundedSender<E>, Ticket)> {
        if let Some(previous) = self.tasks.remove(&task) {
            previous.abort();
        }
        let Some(tx) = self.tx.clone() else {
            debug!(task = %task, "Ignoring task on disposed scheduler");
            return None;
        };
        let generation = self.retire(task);
        Some((tx, Ticket { task, generation }))
    }

    /// Invalidate every ticket handed out for the slot so far
    fn retire(&mut self, task: TaskName) -> u64 {
        let generation = self.generations.entry(task).or_insert(0);
        *generation += 1;
        *generation
    }
}

impl<E> Drop for Scheduler<E> {
    fn drop(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }
}
