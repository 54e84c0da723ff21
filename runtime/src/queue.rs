//! Per-actor serial queue
//!
//! Every actor owns one `ActorQueue`. Tasks are admitted in FIFO order and
//! drained one at a time by a job spawned on the shared tokio pool, so at most
//! one worker services a given queue at any moment. A task that suspends is
//! re-admitted at the back of the queue when woken.
//!
//! State machine: `Idle → Running → Idle | Suspended → Running`.

use std::cell::Cell;
use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::runtime::Handle;

use crate::executor::Executor;
use crate::task::{PartialTask, TaskPoll};

/// Tasks a drain job runs before handing its worker back to the pool.
pub const DRAIN_BUDGET: usize = 64;

thread_local! {
    /// Address of the queue whose task is running on this thread, or 0.
    static CURRENT: Cell<usize> = const { Cell::new(0) };
}

/// Marks a queue as current on this thread until dropped.
struct Enter {
    prev: usize,
}

impl Drop for Enter {
    fn drop(&mut self) {
        CURRENT.with(|c| c.set(self.prev));
    }
}

/// Observable queue state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// Nothing queued and nothing suspended.
    Idle,
    /// A drain job is scheduled or running.
    Running,
    /// Nothing runnable, but at least one task is waiting to be woken.
    Suspended,
}

/// Counters kept per queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub enqueued: u64,
    pub completed: u64,
    pub suspensions: u64,
}

struct Inner {
    tasks: VecDeque<PartialTask>,
    state: QueueState,
    /// Suspended tasks not yet woken.
    parked: usize,
    closed: bool,
    stats: QueueStats,
}

impl Inner {
    fn settle(&mut self) -> QueueState {
        self.state = if self.parked > 0 {
            QueueState::Suspended
        } else {
            QueueState::Idle
        };
        self.state
    }
}

/// The serial executor behind one actor.
pub struct ActorQueue {
    name: String,
    handle: Handle,
    this: Weak<ActorQueue>,
    inner: Mutex<Inner>,
}

impl ActorQueue {
    /// Create a queue whose drain jobs run on `handle`'s worker pool.
    pub fn new(name: impl Into<String>, handle: Handle) -> Arc<Self> {
        Arc::new_cyclic(|this| ActorQueue {
            name: name.into(),
            handle,
            this: this.clone(),
            inner: Mutex::new(Inner {
                tasks: VecDeque::new(),
                state: QueueState::Idle,
                parked: 0,
                closed: false,
                stats: QueueStats::default(),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> QueueState {
        self.inner.lock().state
    }

    pub fn stats(&self) -> QueueStats {
        self.inner.lock().stats
    }

    /// Number of tasks waiting to run.
    pub fn len(&self) -> usize {
        self.inner.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True while one of this queue's tasks is running on the calling thread.
    pub fn is_current(&self) -> bool {
        CURRENT.with(|c| c.get()) == self.addr()
    }

    fn addr(&self) -> usize {
        self as *const ActorQueue as usize
    }

    fn enter(&self) -> Enter {
        let prev = CURRENT.with(|c| c.replace(self.addr()));
        Enter { prev }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Close the queue. Queued tasks are cancelled now; tasks enqueued later
    /// (including suspended ones being woken) are cancelled on arrival.
    pub fn close(&self) {
        let dropped: Vec<PartialTask> = {
            let mut inner = self.inner.lock();
            inner.closed = true;
            inner.parked = 0;
            inner.settle();
            inner.tasks.drain(..).collect()
        };
        tracing::debug!(queue = %self.name, dropped = dropped.len(), "queue closed");
        for task in dropped {
            task.cancel();
        }
    }

    fn schedule_drain(&self) {
        let Some(queue) = self.this.upgrade() else {
            return;
        };
        self.handle.spawn(async move { queue.drain() });
    }

    /// Run queued tasks one at a time, up to `DRAIN_BUDGET`, then either
    /// settle or re-schedule.
    fn drain(self: Arc<Self>) {
        for _ in 0..DRAIN_BUDGET {
            let task = {
                let mut inner = self.inner.lock();
                match inner.tasks.pop_front() {
                    Some(task) => task,
                    None => {
                        let state = inner.settle();
                        tracing::trace!(queue = %self.name, ?state, "drain finished");
                        return;
                    }
                }
            };
            let cell = Arc::clone(&task.cell);
            let poll = {
                let _enter = self.enter();
                task.run()
            };
            let mut inner = self.inner.lock();
            match poll {
                TaskPoll::Completed => inner.stats.completed += 1,
                TaskPoll::Cancelled => {}
                TaskPoll::Suspended => {
                    inner.stats.suspensions += 1;
                    // Already woken during the poll means it is back in line.
                    if !inner.closed && !cell.queued.load(Ordering::Acquire) {
                        cell.parked.store(true, Ordering::Release);
                        inner.parked += 1;
                    }
                }
            }
        }

        let mut inner = self.inner.lock();
        if inner.tasks.is_empty() {
            inner.settle();
            return;
        }
        drop(inner);
        tracing::trace!(queue = %self.name, "drain budget exhausted, yielding worker");
        self.schedule_drain();
    }
}

impl Executor for ActorQueue {
    fn enqueue(&self, task: PartialTask) {
        let mut inner = self.inner.lock();
        if inner.closed {
            drop(inner);
            task.cancel();
            return;
        }
        if task.cell.parked.swap(false, Ordering::AcqRel) {
            inner.parked = inner.parked.saturating_sub(1);
        }
        inner.tasks.push_back(task);
        inner.stats.enqueued += 1;
        match inner.state {
            QueueState::Running => {}
            QueueState::Idle | QueueState::Suspended => {
                inner.state = QueueState::Running;
                drop(inner);
                tracing::trace!(queue = %self.name, "queue running");
                self.schedule_drain();
            }
        }
    }
}

impl std::fmt::Debug for ActorQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ActorQueue")
            .field("name", &self.name)
            .field("state", &inner.state)
            .field("queued", &inner.tasks.len())
            .field("stats", &inner.stats)
            .finish()
    }
}
