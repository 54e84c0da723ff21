//! Partial tasks
//!
//! A `PartialTask` is the unit an executor schedules: a boxed future plus the
//! executor it belongs to. Running it polls the future once. When the future
//! is woken it is handed back to its home executor, which appends it to the
//! back of its queue.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};

use parking_lot::Mutex;

use crate::executor::Executor;

pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Outcome of running a task once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPoll {
    /// The future finished; the task is spent.
    Completed,
    /// The future is waiting on something; its waker will re-enqueue it.
    Suspended,
    /// The task was cancelled while it was being polled and has been dropped.
    Cancelled,
}

pub(crate) struct TaskCell {
    future: Mutex<Option<BoxFuture>>,
    home: Arc<dyn Executor>,
    /// Set while the task sits in (or is on its way to) an executor queue.
    pub(crate) queued: AtomicBool,
    /// Set while the task is suspended and counted by its queue.
    pub(crate) parked: AtomicBool,
    /// Set by a cancel that found the future mid-poll; the poller drops it.
    cancelled: AtomicBool,
}

impl Wake for TaskCell {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        if self.queued.swap(true, Ordering::AcqRel) {
            return;
        }
        let home = Arc::clone(&self.home);
        home.enqueue(PartialTask {
            cell: Arc::clone(self),
        });
    }
}

/// A schedulable piece of work: one future bound to one executor.
pub struct PartialTask {
    pub(crate) cell: Arc<TaskCell>,
}

impl PartialTask {
    pub(crate) fn new(future: BoxFuture, home: Arc<dyn Executor>) -> Self {
        PartialTask {
            cell: Arc::new(TaskCell {
                future: Mutex::new(Some(future)),
                home,
                queued: AtomicBool::new(true),
                parked: AtomicBool::new(false),
                cancelled: AtomicBool::new(false),
            }),
        }
    }

    /// Poll the task's future once on the current thread.
    pub fn run(self) -> TaskPoll {
        self.cell.queued.store(false, Ordering::Release);
        let mut slot = self.cell.future.lock();
        let Some(future) = slot.as_mut() else {
            return TaskPoll::Completed;
        };
        if self.cell.cancelled.load(Ordering::SeqCst) {
            let spent = slot.take();
            drop(slot);
            drop(spent);
            return TaskPoll::Cancelled;
        }
        let waker = Waker::from(Arc::clone(&self.cell));
        let mut cx = Context::from_waker(&waker);
        let poll = future.as_mut().poll(&mut cx);
        // Dropped outside the lock: the future's destructor may wake or
        // cancel this same task.
        let spent = if poll.is_ready() { slot.take() } else { None };
        drop(slot);
        drop(spent);
        if poll.is_ready() {
            return TaskPoll::Completed;
        }
        // A cancel issued during the poll could not take the future itself.
        if self.cell.cancelled.load(Ordering::SeqCst) {
            let late = self.cell.future.lock().take();
            drop(late);
            return TaskPoll::Cancelled;
        }
        TaskPoll::Suspended
    }

    /// Drop the future without running it. Whoever awaits its result sees
    /// `RuntimeError::TaskDropped`.
    ///
    /// If the future is being polled right now (it woke itself into a
    /// closed queue), the poller drops it once the poll returns.
    pub fn cancel(self) {
        self.cell.cancelled.store(true, Ordering::SeqCst);
        let Some(mut slot) = self.cell.future.try_lock() else {
            return;
        };
        let future = slot.take();
        drop(slot);
        drop(future);
    }

    /// False while the future is still held, including mid-poll.
    pub fn is_finished(&self) -> bool {
        self.cell
            .future
            .try_lock()
            .is_some_and(|slot| slot.is_none())
    }
}

impl std::fmt::Debug for PartialTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartialTask")
            .field("queued", &self.cell.queued.load(Ordering::Relaxed))
            .field("finished", &self.cell.future.try_lock().map(|f| f.is_none()))
            .finish()
    }
}
