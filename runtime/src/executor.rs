//! Executors, isolated actors, and the `run` operation
//!
//! `Executor::enqueue` hands a task to an executor; `run_on` wraps an
//! operation into a task, enqueues it, and returns a future for its result.
//! `Actor<S>` pairs a serial `ActorQueue` with state that only its own tasks
//! can reach, through `Isolated<S>`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::error::{Result, RuntimeError};
use crate::queue::ActorQueue;
use crate::task::PartialTask;

/// Anything that can accept tasks. Actor queues are the main implementation;
/// non-actor types may implement it too.
pub trait Executor: Send + Sync + 'static {
    fn enqueue(&self, task: PartialTask);
}

/// Result of a scheduled operation.
///
/// Resolves to the operation's output, or `RuntimeError::TaskDropped` if the
/// executor discarded the task first.
#[must_use = "a Completion does nothing unless awaited; the operation runs regardless"]
pub struct Completion<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Future for Completion<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|r| r.map_err(|_| RuntimeError::TaskDropped))
    }
}

/// Schedule `op` on `executor` and return a handle to its result.
///
/// The task is enqueued immediately; awaiting the `Completion` only waits.
pub fn run_on<T, Fut>(executor: Arc<dyn Executor>, op: Fut) -> Completion<T>
where
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let future = Box::pin(async move {
        let out = op.await;
        // Receiver gone means nobody wants the value.
        let _ = tx.send(out);
    });
    let task = PartialTask::new(future, Arc::clone(&executor));
    executor.enqueue(task);
    Completion { rx }
}

// ── Actors ──────────────────────────────────────────────────────────────────

/// An actor: a serial queue plus state owned by it.
pub struct Actor<S> {
    queue: Arc<ActorQueue>,
    state: Arc<Mutex<S>>,
}

impl<S> Clone for Actor<S> {
    fn clone(&self) -> Self {
        Actor {
            queue: Arc::clone(&self.queue),
            state: Arc::clone(&self.state),
        }
    }
}

impl<S: Send + 'static> Actor<S> {
    /// Create an actor whose queue drains on `handle`'s worker pool.
    pub fn new(name: impl Into<String>, state: S, handle: Handle) -> Self {
        Actor {
            queue: ActorQueue::new(name, handle),
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Run an isolated operation on this actor and wait for its result.
    ///
    /// `op` receives the actor's state handle. Errors returned by the
    /// operation come back unchanged inside `Ok`.
    pub fn run<T, F, Fut>(&self, op: F) -> Completion<T>
    where
        F: FnOnce(Isolated<S>) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let isolated = Isolated {
            queue: Arc::clone(&self.queue),
            state: Arc::clone(&self.state),
        };
        run_on(self.executor(), op(isolated))
    }

    pub fn executor(&self) -> Arc<dyn Executor> {
        Arc::clone(&self.queue) as Arc<dyn Executor>
    }

    pub fn queue(&self) -> &Arc<ActorQueue> {
        &self.queue
    }
}

impl<S> std::fmt::Debug for Actor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actor").field("queue", &self.queue).finish()
    }
}

/// Access to an actor's state from a task running on that actor.
pub struct Isolated<S> {
    queue: Arc<ActorQueue>,
    state: Arc<Mutex<S>>,
}

impl<S> Isolated<S> {
    /// Borrow the state for the duration of `f`.
    ///
    /// `f` is synchronous, so the borrow never spans a suspension point.
    ///
    /// # Panics
    ///
    /// Panics when called outside a task running on the owning actor's
    /// queue. Use [`Isolated::try_with`] to get an error instead.
    pub fn with<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        match self.try_with(f) {
            Ok(out) => out,
            Err(e) => panic!("{e}"),
        }
    }

    /// Like [`Isolated::with`], but returns `RuntimeError::OffQueue` when
    /// the caller is not running on the owning actor's queue.
    pub fn try_with<R>(&self, f: impl FnOnce(&mut S) -> R) -> Result<R> {
        if !self.queue.is_current() {
            return Err(RuntimeError::OffQueue {
                actor: self.queue.name().to_string(),
            });
        }
        let mut guard = self.state.lock();
        Ok(f(&mut guard))
    }

    pub fn actor_name(&self) -> &str {
        self.queue.name()
    }
}
