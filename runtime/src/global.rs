//! Global actor registry
//!
//! Maps declared global actor type names to their singleton queues. Queues
//! are created on first `resolve` and live until `shutdown`. The registry is
//! an explicit value; nothing here is process-global.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;

use crate::error::{Result, RuntimeError};
use crate::executor::{run_on, Completion};
use crate::queue::ActorQueue;

#[derive(Default)]
struct Inner {
    declared: BTreeSet<String>,
    instances: HashMap<String, Arc<ActorQueue>>,
    shut_down: bool,
}

/// Singleton executors for global actor types.
pub struct GlobalActors {
    handle: Handle,
    inner: Mutex<Inner>,
}

impl GlobalActors {
    pub fn new(handle: Handle) -> Self {
        GlobalActors {
            handle,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Registry with the given global actor types declared.
    pub fn with_types<I, N>(handle: Handle, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let registry = Self::new(handle);
        for name in names {
            registry.declare(name);
        }
        registry
    }

    /// Declare a global actor type. Declaring twice is a no-op.
    pub fn declare(&self, name: impl Into<String>) {
        self.inner.lock().declared.insert(name.into());
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.inner.lock().declared.contains(name)
    }

    /// The singleton queue for `name`, created on first use.
    pub fn resolve(&self, name: &str) -> Result<Arc<ActorQueue>> {
        let mut inner = self.inner.lock();
        if inner.shut_down {
            return Err(RuntimeError::ShutDown);
        }
        if !inner.declared.contains(name) {
            return Err(RuntimeError::UnknownGlobalActor {
                name: name.to_string(),
            });
        }
        if let Some(queue) = inner.instances.get(name) {
            return Ok(Arc::clone(queue));
        }
        let queue = ActorQueue::new(name, self.handle.clone());
        inner.instances.insert(name.to_string(), Arc::clone(&queue));
        tracing::debug!(global_actor = name, "global actor initialized");
        Ok(queue)
    }

    /// Schedule `op` on the global actor `name`.
    pub fn run<T, Fut>(&self, name: &str, op: Fut) -> Result<Completion<T>>
    where
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let queue = self.resolve(name)?;
        Ok(run_on(queue, op))
    }

    /// Close every initialized queue and refuse further resolution.
    pub fn shutdown(&self) {
        let queues: Vec<Arc<ActorQueue>> = {
            let mut inner = self.inner.lock();
            inner.shut_down = true;
            inner.instances.drain().map(|(_, q)| q).collect()
        };
        tracing::debug!(count = queues.len(), "global actors shut down");
        for queue in queues {
            queue.close();
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.lock().shut_down
    }
}

impl std::fmt::Debug for GlobalActors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("GlobalActors")
            .field("declared", &inner.declared)
            .field("initialized", &inner.instances.len())
            .field("shut_down", &inner.shut_down)
            .finish()
    }
}
