//! Runtime errors
//!
//! Operation errors are never wrapped: `run` yields `Result<T, RuntimeError>`
//! where `T` is whatever the operation returned, including its own `Result`.

use thiserror::Error;

/// Result type alias for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Errors raised by the runtime itself
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// The task was discarded before it produced a value, because its
    /// queue was closed.
    #[error("task dropped before completion")]
    TaskDropped,

    #[error("global actor registry has been shut down")]
    ShutDown,

    #[error("unknown global actor: {name}")]
    UnknownGlobalActor { name: String },

    /// Isolated state was reached from outside its actor's queue.
    #[error("isolated state of '{actor}' accessed off its queue")]
    OffQueue { actor: String },
}
