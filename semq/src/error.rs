use thiserror::Error;

use crate::task::Role;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("queue capacity must be positive, got {0}")]
    InvalidCapacity(usize),

    /// A task could not be brought up, so the run never started.
    #[error("failed to initialize synchronization for the {role} task")]
    SynchronizationInitFailure {
        role: Role,
        #[source]
        source: std::io::Error,
    },

    #[error("blocking wait was cancelled")]
    Cancelled,

    /// Both tasks finish for good, so a session runs at most once.
    #[error("session has already been run")]
    AlreadyRun,

    #[error("the {0} task panicked")]
    TaskPanicked(Role),

    #[error("payload catalog must not be empty")]
    EmptyCatalog,

    #[error("invalid value for {var}: {reason}")]
    InvalidConfig { var: &'static str, reason: String },
}

/// Returned by a blocking wait that was abandoned through cancellation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cancelled;

impl From<Cancelled> for Error {
    fn from(_: Cancelled) -> Self {
        Error::Cancelled
    }
}
