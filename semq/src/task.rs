use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Producer,
    Consumer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Producer => "producer",
            Role::Consumer => "consumer",
        })
    }
}

/// Lifecycle of a producer or consumer task.
///
/// `Blocked`, `InCriticalSection` and `Processing` are the sub-states of a
/// running task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskState {
    NotStarted = 0,
    /// Waiting on a semaphore (or a cosmetic delay before one).
    Blocked = 1,
    /// Handing an item off: the slot is updated but the peer is not yet
    /// signalled.
    InCriticalSection = 2,
    Processing = 3,
    Finished = 4,
}

impl TaskState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => TaskState::NotStarted,
            1 => TaskState::Blocked,
            2 => TaskState::InCriticalSection,
            3 => TaskState::Processing,
            4 => TaskState::Finished,
            _ => unreachable!("invalid task state"),
        }
    }

    pub fn is_running(self) -> bool {
        !matches!(self, TaskState::NotStarted | TaskState::Finished)
    }
}

/// Shared view of a task's [`TaskState`], updated by the task itself.
#[derive(Debug)]
pub struct TaskMonitor {
    role: Role,
    state: AtomicU8,
}

impl TaskMonitor {
    pub const fn new(role: Role) -> Self {
        Self {
            role,
            state: AtomicU8::new(TaskState::NotStarted as u8),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, next: TaskState) {
        let prev = TaskState::from_u8(self.state.swap(next as u8, Ordering::AcqRel));
        debug_assert!(
            prev != TaskState::Finished && next != TaskState::NotStarted,
            "invalid transition of {} task: {prev:?} -> {next:?}",
            self.role,
        );
        tracing::trace!("{} task: {prev:?} -> {next:?}", self.role);
    }
}
