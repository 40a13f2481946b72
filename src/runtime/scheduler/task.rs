//! Task definitions for the scheduler.
//!
//! A task is a time-boxed unit of blocking work keyed by the actor or tile it
//! occupies.

use std::fmt;

use tokio::task::JoinHandle;

use crate::world::ProgressInfo;

/// Completion callback run when a task's timer fires
pub type CompletionCallback = Box<dyn FnOnce() + Send + 'static>;

/// What a task blocks
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskKey {
    Actor(String),
    Tile(String),
}

impl TaskKey {
    pub fn actor(id: impl Into<String>) -> Self {
        TaskKey::Actor(id.into())
    }

    pub fn tile(id: impl Into<String>) -> Self {
        TaskKey::Tile(id.into())
    }

    pub fn id(&self) -> &str {
        match self {
            TaskKey::Actor(id) | TaskKey::Tile(id) => id,
        }
    }
}

impl fmt::Display for TaskKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            TaskKey::Actor(id) => write!(f, "actor:{}", id),
            TaskKey::Tile(id) => write!(f, "tile:{}", id),
        }
    }
}

/// Read-only view of an active task
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSnapshot {
    pub label: String,
    pub progress: ProgressInfo,
}

/// Scheduler bookkeeping for one key
pub(crate) struct TaskSlot {
    pub(crate) label: String,
    pub(crate) progress: ProgressInfo,
    /// Distinguishes this task from a later one on the same key
    pub(crate) generation: u64,
    /// Timer fired and the callback is running; the key may be re-armed
    pub(crate) completing: bool,
    pub(crate) on_complete: Option<CompletionCallback>,
    /// Cancellation handle of the timer task
    pub(crate) timer: Option<JoinHandle<()>>,
}

impl TaskSlot {
    pub(crate) fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            label: self.label.clone(),
            progress: self.progress.clone(),
        }
    }
}

impl fmt::Debug for TaskSlot {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("TaskSlot")
            .field("label", &self.label)
            .field("generation", &self.generation)
            .field("completing", &self.completing)
            .finish()
    }
}
