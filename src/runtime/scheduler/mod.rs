//! Task scheduler
//!
//! The scheduler is the only place that blocks and unblocks actors and
//! tiles. Each key (an actor or a tile) holds at most one task; a task is a
//! tokio timer armed for the task's duration. The timer's `JoinHandle` is the
//! cancellation handle and a per-task generation number keeps a stale timer
//! from touching a newer task on the same key.
//!
//! ```text
//! start_*_task ──► slot inserted, store marked blocked ──► timer sleeps
//!                                                             │
//!              store marked idle ◄── slot cleared ◄── on_complete runs
//! ```
//!
//! Task state is written through to the [`WorldStore`] under the same lock
//! that guards the slot table, so the store's `is_blocked` flag and the
//! scheduler's progress record change together.

pub mod task;

pub use task::{CompletionCallback, TaskKey, TaskSnapshot};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::world::{ActorPatch, ProgressInfo, TaskState, TilePatch, WorldStore};
use task::TaskSlot;

/// Per-key task scheduler, cheap to clone
#[derive(Clone)]
pub struct TaskScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    world: Arc<dyn WorldStore>,
    slots: Mutex<HashMap<TaskKey, TaskSlot>>,
    next_generation: AtomicU64,
    /// Read by a firing timer for the whole completion, written by `cancel_all`
    completion_gate: RwLock<()>,
}

impl std::fmt::Debug for TaskScheduler {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("active", &self.inner.slots.lock().len())
            .finish()
    }
}

impl SchedulerInner {
    fn write_through(
        &self,
        key: &TaskKey,
        state: TaskState,
    ) {
        let result = match key {
            TaskKey::Actor(id) => self
                .world
                .update_actor(id, ActorPatch::task_state(state))
                .map(|_| ()),
            TaskKey::Tile(id) => self
                .world
                .update_tile(id, TilePatch::task_state(state))
                .map(|_| ()),
        };
        if let Err(e) = result {
            debug!("task state of {} not mirrored: {}", key, e);
        }
    }

    /// Timer expiry: run the callback, then clear the slot if it is still ours
    fn fire(
        &self,
        key: TaskKey,
        generation: u64,
    ) {
        let _completing = self.completion_gate.read();
        let callback = {
            let mut slots = self.slots.lock();
            match slots.get_mut(&key) {
                Some(slot) if slot.generation == generation && !slot.completing => {
                    slot.completing = true;
                    slot.on_complete.take()
                }
                _ => return,
            }
        };

        if let Some(callback) = callback {
            callback();
        }

        let mut slots = self.slots.lock();
        if slots
            .get(&key)
            .is_some_and(|slot| slot.generation == generation)
        {
            if let Some(slot) = slots.remove(&key) {
                debug!("{} finished '{}'", key, slot.label);
            }
            self.write_through(&key, TaskState::idle());
        }
    }
}

impl TaskScheduler {
    pub fn new(world: Arc<dyn WorldStore>) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                world,
                slots: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(1),
                completion_gate: RwLock::new(()),
            }),
        }
    }

    /// Block an actor for `duration`
    ///
    /// Returns false without effect when the actor is already blocked.
    pub fn start_actor_task(
        &self,
        actor_id: &str,
        label: &str,
        duration: Duration,
        description: &str,
        on_complete: Option<CompletionCallback>,
    ) -> bool {
        self.start(
            TaskKey::actor(actor_id),
            label,
            duration,
            description,
            Some(actor_id.to_string()),
            on_complete,
        )
    }

    /// Block a tile for `duration`
    ///
    /// `on_complete` runs before the task is cleared, and may start the next
    /// task on the same tile.
    pub fn start_tile_task(
        &self,
        tile_id: &str,
        label: &str,
        duration: Duration,
        description: &str,
        owner_actor_id: Option<&str>,
        on_complete: Option<CompletionCallback>,
    ) -> bool {
        self.start(
            TaskKey::tile(tile_id),
            label,
            duration,
            description,
            owner_actor_id.map(str::to_string),
            on_complete,
        )
    }

    fn start(
        &self,
        key: TaskKey,
        label: &str,
        duration: Duration,
        description: &str,
        owner_actor_id: Option<String>,
        on_complete: Option<CompletionCallback>,
    ) -> bool {
        let mut slots = self.inner.slots.lock();
        if let Some(existing) = slots.get(&key) {
            if !existing.completing {
                warn!(
                    "{} is busy with '{}', rejecting '{}'",
                    key, existing.label, label
                );
                return false;
            }
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime to time '{}' on {}", label, key);
            return false;
        };

        let generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst);
        let progress = ProgressInfo::start(duration, description, owner_actor_id);
        let weak: Weak<SchedulerInner> = Arc::downgrade(&self.inner);
        let timer_key = key.clone();
        let timer = runtime.spawn(async move {
            tokio::time::sleep(duration).await;
            if let Some(inner) = weak.upgrade() {
                inner.fire(timer_key, generation);
            }
        });

        self.inner
            .write_through(&key, TaskState::active(label, progress.clone()));
        debug!("{} started '{}' for {:?}", key, label, duration);
        // a completing task keeps its timer: the callback is running inside it
        slots.insert(
            key,
            TaskSlot {
                label: label.to_string(),
                progress,
                generation,
                completing: false,
                on_complete,
                timer: Some(timer),
            },
        );
        true
    }

    /// Abort every timer without running callbacks
    ///
    /// A callback already running finishes first, so a task it chains is
    /// cancelled too. Must not be called from a completion callback.
    pub fn cancel_all(&self) {
        let _gate = self.inner.completion_gate.write();
        let mut slots = self.inner.slots.lock();
        let count = slots.len();
        for (key, slot) in slots.drain() {
            if let Some(timer) = slot.timer {
                timer.abort();
            }
            self.inner.write_through(&key, TaskState::idle());
        }
        if count > 0 {
            info!("cancelled {} task(s)", count);
        }
    }

    pub fn is_blocked(
        &self,
        key: &TaskKey,
    ) -> bool {
        self.inner.slots.lock().contains_key(key)
    }

    pub fn can_actor_act(
        &self,
        actor_id: &str,
    ) -> bool {
        !self.is_blocked(&TaskKey::actor(actor_id))
    }

    pub fn can_tile_act(
        &self,
        tile_id: &str,
    ) -> bool {
        !self.is_blocked(&TaskKey::tile(tile_id))
    }

    pub fn task(
        &self,
        key: &TaskKey,
    ) -> Option<TaskSnapshot> {
        self.inner.slots.lock().get(key).map(TaskSlot::snapshot)
    }

    pub fn actor_task(
        &self,
        actor_id: &str,
    ) -> Option<TaskSnapshot> {
        self.task(&TaskKey::actor(actor_id))
    }

    pub fn tile_task(
        &self,
        tile_id: &str,
    ) -> Option<TaskSnapshot> {
        self.task(&TaskKey::tile(tile_id))
    }

    /// Task state as the store should see it
    pub fn task_state(
        &self,
        key: &TaskKey,
    ) -> TaskState {
        match self.task(key) {
            Some(task) => TaskState::active(task.label, task.progress),
            None => TaskState::idle(),
        }
    }

    /// Completion percentage in [0, 100]; 0 without an active task
    pub fn progress(
        &self,
        key: &TaskKey,
    ) -> f64 {
        self.task(key)
            .map(|task| task.progress.percent_at(Instant::now()))
            .unwrap_or(0.0)
    }

    /// Longest remaining time among the given actor and tile
    pub fn remaining_time(
        &self,
        actor_id: Option<&str>,
        tile_id: Option<&str>,
    ) -> Duration {
        let now = Instant::now();
        let keys = actor_id
            .map(TaskKey::actor)
            .into_iter()
            .chain(tile_id.map(TaskKey::tile));
        keys.filter_map(|key| self.task(&key))
            .map(|task| task.progress.remaining_at(now))
            .max()
            .unwrap_or(Duration::ZERO)
    }

    pub fn active_count(&self) -> usize {
        self.inner.slots.lock().len()
    }
}

#[cfg(test)]
mod tests;
