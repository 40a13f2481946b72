//! Execution context
//!
//! Everything a capability executor may touch while one statement runs: a
//! snapshot of the acting actor, handles to the shared services and the
//! interpreter's variable snapshot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;

use super::events::{EventSink, ExecutionEvent};
use super::result::Severity;
use super::scheduler::TaskScheduler;
use super::value::Value;
use crate::capabilities::CapabilityRegistry;
use crate::tiles::TileFunctionDispatch;
use crate::util::config::InterpreterConfig;
use crate::world::{Actor, MovementBridge, Tile, WorldError, WorldStore};

/// Shared services several interpreters run against
///
/// One `Services` value is built per world; every actor (primary or drone)
/// gets its own interpreter from it via
/// [`Interpreter::new`](super::interpreter::Interpreter::new).
#[derive(Clone)]
pub struct Services {
    pub world: Arc<dyn WorldStore>,
    pub movement: Arc<dyn MovementBridge>,
    pub scheduler: TaskScheduler,
    pub tiles: Arc<TileFunctionDispatch>,
    pub capabilities: Arc<CapabilityRegistry>,
    pub events: EventSink,
    pub config: InterpreterConfig,
}

impl std::fmt::Debug for Services {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("scheduler", &self.scheduler)
            .field("config", &self.config)
            .finish()
    }
}

impl Services {
    /// Services with the built-in capabilities and tile functions
    pub fn new(
        world: Arc<dyn WorldStore>,
        movement: Arc<dyn MovementBridge>,
    ) -> Self {
        let scheduler = TaskScheduler::new(world.clone());
        let tiles = Arc::new(TileFunctionDispatch::new(world.clone(), scheduler.clone()));
        Self {
            world,
            movement,
            scheduler,
            tiles,
            capabilities: Arc::new(CapabilityRegistry::new()),
            events: EventSink::disabled(),
            config: InterpreterConfig::default(),
        }
    }

    pub fn with_events(
        mut self,
        events: EventSink,
    ) -> Self {
        self.events = events;
        self
    }

    pub fn with_config(
        mut self,
        config: InterpreterConfig,
    ) -> Self {
        self.config = config;
        self
    }
}

/// Per-statement view handed to capability executors
pub struct ExecutionContext {
    /// Local snapshot; refreshed with [`resync`](Self::resync)
    pub actor: Actor,
    pub world: Arc<dyn WorldStore>,
    pub movement: Arc<dyn MovementBridge>,
    pub scheduler: TaskScheduler,
    pub tiles: Arc<TileFunctionDispatch>,
    pub events: EventSink,
    /// Variables visible to the running script
    pub variables: IndexMap<String, Value>,
    running: Arc<AtomicBool>,
}

impl ExecutionContext {
    pub(crate) fn new(
        services: &Services,
        actor: Actor,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            actor,
            world: services.world.clone(),
            movement: services.movement.clone(),
            scheduler: services.scheduler.clone(),
            tiles: services.tiles.clone(),
            events: services.events.clone(),
            variables: IndexMap::new(),
            running,
        }
    }

    #[inline]
    pub fn actor_id(&self) -> &str {
        &self.actor.id
    }

    /// Refresh the actor snapshot from the store
    pub fn resync(&mut self) -> Result<&Actor, WorldError> {
        self.actor = self.world.actor(&self.actor.id)?;
        Ok(&self.actor)
    }

    /// Tile under the actor, by the current snapshot
    pub fn current_tile(&self) -> Option<Tile> {
        self.world.tile_at(self.actor.position)
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Send a log line to the presentation layer
    pub fn log(
        &self,
        severity: Severity,
        message: impl Into<String>,
    ) {
        self.events.emit(ExecutionEvent::Log {
            actor: self.actor.id.clone(),
            severity,
            message: message.into(),
        });
    }
}
