//! Tile function dispatch
//!
//! Tiles bind functions by name (`plant` on farmland, `collect` on a mine,
//! ...). A script reaches them by standing on the tile and calling the name.
//! [`TileFunctionDispatch::invoke`] checks every precondition before any
//! side effect, in this order:
//!
//! 1. the actor stands on the tile
//! 2. the actor is not busy
//! 3. the tile is not mid-task
//! 4. the actor has enough energy

pub mod farmland;
pub mod food;
pub mod mine;
pub mod storage;

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::runtime::result::{ErrorKind, ExecutionResult};
use crate::runtime::scheduler::{CompletionCallback, TaskScheduler};
use crate::runtime::value::Value;
use crate::world::{
    Actor, ActorPatch, EnergyChange, ResourcePatch, Tile, TileKind, TilePatch, TileValue,
    WorldError, WorldOp, WorldStore, QUANTITY_KEY, STATUS_KEY,
};

/// Tile status values
pub mod status {
    pub const IDLE: &str = "idle";
    pub const READY: &str = "ready";
}

/// Tile state key naming the actor that started the current cycle
pub const WORKER_KEY: &str = "worker";

/// Everything a tile function body sees
pub struct TileCall<'a> {
    pub actor: &'a Actor,
    pub tile: &'a Tile,
    pub function: &'a TileFunction,
    pub world: &'a Arc<dyn WorldStore>,
    pub scheduler: &'a TaskScheduler,
}

pub type TileFn = fn(&TileCall<'_>) -> ExecutionResult;

/// A function a tile kind can bind
#[derive(Debug, Clone)]
pub struct TileFunction {
    pub name: &'static str,
    pub kind: TileKind,
    /// Energy the actor needs to start it
    pub energy: u32,
    pub description: &'static str,
    pub run: TileFn,
}

/// Resolves and runs tile-bound functions
pub struct TileFunctionDispatch {
    world: Arc<dyn WorldStore>,
    scheduler: TaskScheduler,
    functions: IndexMap<&'static str, TileFunction>,
}

impl std::fmt::Debug for TileFunctionDispatch {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("TileFunctionDispatch")
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TileFunctionDispatch {
    /// Dispatch with the built-in tile functions
    pub fn new(
        world: Arc<dyn WorldStore>,
        scheduler: TaskScheduler,
    ) -> Self {
        let functions = farmland::functions()
            .into_iter()
            .chain(mine::functions())
            .chain(food::functions())
            .chain(storage::functions())
            .map(|f| (f.name, f))
            .collect();
        Self {
            world,
            scheduler,
            functions,
        }
    }

    pub fn functions(&self) -> impl Iterator<Item = &TileFunction> {
        self.functions.values()
    }

    /// The function `name` when `tile` binds it
    pub fn resolve(
        &self,
        tile: &Tile,
        name: &str,
    ) -> Option<&TileFunction> {
        if !tile.binds(name) {
            return None;
        }
        self.functions.get(name).filter(|f| f.kind == tile.kind)
    }

    /// Check preconditions and run `name` on `tile_id` for `actor_id`
    pub fn invoke(
        &self,
        actor_id: &str,
        tile_id: &str,
        name: &str,
    ) -> ExecutionResult {
        let (actor, tile) = match (self.world.actor(actor_id), self.world.tile(tile_id)) {
            (Ok(actor), Ok(tile)) => (actor, tile),
            (Err(e), _) | (_, Err(e)) => return ExecutionResult::execution_error(e),
        };
        let Some(function) = self.resolve(&tile, name) else {
            return ExecutionResult::fail(
                ErrorKind::NotFound,
                format!("{} has no function {}", tile.id, name),
            );
        };

        if actor.position != tile.position {
            return ExecutionResult::fail(
                ErrorKind::Precondition,
                format!(
                    "{} must stand on {} at {} to {}, but is at {}",
                    actor.id, tile.id, tile.position, name, actor.position
                ),
            );
        }
        if let Some(task) = self.scheduler.actor_task(&actor.id) {
            return ExecutionResult::fail(
                ErrorKind::Blocked,
                format!(
                    "{} is busy: {} ({}% complete)",
                    actor.id,
                    task.progress.description,
                    task.progress.percent_at(Instant::now()).floor()
                ),
            );
        }
        if let Some(task) = self.scheduler.tile_task(&tile.id) {
            return ExecutionResult::fail(
                ErrorKind::Blocked,
                format!(
                    "{} is not ready: {} ({}% complete)",
                    tile.id,
                    task.progress.description,
                    task.progress.percent_at(Instant::now()).floor()
                ),
            );
        }
        if actor.stats.energy < function.energy {
            return ExecutionResult::fail(
                ErrorKind::Resource,
                format!(
                    "not enough energy: {} needs {}, have {}",
                    name, function.energy, actor.stats.energy
                ),
            );
        }

        debug!("{} runs {} on {}", actor.id, name, tile.id);
        let call = TileCall {
            actor: &actor,
            tile: &tile,
            function,
            world: &self.world,
            scheduler: &self.scheduler,
        };
        (function.run)(&call)
    }
}

/// Turn a store failure into the script-facing failure
fn store_failure(error: WorldError) -> ExecutionResult {
    match error {
        WorldError::InsufficientEnergy { needed, available } => ExecutionResult::fail(
            ErrorKind::Resource,
            format!("not enough energy: need {}, have {}", needed, available),
        ),
        WorldError::InsufficientResource {
            name,
            needed,
            available,
        } => ExecutionResult::fail(
            ErrorKind::Resource,
            format!("not enough {}: need {}, have {}", name, needed, available),
        ),
        WorldError::Conflict { id, .. } => ExecutionResult::fail(
            ErrorKind::Blocked,
            format!("{} is not ready: another actor got there first", id),
        ),
        other => ExecutionResult::execution_error(other),
    }
}

/// Guard that `key` on the tile still holds the snapshot's value
fn unchanged(
    tile: &Tile,
    key: &str,
) -> WorldOp {
    WorldOp::TileGuard {
        id: tile.id.clone(),
        key: key.to_string(),
        expected: tile.state.get(key).cloned(),
    }
}

/// Write a tile status from a timer callback
fn set_status(
    world: &Arc<dyn WorldStore>,
    tile_id: &str,
    status: &str,
    quantity: Option<i64>,
) {
    let mut patch = TilePatch::default().set(STATUS_KEY, TileValue::from(status));
    if let Some(quantity) = quantity {
        patch = patch.set(QUANTITY_KEY, TileValue::Int(quantity));
    }
    if let Err(e) = world.update_tile(tile_id, patch) {
        warn!("{} status not updated to {}: {}", tile_id, status, e);
    }
}

/// Two-stage production: the actor sets up, then the tile works alone
pub(crate) struct Production {
    /// Status while the actor sets up
    pub preparing: &'static str,
    pub setup_label: &'static str,
    pub setup: Duration,
    pub setup_description: &'static str,
    /// Status while the tile works
    pub working: &'static str,
    pub work_label: &'static str,
    pub work: Duration,
    pub work_description: &'static str,
    pub yield_quantity: i64,
}

/// A cancelled cycle leaves its status behind with no task driving it
fn interrupted(
    call: &TileCall<'_>,
    production: &Production,
) -> bool {
    let tile = call.tile;
    if tile.status() == status::READY || call.scheduler.tile_task(&tile.id).is_some() {
        return false;
    }
    let setting_up = tile
        .state
        .get(WORKER_KEY)
        .and_then(TileValue::as_text)
        .and_then(|worker| call.scheduler.actor_task(worker))
        .is_some_and(|task| task.label == production.setup_label);
    !setting_up
}

/// Start a production cycle on an idle tile
pub(crate) fn start_production(
    call: &TileCall<'_>,
    production: &Production,
) -> ExecutionResult {
    let tile = call.tile;
    let current = tile.status();
    if current != status::IDLE {
        if !interrupted(call, production) {
            return ExecutionResult::fail(
                ErrorKind::Precondition,
                format!("{} is {}, only an idle {} can start", tile.id, current, tile.kind),
            );
        }
        debug!("{} was left {} by a cancelled cycle, starting over", tile.id, current);
    }

    let energy = call.function.energy;
    // the snapshot must still hold under the write lock
    let ops = vec![
        unchanged(tile, STATUS_KEY),
        unchanged(tile, WORKER_KEY),
        WorldOp::Actor(
            call.actor.id.clone(),
            ActorPatch::energy(EnergyChange::Debit(energy)),
        ),
        WorldOp::Tile(
            tile.id.clone(),
            TilePatch::default()
                .set(STATUS_KEY, TileValue::from(production.preparing))
                .set(WORKER_KEY, TileValue::from(call.actor.id.as_str())),
        ),
    ];
    if let Err(e) = call.world.transact(ops) {
        return store_failure(e);
    }

    let world = call.world.clone();
    let scheduler = call.scheduler.clone();
    let tile_id = tile.id.clone();
    let owner = call.actor.id.clone();
    let working = production.working;
    let work_label = production.work_label;
    let work = production.work;
    let work_description = production.work_description;
    let quantity = production.yield_quantity;

    let after_setup: CompletionCallback = Box::new(move || {
        set_status(&world, &tile_id, working, None);
        let done_world = world.clone();
        let done_tile = tile_id.clone();
        let on_ready: CompletionCallback = Box::new(move || {
            set_status(&done_world, &done_tile, status::READY, Some(quantity));
        });
        if !scheduler.start_tile_task(
            &tile_id,
            work_label,
            work,
            work_description,
            Some(&owner),
            Some(on_ready),
        ) {
            set_status(&world, &tile_id, status::IDLE, None);
        }
    });

    let started = call.scheduler.start_actor_task(
        &call.actor.id,
        production.setup_label,
        production.setup,
        production.setup_description,
        Some(after_setup),
    );
    if !started {
        // roll back: refund the energy and return to idle
        let refund = vec![
            WorldOp::Actor(
                call.actor.id.clone(),
                ActorPatch::energy(EnergyChange::Credit(energy)),
            ),
            WorldOp::Tile(
                tile.id.clone(),
                TilePatch::default().set(STATUS_KEY, TileValue::from(status::IDLE)),
            ),
        ];
        if let Err(e) = call.world.transact(refund) {
            warn!("refund for {} failed: {}", tile.id, e);
        }
        return ExecutionResult::fail(
            ErrorKind::Blocked,
            format!("{} could not start {}", call.actor.id, production.setup_label),
        );
    }

    ExecutionResult::ok_msg(production.setup_description).with_duration(production.setup)
}

/// Collect a finished tile's output into global resources
pub(crate) fn collect_output(
    call: &TileCall<'_>,
    resource: &str,
) -> ExecutionResult {
    let tile = call.tile;
    if tile.status() != status::READY {
        return ExecutionResult::fail(
            ErrorKind::Precondition,
            format!("{} is not ready (status: {})", tile.id, tile.status()),
        );
    }

    let quantity = tile.quantity().max(0);
    let ops = vec![
        unchanged(tile, STATUS_KEY),
        WorldOp::Tile(
            tile.id.clone(),
            TilePatch::default()
                .set(STATUS_KEY, TileValue::from(status::IDLE))
                .set(QUANTITY_KEY, TileValue::Int(0)),
        ),
        WorldOp::Resources(ResourcePatch::default().add(resource, quantity)),
        WorldOp::Actor(
            call.actor.id.clone(),
            ActorPatch::energy(EnergyChange::Debit(call.function.energy)),
        ),
    ];
    if let Err(e) = call.world.transact(ops) {
        return store_failure(e);
    }

    ExecutionResult::ok_msg(format!("Collected {} {}", quantity, resource))
        .with_data(Value::Int(quantity))
}

#[cfg(test)]
mod tests;
