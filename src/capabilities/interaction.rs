//! Interaction capabilities
//!
//! Thin wrappers over tile functions that first make sure the actor stands
//! on the right kind of tile.

use futures::future::{BoxFuture, FutureExt};

use super::{CapabilityDescriptor, Category, EnergyCost, Executor};
use crate::runtime::context::ExecutionContext;
use crate::runtime::result::{ErrorKind, ExecutionResult};
use crate::runtime::value::Value;
use crate::tiles::{farmland, storage};
use crate::world::TileKind;

pub fn descriptors() -> Vec<CapabilityDescriptor> {
    let entry = |name: &'static str,
                 description: &'static str,
                 energy: EnergyCost,
                 executor: Executor| CapabilityDescriptor {
        name,
        category: Category::Interaction,
        params: vec![],
        description,
        energy,
        executor,
    };
    vec![
        entry(
            "plant",
            "Plant seeds on farmland",
            EnergyCost::Fixed(farmland::PLANT_ENERGY),
            plant,
        ),
        entry(
            "harvest",
            "Harvest ready farmland",
            EnergyCost::Fixed(farmland::HARVEST_ENERGY),
            harvest,
        ),
        entry("eat", "Eat from a food tile", EnergyCost::None, eat),
        entry(
            "store",
            "Deposit the inventory at a storage tile",
            EnergyCost::Fixed(storage::STORE_ENERGY),
            store,
        ),
    ]
}

fn plant(
    ctx: &mut ExecutionContext,
    _args: Vec<Value>,
) -> BoxFuture<'_, ExecutionResult> {
    on_tile(ctx, "plant", TileKind::Farmland).boxed()
}

fn harvest(
    ctx: &mut ExecutionContext,
    _args: Vec<Value>,
) -> BoxFuture<'_, ExecutionResult> {
    on_tile(ctx, "harvest", TileKind::Farmland).boxed()
}

fn eat(
    ctx: &mut ExecutionContext,
    _args: Vec<Value>,
) -> BoxFuture<'_, ExecutionResult> {
    on_tile(ctx, "eat", TileKind::Food).boxed()
}

fn store(
    ctx: &mut ExecutionContext,
    _args: Vec<Value>,
) -> BoxFuture<'_, ExecutionResult> {
    on_tile(ctx, "store", TileKind::Storage).boxed()
}

/// Run `function` on the tile under the actor when it is a `kind` tile
async fn on_tile(
    ctx: &mut ExecutionContext,
    function: &'static str,
    kind: TileKind,
) -> ExecutionResult {
    let tile = match ctx.current_tile() {
        Some(tile) if tile.kind == kind => tile,
        other => {
            let here = other
                .map(|t| format!("{} ({})", t.id, t.kind))
                .unwrap_or_else(|| "open ground".to_string());
            return ExecutionResult::fail(
                ErrorKind::Precondition,
                format!(
                    "{} needs a {} tile, but {} is on {} at {}",
                    function,
                    kind,
                    ctx.actor_id(),
                    here,
                    ctx.actor.position
                ),
            );
        }
    };
    ctx.tiles.invoke(ctx.actor_id(), &tile.id, function)
}
