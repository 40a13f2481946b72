//! Storage: deposit the actor's inventory into global resources

use indexmap::IndexMap;

use super::{store_failure, TileCall, TileFunction};
use crate::runtime::result::ExecutionResult;
use crate::runtime::value::Value;
use crate::world::{ActorPatch, EnergyChange, ResourcePatch, TileKind, WorldOp};

pub const STORE_ENERGY: u32 = 1;

pub fn functions() -> Vec<TileFunction> {
    vec![TileFunction {
        name: "store",
        kind: TileKind::Storage,
        energy: STORE_ENERGY,
        description: "Move everything the actor carries into global resources",
        run: store,
    }]
}

fn store(call: &TileCall<'_>) -> ExecutionResult {
    let inventory = &call.actor.inventory;
    let total: u64 = inventory.values().map(|n| u64::from(*n)).sum();
    if total == 0 {
        return ExecutionResult::ok_msg("Nothing to store");
    }

    let resources = inventory
        .iter()
        .fold(ResourcePatch::default(), |patch, (item, count)| {
            patch.add(item.clone(), i64::from(*count))
        });
    let actor_patch = ActorPatch {
        energy: Some(EnergyChange::Debit(call.function.energy)),
        inventory: Some(IndexMap::new()),
        ..Default::default()
    };
    let ops = vec![
        WorldOp::Actor(call.actor.id.clone(), actor_patch),
        WorldOp::Resources(resources),
    ];
    if let Err(e) = call.world.transact(ops) {
        return store_failure(e);
    }

    let stored: IndexMap<String, Value> = inventory
        .iter()
        .map(|(item, count)| (item.clone(), Value::Int(i64::from(*count))))
        .collect();
    ExecutionResult::ok_msg(format!("Stored {} items", total)).with_data(Value::Map(stored))
}
