//! Food: eating restores energy

use std::time::Duration;

use super::{store_failure, TileCall, TileFunction};
use crate::runtime::result::{ErrorKind, ExecutionResult};
use crate::runtime::value::Value;
use crate::world::{ActorPatch, EnergyChange, TileKind, TileValue};

/// Tile state key for the energy one meal restores
pub const NUTRITION_KEY: &str = "nutrition";
pub const DEFAULT_NUTRITION: u32 = 20;
const EATING: Duration = Duration::from_secs(1);

pub fn functions() -> Vec<TileFunction> {
    vec![TileFunction {
        name: "eat",
        kind: TileKind::Food,
        energy: 0,
        description: "Eat to restore energy, up to the maximum",
        run: eat,
    }]
}

fn eat(call: &TileCall<'_>) -> ExecutionResult {
    let nutrition = call
        .tile
        .state
        .get(NUTRITION_KEY)
        .and_then(TileValue::as_int)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(DEFAULT_NUTRITION);

    if !call
        .scheduler
        .start_actor_task(&call.actor.id, "eat", EATING, "Eating", None)
    {
        return ExecutionResult::fail(
            ErrorKind::Blocked,
            format!("{} could not start eating", call.actor.id),
        );
    }

    let before = call.actor.stats.energy;
    let patch = ActorPatch::energy(EnergyChange::Credit(nutrition));
    match call.world.update_actor(&call.actor.id, patch) {
        Ok(actor) => {
            let gained = actor.stats.energy.saturating_sub(before);
            ExecutionResult::ok_msg(format!("Ate and restored {} energy", gained))
                .with_data(Value::Int(i64::from(gained)))
                .with_duration(EATING)
        }
        Err(e) => store_failure(e),
    }
}
