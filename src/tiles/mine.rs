//! Mine: set up, let it dig, collect ore

use std::time::Duration;

use super::{collect_output, start_production, Production, TileCall, TileFunction};
use crate::runtime::result::ExecutionResult;
use crate::world::TileKind;

pub const MINE_ENERGY: u32 = 10;
pub const COLLECT_ENERGY: u32 = 2;
pub const ORE: &str = "ore";

const MINING: Production = Production {
    preparing: "preparing",
    setup_label: "mine_setup",
    setup: Duration::from_secs(3),
    setup_description: "Setting up mine",
    working: "mining",
    work_label: "mine",
    work: Duration::from_secs(10),
    work_description: "Mining ore",
    yield_quantity: 1,
};

pub fn functions() -> Vec<TileFunction> {
    vec![
        TileFunction {
            name: "mine_initiate",
            kind: TileKind::Mine,
            energy: MINE_ENERGY,
            description: "Set up the mine; ore is ready about 13 seconds later",
            run: mine_initiate,
        },
        TileFunction {
            name: "collect",
            kind: TileKind::Mine,
            energy: COLLECT_ENERGY,
            description: "Collect mined ore into global ore",
            run: collect,
        },
    ]
}

fn mine_initiate(call: &TileCall<'_>) -> ExecutionResult {
    start_production(call, &MINING)
}

fn collect(call: &TileCall<'_>) -> ExecutionResult {
    collect_output(call, ORE)
}
