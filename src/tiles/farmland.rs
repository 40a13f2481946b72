//! Farmland: plant, wait for the crop, harvest wheat

use std::time::Duration;

use super::{collect_output, start_production, Production, TileCall, TileFunction};
use crate::runtime::result::ExecutionResult;
use crate::world::TileKind;

pub const PLANT_ENERGY: u32 = 5;
pub const HARVEST_ENERGY: u32 = 2;
pub const CROP: &str = "wheat";

const PLANTING: Production = Production {
    preparing: "planting",
    setup_label: "plant",
    setup: Duration::from_secs(2),
    setup_description: "Planting seeds",
    working: "growing",
    work_label: "grow",
    work: Duration::from_secs(8),
    work_description: "Crops growing",
    yield_quantity: 1,
};

pub fn functions() -> Vec<TileFunction> {
    vec![
        TileFunction {
            name: "plant",
            kind: TileKind::Farmland,
            energy: PLANT_ENERGY,
            description: "Plant seeds; the crop is ready about 10 seconds later",
            run: plant,
        },
        TileFunction {
            name: "harvest",
            kind: TileKind::Farmland,
            energy: HARVEST_ENERGY,
            description: "Harvest a ready crop into global wheat",
            run: harvest,
        },
    ]
}

fn plant(call: &TileCall<'_>) -> ExecutionResult {
    start_production(call, &PLANTING)
}

fn harvest(call: &TileCall<'_>) -> ExecutionResult {
    collect_output(call, CROP)
}
