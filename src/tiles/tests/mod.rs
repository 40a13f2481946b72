//! Tile dispatch 单元测试
//!
//! 暂停时钟下驱动完整的生产周期

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::runtime::result::{ErrorKind, ExecutionResult};
use crate::runtime::scheduler::TaskScheduler;
use crate::runtime::value::Value;
use crate::tiles::{TileCall, TileFunctionDispatch};
use crate::world::{Actor, MemoryWorld, Position, Tile, TileKind, TileValue, WorldStore};

struct Fixture {
    world: Arc<MemoryWorld>,
    scheduler: TaskScheduler,
    dispatch: TileFunctionDispatch,
}

fn fixture(world: MemoryWorld) -> Fixture {
    let world = Arc::new(world);
    let scheduler = TaskScheduler::new(world.clone());
    let dispatch = TileFunctionDispatch::new(world.clone(), scheduler.clone());
    Fixture {
        world,
        scheduler,
        dispatch,
    }
}

fn farm() -> Fixture {
    fixture(
        MemoryWorld::new(10, 10)
            .with_actor(Actor::new("bot", Position::new(2, 2)))
            .with_tile(Tile::new("field", TileKind::Farmland, Position::new(2, 2))),
    )
}

fn mine() -> Fixture {
    fixture(
        MemoryWorld::new(10, 10)
            .with_actor(Actor::new("bot", Position::new(4, 4)))
            .with_tile(Tile::new("mine", TileKind::Mine, Position::new(4, 4))),
    )
}

fn crew_on_mine() -> Fixture {
    fixture(
        MemoryWorld::new(10, 10)
            .with_actor(Actor::new("bot", Position::new(4, 4)))
            .with_actor(Actor::new("bob", Position::new(4, 4)))
            .with_tile(Tile::new("mine", TileKind::Mine, Position::new(4, 4))),
    )
}

/// 用较旧的地块快照执行地块函数
fn run_with_snapshot(
    f: &Fixture,
    actor_id: &str,
    tile: &Tile,
    name: &str,
) -> ExecutionResult {
    let world: Arc<dyn WorldStore> = f.world.clone();
    let actor = f.world.actor(actor_id).unwrap();
    let function = f.dispatch.resolve(tile, name).unwrap();
    let call = TileCall {
        actor: &actor,
        tile,
        function,
        world: &world,
        scheduler: &f.scheduler,
    };
    (function.run)(&call)
}

fn failure(result: ExecutionResult) -> (ErrorKind, String) {
    match result {
        ExecutionResult::Failure { kind, message } => (kind, message),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[cfg(test)]
mod mine_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_mining_cycle() {
        let f = mine();

        let result = f.dispatch.invoke("bot", "mine", "mine_initiate");
        assert!(result.is_success(), "{:?}", result);
        assert_eq!(result.duration(), Some(Duration::from_secs(3)));
        assert_eq!(f.world.actor("bot").unwrap().stats.energy, 90);
        assert!(f.world.actor("bot").unwrap().task_state.is_blocked);
        assert_eq!(f.world.tile("mine").unwrap().status(), "preparing");

        sleep(Duration::from_millis(3010)).await;
        assert!(f.scheduler.can_actor_act("bot"));
        let tile = f.world.tile("mine").unwrap();
        assert_eq!(tile.status(), "mining");
        assert!(tile.task_state.is_blocked);

        // t = 5s：矿仍在开采
        sleep(Duration::from_secs(2)).await;
        let (kind, message) = failure(f.dispatch.invoke("bot", "mine", "collect"));
        assert_eq!(kind, ErrorKind::Blocked);
        assert!(message.contains("not ready"), "{}", message);
        assert!(message.contains("Mining ore"), "{}", message);
        assert_eq!(f.world.resources().get("ore"), 0);

        // t = 13.02s
        sleep(Duration::from_millis(8010)).await;
        let tile = f.world.tile("mine").unwrap();
        assert_eq!(tile.status(), "ready");
        assert_eq!(tile.quantity(), 1);
        assert!(!tile.task_state.is_blocked);

        let result = f.dispatch.invoke("bot", "mine", "collect");
        assert!(result.is_success(), "{:?}", result);
        assert_eq!(result.data(), Some(&Value::Int(1)));
        assert_eq!(f.world.resources().get("ore"), 1);
        let tile = f.world.tile("mine").unwrap();
        assert_eq!(tile.status(), "idle");
        assert_eq!(tile.quantity(), 0);
        assert_eq!(f.world.actor("bot").unwrap().stats.energy, 88);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_mid_setup() {
        let f = mine();
        assert!(f.dispatch.invoke("bot", "mine", "mine_initiate").is_success());

        sleep(Duration::from_secs(1)).await;
        f.scheduler.cancel_all();
        assert!(!f.world.actor("bot").unwrap().task_state.is_blocked);
        assert!(!f.world.tile("mine").unwrap().task_state.is_blocked);
        assert_eq!(f.scheduler.active_count(), 0);

        sleep(Duration::from_secs(20)).await;
        // 准备回调从未执行，矿没有开始开采
        let tile = f.world.tile("mine").unwrap();
        assert_eq!(tile.status(), "preparing");
        assert!(!tile.task_state.is_blocked);
        assert_eq!(f.world.actor("bot").unwrap().stats.energy, 90);

        // 被中断的矿不能收取，但可以重新开始
        let (kind, _) = failure(f.dispatch.invoke("bot", "mine", "collect"));
        assert_eq!(kind, ErrorKind::Precondition);
        let result = f.dispatch.invoke("bot", "mine", "mine_initiate");
        assert!(result.is_success(), "{:?}", result);
        assert_eq!(f.world.actor("bot").unwrap().stats.energy, 80);

        sleep(Duration::from_millis(13020)).await;
        assert_eq!(f.world.tile("mine").unwrap().status(), "ready");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_mid_work() {
        let f = mine();
        assert!(f.dispatch.invoke("bot", "mine", "mine_initiate").is_success());

        sleep(Duration::from_secs(5)).await;
        assert!(!f.scheduler.can_tile_act("mine"));
        f.scheduler.cancel_all();
        assert!(f.scheduler.can_tile_act("mine"));
        assert!(!f.world.tile("mine").unwrap().task_state.is_blocked);

        sleep(Duration::from_secs(20)).await;
        assert_eq!(f.world.tile("mine").unwrap().status(), "mining");
        assert_eq!(f.world.tile("mine").unwrap().quantity(), 0);

        let result = f.dispatch.invoke("bot", "mine", "mine_initiate");
        assert!(result.is_success(), "{:?}", result);
        assert_eq!(f.world.tile("mine").unwrap().status(), "preparing");
    }

    #[tokio::test(start_paused = true)]
    async fn test_setup_in_progress_is_not_interrupted() {
        let f = crew_on_mine();
        assert!(f.dispatch.invoke("bot", "mine", "mine_initiate").is_success());

        let (kind, message) = failure(f.dispatch.invoke("bob", "mine", "mine_initiate"));
        assert_eq!(kind, ErrorKind::Precondition);
        assert!(message.contains("mine is preparing"), "{}", message);
        assert_eq!(f.world.actor("bob").unwrap().stats.energy, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_snapshot_loses_the_start() {
        let f = crew_on_mine();
        let stale = f.world.tile("mine").unwrap();
        assert!(f.dispatch.invoke("bot", "mine", "mine_initiate").is_success());

        let (kind, message) = failure(run_with_snapshot(&f, "bob", &stale, "mine_initiate"));
        assert_eq!(kind, ErrorKind::Blocked);
        assert!(message.contains("another actor got there first"), "{}", message);
        assert_eq!(f.world.actor("bob").unwrap().stats.energy, 100);
        assert!(f.scheduler.can_actor_act("bob"));
        assert_eq!(f.scheduler.actor_task("bot").unwrap().label, "mine_setup");
        let tile = f.world.tile("mine").unwrap();
        assert_eq!(tile.status(), "preparing");
        assert_eq!(tile.state.get("worker"), Some(&TileValue::from("bot")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_snapshot_collects_nothing() {
        let f = crew_on_mine();
        assert!(f.dispatch.invoke("bot", "mine", "mine_initiate").is_success());
        sleep(Duration::from_millis(13020)).await;

        let ready = f.world.tile("mine").unwrap();
        assert!(f.dispatch.invoke("bot", "mine", "collect").is_success());
        let (kind, _) = failure(run_with_snapshot(&f, "bob", &ready, "collect"));
        assert_eq!(kind, ErrorKind::Blocked);
        assert_eq!(f.world.resources().get("ore"), 1);
        assert_eq!(f.world.actor("bob").unwrap().stats.energy, 100);
    }

    #[tokio::test]
    async fn test_collect_idle_mine_is_precondition() {
        let f = mine();
        let (kind, message) = failure(f.dispatch.invoke("bot", "mine", "collect"));
        assert_eq!(kind, ErrorKind::Precondition);
        assert!(message.contains("not ready"), "{}", message);
        assert_eq!(f.world.actor("bot").unwrap().stats.energy, 100);
    }
}

#[cfg(test)]
mod precondition_tests {
    use super::*;

    #[tokio::test]
    async fn test_off_tile_is_checked_first() {
        let f = fixture(
            MemoryWorld::new(10, 10)
                .with_actor(Actor::new("bot", Position::new(0, 0)).with_energy(1))
                .with_tile(Tile::new("field", TileKind::Farmland, Position::new(2, 2))),
        );
        assert!(f
            .scheduler
            .start_actor_task("bot", "busy", Duration::from_secs(5), "Busy", None));

        let (kind, message) = failure(f.dispatch.invoke("bot", "field", "plant"));
        assert_eq!(kind, ErrorKind::Precondition);
        assert!(message.contains("must stand on field"), "{}", message);
        assert_eq!(f.world.tile("field").unwrap().status(), "idle");
    }

    #[tokio::test]
    async fn test_busy_actor_before_tile_state() {
        let f = farm();
        assert!(f
            .scheduler
            .start_actor_task("bot", "eat", Duration::from_secs(5), "Eating", None));
        assert!(f.scheduler.start_tile_task(
            "field",
            "grow",
            Duration::from_secs(5),
            "Crops growing",
            None,
            None
        ));

        let (kind, message) = failure(f.dispatch.invoke("bot", "field", "harvest"));
        assert_eq!(kind, ErrorKind::Blocked);
        assert!(message.contains("bot is busy: Eating"), "{}", message);
    }

    #[tokio::test]
    async fn test_busy_tile_before_energy() {
        let f = fixture(
            MemoryWorld::new(10, 10)
                .with_actor(Actor::new("bot", Position::new(2, 2)).with_energy(0))
                .with_tile(Tile::new("field", TileKind::Farmland, Position::new(2, 2))),
        );
        assert!(f.scheduler.start_tile_task(
            "field",
            "grow",
            Duration::from_secs(5),
            "Crops growing",
            None,
            None
        ));

        let (kind, message) = failure(f.dispatch.invoke("bot", "field", "harvest"));
        assert_eq!(kind, ErrorKind::Blocked);
        assert!(message.contains("field is not ready: Crops growing"), "{}", message);
    }

    #[tokio::test]
    async fn test_low_energy_mutates_nothing() {
        let f = fixture(
            MemoryWorld::new(10, 10)
                .with_actor(Actor::new("bot", Position::new(2, 2)).with_energy(4))
                .with_tile(Tile::new("field", TileKind::Farmland, Position::new(2, 2))),
        );

        let (kind, message) = failure(f.dispatch.invoke("bot", "field", "plant"));
        assert_eq!(kind, ErrorKind::Resource);
        assert!(message.contains("not enough energy"), "{}", message);
        assert_eq!(f.world.actor("bot").unwrap().stats.energy, 4);
        assert_eq!(f.world.tile("field").unwrap().status(), "idle");
        assert_eq!(f.scheduler.active_count(), 0);
    }

    #[tokio::test]
    async fn test_unbound_function_is_not_found() {
        let f = farm();
        let (kind, _) = failure(f.dispatch.invoke("bot", "field", "collect"));
        assert_eq!(kind, ErrorKind::NotFound);
    }

    #[test]
    fn test_resolve_requires_binding_and_kind() {
        let f = farm();
        let field = f.world.tile("field").unwrap();
        assert!(f.dispatch.resolve(&field, "plant").is_some());
        assert!(f.dispatch.resolve(&field, "mine_initiate").is_none());

        // 绑定了名字但类型不匹配
        let mut odd = Tile::new("odd", TileKind::Plain, Position::new(0, 0));
        odd.functions.push("plant".to_string());
        assert!(f.dispatch.resolve(&odd, "plant").is_none());
    }
}

#[cfg(test)]
mod farmland_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_plant_then_harvest() {
        let f = farm();

        let result = f.dispatch.invoke("bot", "field", "plant");
        assert_eq!(result.message(), Some("Planting seeds"));
        assert_eq!(f.world.tile("field").unwrap().status(), "planting");

        // 准备期间再次 plant 会被忙碌检查拒绝
        let (kind, _) = failure(f.dispatch.invoke("bot", "field", "plant"));
        assert_eq!(kind, ErrorKind::Blocked);

        sleep(Duration::from_millis(2010)).await;
        assert_eq!(f.world.tile("field").unwrap().status(), "growing");
        let (kind, _) = failure(f.dispatch.invoke("bot", "field", "harvest"));
        assert_eq!(kind, ErrorKind::Blocked);

        sleep(Duration::from_secs(8)).await;
        assert_eq!(f.world.tile("field").unwrap().status(), "ready");

        let (kind, message) = failure(f.dispatch.invoke("bot", "field", "plant"));
        assert_eq!(kind, ErrorKind::Precondition);
        assert!(message.contains("field is ready"), "{}", message);

        let result = f.dispatch.invoke("bot", "field", "harvest");
        assert_eq!(result.message(), Some("Collected 1 wheat"));
        assert_eq!(f.world.resources().get("wheat"), 1);
        assert_eq!(f.world.tile("field").unwrap().status(), "idle");
        assert_eq!(f.world.actor("bot").unwrap().stats.energy, 93);
    }

    #[tokio::test]
    async fn test_harvest_energy_shortfall_is_atomic() {
        let f = fixture(
            MemoryWorld::new(10, 10)
                .with_actor(Actor::new("bot", Position::new(2, 2)).with_energy(1))
                .with_tile(
                    Tile::new("field", TileKind::Farmland, Position::new(2, 2))
                        .with_state("status", TileValue::from("ready"))
                        .with_state("quantity", TileValue::Int(3)),
                ),
        );
        let (kind, _) = failure(f.dispatch.invoke("bot", "field", "harvest"));
        assert_eq!(kind, ErrorKind::Resource);
        assert_eq!(f.world.resources().get("wheat"), 0);
        assert_eq!(f.world.tile("field").unwrap().status(), "ready");
        assert_eq!(f.world.tile("field").unwrap().quantity(), 3);
    }
}

#[cfg(test)]
mod food_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_eat_is_capped_at_max() {
        let f = fixture(
            MemoryWorld::new(10, 10)
                .with_actor(Actor::new("bot", Position::new(1, 1)).with_energy(90))
                .with_tile(Tile::new("apple", TileKind::Food, Position::new(1, 1))),
        );

        let result = f.dispatch.invoke("bot", "apple", "eat");
        assert_eq!(result.message(), Some("Ate and restored 10 energy"));
        assert_eq!(result.data(), Some(&Value::Int(10)));
        assert_eq!(result.duration(), Some(Duration::from_secs(1)));
        let actor = f.world.actor("bot").unwrap();
        assert_eq!(actor.stats.energy, 100);
        assert!(actor.task_state.is_blocked);

        sleep(Duration::from_millis(1010)).await;
        assert!(f.scheduler.can_actor_act("bot"));
    }

    #[tokio::test]
    async fn test_eat_uses_tile_nutrition() {
        let f = fixture(
            MemoryWorld::new(10, 10)
                .with_actor(Actor::new("bot", Position::new(1, 1)).with_energy(10))
                .with_tile(
                    Tile::new("berry", TileKind::Food, Position::new(1, 1))
                        .with_state("nutrition", TileValue::Int(5)),
                ),
        );
        assert!(f.dispatch.invoke("bot", "berry", "eat").is_success());
        assert_eq!(f.world.actor("bot").unwrap().stats.energy, 15);
    }
}

#[cfg(test)]
mod storage_tests {
    use super::*;

    #[tokio::test]
    async fn test_store_moves_inventory() {
        let f = fixture(
            MemoryWorld::new(10, 10)
                .with_actor(
                    Actor::new("bot", Position::new(3, 3))
                        .with_item("wheat", 3)
                        .with_item("ore", 2),
                )
                .with_tile(Tile::new("barn", TileKind::Storage, Position::new(3, 3)))
                .with_resource("wheat", 1),
        );

        let result = f.dispatch.invoke("bot", "barn", "store");
        assert_eq!(result.message(), Some("Stored 5 items"));
        let resources = f.world.resources();
        assert_eq!(resources.get("wheat"), 4);
        assert_eq!(resources.get("ore"), 2);
        let actor = f.world.actor("bot").unwrap();
        assert!(actor.inventory.is_empty());
        assert_eq!(actor.stats.energy, 99);
    }

    #[tokio::test]
    async fn test_store_empty_inventory() {
        let f = fixture(
            MemoryWorld::new(10, 10)
                .with_actor(Actor::new("bot", Position::new(3, 3)))
                .with_tile(Tile::new("barn", TileKind::Storage, Position::new(3, 3))),
        );
        let result = f.dispatch.invoke("bot", "barn", "store");
        assert_eq!(result.message(), Some("Nothing to store"));
        assert_eq!(f.world.actor("bot").unwrap().stats.energy, 100);
    }
}
