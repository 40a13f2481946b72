//! Capability 单元测试

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;

use crate::capabilities::movement::{path_to, Direction};
use crate::capabilities::{CapabilityRegistry, Category, EnergyCost};
use crate::runtime::context::{ExecutionContext, Services};
use crate::runtime::events::{EventSink, ExecutionEvent};
use crate::runtime::result::{ErrorKind, ExecutionResult};
use crate::runtime::value::Value;
use crate::world::{Actor, MemoryWorld, Position, Tile, TileKind, TweenMovement, WorldStore};

struct Rig {
    world: Arc<MemoryWorld>,
    movement: Arc<TweenMovement>,
    registry: CapabilityRegistry,
    ctx: ExecutionContext,
}

fn rig(world: MemoryWorld) -> Rig {
    let world = Arc::new(world);
    let movement = Arc::new(TweenMovement::new(world.clone(), Duration::from_millis(300)));
    let services = Services::new(world.clone(), movement.clone());
    let actor = world.actor("bot").unwrap();
    let ctx = ExecutionContext::new(&services, actor, Arc::new(AtomicBool::new(true)));
    Rig {
        world,
        movement,
        registry: CapabilityRegistry::new(),
        ctx,
    }
}

fn bot_at(
    x: i32,
    y: i32,
) -> Rig {
    rig(MemoryWorld::new(10, 10).with_actor(Actor::new("bot", Position::new(x, y))))
}

impl Rig {
    async fn call(
        &mut self,
        name: &str,
        args: Vec<Value>,
    ) -> ExecutionResult {
        let executor = self.registry.get(name).unwrap().executor;
        executor(&mut self.ctx, args).await
    }
}

fn position(
    x: i64,
    y: i64,
) -> Value {
    let mut map = IndexMap::new();
    map.insert("x".to_string(), Value::Int(x));
    map.insert("y".to_string(), Value::Int(y));
    Value::Map(map)
}

fn failure_kind(result: &ExecutionResult) -> ErrorKind {
    result.kind().unwrap_or_else(|| panic!("expected failure, got {:?}", result))
}

#[cfg(test)]
mod registry_tests {
    use super::*;

    #[test]
    fn test_lookup_is_exact() {
        let registry = CapabilityRegistry::new();
        assert!(registry.get("move_right").is_some());
        assert!(registry.get("Move_Right").is_none());
        assert!(registry.get("move_righ").is_none());
    }

    #[test]
    fn test_categories_partition_everything() {
        let registry = CapabilityRegistry::new();
        let total: usize = Category::ALL
            .iter()
            .map(|c| registry.by_category(*c).count())
            .sum();
        assert_eq!(total, registry.len());
        assert_eq!(registry.all().count(), registry.len());

        let movement: Vec<&str> = registry
            .by_category(Category::Movement)
            .map(|d| d.name)
            .collect();
        assert_eq!(
            movement,
            vec!["move_up", "move_down", "move_left", "move_right", "move", "move_to"]
        );
        let system: Vec<&str> = registry.by_category(Category::System).map(|d| d.name).collect();
        assert_eq!(system, vec!["wait", "sleep"]);
    }

    #[test]
    fn test_executor_map_covers_registry() {
        let registry = CapabilityRegistry::new();
        let executors = registry.executor_map();
        assert_eq!(executors.len(), registry.len());
        assert!(executors.contains_key("plant"));
        assert!(executors.contains_key("range"));
    }

    #[test]
    fn test_describe_lists_signatures() {
        let text = CapabilityRegistry::new().describe();
        assert!(text.contains("[movement]"));
        assert!(text.contains("move_to(x: int, y: int)"));
        assert!(text.contains("move(direction: str, steps?: int)"));
        assert!(text.contains("5 energy per step"));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = CapabilityRegistry::empty();
        assert!(registry.is_empty());
        let mut wait = CapabilityRegistry::new().get("wait").unwrap().clone();
        registry.register(wait.clone());
        wait.description = "Pause";
        registry.register(wait);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("wait").unwrap().description, "Pause");
    }

    #[test]
    fn test_energy_requirements() {
        let registry = CapabilityRegistry::new();
        let actor = Actor::new("bot", Position::new(1, 1));
        let cost = |name: &str, args: &[Value]| {
            registry.get(name).unwrap().energy.required(&actor, args)
        };

        assert_eq!(cost("move_left", &[]), 5);
        assert_eq!(cost("move", &[Value::from("up")]), 5);
        assert_eq!(cost("move", &[Value::from("up"), Value::Int(3)]), 15);
        assert_eq!(cost("move_to", &[Value::Int(4), Value::Int(3)]), 25);
        assert_eq!(cost("eat", &[]), 0);
        assert_eq!(cost("print", &[]), 0);
        assert!(matches!(registry.get("plant").unwrap().energy, EnergyCost::Fixed(5)));
    }
}

#[cfg(test)]
mod movement_tests {
    use super::*;

    #[test]
    fn test_direction_parse() {
        assert_eq!(Direction::parse("Up"), Some(Direction::Up));
        assert_eq!(Direction::parse("west"), Some(Direction::Left));
        assert_eq!(Direction::parse("sideways"), None);
        assert_eq!(Direction::Up.delta(), (0, -1));
    }

    #[test]
    fn test_path_walks_x_first() {
        let path = path_to(Position::new(1, 1), Position::new(3, 0));
        assert_eq!(
            path,
            vec![Position::new(2, 1), Position::new(3, 1), Position::new(3, 0)]
        );
        assert!(path_to(Position::new(2, 2), Position::new(2, 2)).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_move_right_commits_after_tween() {
        let mut rig = bot_at(5, 5);
        let result = rig.call("move_right", vec![]).await;

        assert_eq!(result.message(), Some("Moved to (6, 5)"));
        assert_eq!(result.data(), Some(&position(6, 5)));
        assert_eq!(result.energy_cost(), Some(5));
        assert_eq!(rig.ctx.actor.position, Position::new(6, 5));
        assert_eq!(rig.world.actor("bot").unwrap().position, Position::new(6, 5));
        // 执行器只报告消耗，由解释器扣除
        assert_eq!(rig.world.actor("bot").unwrap().stats.energy, 100);
        assert_eq!(rig.movement.requests(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_bounds_never_reaches_bridge() {
        let mut rig = bot_at(0, 0);
        let result = rig.call("move_up", vec![]).await;
        assert_eq!(failure_kind(&result), ErrorKind::Bounds);
        assert!(result.message().unwrap().contains("(0, -1)"));

        // 中途越界的路径也一步都不走
        let result = rig.call("move", vec!["right".into(), Value::Int(12)]).await;
        assert_eq!(failure_kind(&result), ErrorKind::Bounds);

        let result = rig.call("move_to", vec![Value::Int(3), Value::Int(10)]).await;
        assert_eq!(failure_kind(&result), ErrorKind::Bounds);

        assert_eq!(rig.movement.requests(), 0);
        assert_eq!(rig.world.actor("bot").unwrap().position, Position::new(0, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_move_to_multi_step() {
        let mut rig = bot_at(1, 1);
        let result = rig.call("move_to", vec![Value::Int(3), Value::Int(0)]).await;
        assert!(result.is_success(), "{:?}", result);
        assert_eq!(result.energy_cost(), Some(15));
        assert_eq!(rig.movement.requests(), 3);
        assert_eq!(rig.ctx.actor.position, Position::new(3, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_move_direction_arguments() {
        let mut rig = bot_at(4, 4);
        let result = rig.call("move", vec!["down".into(), Value::Int(2)]).await;
        assert_eq!(result.data(), Some(&position(4, 6)));

        let result = rig.call("move", vec!["diagonal".into()]).await;
        assert_eq!(failure_kind(&result), ErrorKind::Execution);
        assert!(result.message().unwrap().contains("unknown direction"));

        let result = rig.call("move", vec!["up".into(), Value::Int(-1)]).await;
        assert_eq!(failure_kind(&result), ErrorKind::Execution);

        let result = rig.call("move_to", vec![Value::Int(4), Value::Int(6)]).await;
        assert_eq!(result.message(), Some("Already at (4, 6)"));
        assert_eq!(result.energy_cost(), None);
    }
}

#[cfg(test)]
mod interaction_tests {
    use super::*;

    #[tokio::test]
    async fn test_wrong_tile_kind_is_precondition() {
        let mut rig = rig(
            MemoryWorld::new(10, 10)
                .with_actor(Actor::new("bot", Position::new(2, 2)))
                .with_tile(Tile::new("mine", TileKind::Mine, Position::new(2, 2))),
        );
        let result = rig.call("plant", vec![]).await;
        assert_eq!(failure_kind(&result), ErrorKind::Precondition);
        assert!(result.message().unwrap().contains("plant needs a farmland tile"));
        assert_eq!(rig.world.actor("bot").unwrap().stats.energy, 100);

        let result = rig.call("eat", vec![]).await;
        assert_eq!(failure_kind(&result), ErrorKind::Precondition);
    }

    #[tokio::test]
    async fn test_off_any_tile() {
        let mut rig = bot_at(7, 7);
        let result = rig.call("store", vec![]).await;
        assert_eq!(failure_kind(&result), ErrorKind::Precondition);
        assert!(result.message().unwrap().contains("open ground"));
    }

    #[tokio::test]
    async fn test_plant_delegates_to_tile() {
        let mut rig = rig(
            MemoryWorld::new(10, 10)
                .with_actor(Actor::new("bot", Position::new(2, 2)))
                .with_tile(Tile::new("field", TileKind::Farmland, Position::new(2, 2))),
        );
        let result = rig.call("plant", vec![]).await;
        assert_eq!(result.message(), Some("Planting seeds"));
        assert_eq!(rig.world.tile("field").unwrap().status(), "planting");
        assert_eq!(rig.world.actor("bot").unwrap().stats.energy, 95);
    }
}

#[cfg(test)]
mod system_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_wait_sleeps_for_real() {
        let mut rig = bot_at(0, 0);
        let start = tokio::time::Instant::now();
        let result = rig.call("wait", vec![Value::Float(1.5)]).await;
        assert_eq!(result.message(), Some("Waited 1.5s"));
        assert!(start.elapsed() >= Duration::from_millis(1500));

        let result = rig.call("sleep", vec![Value::Int(2)]).await;
        assert!(result.is_success());
        assert!(start.elapsed() >= Duration::from_millis(3500));
    }

    #[tokio::test]
    async fn test_wait_rejects_bad_durations() {
        let mut rig = bot_at(0, 0);
        for args in [vec![Value::Int(-1)], vec!["soon".into()], vec![]] {
            let result = rig.call("wait", args).await;
            assert_eq!(failure_kind(&result), ErrorKind::Execution);
        }
    }
}

#[cfg(test)]
mod utility_tests {
    use super::*;

    fn ints(values: &[i64]) -> Value {
        Value::List(values.iter().map(|n| Value::Int(*n)).collect())
    }

    #[tokio::test]
    async fn test_queries() {
        let mut rig = rig(
            MemoryWorld::new(10, 10)
                .with_actor(Actor::new("bot", Position::new(3, 4)).with_energy(42).with_item("ore", 2)),
        );
        let result = rig.call("get_position", vec![]).await;
        assert_eq!(result.data(), Some(&position(3, 4)));
        let result = rig.call("get_energy", vec![]).await;
        assert_eq!(result.data(), Some(&Value::Int(42)));

        let result = rig.call("get_inventory", vec![]).await;
        let mut expected = IndexMap::new();
        expected.insert("ore".to_string(), Value::Int(2));
        assert_eq!(result.data(), Some(&Value::Map(expected)));
    }

    #[tokio::test]
    async fn test_print_emits_log() {
        let world = Arc::new(
            MemoryWorld::new(10, 10).with_actor(Actor::new("bot", Position::new(0, 0))),
        );
        let movement = Arc::new(TweenMovement::new(world.clone(), Duration::from_millis(300)));
        let (events, mut rx) = EventSink::channel();
        let services = Services::new(world.clone(), movement).with_events(events);
        let mut ctx = ExecutionContext::new(
            &services,
            world.actor("bot").unwrap(),
            Arc::new(AtomicBool::new(true)),
        );

        let print = services.capabilities.get("print").unwrap().executor;
        let result = print(&mut ctx, vec!["energy".into(), Value::Int(7)]).await;
        assert_eq!(result.message(), Some("energy 7"));
        match rx.try_recv().unwrap() {
            ExecutionEvent::Log { actor, message, .. } => {
                assert_eq!(actor, "bot");
                assert_eq!(message, "energy 7");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_range() {
        let mut rig = bot_at(0, 0);
        let result = rig.call("range", vec![Value::Int(3)]).await;
        assert_eq!(result.data(), Some(&ints(&[0, 1, 2])));
        let result = rig.call("range", vec![Value::Int(2), Value::Int(5)]).await;
        assert_eq!(result.data(), Some(&ints(&[2, 3, 4])));
        let result = rig
            .call("range", vec![Value::Int(5), Value::Int(0), Value::Int(-2)])
            .await;
        assert_eq!(result.data(), Some(&ints(&[5, 3, 1])));
        let result = rig.call("range", vec![Value::Int(-2)]).await;
        assert_eq!(result.data(), Some(&ints(&[])));

        for args in [
            vec![],
            vec![Value::Int(1), Value::Int(2), Value::Int(0)],
            vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)],
            vec!["ten".into()],
            vec![Value::Int(2_000_000)],
        ] {
            let result = rig.call("range", args).await;
            assert_eq!(failure_kind(&result), ErrorKind::Execution);
        }
    }

    #[tokio::test]
    async fn test_aggregates() {
        let mut rig = bot_at(0, 0);
        let result = rig.call("len", vec!["wheat".into()]).await;
        assert_eq!(result.data(), Some(&Value::Int(5)));
        let result = rig.call("len", vec![ints(&[1, 2])]).await;
        assert_eq!(result.data(), Some(&Value::Int(2)));

        let result = rig.call("min", vec![ints(&[4, 1, 9])]).await;
        assert_eq!(result.data(), Some(&Value::Int(1)));
        let result = rig.call("max", vec![Value::Int(4), Value::Float(9.5), Value::Int(2)]).await;
        assert_eq!(result.data(), Some(&Value::Float(9.5)));
        let result = rig.call("max", vec![]).await;
        assert_eq!(failure_kind(&result), ErrorKind::Execution);
        let result = rig.call("min", vec![Value::Int(1), "a".into()]).await;
        assert_eq!(failure_kind(&result), ErrorKind::Execution);

        let result = rig.call("sum", vec![ints(&[1, 2, 3])]).await;
        assert_eq!(result.data(), Some(&Value::Int(6)));
        let result = rig.call("sum", vec![Value::Int(1), Value::Float(0.5)]).await;
        assert_eq!(result.data(), Some(&Value::Float(1.5)));
        let result = rig.call("sum", vec![ints(&[])]).await;
        assert_eq!(result.data(), Some(&Value::Int(0)));

        let result = rig.call("abs", vec![Value::Int(-4)]).await;
        assert_eq!(result.data(), Some(&Value::Int(4)));
        let result = rig.call("abs", vec![Value::Int(i64::MIN)]).await;
        assert_eq!(failure_kind(&result), ErrorKind::Execution);
    }
}
