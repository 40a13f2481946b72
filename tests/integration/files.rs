//! 磁盘上的世界、脚本与配置文件

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tilescript::runtime::{Interpreter, Services};
use tilescript::util::config::{load_config, CONFIG_FILE_NAME};
use tilescript::world::{MemoryWorld, Position, TweenMovement, WorldStore};
use tilescript::Value;

const WORLD: &str = r#"
[world]
width = 6
height = 4

[[actors]]
id = "bot"
x = 0
y = 0
energy = 50
inventory = { ore = 2 }

[[tiles]]
id = "barn"
kind = "storage"
x = 2
y = 0

[[tiles]]
id = "apple"
kind = "food"
x = 2
y = 1
state = { nutrition = 30 }

[resources]
wheat = 1
"#;

const SCRIPT: &str = "\
# walk to the barn, then to the apple tree
def go:
    move_to(args[0], args[1])

go(2, 0)
store()
go(2, 1)
energy = get_energy()
eat()
";

#[tokio::test(start_paused = true)]
async fn test_run_script_file_against_world_file() {
    let dir = TempDir::new().unwrap();
    let world_path = dir.path().join("farm.toml");
    let script_path = dir.path().join("chores.tile");
    fs::write(&world_path, WORLD).unwrap();
    fs::write(&script_path, SCRIPT).unwrap();

    let world = Arc::new(MemoryWorld::load(&world_path).unwrap());
    let movement = Arc::new(TweenMovement::new(world.clone(), Duration::from_millis(300)));
    let services = Services::new(world.clone(), movement);
    let mut interpreter = Interpreter::new(&services, "bot").unwrap();
    interpreter
        .load_script(&fs::read_to_string(&script_path).unwrap())
        .unwrap();
    assert!(interpreter.has_subroutine("go"));

    let result = interpreter.execute_main().await;
    assert!(result.is_success(), "{:?}", result);

    let actor = world.actor("bot").unwrap();
    assert_eq!(actor.position, Position::new(2, 1));
    // 50 - 10（行走）- 1（存放）- 5（行走）+ 30（进食）
    assert_eq!(actor.stats.energy, 64);
    assert_eq!(interpreter.variables().get("energy"), Some(&Value::Int(34)));
    assert_eq!(world.resources().get("ore"), 2);
    assert!(actor.inventory.is_empty());
}

#[test]
fn test_missing_world_file() {
    let dir = TempDir::new().unwrap();
    let err = MemoryWorld::load(&dir.path().join("nowhere.toml")).unwrap_err();
    assert!(err.to_string().contains("nowhere.toml"));
}

#[test]
fn test_config_file_in_directory() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        "[interpreter]\npacing_cap_ms = 50\n\n[movement]\nstep_ms = 120\n",
    )
    .unwrap();

    let config = load_config(None, dir.path()).unwrap();
    assert_eq!(config.interpreter.pacing_cap_ms, 50);
    assert_eq!(config.interpreter.max_loop_iterations, 10_000);
    assert_eq!(config.movement.step_ms, 120);
    assert_eq!(config.log.level, "info");
}

#[tokio::test(start_paused = true)]
async fn test_config_drives_pacing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    fs::write(&path, "[interpreter]\npacing_cap_ms = 50\n").unwrap();
    let config = load_config(Some(&path), dir.path()).unwrap();

    let dir_world = dir.path().join("farm.toml");
    fs::write(&dir_world, WORLD).unwrap();
    let world = Arc::new(MemoryWorld::load(&dir_world).unwrap());
    let movement = Arc::new(TweenMovement::new(world.clone(), Duration::from_millis(300)));
    let services = Services::new(world.clone(), movement).with_config(config.interpreter);
    let mut interpreter = Interpreter::new(&services, "bot").unwrap();
    interpreter.load_script("move_to(2, 1)\neat()\n").unwrap();

    let start = tokio::time::Instant::now();
    assert!(interpreter.execute_main().await.is_success());
    // 三步各 300ms，进食后再暂停 50ms
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(950), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(1100), "{:?}", elapsed);
}
