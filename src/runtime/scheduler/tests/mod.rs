//! Scheduler 单元测试
//!
//! 使用 tokio 暂停时钟推进虚拟时间，测试阻塞标志、进度、链式任务和取消

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use tokio::time::sleep;

use crate::runtime::scheduler::{TaskKey, TaskScheduler};
use crate::world::{Actor, MemoryWorld, Position, Tile, TileKind, WorldStore};

fn setup() -> (Arc<MemoryWorld>, TaskScheduler) {
    let world = Arc::new(
        MemoryWorld::new(10, 10)
            .with_actor(Actor::new("bot", Position::new(1, 1)))
            .with_tile(Tile::new("mine", TileKind::Mine, Position::new(1, 1))),
    );
    let scheduler = TaskScheduler::new(world.clone());
    (world, scheduler)
}

fn close_to(
    actual: Duration,
    expected: Duration,
) -> bool {
    actual.abs_diff(expected) <= Duration::from_millis(5)
}

fn counter_callback(counter: &Arc<AtomicUsize>) -> Option<crate::runtime::scheduler::CompletionCallback> {
    let counter = counter.clone();
    Some(Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }))
}

#[cfg(test)]
mod actor_task_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_blocked_flag_and_progress_move_together() {
        let (world, scheduler) = setup();
        let done = Arc::new(AtomicUsize::new(0));

        assert!(scheduler.start_actor_task(
            "bot",
            "setup",
            Duration::from_secs(3),
            "Setting up",
            counter_callback(&done)
        ));
        assert!(!scheduler.can_actor_act("bot"));
        let stored = world.actor("bot").unwrap().task_state;
        assert!(stored.is_blocked);
        assert_eq!(stored.current_task.as_deref(), Some("setup"));
        assert_eq!(stored.progress.unwrap().description, "Setting up");

        sleep(Duration::from_secs(1)).await;
        let pct = scheduler.progress(&TaskKey::actor("bot"));
        assert!((pct - 100.0 / 3.0).abs() < 0.5, "progress was {}", pct);

        sleep(Duration::from_millis(2001)).await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
        assert!(scheduler.can_actor_act("bot"));
        assert_eq!(scheduler.progress(&TaskKey::actor("bot")), 0.0);
        let stored = world.actor("bot").unwrap().task_state;
        assert!(!stored.is_blocked);
        assert!(stored.progress.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_start_is_rejected() {
        let (_world, scheduler) = setup();
        assert!(scheduler.start_actor_task("bot", "first", Duration::from_secs(5), "First", None));
        let before = scheduler.actor_task("bot").unwrap();

        sleep(Duration::from_secs(1)).await;
        assert!(!scheduler.start_actor_task("bot", "second", Duration::from_secs(1), "Second", None));

        let after = scheduler.actor_task("bot").unwrap();
        assert_eq!(before, after);
        assert_eq!(after.label, "first");
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_time_takes_longest() {
        let (_world, scheduler) = setup();
        scheduler.start_actor_task("bot", "a", Duration::from_secs(3), "A", None);
        scheduler.start_tile_task("mine", "t", Duration::from_secs(10), "T", Some("bot"), None);

        sleep(Duration::from_secs(2)).await;
        let actor_left = scheduler.remaining_time(Some("bot"), None);
        assert!(close_to(actor_left, Duration::from_secs(1)), "{:?}", actor_left);
        let both_left = scheduler.remaining_time(Some("bot"), Some("mine"));
        assert!(close_to(both_left, Duration::from_secs(8)), "{:?}", both_left);
        assert_eq!(scheduler.remaining_time(None, None), Duration::ZERO);
    }

    #[test]
    fn test_start_without_runtime_is_rejected() {
        let (_world, scheduler) = setup();
        assert!(!scheduler.start_actor_task("bot", "a", Duration::from_secs(1), "A", None));
        assert!(scheduler.can_actor_act("bot"));
    }
}

#[cfg(test)]
mod tile_task_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_callback_may_chain_on_same_tile() {
        let (world, scheduler) = setup();
        let second_done = Arc::new(AtomicUsize::new(0));

        let chain = {
            let scheduler = scheduler.clone();
            let second_done = second_done.clone();
            Box::new(move || {
                let started = scheduler.start_tile_task(
                    "mine",
                    "phase-two",
                    Duration::from_secs(4),
                    "Phase two",
                    None,
                    counter_callback(&second_done),
                );
                assert!(started);
            })
        };
        assert!(scheduler.start_tile_task(
            "mine",
            "phase-one",
            Duration::from_secs(2),
            "Phase one",
            Some("bot"),
            Some(chain)
        ));
        assert_eq!(
            scheduler.tile_task("mine").unwrap().progress.owner_actor_id.as_deref(),
            Some("bot")
        );

        sleep(Duration::from_millis(2001)).await;
        let task = scheduler.tile_task("mine").expect("chained task survives the clear");
        assert_eq!(task.label, "phase-two");
        assert!(world.tile("mine").unwrap().task_state.is_blocked);

        sleep(Duration::from_secs(4)).await;
        assert_eq!(second_done.load(Ordering::SeqCst), 1);
        assert!(scheduler.can_tile_act("mine"));
        assert!(!world.tile("mine").unwrap().task_state.is_blocked);
    }
}

#[cfg(test)]
mod cancel_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_skips_callbacks() {
        let (world, scheduler) = setup();
        let fired = Arc::new(AtomicUsize::new(0));
        scheduler.start_actor_task("bot", "a", Duration::from_secs(3), "A", counter_callback(&fired));
        scheduler.start_tile_task("mine", "t", Duration::from_secs(10), "T", None, counter_callback(&fired));
        assert_eq!(scheduler.active_count(), 2);

        sleep(Duration::from_secs(1)).await;
        scheduler.cancel_all();

        assert_eq!(scheduler.active_count(), 0);
        assert!(scheduler.can_actor_act("bot"));
        assert!(scheduler.can_tile_act("mine"));
        assert!(!world.actor("bot").unwrap().task_state.is_blocked);
        assert!(!world.tile("mine").unwrap().task_state.is_blocked);
        assert_eq!(scheduler.progress(&TaskKey::tile("mine")), 0.0);

        sleep(Duration::from_secs(20)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_key_is_reusable_after_cancel() {
        let (_world, scheduler) = setup();
        scheduler.start_actor_task("bot", "a", Duration::from_secs(3), "A", None);
        scheduler.cancel_all();
        assert!(scheduler.start_actor_task("bot", "b", Duration::from_secs(1), "B", None));
        // "a" 被中止的计时器不能清除 "b"
        sleep(Duration::from_millis(500)).await;
        assert_eq!(scheduler.actor_task("bot").unwrap().label, "b");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancel_during_callback_also_cancels_the_chain() {
        let (world, scheduler) = setup();
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let chain = scheduler.clone();
        let callback: crate::runtime::scheduler::CompletionCallback = Box::new(move || {
            let _ = entered_tx.send(());
            // cancel_all 在回调执行期间到达
            std::thread::sleep(Duration::from_millis(100));
            chain.start_tile_task("mine", "work", Duration::from_secs(10), "Work", None, None);
        });
        assert!(scheduler.start_tile_task(
            "mine",
            "setup",
            Duration::from_millis(10),
            "Setup",
            None,
            Some(callback)
        ));

        let canceller = scheduler.clone();
        tokio::task::spawn_blocking(move || {
            entered_rx.recv().unwrap();
            canceller.cancel_all();
        })
        .await
        .unwrap();

        assert_eq!(scheduler.active_count(), 0);
        assert!(scheduler.can_tile_act("mine"));
        assert!(!world.tile("mine").unwrap().task_state.is_blocked);
    }
}

proptest! {
    #[test]
    fn prop_progress_is_monotonic_and_bounded(
        duration_ms in 100u64..5_000,
        steps in proptest::collection::vec(1u64..800, 1..12),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();
        runtime.block_on(async {
            let (world, scheduler) = setup();
            let key = TaskKey::actor("bot");
            scheduler.start_actor_task("bot", "p", Duration::from_millis(duration_ms), "P", None);

            let mut last = scheduler.progress(&key);
            for step in steps {
                sleep(Duration::from_millis(step)).await;
                let pct = scheduler.progress(&key);
                let active = scheduler.is_blocked(&key);
                prop_assert_eq!(active, world.actor("bot").unwrap().task_state.is_blocked);
                prop_assert!((0.0..=100.0).contains(&pct));
                if active {
                    prop_assert!(pct >= last);
                    last = pct;
                } else {
                    prop_assert_eq!(pct, 0.0);
                }
            }
            Ok(())
        })?;
    }
}
