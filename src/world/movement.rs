//! Movement bridge
//!
//! The bridge owns the visual transition of an actor between tiles. Callers
//! request a move and await the outcome; only the bridge writes the new
//! position.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, warn};

use super::store::{ActorPatch, WorldStore};
use super::Position;

/// Movement Bridge consumed by the movement capabilities
pub trait MovementBridge: Send + Sync {
    /// Move one actor to an adjacent target; resolves to `true` on arrival
    fn request_move<'a>(
        &'a self,
        actor_id: &'a str,
        target: Position,
    ) -> BoxFuture<'a, bool>;

    /// Stop every motion in flight; those requests resolve to `false`
    fn stop_all(&self) {}
}

/// Simulated bridge: waits out the tween, then commits the position
pub struct TweenMovement {
    world: Arc<dyn WorldStore>,
    step: Duration,
    /// Bumped by `stop_all`; a tween that sees a newer epoch is discarded
    epoch: AtomicU64,
    requests: AtomicUsize,
}

impl std::fmt::Debug for TweenMovement {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("TweenMovement")
            .field("step", &self.step)
            .field("requests", &self.requests.load(Ordering::SeqCst))
            .finish()
    }
}

impl TweenMovement {
    pub fn new(
        world: Arc<dyn WorldStore>,
        step: Duration,
    ) -> Self {
        Self {
            world,
            step,
            epoch: AtomicU64::new(0),
            requests: AtomicUsize::new(0),
        }
    }

    /// Number of move requests received so far
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Tween time for one step at the given speed
    pub fn tween_duration(
        &self,
        speed: f64,
    ) -> Option<Duration> {
        if !speed.is_finite() || speed <= 0.0 {
            return None;
        }
        Some(self.step.div_f64(speed))
    }
}

impl MovementBridge for TweenMovement {
    fn request_move<'a>(
        &'a self,
        actor_id: &'a str,
        target: Position,
    ) -> BoxFuture<'a, bool> {
        async move {
            self.requests.fetch_add(1, Ordering::SeqCst);
            let epoch = self.epoch.load(Ordering::SeqCst);

            let actor = match self.world.actor(actor_id) {
                Ok(actor) => actor,
                Err(e) => {
                    warn!("move rejected: {}", e);
                    return false;
                }
            };
            if !self.world.bounds().contains(target) {
                warn!("move rejected: {} is out of bounds", target);
                return false;
            }
            let Some(tween) = self.tween_duration(actor.stats.speed) else {
                warn!("move rejected: {} cannot move at speed {}", actor_id, actor.stats.speed);
                return false;
            };

            debug!("{} tweening {} -> {} over {:?}", actor_id, actor.position, target, tween);
            tokio::time::sleep(tween).await;

            if self.epoch.load(Ordering::SeqCst) != epoch {
                debug!("{} motion stopped before arrival", actor_id);
                return false;
            }
            self.world
                .update_actor(actor_id, ActorPatch::position(target))
                .is_ok()
        }
        .boxed()
    }

    fn stop_all(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }
}
