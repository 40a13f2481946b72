//! Simulated world
//!
//! Data model shared by the scheduler, capabilities and tile functions, plus
//! the two external collaborators the interpreter consumes: the world state
//! store and the movement bridge.

pub mod memory;
pub mod movement;
pub mod store;

pub use memory::MemoryWorld;
pub use movement::{MovementBridge, TweenMovement};
pub use store::{
    ActorPatch, Bounds, EnergyChange, ResourcePatch, TilePatch, WorldError, WorldOp, WorldStore,
};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

pub type ActorId = String;
pub type TileId = String;

/// Tile state key holding the production status
pub const STATUS_KEY: &str = "status";
/// Tile state key holding the produced quantity
pub const QUANTITY_KEY: &str = "quantity";

/// Grid coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    #[inline]
    pub fn new(
        x: i32,
        y: i32,
    ) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn offset(
        self,
        dx: i32,
        dy: i32,
    ) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Manhattan distance in tile steps
    pub fn steps_to(
        self,
        other: Position,
    ) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for Position {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Actor statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub energy: u32,
    pub max_energy: u32,
    /// Movement speed multiplier, 1.0 is the base tween time
    pub speed: f64,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            energy: 100,
            max_energy: 100,
            speed: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    #[default]
    Primary,
    Drone,
}

/// A controllable entity
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub id: ActorId,
    pub kind: ActorKind,
    pub position: Position,
    pub stats: Stats,
    pub inventory: IndexMap<String, u32>,
    pub task_state: TaskState,
}

impl Actor {
    pub fn new(
        id: impl Into<ActorId>,
        position: Position,
    ) -> Self {
        Self {
            id: id.into(),
            kind: ActorKind::Primary,
            position,
            stats: Stats::default(),
            inventory: IndexMap::new(),
            task_state: TaskState::default(),
        }
    }

    pub fn with_energy(
        mut self,
        energy: u32,
    ) -> Self {
        self.stats.energy = energy;
        self.stats.max_energy = self.stats.max_energy.max(energy);
        self
    }

    pub fn with_kind(
        mut self,
        kind: ActorKind,
    ) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_item(
        mut self,
        item: impl Into<String>,
        count: u32,
    ) -> Self {
        self.inventory.insert(item.into(), count);
        self
    }
}

/// Tile kinds and the functions they bind by default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    #[default]
    Plain,
    Farmland,
    Mine,
    Food,
    Storage,
}

impl TileKind {
    pub fn default_functions(self) -> &'static [&'static str] {
        match self {
            TileKind::Plain => &[],
            TileKind::Farmland => &["plant", "harvest"],
            TileKind::Mine => &["mine_initiate", "collect"],
            TileKind::Food => &["eat"],
            TileKind::Storage => &["store"],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TileKind::Plain => "plain",
            TileKind::Farmland => "farmland",
            TileKind::Mine => "mine",
            TileKind::Food => "food",
            TileKind::Storage => "storage",
        }
    }

    /// Producing tiles track an idle/working/ready status
    pub fn is_producer(self) -> bool {
        matches!(self, TileKind::Farmland | TileKind::Mine)
    }
}

impl fmt::Display for TileKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific tile state value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TileValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl TileValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            TileValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TileValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for TileValue {
    fn from(s: &str) -> Self {
        TileValue::Text(s.to_string())
    }
}

impl From<i64> for TileValue {
    fn from(n: i64) -> Self {
        TileValue::Int(n)
    }
}

/// A positioned world object
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub id: TileId,
    pub kind: TileKind,
    pub position: Position,
    pub functions: Vec<String>,
    pub state: IndexMap<String, TileValue>,
    pub task_state: TaskState,
}

impl Tile {
    pub fn new(
        id: impl Into<TileId>,
        kind: TileKind,
        position: Position,
    ) -> Self {
        let mut state = IndexMap::new();
        if kind.is_producer() {
            state.insert(STATUS_KEY.to_string(), TileValue::from("idle"));
            state.insert(QUANTITY_KEY.to_string(), TileValue::Int(0));
        }
        Self {
            id: id.into(),
            kind,
            position,
            functions: kind
                .default_functions()
                .iter()
                .map(|f| f.to_string())
                .collect(),
            state,
            task_state: TaskState::default(),
        }
    }

    pub fn with_state(
        mut self,
        key: impl Into<String>,
        value: TileValue,
    ) -> Self {
        self.state.insert(key.into(), value);
        self
    }

    pub fn status(&self) -> &str {
        self.state
            .get(STATUS_KEY)
            .and_then(TileValue::as_text)
            .unwrap_or("idle")
    }

    pub fn quantity(&self) -> i64 {
        self.state
            .get(QUANTITY_KEY)
            .and_then(TileValue::as_int)
            .unwrap_or(0)
    }

    pub fn binds(
        &self,
        function: &str,
    ) -> bool {
        self.functions.iter().any(|f| f == function)
    }
}

/// Blocking state of an actor or tile
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskState {
    pub is_blocked: bool,
    pub current_task: Option<String>,
    pub progress: Option<ProgressInfo>,
}

impl TaskState {
    pub fn active(
        label: impl Into<String>,
        progress: ProgressInfo,
    ) -> Self {
        Self {
            is_blocked: true,
            current_task: Some(label.into()),
            progress: Some(progress),
        }
    }

    pub fn idle() -> Self {
        Self::default()
    }
}

/// Timing of one running task
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressInfo {
    pub is_active: bool,
    pub start_time: Instant,
    pub duration: Duration,
    pub description: String,
    pub owner_actor_id: Option<ActorId>,
}

impl ProgressInfo {
    pub fn start(
        duration: Duration,
        description: impl Into<String>,
        owner_actor_id: Option<ActorId>,
    ) -> Self {
        Self {
            is_active: true,
            start_time: Instant::now(),
            duration,
            description: description.into(),
            owner_actor_id,
        }
    }

    /// Completion percentage at `now`, clamped to [0, 100]
    pub fn percent_at(
        &self,
        now: Instant,
    ) -> f64 {
        if self.duration.is_zero() {
            return 100.0;
        }
        let elapsed = now.saturating_duration_since(self.start_time);
        let ratio = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        ratio.clamp(0.0, 1.0) * 100.0
    }

    pub fn remaining_at(
        &self,
        now: Instant,
    ) -> Duration {
        (self.start_time + self.duration).saturating_duration_since(now)
    }
}

/// Named global counters (ore, wheat, ...)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobalResources {
    pub counters: IndexMap<String, u64>,
}

impl GlobalResources {
    pub fn get(
        &self,
        name: &str,
    ) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }
}
