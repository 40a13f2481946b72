//! World state store interface
//!
//! Authoritative actor, tile and resource state lives behind [`WorldStore`].
//! Interpreters only ever hold snapshots of it.

use indexmap::IndexMap;

use super::{Actor, GlobalResources, Position, TaskState, Tile, TileValue};

/// World dimensions; valid coordinates are `[0, width) × [0, height)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub width: i32,
    pub height: i32,
}

impl Bounds {
    pub fn contains(
        &self,
        pos: super::Position,
    ) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }
}

/// Energy mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergyChange {
    Set(u32),
    /// Fails without effect when the balance is too small
    Debit(u32),
    /// Capped at `max_energy`
    Credit(u32),
}

/// Partial actor update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActorPatch {
    pub position: Option<Position>,
    pub energy: Option<EnergyChange>,
    /// Replaces the whole inventory
    pub inventory: Option<IndexMap<String, u32>>,
    pub task_state: Option<TaskState>,
}

impl ActorPatch {
    pub fn position(pos: Position) -> Self {
        Self {
            position: Some(pos),
            ..Default::default()
        }
    }

    pub fn energy(change: EnergyChange) -> Self {
        Self {
            energy: Some(change),
            ..Default::default()
        }
    }

    pub fn task_state(state: TaskState) -> Self {
        Self {
            task_state: Some(state),
            ..Default::default()
        }
    }
}

/// Partial tile update; `state` entries are merged into the tile state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TilePatch {
    pub state: IndexMap<String, TileValue>,
    pub task_state: Option<TaskState>,
}

impl TilePatch {
    pub fn set(
        mut self,
        key: impl Into<String>,
        value: TileValue,
    ) -> Self {
        self.state.insert(key.into(), value);
        self
    }

    pub fn task_state(state: TaskState) -> Self {
        Self {
            task_state: Some(state),
            ..Default::default()
        }
    }
}

/// Signed deltas applied to global counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourcePatch {
    pub deltas: IndexMap<String, i64>,
}

impl ResourcePatch {
    pub fn add(
        mut self,
        name: impl Into<String>,
        delta: i64,
    ) -> Self {
        *self.deltas.entry(name.into()).or_insert(0) += delta;
        self
    }
}

/// One step of an atomic [`WorldStore::transact`]
#[derive(Debug, Clone, PartialEq)]
pub enum WorldOp {
    Actor(String, ActorPatch),
    Tile(String, TilePatch),
    Resources(ResourcePatch),
    /// Abort unless the tile's `key` still holds `expected`
    TileGuard {
        id: String,
        key: String,
        expected: Option<TileValue>,
    },
}

/// World store errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorldError {
    #[error("actor not found: {0}")]
    ActorNotFound(String),
    #[error("tile not found: {0}")]
    TileNotFound(String),
    #[error("not enough energy: need {needed}, have {available}")]
    InsufficientEnergy { needed: u32, available: u32 },
    #[error("not enough {name}: need {needed}, have {available}")]
    InsufficientResource {
        name: String,
        needed: u64,
        available: u64,
    },
    #[error("position {0} is outside the world")]
    OutOfBounds(Position),
    #[error("{id} changed before the update: {key} is no longer {expected}")]
    Conflict {
        id: String,
        key: String,
        expected: String,
    },
    #[error("invalid world: {0}")]
    Invalid(String),
}

/// World State Store consumed by the engine
pub trait WorldStore: Send + Sync {
    fn actor(
        &self,
        id: &str,
    ) -> Result<Actor, WorldError>;

    fn tile(
        &self,
        id: &str,
    ) -> Result<Tile, WorldError>;

    fn tile_at(
        &self,
        pos: Position,
    ) -> Option<Tile>;

    fn update_actor(
        &self,
        id: &str,
        patch: ActorPatch,
    ) -> Result<Actor, WorldError>;

    fn update_tile(
        &self,
        id: &str,
        patch: TilePatch,
    ) -> Result<Tile, WorldError>;

    fn update_resources(
        &self,
        patch: ResourcePatch,
    ) -> Result<GlobalResources, WorldError>;

    fn resources(&self) -> GlobalResources;

    fn bounds(&self) -> Bounds;

    /// Apply every op or none of them
    fn transact(
        &self,
        ops: Vec<WorldOp>,
    ) -> Result<(), WorldError>;
}
