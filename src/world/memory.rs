//! 内存中的世界存储
//!
//! 线程安全：使用 `parking_lot::RwLock` 支持并发读取，所有写入在同一把锁内完成。

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::Deserialize;
use tracing::debug;

use super::store::{
    ActorPatch, Bounds, EnergyChange, ResourcePatch, TilePatch, WorldError, WorldOp, WorldStore,
};
use super::{Actor, ActorKind, GlobalResources, Position, Stats, Tile, TileKind, TileValue};

#[derive(Debug, Clone)]
struct WorldState {
    bounds: Bounds,
    actors: IndexMap<String, Actor>,
    tiles: IndexMap<String, Tile>,
    resources: GlobalResources,
}

impl WorldState {
    fn apply_actor(
        &mut self,
        id: &str,
        patch: ActorPatch,
    ) -> Result<Actor, WorldError> {
        let bounds = self.bounds;
        let actor = self
            .actors
            .get_mut(id)
            .ok_or_else(|| WorldError::ActorNotFound(id.to_string()))?;

        // 先校验，全部通过后再写入
        if let Some(pos) = patch.position {
            if !bounds.contains(pos) {
                return Err(WorldError::OutOfBounds(pos));
            }
        }
        let energy = match patch.energy {
            None => actor.stats.energy,
            Some(EnergyChange::Set(value)) => value.min(actor.stats.max_energy),
            Some(EnergyChange::Credit(amount)) => actor
                .stats
                .energy
                .saturating_add(amount)
                .min(actor.stats.max_energy),
            Some(EnergyChange::Debit(amount)) => actor.stats.energy.checked_sub(amount).ok_or(
                WorldError::InsufficientEnergy {
                    needed: amount,
                    available: actor.stats.energy,
                },
            )?,
        };

        actor.stats.energy = energy;
        if let Some(pos) = patch.position {
            actor.position = pos;
        }
        if let Some(inventory) = patch.inventory {
            actor.inventory = inventory;
        }
        if let Some(task_state) = patch.task_state {
            actor.task_state = task_state;
        }
        Ok(actor.clone())
    }

    fn apply_tile(
        &mut self,
        id: &str,
        patch: TilePatch,
    ) -> Result<Tile, WorldError> {
        let tile = self
            .tiles
            .get_mut(id)
            .ok_or_else(|| WorldError::TileNotFound(id.to_string()))?;
        for (key, value) in patch.state {
            tile.state.insert(key, value);
        }
        if let Some(task_state) = patch.task_state {
            tile.task_state = task_state;
        }
        Ok(tile.clone())
    }

    fn apply_resources(
        &mut self,
        patch: ResourcePatch,
    ) -> Result<GlobalResources, WorldError> {
        for (name, delta) in &patch.deltas {
            let available = self.resources.get(name);
            if *delta < 0 && available < delta.unsigned_abs() {
                return Err(WorldError::InsufficientResource {
                    name: name.clone(),
                    needed: delta.unsigned_abs(),
                    available,
                });
            }
        }
        for (name, delta) in patch.deltas {
            let entry = self.resources.counters.entry(name).or_insert(0);
            *entry = entry.saturating_add_signed(delta);
        }
        Ok(self.resources.clone())
    }

    fn apply(
        &mut self,
        op: WorldOp,
    ) -> Result<(), WorldError> {
        match op {
            WorldOp::Actor(id, patch) => self.apply_actor(&id, patch).map(|_| ()),
            WorldOp::Tile(id, patch) => self.apply_tile(&id, patch).map(|_| ()),
            WorldOp::Resources(patch) => self.apply_resources(patch).map(|_| ()),
            WorldOp::TileGuard { id, key, expected } => {
                let tile = self
                    .tiles
                    .get(&id)
                    .ok_or_else(|| WorldError::TileNotFound(id.clone()))?;
                if tile.state.get(&key) == expected.as_ref() {
                    return Ok(());
                }
                let expected = match expected {
                    Some(TileValue::Text(text)) => text,
                    Some(other) => format!("{:?}", other),
                    None => "unset".to_string(),
                };
                Err(WorldError::Conflict { id, key, expected })
            }
        }
    }
}

/// 基于进程内存的世界存储
#[derive(Debug)]
pub struct MemoryWorld {
    state: RwLock<WorldState>,
    /// 地块不会移动，位置索引只构建一次
    tile_index: RwLock<HashMap<Position, String>>,
}

impl MemoryWorld {
    pub fn new(
        width: i32,
        height: i32,
    ) -> Self {
        Self {
            state: RwLock::new(WorldState {
                bounds: Bounds { width, height },
                actors: IndexMap::new(),
                tiles: IndexMap::new(),
                resources: GlobalResources::default(),
            }),
            tile_index: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_actor(
        self,
        actor: Actor,
    ) -> Self {
        self.insert_actor(actor);
        self
    }

    pub fn with_tile(
        self,
        tile: Tile,
    ) -> Self {
        self.insert_tile(tile);
        self
    }

    pub fn with_resource(
        self,
        name: impl Into<String>,
        amount: u64,
    ) -> Self {
        self.state.write().resources.counters.insert(name.into(), amount);
        self
    }

    pub fn insert_actor(
        &self,
        actor: Actor,
    ) {
        self.state.write().actors.insert(actor.id.clone(), actor);
    }

    pub fn insert_tile(
        &self,
        tile: Tile,
    ) {
        self.tile_index.write().insert(tile.position, tile.id.clone());
        self.state.write().tiles.insert(tile.id.clone(), tile);
    }

    pub fn actor_ids(&self) -> Vec<String> {
        self.state.read().actors.keys().cloned().collect()
    }

    pub fn tiles(&self) -> Vec<Tile> {
        self.state.read().tiles.values().cloned().collect()
    }

    /// 从 TOML 世界文件构建世界
    pub fn from_toml(content: &str) -> Result<Self, WorldError> {
        let file: WorldFile =
            toml::from_str(content).map_err(|e| WorldError::Invalid(e.to_string()))?;
        file.build()
    }

    /// 从磁盘加载 TOML 世界文件
    pub fn load(path: &Path) -> Result<Self, WorldError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| WorldError::Invalid(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }
}

impl WorldStore for MemoryWorld {
    fn actor(
        &self,
        id: &str,
    ) -> Result<Actor, WorldError> {
        self.state
            .read()
            .actors
            .get(id)
            .cloned()
            .ok_or_else(|| WorldError::ActorNotFound(id.to_string()))
    }

    fn tile(
        &self,
        id: &str,
    ) -> Result<Tile, WorldError> {
        self.state
            .read()
            .tiles
            .get(id)
            .cloned()
            .ok_or_else(|| WorldError::TileNotFound(id.to_string()))
    }

    fn tile_at(
        &self,
        pos: Position,
    ) -> Option<Tile> {
        let id = self.tile_index.read().get(&pos).cloned()?;
        self.state.read().tiles.get(&id).cloned()
    }

    fn update_actor(
        &self,
        id: &str,
        patch: ActorPatch,
    ) -> Result<Actor, WorldError> {
        debug!("update actor {}: {:?}", id, patch.position.map(|p| p.to_string()));
        self.state.write().apply_actor(id, patch)
    }

    fn update_tile(
        &self,
        id: &str,
        patch: TilePatch,
    ) -> Result<Tile, WorldError> {
        self.state.write().apply_tile(id, patch)
    }

    fn update_resources(
        &self,
        patch: ResourcePatch,
    ) -> Result<GlobalResources, WorldError> {
        self.state.write().apply_resources(patch)
    }

    fn resources(&self) -> GlobalResources {
        self.state.read().resources.clone()
    }

    fn bounds(&self) -> Bounds {
        self.state.read().bounds
    }

    fn transact(
        &self,
        ops: Vec<WorldOp>,
    ) -> Result<(), WorldError> {
        let mut state = self.state.write();
        let mut staged = state.clone();
        for op in ops {
            staged.apply(op)?;
        }
        *state = staged;
        Ok(())
    }
}

// ============================================================================
// 世界文件
// ============================================================================

#[derive(Debug, Deserialize)]
struct WorldFile {
    world: WorldSection,
    #[serde(default)]
    actors: Vec<ActorEntry>,
    #[serde(default)]
    tiles: Vec<TileEntry>,
    #[serde(default)]
    resources: IndexMap<String, u64>,
}

#[derive(Debug, Deserialize)]
struct WorldSection {
    width: i32,
    height: i32,
}

#[derive(Debug, Deserialize)]
struct ActorEntry {
    id: String,
    #[serde(default)]
    kind: ActorKind,
    x: i32,
    y: i32,
    #[serde(default)]
    energy: Option<u32>,
    #[serde(default)]
    max_energy: Option<u32>,
    #[serde(default)]
    speed: Option<f64>,
    #[serde(default)]
    inventory: IndexMap<String, u32>,
}

#[derive(Debug, Deserialize)]
struct TileEntry {
    id: String,
    kind: TileKind,
    x: i32,
    y: i32,
    #[serde(default)]
    functions: Option<Vec<String>>,
    #[serde(default)]
    state: IndexMap<String, TileValue>,
}

impl WorldFile {
    fn build(self) -> Result<MemoryWorld, WorldError> {
        if self.world.width <= 0 || self.world.height <= 0 {
            return Err(WorldError::Invalid(format!(
                "world size must be positive, got {}x{}",
                self.world.width, self.world.height
            )));
        }
        let world = MemoryWorld::new(self.world.width, self.world.height);
        let bounds = world.bounds();

        for entry in self.actors {
            let position = Position::new(entry.x, entry.y);
            if !bounds.contains(position) {
                return Err(WorldError::OutOfBounds(position));
            }
            let defaults = Stats::default();
            let max_energy = entry.max_energy.unwrap_or(defaults.max_energy);
            let mut actor = Actor::new(entry.id, position).with_kind(entry.kind);
            actor.stats = Stats {
                energy: entry.energy.unwrap_or(max_energy).min(max_energy),
                max_energy,
                speed: entry.speed.unwrap_or(defaults.speed),
            };
            actor.inventory = entry.inventory;
            world.insert_actor(actor);
        }

        for entry in self.tiles {
            let position = Position::new(entry.x, entry.y);
            if !bounds.contains(position) {
                return Err(WorldError::OutOfBounds(position));
            }
            if world.tile_at(position).is_some() {
                return Err(WorldError::Invalid(format!(
                    "two tiles share position {}",
                    position
                )));
            }
            let mut tile = Tile::new(entry.id, entry.kind, position);
            if let Some(functions) = entry.functions {
                tile.functions = functions;
            }
            for (key, value) in entry.state {
                tile.state.insert(key, value);
            }
            world.insert_tile(tile);
        }

        for (name, amount) in self.resources {
            world.state.write().resources.counters.insert(name, amount);
        }
        Ok(world)
    }
}
