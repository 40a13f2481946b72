//! Movement capabilities
//!
//! Every target is checked against the world bounds before the first
//! request reaches the movement bridge. Multi-step moves walk the x axis
//! first, then y. Up is `y - 1`.

use futures::future::{BoxFuture, FutureExt};
use tracing::debug;

use super::{args, invalid_argument, position_value};
use super::{CapabilityDescriptor, Category, EnergyCost, Executor, ParamSpec};
use crate::runtime::context::ExecutionContext;
use crate::runtime::result::{ErrorKind, ExecutionResult};
use crate::runtime::value::Value;
use crate::world::{Actor, Position};

/// Energy per tile moved
pub const STEP_ENERGY: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "up" | "north" => Some(Direction::Up),
            "down" | "south" => Some(Direction::Down),
            "left" | "west" => Some(Direction::Left),
            "right" | "east" => Some(Direction::Right),
            _ => None,
        }
    }
}

pub fn descriptors() -> Vec<CapabilityDescriptor> {
    let single = |name: &'static str, description: &'static str, executor: Executor| {
        CapabilityDescriptor {
            name,
            category: Category::Movement,
            params: vec![],
            description,
            energy: EnergyCost::Fixed(STEP_ENERGY),
            executor,
        }
    };
    vec![
        single("move_up", "Move one tile up", move_up),
        single("move_down", "Move one tile down", move_down),
        single("move_left", "Move one tile left", move_left),
        single("move_right", "Move one tile right", move_right),
        CapabilityDescriptor {
            name: "move",
            category: Category::Movement,
            params: vec![
                ParamSpec::required("direction", "str", "up, down, left or right"),
                ParamSpec::optional("steps", "int", "tiles to move, default 1"),
            ],
            description: "Move in a direction",
            energy: EnergyCost::PerStep {
                per_step: STEP_ENERGY,
                steps: direction_steps,
            },
            executor: move_direction,
        },
        CapabilityDescriptor {
            name: "move_to",
            category: Category::Movement,
            params: vec![
                ParamSpec::required("x", "int", "target column"),
                ParamSpec::required("y", "int", "target row"),
            ],
            description: "Walk to a tile, x axis first",
            energy: EnergyCost::PerStep {
                per_step: STEP_ENERGY,
                steps: target_steps,
            },
            executor: move_to,
        },
    ]
}

fn direction_steps(
    _actor: &Actor,
    args: &[Value],
) -> u32 {
    match args.get(1) {
        Some(value) => value
            .as_i64()
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0),
        None => 1,
    }
}

fn target_steps(
    actor: &Actor,
    args: &[Value],
) -> u32 {
    match target(args) {
        Ok(target) => actor.position.steps_to(target),
        Err(_) => 0,
    }
}

fn target(args: &[Value]) -> Result<Position, String> {
    let x = args::int(args, 0, "x")?;
    let y = args::int(args, 1, "y")?;
    let x = i32::try_from(x).map_err(|_| format!("x out of range: {}", x))?;
    let y = i32::try_from(y).map_err(|_| format!("y out of range: {}", y))?;
    Ok(Position::new(x, y))
}

fn move_up(
    ctx: &mut ExecutionContext,
    _args: Vec<Value>,
) -> BoxFuture<'_, ExecutionResult> {
    step(ctx, Direction::Up, 1).boxed()
}

fn move_down(
    ctx: &mut ExecutionContext,
    _args: Vec<Value>,
) -> BoxFuture<'_, ExecutionResult> {
    step(ctx, Direction::Down, 1).boxed()
}

fn move_left(
    ctx: &mut ExecutionContext,
    _args: Vec<Value>,
) -> BoxFuture<'_, ExecutionResult> {
    step(ctx, Direction::Left, 1).boxed()
}

fn move_right(
    ctx: &mut ExecutionContext,
    _args: Vec<Value>,
) -> BoxFuture<'_, ExecutionResult> {
    step(ctx, Direction::Right, 1).boxed()
}

fn move_direction(
    ctx: &mut ExecutionContext,
    args: Vec<Value>,
) -> BoxFuture<'_, ExecutionResult> {
    async move {
        let direction = match args::text(&args, 0, "direction") {
            Ok(text) => match Direction::parse(text) {
                Some(direction) => direction,
                None => return invalid_argument(format!("unknown direction: {}", text)),
            },
            Err(e) => return invalid_argument(e),
        };
        let steps = match args.get(1) {
            None => 1,
            Some(_) => match args::int(&args, 1, "steps") {
                Ok(n) if n >= 0 => n,
                Ok(n) => return invalid_argument(format!("steps must not be negative: {}", n)),
                Err(e) => return invalid_argument(e),
            },
        };
        step(ctx, direction, steps).await
    }
    .boxed()
}

fn move_to(
    ctx: &mut ExecutionContext,
    args: Vec<Value>,
) -> BoxFuture<'_, ExecutionResult> {
    async move {
        let goal = match target(&args) {
            Ok(goal) => goal,
            Err(e) => return invalid_argument(e),
        };
        let path = path_to(ctx.actor.position, goal);
        walk(ctx, path).await
    }
    .boxed()
}

async fn step(
    ctx: &mut ExecutionContext,
    direction: Direction,
    steps: i64,
) -> ExecutionResult {
    let (dx, dy) = direction.delta();
    let bounds = ctx.world.bounds();
    // paths never exceed the world size, longer step counts are already out of bounds
    let limit = i64::from(bounds.width.max(bounds.height)) + 1;
    let count = i32::try_from(steps.min(limit)).unwrap_or(0);
    let start = ctx.actor.position;
    let path = (1..=count).map(|i| start.offset(dx * i, dy * i)).collect();
    walk(ctx, path).await
}

/// Tiles visited walking from `from` to `to`, x axis first
pub fn path_to(
    from: Position,
    to: Position,
) -> Vec<Position> {
    let mut path = Vec::new();
    let mut current = from;
    while current.x != to.x {
        current = current.offset((to.x - current.x).signum(), 0);
        path.push(current);
    }
    while current.y != to.y {
        current = current.offset(0, (to.y - current.y).signum());
        path.push(current);
    }
    path
}

async fn walk(
    ctx: &mut ExecutionContext,
    path: Vec<Position>,
) -> ExecutionResult {
    let bounds = ctx.world.bounds();
    if let Some(outside) = path.iter().find(|p| !bounds.contains(**p)) {
        return ExecutionResult::fail(
            ErrorKind::Bounds,
            format!(
                "cannot move to {}: outside the {}x{} world",
                outside, bounds.width, bounds.height
            ),
        );
    }
    if path.is_empty() {
        return ExecutionResult::ok_msg(format!("Already at {}", ctx.actor.position))
            .with_data(position_value(ctx.actor.position));
    }

    let actor_id = ctx.actor.id.clone();
    for target in &path {
        if !ctx.is_running() {
            return ExecutionResult::fail(ErrorKind::Stopped, "execution stopped");
        }
        if !ctx.movement.request_move(&actor_id, *target).await {
            let _ = ctx.resync();
            let kind = if ctx.is_running() {
                ErrorKind::Execution
            } else {
                ErrorKind::Stopped
            };
            return ExecutionResult::fail(kind, format!("move to {} was interrupted", target));
        }
    }

    if let Err(e) = ctx.resync() {
        return ExecutionResult::execution_error(e);
    }
    let steps = u32::try_from(path.len()).unwrap_or(u32::MAX);
    debug!("{} moved {} step(s) to {}", actor_id, steps, ctx.actor.position);
    ExecutionResult::ok_msg(format!("Moved to {}", ctx.actor.position))
        .with_data(position_value(ctx.actor.position))
        .with_energy_cost(STEP_ENERGY.saturating_mul(steps))
}
