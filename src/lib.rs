//! TileScript
//!
//! A small teaching script language whose programs drive actors around a
//! simulated tile world: walking, planting and harvesting, mining, storing.
//! Timed work runs on a task scheduler while the script keeps a strictly
//! sequential, statement-by-statement pace.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use tilescript::runtime::{Interpreter, Services};
//! use tilescript::world::{Actor, MemoryWorld, Position, TweenMovement};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let world = Arc::new(MemoryWorld::new(10, 10).with_actor(Actor::new("bot", Position::new(5, 5))));
//! let movement = Arc::new(TweenMovement::new(world.clone(), Duration::from_millis(300)));
//! let services = Services::new(world, movement);
//!
//! let mut interpreter = Interpreter::new(&services, "bot")?;
//! interpreter.load_script("move_right()\nprint(get_position())\n")?;
//! let result = interpreter.execute_main().await;
//! assert!(result.is_success());
//! # Ok(())
//! # }
//! ```

#![warn(rust_2018_idioms)]

pub mod capabilities;
pub mod frontend;
pub mod runtime;
pub mod tiles;
pub mod util;
pub mod world;

pub use runtime::{ErrorKind, ExecutionResult, Interpreter, Services, Value};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Language name
pub const NAME: &str = "TileScript";
