//! Runtime system
//!
//! Script execution (interpreter, values, results, events) and the task
//! scheduler that times actor and tile work.

pub mod context;
pub mod error;
pub mod events;
pub mod interpreter;
pub mod result;
pub mod scheduler;
pub mod value;

pub use context::{ExecutionContext, Services};
pub use error::ScriptError;
pub use events::{CallSource, ErrorEvent, EventSink, ExecutionEvent};
pub use interpreter::{Interpreter, StopHandle};
pub use result::{ErrorKind, ExecutionResult, Severity};
pub use scheduler::{TaskKey, TaskScheduler};
pub use value::Value;
