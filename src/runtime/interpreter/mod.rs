//! Script interpreter
//!
//! Runs one actor's script, one statement at a time. Each call statement is
//! resolved against the capability registry first, then the functions bound
//! to the tile the actor stands on, then the user's subroutines:
//!
//! ```text
//! call NAME(args)
//!   ├─ capability?     energy pre-check ─► executor ─► settle (debit, pace)
//!   ├─ tile function?  TileFunctionDispatch::invoke ─► settle (pace)
//!   ├─ subroutine?     new frame, `args` bound ─► run body
//!   └─ "function not found: NAME"
//! ```
//!
//! Timed actions only delay the script by a short pacing pause; the action
//! itself keeps running on the scheduler.

mod eval;
pub mod ops;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use super::context::{ExecutionContext, Services};
use super::error::ScriptError;
use super::events::{CallSource, ExecutionEvent};
use super::result::{ErrorKind, ExecutionResult};
use super::value::Value;
use crate::capabilities::CapabilityDescriptor;
use crate::frontend::parser::ast::{Block, Program, Stmt, StmtKind};
use crate::frontend::{self, MAIN};
use crate::util::config::InterpreterConfig;
use crate::util::span::SourceLines;
use crate::world::{ActorPatch, EnergyChange, Tile, WorldError};

/// Control flow out of a statement
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// Failing statements short-circuit with their failure result
pub(crate) type StmtResult<T> = Result<T, ExecutionResult>;

/// A compiled subroutine
#[derive(Debug)]
struct Unit {
    program: Program,
    lines: SourceLines,
}

/// One active subroutine call
#[derive(Debug)]
struct Frame {
    name: String,
    unit: Arc<Unit>,
    /// `None` for the entry script, which writes globals
    locals: Option<IndexMap<String, Value>>,
}

/// Stops a running interpreter from another task
#[derive(Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
    services: Services,
}

impl StopHandle {
    /// Cooperative stop; the call in flight completes, nothing after it runs
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.services.scheduler.cancel_all();
        self.services.movement.stop_all();
        info!("execution stopped");
    }
}

impl std::fmt::Debug for StopHandle {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("StopHandle")
            .field("running", &self.running.load(Ordering::SeqCst))
            .finish()
    }
}

/// Script interpreter bound to one actor
pub struct Interpreter {
    services: Services,
    ctx: ExecutionContext,
    units: IndexMap<String, Arc<Unit>>,
    frames: Vec<Frame>,
    /// Every assignment, last write wins
    snapshot: IndexMap<String, Value>,
    running: Arc<AtomicBool>,
    config: InterpreterConfig,
}

impl Interpreter {
    /// Interpreter for `actor_id`, which must exist in the store
    pub fn new(
        services: &Services,
        actor_id: &str,
    ) -> Result<Self, WorldError> {
        let actor = services.world.actor(actor_id)?;
        let running = Arc::new(AtomicBool::new(false));
        Ok(Self {
            ctx: ExecutionContext::new(services, actor, running.clone()),
            services: services.clone(),
            units: IndexMap::new(),
            frames: Vec::new(),
            snapshot: IndexMap::new(),
            running,
            config: services.config.clone(),
        })
    }

    pub fn actor_id(&self) -> &str {
        self.ctx.actor_id()
    }

    /// Replace all subroutines with the given named sources
    ///
    /// Nothing is replaced when any source fails to tokenize.
    pub fn set_subroutines(
        &mut self,
        sources: IndexMap<String, String>,
    ) -> Result<(), ScriptError> {
        let mut units = IndexMap::with_capacity(sources.len());
        for (name, source) in sources {
            let output = frontend::compile(&source).map_err(|source| ScriptError::Syntax {
                subroutine: name.clone(),
                source,
            })?;
            for (line, error) in &output.errors {
                debug!("{}:{}: {}", name, line, error);
            }
            let unit = Unit {
                program: output.program,
                lines: SourceLines::new(&source),
            };
            units.insert(name, Arc::new(unit));
        }
        self.units = units;
        Ok(())
    }

    /// Load a script file (`def NAME:` sections plus top-level `main`)
    pub fn load_script(
        &mut self,
        source: &str,
    ) -> Result<(), ScriptError> {
        let sources = frontend::split_subroutines(source)?;
        self.set_subroutines(sources)
    }

    pub fn has_subroutine(
        &self,
        name: &str,
    ) -> bool {
        self.units.contains_key(name)
    }

    /// Variables assigned so far
    pub fn variables(&self) -> &IndexMap<String, Value> {
        &self.snapshot
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            running: self.running.clone(),
            services: self.services.clone(),
        }
    }

    /// Stop execution and cancel every scheduled task
    pub fn stop(&self) {
        self.stop_handle().stop();
    }

    /// Run the entry script to completion
    pub async fn execute_main(&mut self) -> ExecutionResult {
        let actor = self.ctx.actor_id().to_string();
        if !self.units.contains_key(MAIN) {
            let result = ExecutionResult::fail(ErrorKind::NotFound, "no entry script");
            self.services.events.report_failure(&actor, &result);
            return result;
        }

        self.running.store(true, Ordering::SeqCst);
        info!("{} running main", actor);
        self.services
            .events
            .emit(ExecutionEvent::Started { actor: actor.clone() });

        let result = self.execute_function(MAIN, Vec::new()).await;
        self.running.store(false, Ordering::SeqCst);

        match &result {
            ExecutionResult::Success { message, .. } => {
                info!("{} finished main", actor);
                self.services.events.emit(ExecutionEvent::Completed {
                    actor,
                    message: message.clone().unwrap_or_else(|| "completed".to_string()),
                });
            }
            ExecutionResult::Failure { message, .. } => {
                warn!("{} failed: {}", actor, message);
                self.services.events.report_failure(&actor, &result);
            }
        }
        result
    }

    /// Resolve and call `name`
    pub fn execute_function<'a>(
        &'a mut self,
        name: &'a str,
        args: Vec<Value>,
    ) -> BoxFuture<'a, ExecutionResult> {
        async move {
            if self.frames.is_empty() {
                self.running.store(true, Ordering::SeqCst);
            }
            if let Err(e) = self.ctx.resync() {
                return ExecutionResult::execution_error(e);
            }
            if let Some(busy) = self.busy() {
                return busy;
            }

            if let Some(descriptor) = self.services.capabilities.get(name).cloned() {
                self.emit_call(name, &args, CallSource::Capability);
                return self.call_capability(&descriptor, args).await;
            }

            if let Some(tile) = self.bound_tile(name) {
                self.emit_call(name, &args, CallSource::TileFunction);
                let result = self.services.tiles.invoke(self.ctx.actor_id(), &tile.id, name);
                return self.settle(result).await;
            }

            if let Some(unit) = self.units.get(name).cloned() {
                self.emit_call(name, &args, CallSource::Subroutine);
                return self.call_subroutine(name, unit, args).await;
            }

            ExecutionResult::fail(ErrorKind::NotFound, format!("function not found: {}", name))
        }
        .boxed()
    }

    /// Blocked failure when the actor has a task in progress
    fn busy(&self) -> Option<ExecutionResult> {
        let task = self.services.scheduler.actor_task(self.ctx.actor_id())?;
        let percent = task
            .progress
            .percent_at(tokio::time::Instant::now())
            .floor();
        Some(ExecutionResult::fail(
            ErrorKind::Blocked,
            format!(
                "{} is busy: {} ({}% complete)",
                self.ctx.actor_id(),
                task.progress.description,
                percent
            ),
        ))
    }

    /// Tile under the actor when it binds `name`
    fn bound_tile(
        &self,
        name: &str,
    ) -> Option<Tile> {
        let tile = self.ctx.current_tile()?;
        self.services.tiles.resolve(&tile, name)?;
        Some(tile)
    }

    fn emit_call(
        &self,
        name: &str,
        args: &[Value],
        source: CallSource,
    ) {
        debug!("{} calls {}({} args) via {:?}", self.ctx.actor_id(), name, args.len(), source);
        self.services.events.emit(ExecutionEvent::Call {
            actor: self.ctx.actor_id().to_string(),
            name: name.to_string(),
            args: args.iter().map(Value::to_string).collect(),
            source,
        });
    }

    async fn call_capability(
        &mut self,
        descriptor: &CapabilityDescriptor,
        args: Vec<Value>,
    ) -> ExecutionResult {
        let required = descriptor.energy.required(&self.ctx.actor, &args);
        let available = self.ctx.actor.stats.energy;
        if required > available {
            return ExecutionResult::fail(
                ErrorKind::Resource,
                format!(
                    "not enough energy: {} needs {}, have {}",
                    descriptor.name, required, available
                ),
            );
        }
        let result = (descriptor.executor)(&mut self.ctx, args).await;
        self.settle(result).await
    }

    /// Apply a result's energy cost and pacing pause
    async fn settle(
        &mut self,
        result: ExecutionResult,
    ) -> ExecutionResult {
        if let Some(cost) = result.energy_cost().filter(|c| *c > 0) {
            let patch = ActorPatch::energy(EnergyChange::Debit(cost));
            match self.services.world.update_actor(self.ctx.actor_id(), patch) {
                Ok(actor) => self.ctx.actor = actor,
                Err(WorldError::InsufficientEnergy { needed, available }) => {
                    return ExecutionResult::fail(
                        ErrorKind::Resource,
                        format!("not enough energy: need {}, have {}", needed, available),
                    );
                }
                Err(e) => return ExecutionResult::execution_error(e),
            }
        }

        if let Some(duration) = result.duration() {
            let pause = pacing_pause(duration, self.config.pacing_cap());
            if !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
        }
        result
    }

    async fn call_subroutine(
        &mut self,
        name: &str,
        unit: Arc<Unit>,
        args: Vec<Value>,
    ) -> ExecutionResult {
        if self.frames.len() >= self.config.max_call_depth {
            return ScriptError::CallDepth(self.config.max_call_depth).into();
        }

        let locals = if name == MAIN {
            None
        } else {
            let mut locals = IndexMap::new();
            locals.insert("args".to_string(), Value::List(args));
            Some(locals)
        };
        self.frames.push(Frame {
            name: name.to_string(),
            unit: unit.clone(),
            locals,
        });
        let outcome = self.run_block(&unit.program.body).await;
        self.frames.pop();

        match outcome {
            Ok(Flow::Normal) => ExecutionResult::ok_msg(format!("{} completed", name)),
            Ok(Flow::Return(value)) => {
                ExecutionResult::ok_msg(format!("{} returned", name)).with_data(value)
            }
            Ok(Flow::Break) => ScriptError::JumpOutsideLoop("break").into(),
            Ok(Flow::Continue) => ScriptError::JumpOutsideLoop("continue").into(),
            Err(failure) => failure,
        }
    }

    fn run_block<'a>(
        &'a mut self,
        block: &'a Block,
    ) -> BoxFuture<'a, StmtResult<Flow>> {
        async move {
            for stmt in block {
                let flow = self.exec_stmt(stmt).await?;
                if flow != Flow::Normal {
                    return Ok(flow);
                }
            }
            Ok(Flow::Normal)
        }
        .boxed()
    }

    fn check_running(&self) -> StmtResult<()> {
        if self.running.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ExecutionResult::fail(ErrorKind::Stopped, "execution stopped"))
        }
    }

    fn exec_stmt<'a>(
        &'a mut self,
        stmt: &'a Stmt,
    ) -> BoxFuture<'a, StmtResult<Flow>> {
        async move {
            self.check_running()?;
            self.emit_statement(stmt);

            match &stmt.kind {
                StmtKind::Assign { name, op, value } => {
                    let value = self.eval(value).await?;
                    self.assign_with(name, *op, value)?;
                    Ok(Flow::Normal)
                }
                StmtKind::Expr(expr) => {
                    self.eval(expr).await?;
                    Ok(Flow::Normal)
                }
                StmtKind::If {
                    branches,
                    else_branch,
                } => {
                    for (condition, body) in branches {
                        if self.eval(condition).await?.is_truthy() {
                            return self.run_block(body).await;
                        }
                    }
                    match else_branch {
                        Some(body) => self.run_block(body).await,
                        None => Ok(Flow::Normal),
                    }
                }
                StmtKind::While { condition, body } => {
                    let limit = self.config.max_loop_iterations;
                    let mut iterations = 0usize;
                    loop {
                        self.check_running()?;
                        if !self.eval(condition).await?.is_truthy() {
                            break;
                        }
                        iterations += 1;
                        if iterations > limit {
                            return Err(ScriptError::LoopLimit(limit).into());
                        }
                        match self.run_block(body).await? {
                            Flow::Break => break,
                            Flow::Return(value) => return Ok(Flow::Return(value)),
                            Flow::Normal | Flow::Continue => {}
                        }
                    }
                    Ok(Flow::Normal)
                }
                StmtKind::For {
                    var,
                    iterable,
                    body,
                } => {
                    let items = ops::iterate(&self.eval(iterable).await?)?;
                    for item in items {
                        self.check_running()?;
                        self.assign(var, item);
                        match self.run_block(body).await? {
                            Flow::Break => break,
                            Flow::Return(value) => return Ok(Flow::Return(value)),
                            Flow::Normal | Flow::Continue => {}
                        }
                    }
                    Ok(Flow::Normal)
                }
                StmtKind::Return(value) => {
                    let value = match value {
                        Some(expr) => self.eval(expr).await?,
                        None => Value::None,
                    };
                    Ok(Flow::Return(value))
                }
                StmtKind::Break => Ok(Flow::Break),
                StmtKind::Continue => Ok(Flow::Continue),
                StmtKind::Pass => Ok(Flow::Normal),
                StmtKind::Unclassified(text) => {
                    warn!(
                        "{}:{}: skipping unrecognized line `{}`",
                        self.frame_name(),
                        stmt.span.line(),
                        text
                    );
                    Ok(Flow::Normal)
                }
            }
        }
        .boxed()
    }

    fn frame_name(&self) -> &str {
        self.frames.last().map(|f| f.name.as_str()).unwrap_or(MAIN)
    }

    fn emit_statement(
        &self,
        stmt: &Stmt,
    ) {
        let line = stmt.span.line();
        let text = self
            .frames
            .last()
            .and_then(|f| f.unit.lines.line(line))
            .unwrap_or_default()
            .to_string();
        debug!("{} {}:{} {}", self.ctx.actor_id(), self.frame_name(), line, text);
        self.services.events.emit(ExecutionEvent::Statement {
            actor: self.ctx.actor_id().to_string(),
            subroutine: self.frame_name().to_string(),
            line,
            text,
        });
    }

    /// Variable lookup: innermost frame, then globals
    fn lookup(
        &self,
        name: &str,
    ) -> Option<&Value> {
        self.frames
            .last()
            .and_then(|f| f.locals.as_ref())
            .and_then(|locals| locals.get(name))
            .or_else(|| self.ctx.variables.get(name))
    }

    fn assign(
        &mut self,
        name: &str,
        value: Value,
    ) {
        self.snapshot.insert(name.to_string(), value.clone());
        match self.frames.last_mut().and_then(|f| f.locals.as_mut()) {
            Some(locals) => {
                locals.insert(name.to_string(), value);
            }
            None => {
                self.ctx.variables.insert(name.to_string(), value);
            }
        }
    }
}

/// Pacing pause for a timed action
pub fn pacing_pause(
    duration: Duration,
    cap: Duration,
) -> Duration {
    duration.min(cap)
}
