//! TileScript - CLI

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use owo_colors::OwoColorize;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

use tilescript::capabilities::CapabilityRegistry;
use tilescript::frontend::{self, split_subroutines};
use tilescript::runtime::{
    EventSink, ExecutionEvent, ExecutionResult, Interpreter, Services, Severity, TaskScheduler,
};
use tilescript::tiles::TileFunctionDispatch;
use tilescript::util::config::{load_config, EngineConfig};
use tilescript::util::logger::{self, LogLevel};
use tilescript::world::{
    Actor, ActorKind, MemoryWorld, Position, TweenMovement, WorldStore,
};
use tilescript::{NAME, VERSION};

/// Drive actors through a tile world with small scripts
#[derive(Parser, Debug)]
#[command(name = "tilescript")]
#[command(author = "TileScript Team")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Config file (defaults to ./tilescript.toml when present)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a script against a world
    Run {
        /// Script file
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,

        /// World file (TOML); a 10x10 world with one actor otherwise
        #[arg(short, long, value_name = "FILE")]
        world: Option<PathBuf>,

        /// Actor the script drives; the first primary actor by default
        #[arg(short, long)]
        actor: Option<String>,

        /// Run another actor concurrently: ID=SCRIPT
        #[arg(long = "drone", value_name = "ID=SCRIPT")]
        drones: Vec<String>,

        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Check a script without running it
    Check {
        /// Script file
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,
    },

    /// List capabilities and tile functions
    Capabilities,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let mut config = load_config(args.config.as_deref(), &cwd)
        .with_context(|| "Failed to load configuration")?;
    config.apply_env();

    let level = if args.verbose {
        LogLevel::Debug
    } else {
        config.log.level.parse().unwrap_or(LogLevel::Info)
    };
    logger::init_with_level(level);
    debug!("{} {} on {}", NAME, VERSION, std::env::consts::OS);

    match args.command {
        Commands::Run {
            script,
            world,
            actor,
            drones,
            json,
        } => run(&config, &script, world.as_deref(), actor, &drones, json).await,
        Commands::Check { script } => check(&script),
        Commands::Capabilities => {
            capabilities();
            Ok(())
        }
    }
}

fn read_script(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script: {}", path.display()))
}

fn default_world() -> MemoryWorld {
    MemoryWorld::new(10, 10).with_actor(Actor::new("bot", Position::new(0, 0)))
}

async fn run(
    config: &EngineConfig,
    script: &Path,
    world_path: Option<&Path>,
    actor: Option<String>,
    drones: &[String],
    json: bool,
) -> Result<()> {
    let world = match world_path {
        Some(path) => MemoryWorld::load(path)
            .with_context(|| format!("Failed to load world: {}", path.display()))?,
        None => default_world(),
    };
    let world = Arc::new(world);

    let actor_id = match actor {
        Some(id) => id,
        None => world
            .actor_ids()
            .into_iter()
            .find(|id| {
                world
                    .actor(id)
                    .is_ok_and(|a| a.kind == ActorKind::Primary)
            })
            .ok_or_else(|| anyhow!("World has no primary actor"))?,
    };

    let movement = Arc::new(TweenMovement::new(
        world.clone(),
        Duration::from_millis(config.movement.step_ms),
    ));
    let (events, rx) = EventSink::channel();
    let services = Services::new(world.clone(), movement)
        .with_events(events)
        .with_config(config.interpreter.clone());

    let printer = tokio::spawn(print_events(rx, json));

    let mut interpreter = Interpreter::new(&services, &actor_id)
        .with_context(|| format!("Unknown actor: {}", actor_id))?;
    interpreter
        .load_script(&read_script(script)?)
        .with_context(|| format!("Failed to load script: {}", script.display()))?;

    let mut handles = vec![interpreter.stop_handle()];
    let mut drone_tasks = Vec::new();
    for spec in drones {
        let (id, path) = spec
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected ID=SCRIPT, got `{}`", spec))?;
        let mut drone = Interpreter::new(&services, id)
            .with_context(|| format!("Unknown drone: {}", id))?;
        drone
            .load_script(&read_script(Path::new(path))?)
            .with_context(|| format!("Failed to load script: {}", path))?;
        handles.push(drone.stop_handle());
        info!("drone {} runs {}", id, path);
        drone_tasks.push(tokio::spawn(async move { drone.execute_main().await }));
    }

    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            for handle in &handles {
                handle.stop();
            }
        }
    });

    let result = interpreter.execute_main().await;
    let mut drone_failures = 0;
    for task in drone_tasks {
        match task.await {
            Ok(r) if r.is_success() => {}
            Ok(_) => drone_failures += 1,
            Err(e) => bail!("Drone task panicked: {}", e),
        }
    }

    interrupt.abort();
    let _ = interrupt.await;
    drop(interpreter);
    drop(services);
    let _ = printer.await;

    if !json {
        print_summary(world.as_ref(), &actor_id);
    }

    match result {
        ExecutionResult::Success { .. } if drone_failures == 0 => Ok(()),
        ExecutionResult::Success { .. } => bail!("{} drone script(s) failed", drone_failures),
        ExecutionResult::Failure { message, kind } => {
            bail!("Script failed ({:?}): {}", kind, message)
        }
    }
}

async fn print_events(
    mut rx: UnboundedReceiver<ExecutionEvent>,
    json: bool,
) {
    while let Some(event) = rx.recv().await {
        if json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => debug!("event not serialized: {}", e),
            }
            continue;
        }
        match event {
            ExecutionEvent::Started { actor } => {
                println!("{} {}", "▶".green(), format!("{} started", actor).bold())
            }
            ExecutionEvent::Completed { actor, message } => {
                println!("{} {}: {}", "✔".green(), actor.bold(), message)
            }
            ExecutionEvent::Failed { actor, message } => {
                println!("{} {}: {}", "✘".red(), actor.bold(), message)
            }
            ExecutionEvent::Stopped { actor } => {
                println!("{} {} stopped", "■".yellow(), actor.bold())
            }
            ExecutionEvent::Statement {
                actor,
                subroutine,
                line,
                text,
            } => println!(
                "{}",
                format!("  [{}] {}:{} {}", actor, subroutine, line, text).dimmed()
            ),
            ExecutionEvent::Call { .. } => {}
            ExecutionEvent::Log {
                actor,
                severity,
                message,
            } => match severity {
                Severity::Error => println!("  [{}] {}", actor, message.red()),
                Severity::Warning => println!("  [{}] {}", actor, message.yellow()),
                Severity::Info => println!("  [{}] {}", actor, message),
            },
            ExecutionEvent::Error { actor, error } => {
                println!("{} [{}] {}", "error:".red().bold(), actor, error.message);
                println!("  {} {} ({})", "hint:".cyan(), error.suggestion, error.concept);
            }
        }
    }
}

fn print_summary(
    world: &MemoryWorld,
    actor_id: &str,
) {
    if let Ok(actor) = world.actor(actor_id) {
        println!(
            "{} at {} with {}/{} energy",
            actor.id.bold(),
            actor.position,
            actor.stats.energy,
            actor.stats.max_energy
        );
    }
    let resources = world.resources();
    if !resources.counters.is_empty() {
        let list: Vec<String> = resources
            .counters
            .iter()
            .map(|(name, count)| format!("{} {}", count, name))
            .collect();
        println!("resources: {}", list.join(", "));
    }
}

/// Report unrecognized lines and calls no actor could resolve
fn check(script: &Path) -> Result<()> {
    let source = read_script(script)?;
    let sections: IndexMap<String, String> = split_subroutines(&source)
        .with_context(|| format!("Failed to check: {}", script.display()))?;

    let registry = CapabilityRegistry::new();
    let dispatch = builtin_tile_functions();
    let tile_functions: Vec<&'static str> = dispatch.functions().map(|f| f.name).collect();

    let mut problems = 0;
    for (name, text) in &sections {
        let output = frontend::compile(text)
            .map_err(|e| anyhow!("{}: {}", name, e))
            .with_context(|| format!("Failed to check: {}", script.display()))?;
        for (line, error) in &output.errors {
            problems += 1;
            println!(
                "{} {}:{}: {} ({})",
                "warning:".yellow().bold(),
                script.display(),
                line,
                error,
                "line is skipped when run".dimmed()
            );
        }
        for (line, call) in output.program.calls() {
            let known = registry.get(call).is_some()
                || tile_functions.iter().any(|f| *f == call)
                || sections.contains_key(call);
            if !known {
                problems += 1;
                println!(
                    "{} {}:{}: function not found: {}",
                    "warning:".yellow().bold(),
                    script.display(),
                    line,
                    call
                );
            }
        }
    }

    if problems == 0 {
        println!("{} {} ({} subroutines)", "ok".green(), script.display(), sections.len());
    } else {
        println!("{} warning(s)", problems);
    }
    Ok(())
}

/// Tile function table, detached from any real world
fn builtin_tile_functions() -> TileFunctionDispatch {
    let world: Arc<dyn WorldStore> = Arc::new(MemoryWorld::new(1, 1));
    TileFunctionDispatch::new(world.clone(), TaskScheduler::new(world))
}

fn capabilities() {
    let registry = CapabilityRegistry::new();
    print!("{}", registry.describe());

    println!("[tile functions]");
    for f in builtin_tile_functions().functions() {
        println!(
            "  {:<28} {} ({} tile, {} energy)",
            f.name, f.description, f.kind, f.energy
        );
    }
}
