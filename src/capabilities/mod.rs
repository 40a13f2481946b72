//! Capability registry
//!
//! Capabilities are the host operations a script may call by name. Each
//! category module declares its capabilities as a table of
//! [`CapabilityDescriptor`]s; the registry indexes them by name.

pub mod interaction;
pub mod movement;
pub mod system;
pub mod utility;

use std::fmt::{self, Write as _};

use futures::future::BoxFuture;
use indexmap::IndexMap;

use crate::runtime::context::ExecutionContext;
use crate::runtime::result::ExecutionResult;
use crate::runtime::value::Value;
use crate::world::Actor;

/// Async capability body
pub type Executor =
    for<'a> fn(&'a mut ExecutionContext, Vec<Value>) -> BoxFuture<'a, ExecutionResult>;

/// Number of steps a call will take, for per-step energy
pub type StepCounter = fn(&Actor, &[Value]) -> u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Movement,
    Interaction,
    System,
    Utility,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Movement,
        Category::Interaction,
        Category::System,
        Category::Utility,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Movement => "movement",
            Category::Interaction => "interaction",
            Category::System => "system",
            Category::Utility => "utility",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub ty: &'static str,
    pub required: bool,
    pub description: &'static str,
}

impl ParamSpec {
    pub const fn required(
        name: &'static str,
        ty: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            ty,
            required: true,
            description,
        }
    }

    pub const fn optional(
        name: &'static str,
        ty: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            ty,
            required: false,
            description,
        }
    }
}

/// Declared energy cost
#[derive(Clone, Copy)]
pub enum EnergyCost {
    None,
    Fixed(u32),
    PerStep { per_step: u32, steps: StepCounter },
}

impl EnergyCost {
    /// Energy the call needs, given the actor and arguments
    pub fn required(
        &self,
        actor: &Actor,
        args: &[Value],
    ) -> u32 {
        match self {
            EnergyCost::None => 0,
            EnergyCost::Fixed(cost) => *cost,
            EnergyCost::PerStep { per_step, steps } => {
                per_step.saturating_mul(steps(actor, args))
            }
        }
    }
}

impl fmt::Debug for EnergyCost {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            EnergyCost::None => write!(f, "None"),
            EnergyCost::Fixed(cost) => write!(f, "Fixed({})", cost),
            EnergyCost::PerStep { per_step, .. } => write!(f, "PerStep({})", per_step),
        }
    }
}

impl fmt::Display for EnergyCost {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            EnergyCost::None => write!(f, "free"),
            EnergyCost::Fixed(cost) => write!(f, "{} energy", cost),
            EnergyCost::PerStep { per_step, .. } => write!(f, "{} energy per step", per_step),
        }
    }
}

/// A named host operation
#[derive(Clone)]
pub struct CapabilityDescriptor {
    pub name: &'static str,
    pub category: Category,
    pub params: Vec<ParamSpec>,
    pub description: &'static str,
    pub energy: EnergyCost,
    pub executor: Executor,
}

impl fmt::Debug for CapabilityDescriptor {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("CapabilityDescriptor")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("params", &self.params)
            .field("energy", &self.energy)
            .finish()
    }
}

impl CapabilityDescriptor {
    /// `name(a: int, b?: int)`
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| {
                let marker = if p.required { "" } else { "?" };
                format!("{}{}: {}", p.name, marker, p.ty)
            })
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

/// Catalog of capabilities, in declaration order
#[derive(Debug, Clone)]
pub struct CapabilityRegistry {
    capabilities: IndexMap<&'static str, CapabilityDescriptor>,
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityRegistry {
    /// Registry with every built-in capability
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for descriptor in movement::descriptors()
            .into_iter()
            .chain(interaction::descriptors())
            .chain(system::descriptors())
            .chain(utility::descriptors())
        {
            registry.register(descriptor);
        }
        registry
    }

    pub fn empty() -> Self {
        Self {
            capabilities: IndexMap::new(),
        }
    }

    /// Add or replace a capability
    pub fn register(
        &mut self,
        descriptor: CapabilityDescriptor,
    ) {
        self.capabilities.insert(descriptor.name, descriptor);
    }

    /// Exact-match lookup
    pub fn get(
        &self,
        name: &str,
    ) -> Option<&CapabilityDescriptor> {
        self.capabilities.get(name)
    }

    pub fn all(&self) -> impl Iterator<Item = &CapabilityDescriptor> {
        self.capabilities.values()
    }

    pub fn by_category(
        &self,
        category: Category,
    ) -> impl Iterator<Item = &CapabilityDescriptor> {
        self.capabilities
            .values()
            .filter(move |d| d.category == category)
    }

    pub fn executor_map(&self) -> IndexMap<&'static str, Executor> {
        self.capabilities
            .values()
            .map(|d| (d.name, d.executor))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Glossary listing grouped by category
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for category in Category::ALL {
            let mut entries = self.by_category(category).peekable();
            if entries.peek().is_none() {
                continue;
            }
            let _ = writeln!(out, "[{}]", category);
            for d in entries {
                let _ = writeln!(out, "  {:<28} {} ({})", d.signature(), d.description, d.energy);
                for p in &d.params {
                    let _ = writeln!(out, "      {:<10} {}", p.name, p.description);
                }
            }
        }
        out
    }
}

/// Failure for a malformed argument
pub(crate) fn invalid_argument(message: impl fmt::Display) -> ExecutionResult {
    ExecutionResult::fail(
        crate::runtime::result::ErrorKind::Execution,
        format!("invalid argument: {}", message),
    )
}

/// `{"x": .., "y": ..}`
pub(crate) fn position_value(pos: crate::world::Position) -> Value {
    let mut map = IndexMap::new();
    map.insert("x".to_string(), Value::Int(i64::from(pos.x)));
    map.insert("y".to_string(), Value::Int(i64::from(pos.y)));
    Value::Map(map)
}

/// Positional argument accessors shared by the executors
pub(crate) mod args {
    use crate::runtime::value::Value;

    pub fn int(
        args: &[Value],
        index: usize,
        name: &str,
    ) -> Result<i64, String> {
        match args.get(index) {
            Some(value) => value
                .as_i64()
                .ok_or_else(|| format!("{} must be an integer, got {}", name, value.type_name())),
            None => Err(format!("missing argument: {}", name)),
        }
    }

    pub fn number(
        args: &[Value],
        index: usize,
        name: &str,
    ) -> Result<f64, String> {
        match args.get(index) {
            Some(value) => value
                .as_f64()
                .ok_or_else(|| format!("{} must be a number, got {}", name, value.type_name())),
            None => Err(format!("missing argument: {}", name)),
        }
    }

    pub fn text<'a>(
        args: &'a [Value],
        index: usize,
        name: &str,
    ) -> Result<&'a str, String> {
        match args.get(index) {
            Some(value) => value
                .as_str()
                .ok_or_else(|| format!("{} must be a string, got {}", name, value.type_name())),
            None => Err(format!("missing argument: {}", name)),
        }
    }
}

#[cfg(test)]
mod tests;
