//! Utility capabilities: queries and pure helpers, no world side effects

use futures::future::{BoxFuture, FutureExt};
use indexmap::IndexMap;

use super::{args, invalid_argument, position_value};
use super::{CapabilityDescriptor, Category, EnergyCost, Executor, ParamSpec};
use crate::runtime::context::ExecutionContext;
use crate::runtime::interpreter::ops;
use crate::runtime::result::{ExecutionResult, Severity};
use crate::runtime::value::Value;

/// Longest list `range` builds
pub const MAX_RANGE_LEN: usize = 1_000_000;

pub fn descriptors() -> Vec<CapabilityDescriptor> {
    let entry = |name: &'static str,
                 params: Vec<ParamSpec>,
                 description: &'static str,
                 executor: Executor| CapabilityDescriptor {
        name,
        category: Category::Utility,
        params,
        description,
        energy: EnergyCost::None,
        executor,
    };
    let value = || vec![ParamSpec::required("value", "any", "list, or several values")];
    vec![
        entry("get_position", vec![], "Current position as {x, y}", get_position),
        entry("get_energy", vec![], "Current energy", get_energy),
        entry("get_inventory", vec![], "Items carried", get_inventory),
        entry(
            "print",
            vec![ParamSpec::optional("values", "any", "values to print")],
            "Print a message",
            print,
        ),
        entry(
            "range",
            vec![
                ParamSpec::required("start", "int", "first value, or the end when alone"),
                ParamSpec::optional("stop", "int", "end, exclusive"),
                ParamSpec::optional("step", "int", "increment, default 1"),
            ],
            "List of integers",
            range,
        ),
        entry("len", value(), "Length of a list, string or map", len),
        entry("min", value(), "Smallest value", min),
        entry("max", value(), "Largest value", max),
        entry("sum", value(), "Sum of numbers", sum),
        entry(
            "abs",
            vec![ParamSpec::required("n", "number", "a number")],
            "Absolute value",
            abs,
        ),
    ]
}

fn data(value: Value) -> ExecutionResult {
    ExecutionResult::ok().with_data(value)
}

fn get_position(
    ctx: &mut ExecutionContext,
    _args: Vec<Value>,
) -> BoxFuture<'_, ExecutionResult> {
    let position = ctx.actor.position;
    async move { data(position_value(position)) }.boxed()
}

fn get_energy(
    ctx: &mut ExecutionContext,
    _args: Vec<Value>,
) -> BoxFuture<'_, ExecutionResult> {
    let energy = i64::from(ctx.actor.stats.energy);
    async move { data(Value::Int(energy)) }.boxed()
}

fn get_inventory(
    ctx: &mut ExecutionContext,
    _args: Vec<Value>,
) -> BoxFuture<'_, ExecutionResult> {
    let items: IndexMap<String, Value> = ctx
        .actor
        .inventory
        .iter()
        .map(|(item, count)| (item.clone(), Value::Int(i64::from(*count))))
        .collect();
    async move { data(Value::Map(items)) }.boxed()
}

fn print(
    ctx: &mut ExecutionContext,
    args: Vec<Value>,
) -> BoxFuture<'_, ExecutionResult> {
    let text = args
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    ctx.log(Severity::Info, text.clone());
    async move { ExecutionResult::ok_msg(text) }.boxed()
}

fn range(
    _ctx: &mut ExecutionContext,
    args: Vec<Value>,
) -> BoxFuture<'_, ExecutionResult> {
    async move {
        let ints: Result<Vec<i64>, String> = (0..args.len())
            .map(|i| args::int(&args, i, "range bound"))
            .collect();
        let (start, stop, step) = match ints.as_deref() {
            Ok([stop]) => (0, *stop, 1),
            Ok([start, stop]) => (*start, *stop, 1),
            Ok([start, stop, step]) => (*start, *stop, *step),
            Ok(_) => return invalid_argument("range takes 1 to 3 integers"),
            Err(e) => return invalid_argument(e),
        };
        if step == 0 {
            return invalid_argument("range step must not be zero");
        }

        let mut items = Vec::new();
        let mut current = start;
        while (step > 0 && current < stop) || (step < 0 && current > stop) {
            if items.len() >= MAX_RANGE_LEN {
                return invalid_argument(format!("range longer than {}", MAX_RANGE_LEN));
            }
            items.push(Value::Int(current));
            match current.checked_add(step) {
                Some(next) => current = next,
                None => break,
            }
        }
        data(Value::List(items))
    }
    .boxed()
}

fn len(
    _ctx: &mut ExecutionContext,
    args: Vec<Value>,
) -> BoxFuture<'_, ExecutionResult> {
    async move {
        let n = match args.first() {
            Some(Value::List(items)) => items.len(),
            Some(Value::Str(s)) => s.chars().count(),
            Some(Value::Map(entries)) => entries.len(),
            Some(other) => {
                return invalid_argument(format!("{} has no length", other.type_name()))
            }
            None => return invalid_argument("missing argument: value"),
        };
        data(Value::Int(i64::try_from(n).unwrap_or(i64::MAX)))
    }
    .boxed()
}

/// `f([a, b])` and `f(a, b)` take the same values
fn spread(args: Vec<Value>) -> Vec<Value> {
    match <[Value; 1]>::try_from(args) {
        Ok([Value::List(items)]) => items,
        Ok([single]) => vec![single],
        Err(args) => args,
    }
}

fn extreme(
    args: Vec<Value>,
    want: std::cmp::Ordering,
) -> ExecutionResult {
    let mut values = spread(args).into_iter();
    let Some(mut best) = values.next() else {
        return invalid_argument("expected at least one value");
    };
    for value in values {
        match ops::compare(&value, &best) {
            Some(ord) if ord == want => best = value,
            Some(_) => {}
            None => {
                return invalid_argument(format!(
                    "cannot compare {} with {}",
                    value.type_name(),
                    best.type_name()
                ))
            }
        }
    }
    data(best)
}

fn min(
    _ctx: &mut ExecutionContext,
    args: Vec<Value>,
) -> BoxFuture<'_, ExecutionResult> {
    async move { extreme(args, std::cmp::Ordering::Less) }.boxed()
}

fn max(
    _ctx: &mut ExecutionContext,
    args: Vec<Value>,
) -> BoxFuture<'_, ExecutionResult> {
    async move { extreme(args, std::cmp::Ordering::Greater) }.boxed()
}

fn sum(
    _ctx: &mut ExecutionContext,
    args: Vec<Value>,
) -> BoxFuture<'_, ExecutionResult> {
    async move {
        let mut total = Value::Int(0);
        for value in spread(args) {
            if !matches!(value, Value::Int(_) | Value::Float(_)) {
                return invalid_argument(format!("cannot sum {}", value.type_name()));
            }
            total = match ops::binary(crate::frontend::parser::ast::BinOp::Add, &total, &value) {
                Ok(total) => total,
                Err(e) => return invalid_argument(e),
            };
        }
        data(total)
    }
    .boxed()
}

fn abs(
    _ctx: &mut ExecutionContext,
    args: Vec<Value>,
) -> BoxFuture<'_, ExecutionResult> {
    async move {
        match args.first() {
            Some(Value::Int(n)) => match n.checked_abs() {
                Some(n) => data(Value::Int(n)),
                None => invalid_argument("integer overflow"),
            },
            Some(Value::Float(f)) => data(Value::Float(f.abs())),
            Some(other) => invalid_argument(format!("abs of {}", other.type_name())),
            None => invalid_argument("missing argument: n"),
        }
    }
    .boxed()
}
