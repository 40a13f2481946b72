//! System capabilities

use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};

use super::{args, invalid_argument, CapabilityDescriptor, Category, EnergyCost, ParamSpec};
use crate::runtime::context::ExecutionContext;
use crate::runtime::result::ExecutionResult;
use crate::runtime::value::Value;

pub fn descriptors() -> Vec<CapabilityDescriptor> {
    let seconds = || vec![ParamSpec::required("seconds", "number", "time to wait")];
    vec![
        CapabilityDescriptor {
            name: "wait",
            category: Category::System,
            params: seconds(),
            description: "Pause the script",
            energy: EnergyCost::None,
            executor: pause,
        },
        CapabilityDescriptor {
            name: "sleep",
            category: Category::System,
            params: seconds(),
            description: "Same as wait",
            energy: EnergyCost::None,
            executor: pause,
        },
    ]
}

fn pause(
    _ctx: &mut ExecutionContext,
    args: Vec<Value>,
) -> BoxFuture<'_, ExecutionResult> {
    async move {
        let seconds = match args::number(&args, 0, "seconds") {
            Ok(s) => s,
            Err(e) => return invalid_argument(e),
        };
        if seconds < 0.0 {
            return invalid_argument(format!("seconds must not be negative: {}", seconds));
        }
        let Ok(duration) = Duration::try_from_secs_f64(seconds) else {
            return invalid_argument(format!("seconds out of range: {}", seconds));
        };
        tokio::time::sleep(duration).await;
        ExecutionResult::ok_msg(format!("Waited {}s", seconds))
    }
    .boxed()
}
