//! 表达式求值

use futures::future::{BoxFuture, FutureExt};

use super::{ops, Interpreter, StmtResult};
use crate::frontend::parser::ast::{AssignOp, BinOp, Expr, Literal, UnOp};
use crate::runtime::error::ScriptError;
use crate::runtime::result::ExecutionResult;
use crate::runtime::value::Value;

impl Interpreter {
    /// 求值表达式；其中的调用失败会使整条语句失败
    pub(super) fn eval<'a>(
        &'a mut self,
        expr: &'a Expr,
    ) -> BoxFuture<'a, StmtResult<Value>> {
        async move {
            match expr {
                Expr::Lit(lit, _) => Ok(literal(lit)),
                // 未定义的裸标识符按其名字作为字符串
                Expr::Var(name, _) => Ok(self
                    .lookup(name)
                    .cloned()
                    .unwrap_or_else(|| Value::Str(name.clone()))),
                Expr::List(items, _) => {
                    let mut values = Vec::with_capacity(items.len());
                    for item in items {
                        values.push(self.eval(item).await?);
                    }
                    Ok(Value::List(values))
                }
                Expr::Index { expr, index, .. } => {
                    let container = self.eval(expr).await?;
                    let index = self.eval(index).await?;
                    Ok(ops::index(&container, &index)?)
                }
                Expr::UnOp { op, expr, .. } => {
                    let value = self.eval(expr).await?;
                    match op {
                        UnOp::Neg => Ok(ops::negate(&value)?),
                        UnOp::Not => Ok(Value::Bool(!value.is_truthy())),
                    }
                }
                Expr::BinOp {
                    op: BinOp::And,
                    left,
                    right,
                    ..
                } => {
                    let left = self.eval(left).await?;
                    if !left.is_truthy() {
                        return Ok(left);
                    }
                    self.eval(right).await
                }
                Expr::BinOp {
                    op: BinOp::Or,
                    left,
                    right,
                    ..
                } => {
                    let left = self.eval(left).await?;
                    if left.is_truthy() {
                        return Ok(left);
                    }
                    self.eval(right).await
                }
                Expr::BinOp {
                    op, left, right, ..
                } => {
                    let left = self.eval(left).await?;
                    let right = self.eval(right).await?;
                    Ok(ops::binary(*op, &left, &right)?)
                }
                Expr::Call { name, args, .. } => {
                    let mut values = Vec::with_capacity(args.len());
                    for arg in args {
                        values.push(self.eval(arg).await?);
                    }
                    match self.execute_function(name, values).await {
                        failure @ ExecutionResult::Failure { .. } => Err(failure),
                        success => Ok(success.data().cloned().unwrap_or_default()),
                    }
                }
            }
        }
        .boxed()
    }

    /// `name = value`、`name += value`、`name -= value`
    pub(super) fn assign_with(
        &mut self,
        name: &str,
        op: AssignOp,
        value: Value,
    ) -> StmtResult<()> {
        let value = match op {
            AssignOp::Set => value,
            AssignOp::Add | AssignOp::Sub => {
                let current = self
                    .lookup(name)
                    .cloned()
                    .ok_or_else(|| ScriptError::UndefinedVariable(name.to_string()))?;
                let op = if op == AssignOp::Add {
                    BinOp::Add
                } else {
                    BinOp::Sub
                };
                ops::binary(op, &current, &value)?
            }
        };
        self.assign(name, value);
        Ok(())
    }
}

fn literal(lit: &Literal) -> Value {
    match lit {
        Literal::Int(n) => Value::Int(*n),
        Literal::Float(f) => Value::Float(*f),
        Literal::Str(s) => Value::Str(s.clone()),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::None => Value::None,
    }
}
