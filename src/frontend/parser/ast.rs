//! Abstract Syntax Tree types

use crate::util::span::Span;

/// Literal value
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

/// Expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Lit(Literal, Span),
    Var(String, Span),
    List(Vec<Expr>, Span),
    Index {
        expr: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },
    UnOp {
        op: UnOp,
        expr: Box<Expr>,
        span: Span,
    },
    BinOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    /// Calls are by name only
    Call {
        name: String,
        args: Vec<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Lit(_, span) | Expr::Var(_, span) | Expr::List(_, span) => *span,
            Expr::Index { span, .. }
            | Expr::UnOp { span, .. }
            | Expr::BinOp { span, .. }
            | Expr::Call { span, .. } => *span,
        }
    }
}

/// Assignment operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
}

/// Statement
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

/// Statement kinds
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Assign {
        name: String,
        op: AssignOp,
        value: Expr,
    },
    Expr(Expr),
    If {
        /// `if` and every `elif`, in order
        branches: Vec<(Expr, Block)>,
        else_branch: Option<Block>,
    },
    While {
        condition: Expr,
        body: Block,
    },
    For {
        var: String,
        iterable: Expr,
        body: Block,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    Pass,
    /// A line the parser could not make sense of; executes as a no-op
    Unclassified(String),
}

/// Statement block
pub type Block = Vec<Stmt>;

/// A parsed script
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub body: Block,
}

impl Program {
    /// Unclassified lines, with their line numbers
    pub fn unclassified(&self) -> Vec<(usize, &str)> {
        fn walk<'a>(
            block: &'a [Stmt],
            out: &mut Vec<(usize, &'a str)>,
        ) {
            for stmt in block {
                match &stmt.kind {
                    StmtKind::Unclassified(text) => out.push((stmt.span.line(), text)),
                    StmtKind::If {
                        branches,
                        else_branch,
                    } => {
                        for (_, body) in branches {
                            walk(body, out);
                        }
                        if let Some(body) = else_branch {
                            walk(body, out);
                        }
                    }
                    StmtKind::While { body, .. } | StmtKind::For { body, .. } => walk(body, out),
                    _ => {}
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.body, &mut out);
        out
    }

    /// Every called name, with the line of the call
    pub fn calls(&self) -> Vec<(usize, &str)> {
        let mut out = Vec::new();
        for stmt in &self.body {
            stmt.visit_calls(&mut out);
        }
        out
    }
}

impl Stmt {
    fn visit_calls<'a>(
        &'a self,
        out: &mut Vec<(usize, &'a str)>,
    ) {
        fn block<'a>(
            body: &'a [Stmt],
            out: &mut Vec<(usize, &'a str)>,
        ) {
            for stmt in body {
                stmt.visit_calls(out);
            }
        }

        let line = self.span.line();
        match &self.kind {
            StmtKind::Assign { value, .. } => value.visit_calls(line, out),
            StmtKind::Expr(expr) => expr.visit_calls(line, out),
            StmtKind::Return(Some(expr)) => expr.visit_calls(line, out),
            StmtKind::If {
                branches,
                else_branch,
            } => {
                for (condition, body) in branches {
                    condition.visit_calls(line, out);
                    block(body, out);
                }
                if let Some(body) = else_branch {
                    block(body, out);
                }
            }
            StmtKind::While { condition, body } => {
                condition.visit_calls(line, out);
                block(body, out);
            }
            StmtKind::For { iterable, body, .. } => {
                iterable.visit_calls(line, out);
                block(body, out);
            }
            _ => {}
        }
    }
}

impl Expr {
    fn visit_calls<'a>(
        &'a self,
        line: usize,
        out: &mut Vec<(usize, &'a str)>,
    ) {
        match self {
            Expr::Call { name, args, .. } => {
                for arg in args {
                    arg.visit_calls(line, out);
                }
                out.push((line, name.as_str()));
            }
            Expr::List(items, _) => {
                for item in items {
                    item.visit_calls(line, out);
                }
            }
            Expr::Index { expr, index, .. } => {
                expr.visit_calls(line, out);
                index.visit_calls(line, out);
            }
            Expr::UnOp { expr, .. } => expr.visit_calls(line, out),
            Expr::BinOp { left, right, .. } => {
                left.visit_calls(line, out);
                right.visit_calls(line, out);
            }
            Expr::Lit(..) | Expr::Var(..) => {}
        }
    }
}
