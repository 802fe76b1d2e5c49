//! Procedure-body AST consumed by the analyses.
//!
//! Parsing is not this crate's concern: a host front end produces these
//! trees. The statement and expression kinds form a closed set so the CFG
//! builder can match exhaustively; constructs outside the set arrive as
//! [`StmtKind::Other`] / [`ExprKind::Other`] and are treated as opaque
//! leaves that still expose their nested expressions.

use std::fmt;

/// Half-open byte range in the original source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both inputs.
    pub fn union(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Host-assigned identity of a resolved storage location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

/// An identifier, optionally resolved by the host to a storage symbol.
/// Without a symbol, analyses fall back to comparing source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub symbol: Option<SymbolId>,
}

impl Ident {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol: None,
        }
    }

    pub fn resolved(name: impl Into<String>, symbol: SymbolId) -> Self {
        Self {
            name: name.into(),
            symbol: Some(symbol),
        }
    }
}

/// One declarator of a local-declaration statement.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalDecl {
    pub name: Ident,
    pub init: Option<Expr>,
    pub span: Span,
}

/// Argument passing mode. `Ref` and `Out` mark arguments whose storage may
/// be rewritten by the callee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgMode {
    Value,
    Ref,
    Out,
}

impl ArgMode {
    pub fn is_mutating(self) -> bool {
        matches!(self, ArgMode::Ref | ArgMode::Out)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub mode: ArgMode,
    pub expr: Expr,
}

impl Arg {
    pub fn value(expr: Expr) -> Self {
        Self {
            mode: ArgMode::Value,
            expr,
        }
    }

    pub fn out(expr: Expr) -> Self {
        Self {
            mode: ArgMode::Out,
            expr,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
    Negate,
    Not,
}

impl UnaryOp {
    /// Increment/decrement operators both read and rewrite their operand.
    pub fn is_mutating(self) -> bool {
        !matches!(self, UnaryOp::Negate | UnaryOp::Not)
    }

    fn token(self) -> &'static str {
        match self {
            UnaryOp::PreIncrement | UnaryOp::PostIncrement => "++",
            UnaryOp::PreDecrement | UnaryOp::PostDecrement => "--",
            UnaryOp::Negate => "-",
            UnaryOp::Not => "!",
        }
    }

    fn is_prefix(self) -> bool {
        !matches!(self, UnaryOp::PostIncrement | UnaryOp::PostDecrement)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    fn token(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Ident(Ident),
    Literal(String),
    /// Member access without a call, e.g. `map.len`.
    Member {
        object: Box<Expr>,
        name: String,
    },
    /// Call of a callee expression, usually a `Member`.
    Call {
        callee: Box<Expr>,
        args: Vec<Arg>,
    },
    /// Element access, e.g. `map[key]`.
    Index {
        object: Box<Expr>,
        args: Vec<Expr>,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Paren(Box<Expr>),
    Await(Box<Expr>),
    /// Unrecognized expression shape; children are still traversed.
    Other {
        children: Vec<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Pre-order visit of this expression and every nested expression.
    pub fn for_each<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        match &self.kind {
            ExprKind::Ident(_) | ExprKind::Literal(_) => {}
            ExprKind::Member { object, .. } => object.for_each(f),
            ExprKind::Call { callee, args } => {
                callee.for_each(f);
                for arg in args {
                    arg.expr.for_each(f);
                }
            }
            ExprKind::Index { object, args } => {
                object.for_each(f);
                for arg in args {
                    arg.for_each(f);
                }
            }
            ExprKind::Assign { target, value } => {
                target.for_each(f);
                value.for_each(f);
            }
            ExprKind::Unary { operand, .. } => operand.for_each(f),
            ExprKind::Binary { lhs, rhs, .. } => {
                lhs.for_each(f);
                rhs.for_each(f);
            }
            ExprKind::Paren(inner) | ExprKind::Await(inner) => inner.for_each(f),
            ExprKind::Other { children } => {
                for child in children {
                    child.for_each(f);
                }
            }
        }
    }

    /// Source-like rendering used for finding message arguments and as the
    /// textual fallback of the alias predicate.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Ident(ident) => write!(f, "{}", ident.name),
            ExprKind::Literal(text) => write!(f, "{text}"),
            ExprKind::Member { object, name } => write!(f, "{object}.{name}"),
            ExprKind::Call { callee, args } => {
                write!(f, "{callee}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match arg.mode {
                        ArgMode::Value => {}
                        ArgMode::Ref => write!(f, "ref ")?,
                        ArgMode::Out => write!(f, "out ")?,
                    }
                    write!(f, "{}", arg.expr)?;
                }
                write!(f, ")")
            }
            ExprKind::Index { object, args } => {
                write!(f, "{object}[")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, "]")
            }
            ExprKind::Assign { target, value } => write!(f, "{target} = {value}"),
            ExprKind::Unary { op, operand } => {
                if op.is_prefix() {
                    write!(f, "{}{operand}", op.token())
                } else {
                    write!(f, "{operand}{}", op.token())
                }
            }
            ExprKind::Binary { op, lhs, rhs } => write!(f, "{lhs} {} {rhs}", op.token()),
            ExprKind::Paren(inner) => write!(f, "({inner})"),
            ExprKind::Await(inner) => write!(f, "await {inner}"),
            ExprKind::Other { children } => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{child}")?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SwitchLabel {
    Case(Expr),
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchSection {
    pub labels: Vec<SwitchLabel>,
    pub body: Vec<Stmt>,
}

impl SwitchSection {
    pub fn is_default(&self) -> bool {
        self.labels
            .iter()
            .any(|label| matches!(label, SwitchLabel::Default))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub binding: Option<Ident>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Expr(Expr),
    Local(Vec<LocalDecl>),
    If {
        cond: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Option<Vec<Stmt>>,
    },
    Switch {
        scrutinee: Expr,
        sections: Vec<SwitchSection>,
    },
    For {
        init: Vec<LocalDecl>,
        cond: Option<Expr>,
        step: Vec<Expr>,
        body: Vec<Stmt>,
    },
    Foreach {
        var: Ident,
        iterable: Expr,
        body: Vec<Stmt>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    DoWhile {
        body: Vec<Stmt>,
        cond: Expr,
    },
    Try {
        body: Vec<Stmt>,
        catches: Vec<CatchClause>,
        finally: Option<Vec<Stmt>>,
    },
    Break,
    Continue,
    Return(Option<Expr>),
    Empty,
    /// Unrecognized statement shape; nested expressions are still visible
    /// to the analyses, control flow through it is treated as straight-line.
    Other {
        exprs: Vec<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Visits every expression in this statement, descending into nested
    /// statements and into each expression's sub-expressions.
    pub fn for_each_expr<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        fn block<'a>(stmts: &'a [Stmt], f: &mut impl FnMut(&'a Expr)) {
            for stmt in stmts {
                stmt.for_each_expr(f);
            }
        }

        match &self.kind {
            StmtKind::Expr(expr) => expr.for_each(f),
            StmtKind::Local(decls) => {
                for decl in decls {
                    if let Some(init) = &decl.init {
                        init.for_each(f);
                    }
                }
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                cond.for_each(f);
                block(then_branch, f);
                if let Some(else_branch) = else_branch {
                    block(else_branch, f);
                }
            }
            StmtKind::Switch {
                scrutinee,
                sections,
            } => {
                scrutinee.for_each(f);
                for section in sections {
                    for label in &section.labels {
                        if let SwitchLabel::Case(expr) = label {
                            expr.for_each(f);
                        }
                    }
                    block(&section.body, f);
                }
            }
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => {
                for decl in init {
                    if let Some(expr) = &decl.init {
                        expr.for_each(f);
                    }
                }
                if let Some(cond) = cond {
                    cond.for_each(f);
                }
                for expr in step {
                    expr.for_each(f);
                }
                block(body, f);
            }
            StmtKind::Foreach { iterable, body, .. } => {
                iterable.for_each(f);
                block(body, f);
            }
            StmtKind::While { cond, body } => {
                cond.for_each(f);
                block(body, f);
            }
            StmtKind::DoWhile { body, cond } => {
                block(body, f);
                cond.for_each(f);
            }
            StmtKind::Try {
                body,
                catches,
                finally,
            } => {
                block(body, f);
                for catch in catches {
                    block(&catch.body, f);
                }
                if let Some(finally) = finally {
                    block(finally, f);
                }
            }
            StmtKind::Return(expr) => {
                if let Some(expr) = expr {
                    expr.for_each(f);
                }
            }
            StmtKind::Break | StmtKind::Continue | StmtKind::Empty => {}
            StmtKind::Other { exprs } => {
                for expr in exprs {
                    expr.for_each(f);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ident(name: &str, span: Span) -> Expr {
        Expr::new(ExprKind::Ident(Ident::new(name)), span)
    }

    #[test]
    fn span_union_covers_both_ranges() {
        let a = Span::new(10, 14);
        let b = Span::new(30, 42);
        assert_eq!(a.union(b), Span::new(10, 42));
        assert_eq!(b.union(a), Span::new(10, 42));
    }

    #[test]
    fn render_index_and_call() {
        let map = ident("cache", Span::new(0, 5));
        let key = ident("key", Span::new(6, 9));
        let index = Expr::new(
            ExprKind::Index {
                object: Box::new(map.clone()),
                args: vec![key.clone()],
            },
            Span::new(0, 10),
        );
        assert_eq!(index.render(), "cache[key]");

        let call = Expr::new(
            ExprKind::Call {
                callee: Box::new(Expr::new(
                    ExprKind::Member {
                        object: Box::new(map),
                        name: "TryGetValue".to_string(),
                    },
                    Span::new(0, 17),
                )),
                args: vec![Arg::value(key), Arg::out(ident("value", Span::new(25, 30)))],
            },
            Span::new(0, 31),
        );
        assert_eq!(call.render(), "cache.TryGetValue(key, out value)");
    }

    #[test]
    fn for_each_visits_nested_expressions_once() {
        let inner = ident("x", Span::new(4, 5));
        let expr = Expr::new(
            ExprKind::Await(Box::new(Expr::new(
                ExprKind::Paren(Box::new(inner)),
                Span::new(3, 6),
            ))),
            Span::new(0, 6),
        );
        let mut seen = Vec::new();
        expr.for_each(&mut |e| seen.push(e.span));
        assert_eq!(
            seen,
            vec![Span::new(0, 6), Span::new(3, 6), Span::new(4, 5)]
        );
    }

    #[test]
    fn stmt_for_each_expr_descends_into_loop_bodies() {
        let body_read = ident("inner", Span::new(20, 25));
        let stmt = Stmt::new(
            StmtKind::While {
                cond: ident("go", Span::new(0, 2)),
                body: vec![Stmt::new(StmtKind::Expr(body_read), Span::new(20, 26))],
            },
            Span::new(0, 30),
        );
        let mut count = 0;
        stmt.for_each_expr(&mut |_| count += 1);
        assert_eq!(count, 2);
    }
}
