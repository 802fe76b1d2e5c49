//! Builders for assembling procedure bodies by hand.
//!
//! Host front ends produce real trees; tests and examples use these
//! helpers. Leaf expressions draw fresh, strictly increasing spans from a
//! thread-local counter so every source position is distinct; composite
//! expressions cover the union of their children.

use std::cell::Cell;

use crate::ast::{
    Arg, BinaryOp, CatchClause, Expr, ExprKind, Ident, LocalDecl, Span, Stmt, StmtKind,
    SwitchLabel, SwitchSection, UnaryOp,
};

thread_local! {
    static NEXT_POS: Cell<usize> = const { Cell::new(0) };
}

fn fresh_span() -> Span {
    NEXT_POS.with(|next| {
        let start = next.get();
        next.set(start + 10);
        Span::new(start, start + 9)
    })
}

pub fn ident(name: &str) -> Expr {
    Expr::new(ExprKind::Ident(Ident::new(name)), fresh_span())
}

pub fn lit(text: &str) -> Expr {
    Expr::new(ExprKind::Literal(text.to_string()), fresh_span())
}

pub fn member(object: Expr, name: &str) -> Expr {
    let span = object.span;
    Expr::new(
        ExprKind::Member {
            object: Box::new(object),
            name: name.to_string(),
        },
        span,
    )
}

pub fn call(callee: Expr, args: Vec<Arg>) -> Expr {
    let span = args
        .iter()
        .fold(callee.span, |span, arg| span.union(arg.expr.span));
    Expr::new(
        ExprKind::Call {
            callee: Box::new(callee),
            args,
        },
        span,
    )
}

/// `object.name(args)`, the common method-call shape.
pub fn method(object: Expr, name: &str, args: Vec<Arg>) -> Expr {
    call(member(object, name), args)
}

pub fn index(object: Expr, key: Expr) -> Expr {
    let span = object.span.union(key.span);
    Expr::new(
        ExprKind::Index {
            object: Box::new(object),
            args: vec![key],
        },
        span,
    )
}

pub fn assign(target: Expr, value: Expr) -> Expr {
    let span = target.span.union(value.span);
    Expr::new(
        ExprKind::Assign {
            target: Box::new(target),
            value: Box::new(value),
        },
        span,
    )
}

pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
    let span = operand.span;
    Expr::new(
        ExprKind::Unary {
            op,
            operand: Box::new(operand),
        },
        span,
    )
}

pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    let span = lhs.span.union(rhs.span);
    Expr::new(
        ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        span,
    )
}

pub fn paren(inner: Expr) -> Expr {
    let span = inner.span;
    Expr::new(ExprKind::Paren(Box::new(inner)), span)
}

pub fn await_(inner: Expr) -> Expr {
    let span = inner.span;
    Expr::new(ExprKind::Await(Box::new(inner)), span)
}

pub fn expr_stmt(expr: Expr) -> Stmt {
    let span = expr.span;
    Stmt::new(StmtKind::Expr(expr), span)
}

pub fn local(name: &str, init: Option<Expr>) -> Stmt {
    let span = init.as_ref().map(|e| e.span).unwrap_or_else(fresh_span);
    Stmt::new(
        StmtKind::Local(vec![LocalDecl {
            name: Ident::new(name),
            init,
            span,
        }]),
        span,
    )
}

fn block_span(stmts: &[Stmt], base: Span) -> Span {
    stmts.iter().fold(base, |span, stmt| span.union(stmt.span))
}

pub fn if_stmt(cond: Expr, then_branch: Vec<Stmt>, else_branch: Option<Vec<Stmt>>) -> Stmt {
    let mut span = block_span(&then_branch, cond.span);
    if let Some(else_branch) = &else_branch {
        span = block_span(else_branch, span);
    }
    Stmt::new(
        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        },
        span,
    )
}

pub fn case(label: Expr, body: Vec<Stmt>) -> SwitchSection {
    SwitchSection {
        labels: vec![SwitchLabel::Case(label)],
        body,
    }
}

pub fn default_case(body: Vec<Stmt>) -> SwitchSection {
    SwitchSection {
        labels: vec![SwitchLabel::Default],
        body,
    }
}

pub fn switch_stmt(scrutinee: Expr, sections: Vec<SwitchSection>) -> Stmt {
    let span = sections.iter().fold(scrutinee.span, |span, section| {
        block_span(&section.body, span)
    });
    Stmt::new(
        StmtKind::Switch {
            scrutinee,
            sections,
        },
        span,
    )
}

pub fn for_stmt(
    init: Vec<(&str, Expr)>,
    cond: Option<Expr>,
    step: Vec<Expr>,
    body: Vec<Stmt>,
) -> Stmt {
    let init: Vec<LocalDecl> = init
        .into_iter()
        .map(|(name, expr)| LocalDecl {
            name: Ident::new(name),
            span: expr.span,
            init: Some(expr),
        })
        .collect();
    let base = init
        .first()
        .map(|decl| decl.span)
        .or(cond.as_ref().map(|c| c.span))
        .unwrap_or_else(fresh_span);
    let span = block_span(&body, base);
    Stmt::new(
        StmtKind::For {
            init,
            cond,
            step,
            body,
        },
        span,
    )
}

pub fn foreach_stmt(var: &str, iterable: Expr, body: Vec<Stmt>) -> Stmt {
    let span = block_span(&body, iterable.span);
    Stmt::new(
        StmtKind::Foreach {
            var: Ident::new(var),
            iterable,
            body,
        },
        span,
    )
}

pub fn while_stmt(cond: Expr, body: Vec<Stmt>) -> Stmt {
    let span = block_span(&body, cond.span);
    Stmt::new(StmtKind::While { cond, body }, span)
}

pub fn do_while_stmt(body: Vec<Stmt>, cond: Expr) -> Stmt {
    let span = block_span(&body, cond.span);
    Stmt::new(StmtKind::DoWhile { body, cond }, span)
}

pub fn try_stmt(body: Vec<Stmt>, catches: Vec<CatchClause>, finally: Option<Vec<Stmt>>) -> Stmt {
    let mut span = block_span(&body, fresh_span());
    for catch in &catches {
        span = block_span(&catch.body, span);
    }
    if let Some(finally) = &finally {
        span = block_span(finally, span);
    }
    Stmt::new(
        StmtKind::Try {
            body,
            catches,
            finally,
        },
        span,
    )
}

pub fn catch(binding: Option<&str>, body: Vec<Stmt>) -> CatchClause {
    CatchClause {
        binding: binding.map(Ident::new),
        body,
    }
}

pub fn break_stmt() -> Stmt {
    Stmt::new(StmtKind::Break, fresh_span())
}

pub fn continue_stmt() -> Stmt {
    Stmt::new(StmtKind::Continue, fresh_span())
}

pub fn return_stmt(value: Option<Expr>) -> Stmt {
    let span = value.as_ref().map(|e| e.span).unwrap_or_else(fresh_span);
    Stmt::new(StmtKind::Return(value), span)
}

/// Shorthand for the most common probe: `container.Read(key)` with the
/// default model's `ContainsKey`.
pub fn contains_key(container: &str, key: &str) -> Expr {
    method(ident(container), "ContainsKey", vec![Arg::value(ident(key))])
}
