//! Detects repeated container lookups with no intervening write.
//!
//! Two passes over one execution graph. The acyclic pass pushes an
//! [`AccessTracker`] forward through the graph with back edges cut, merging
//! at joins and reporting from the trackers that reach nodes with no
//! successors. The cyclic pass replays each discovered cycle twice with a
//! fresh tracker, so a single lookup per iteration shows up as a repeat.

use std::collections::{HashSet, VecDeque};

use crate::ast::{Expr, ExprKind, StmtKind};
use crate::cfg::{AstRef, ExecutionGraph};
use crate::config::ContainerModel;
use crate::graph::{Cycle, NodeId, RootedGraph};

use super::host::AnalysisHost;
use super::tracker::{AccessKey, AccessTracker};
use super::{Finding, FindingKind, ReportedSpans};

pub fn analyze(
    graph: &ExecutionGraph<'_>,
    cycles: &[Cycle],
    host: &dyn AnalysisHost,
    model: &ContainerModel,
) -> Vec<Finding> {
    let ctx = EffectContext { host, model };
    let mut reported = ReportedSpans::default();
    let mut findings = Vec::new();
    acyclic_pass(graph, &ctx, &mut reported, &mut findings);
    cyclic_pass(graph, cycles, &ctx, &mut reported, &mut findings);
    findings
}

struct EffectContext<'h> {
    host: &'h dyn AnalysisHost,
    model: &'h ContainerModel,
}

impl EffectContext<'_> {
    fn access_key(&self, container: &Expr, key: &Expr) -> AccessKey {
        AccessKey {
            container: self.host.storage_of(container),
            key: self.host.storage_of(key),
            container_text: container.render(),
            key_text: key.render(),
        }
    }
}

/// Forward dataflow over the graph with back edges removed. A node with
/// several predecessors waits until every forward predecessor has delivered
/// its state, then continues with the pessimistic merge of them all. Back
/// edges deliver no state; the cyclic pass covers repetition.
fn acyclic_pass(
    graph: &ExecutionGraph<'_>,
    ctx: &EffectContext<'_>,
    reported: &mut ReportedSpans,
    findings: &mut Vec<Finding>,
) {
    let back = back_edges(graph);
    let reachable = reachable_nodes(graph);

    // Forward in-degree, counting parallel edges separately and ignoring
    // edges from unreachable nodes (they will never deliver state).
    let mut remaining = vec![0usize; graph.node_count()];
    for &node in &reachable {
        for &succ in graph.successors(node) {
            if !back.contains(&(node, succ)) {
                remaining[succ.0] += 1;
            }
        }
    }

    let mut state: Vec<Option<AccessTracker>> = (0..graph.node_count()).map(|_| None).collect();
    state[graph.root().0] = Some(AccessTracker::new());
    let mut ready = VecDeque::from([graph.root()]);

    while let Some(node) = ready.pop_front() {
        let incoming = state[node.0].take().unwrap_or_default();
        let tracker = match graph.node(node).ast {
            Some(ast) => apply_ref(ctx, &ast, incoming),
            None => incoming,
        };

        let succs = graph.successors(node);
        if succs.is_empty() {
            report(&tracker, reported, findings);
            continue;
        }
        for &succ in succs {
            if back.contains(&(node, succ)) {
                continue;
            }
            let merged = match state[succ.0].take() {
                Some(existing) => existing.merge(&tracker),
                None => tracker.clone(),
            };
            state[succ.0] = Some(merged);
            remaining[succ.0] -= 1;
            if remaining[succ.0] == 0 {
                ready.push_back(succ);
            }
        }
    }
}

/// Replays each cycle's node sequence twice against a fresh tracker. Any
/// lookup repeated across iterations without a write in between reaches a
/// maximum of two on the second lap. Loop-carried state from outside the
/// cycle is deliberately not imported.
fn cyclic_pass(
    graph: &ExecutionGraph<'_>,
    cycles: &[Cycle],
    ctx: &EffectContext<'_>,
    reported: &mut ReportedSpans,
    findings: &mut Vec<Finding>,
) {
    for cycle in cycles {
        let mut tracker = AccessTracker::new();
        for _ in 0..2 {
            for &node in cycle {
                if let Some(ast) = graph.node(node).ast {
                    tracker = apply_ref(ctx, &ast, tracker);
                }
            }
        }
        report(&tracker, reported, findings);
    }
}

fn report(tracker: &AccessTracker, reported: &mut ReportedSpans, findings: &mut Vec<Finding>) {
    for (key, counter) in tracker.iter() {
        if counter.max > 1 {
            if let Some(span) = counter.max_span {
                if reported.insert(span) {
                    findings.push(Finding {
                        kind: FindingKind::RedundantLookup {
                            container: key.container_text.clone(),
                            key: key.key_text.clone(),
                        },
                        span,
                    });
                }
            }
        }
    }
}

/// Applies the effects of one flow node's AST reference.
fn apply_ref(
    ctx: &EffectContext<'_>,
    ast: &AstRef<'_>,
    tracker: AccessTracker,
) -> AccessTracker {
    match *ast {
        AstRef::Expr(expr) => apply_expr(ctx, expr, tracker),
        AstRef::Decl(decl) => {
            let tracker = tracker.reset_matching(&ctx.host.storage_of_ident(&decl.name));
            match &decl.init {
                Some(init) => apply_expr(ctx, init, tracker),
                None => tracker,
            }
        }
        AstRef::Stmt(stmt) => match &stmt.kind {
            // The foreach body entry: the iteration variable is freshly
            // bound on every pass through this node.
            StmtKind::Foreach { var, .. } => {
                tracker.reset_matching(&ctx.host.storage_of_ident(var))
            }
            StmtKind::Other { exprs } => exprs
                .iter()
                .fold(tracker, |tracker, expr| apply_expr(ctx, expr, tracker)),
            _ => tracker,
        },
    }
}

/// Classifies one expression tree. Reads increment the pair they look up,
/// writes reset it, and mutations of a plain variable reset every pair the
/// variable participates in, since its identity may now differ.
fn apply_expr(ctx: &EffectContext<'_>, expr: &Expr, tracker: AccessTracker) -> AccessTracker {
    match &expr.kind {
        ExprKind::Call { callee, args } => apply_call(ctx, expr, callee, args, tracker),
        ExprKind::Index { object, args } => {
            let mut tracker = tracker;
            if ctx.host.is_container(object) {
                if args.len() == 1 {
                    tracker = tracker.increment(ctx.access_key(object, &args[0]), expr.span);
                } else {
                    log::debug!("element access with unexpected argument count: {expr}");
                }
            }
            tracker = apply_expr(ctx, object, tracker);
            args.iter()
                .fold(tracker, |tracker, arg| apply_expr(ctx, arg, tracker))
        }
        ExprKind::Assign { target, value } => {
            let tracker = apply_write_target(ctx, target, tracker);
            apply_expr(ctx, value, tracker)
        }
        ExprKind::Unary { op, operand } if op.is_mutating() => {
            apply_write_target(ctx, operand, tracker)
        }
        ExprKind::Unary { operand, .. } => apply_expr(ctx, operand, tracker),
        ExprKind::Binary { lhs, rhs, .. } => {
            let tracker = apply_expr(ctx, lhs, tracker);
            apply_expr(ctx, rhs, tracker)
        }
        ExprKind::Member { object, .. } => apply_expr(ctx, object, tracker),
        ExprKind::Paren(inner) | ExprKind::Await(inner) => apply_expr(ctx, inner, tracker),
        ExprKind::Other { children } => children
            .iter()
            .fold(tracker, |tracker, child| apply_expr(ctx, child, tracker)),
        ExprKind::Ident(_) | ExprKind::Literal(_) => tracker,
    }
}

/// The target of an assignment or increment/decrement. Writing `c[k]`
/// resets that pair without counting a read; writing a whole container
/// invalidates everything cached about it; writing any other variable
/// invalidates every pair the variable appears in. Reads nested inside the
/// target (its key expressions, a receiver that is itself a lookup) still
/// count.
fn apply_write_target(
    ctx: &EffectContext<'_>,
    target: &Expr,
    tracker: AccessTracker,
) -> AccessTracker {
    match &target.kind {
        ExprKind::Index { object, args } if ctx.host.is_container(object) => {
            let mut tracker = tracker;
            if args.len() == 1 {
                tracker = tracker.reset(ctx.access_key(object, &args[0]));
            } else {
                log::debug!("element write with unexpected argument count: {target}");
            }
            tracker = apply_expr(ctx, object, tracker);
            args.iter()
                .fold(tracker, |tracker, arg| apply_expr(ctx, arg, tracker))
        }
        ExprKind::Paren(inner) => apply_write_target(ctx, inner, tracker),
        _ if ctx.host.is_container(target) => {
            tracker.reset_container(&ctx.host.storage_of(target))
        }
        ExprKind::Member { object, .. } => {
            let tracker = tracker.reset_matching(&ctx.host.storage_of(target));
            apply_expr(ctx, object, tracker)
        }
        _ => tracker.reset_matching(&ctx.host.storage_of(target)),
    }
}

fn apply_call(
    ctx: &EffectContext<'_>,
    expr: &Expr,
    callee: &Expr,
    args: &[crate::ast::Arg],
    tracker: AccessTracker,
) -> AccessTracker {
    let mut tracker = tracker;

    if let ExprKind::Member { object, name } = &callee.kind {
        if ctx.host.is_container(object) {
            if ctx.model.is_read_method(name) {
                if let Some(first) = args.first() {
                    tracker = tracker.increment(ctx.access_key(object, &first.expr), expr.span);
                } else {
                    log::debug!("read method without arguments: {expr}");
                }
            } else if let Some(arity) = ctx.model.write_method_arity(name) {
                if args.len() != arity {
                    log::debug!("write method with unexpected argument count: {expr}");
                } else if let Some(first) = args.first() {
                    tracker = tracker.reset(ctx.access_key(object, &first.expr));
                } else {
                    // A keyless write method touches the whole container.
                    tracker = tracker.reset_container(&ctx.host.storage_of(object));
                }
            } else if ctx.model.is_clear_method(name) {
                if args.is_empty() {
                    tracker = tracker.reset_container(&ctx.host.storage_of(object));
                } else {
                    log::debug!("clear method with unexpected argument count: {expr}");
                }
            }
        }
    }

    // `ref`/`out` arguments may be rewritten by the callee.
    for arg in args {
        if arg.mode.is_mutating() {
            tracker = tracker.reset_matching(&ctx.host.storage_of(&arg.expr));
        }
    }

    // Reads nested in the receiver and arguments.
    tracker = match &callee.kind {
        ExprKind::Member { object, .. } => apply_expr(ctx, object, tracker),
        _ => apply_expr(ctx, callee, tracker),
    };
    args.iter()
        .fold(tracker, |tracker, arg| apply_expr(ctx, &arg.expr, tracker))
}

/// Edges whose target is an ancestor on the depth-first path. The builder
/// only produces structured loops, so the classification is stable across
/// visit orders.
fn back_edges(graph: &ExecutionGraph<'_>) -> HashSet<(NodeId, NodeId)> {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    let mut back = HashSet::new();
    let mut color = vec![Color::White; graph.node_count()];
    let mut stack: Vec<(NodeId, usize)> = vec![(graph.root(), 0)];
    color[graph.root().0] = Color::Gray;

    while let Some(frame) = stack.last_mut() {
        let node = frame.0;
        let succs = graph.successors(node);
        if frame.1 < succs.len() {
            let next = succs[frame.1];
            frame.1 += 1;
            match color[next.0] {
                Color::White => {
                    color[next.0] = Color::Gray;
                    stack.push((next, 0));
                }
                Color::Gray => {
                    back.insert((node, next));
                }
                Color::Black => {}
            }
        } else {
            color[node.0] = Color::Black;
            stack.pop();
        }
    }
    back
}

fn reachable_nodes(graph: &ExecutionGraph<'_>) -> Vec<NodeId> {
    let mut seen = vec![false; graph.node_count()];
    let mut queue = VecDeque::from([graph.root()]);
    seen[graph.root().0] = true;
    let mut order = Vec::new();
    while let Some(node) = queue.pop_front() {
        order.push(node);
        for &succ in graph.successors(node) {
            if !seen[succ.0] {
                seen[succ.0] = true;
                queue.push_back(succ);
            }
        }
    }
    order
}
