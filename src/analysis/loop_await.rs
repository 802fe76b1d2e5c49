//! Flags `await` expressions that execute inside a loop.
//!
//! Awaiting once per element serializes what could be batched or gathered
//! up front, so any await reachable on a cycle of the execution graph is
//! reported at the await expression's span.

use std::collections::HashSet;

use crate::ast::ExprKind;
use crate::cfg::ExecutionGraph;
use crate::graph::{Cycle, NodeId};

use super::{Finding, FindingKind, ReportedSpans};

pub fn analyze(graph: &ExecutionGraph<'_>, cycles: &[Cycle]) -> Vec<Finding> {
    let mut reported = ReportedSpans::default();
    let mut findings = Vec::new();
    let mut seen: HashSet<NodeId> = HashSet::new();

    for cycle in cycles {
        for &node in cycle {
            if !seen.insert(node) {
                continue;
            }
            let Some(ast) = graph.node(node).ast else {
                continue;
            };
            ast.for_each_expr(&mut |expr| {
                if matches!(expr.kind, ExprKind::Await(_)) && reported.insert(expr.span) {
                    findings.push(Finding {
                        kind: FindingKind::AwaitInLoop,
                        span: expr.span,
                    });
                }
            });
        }
    }
    findings
}
