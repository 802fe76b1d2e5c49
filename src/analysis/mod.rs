//! The analyses and their shared reporting types.

pub mod host;
pub mod loop_await;
pub mod redundant_access;
pub mod tracker;

pub use host::{AnalysisHost, TextualHost};
pub use tracker::{AccessKey, AccessTracker, Counter, StorageKey};

use std::collections::HashSet;

use crate::ast::{Span, Stmt};
use crate::cfg::build_cfg;
use crate::config::ContainerModel;
use crate::graph::{find_cycles, RootedGraph};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FindingKind {
    /// The same (container, key) pair was read more than once with no
    /// intervening write; the texts are the rendered source spellings.
    RedundantLookup { container: String, key: String },
    /// An `await` executes on a cycle of the procedure's control flow.
    AwaitInLoop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub kind: FindingKind,
    pub span: Span,
}

/// Span-keyed suppression set scoped to one analyzer invocation. Distinct
/// paths or cycles often rediscover the same evidence; the first report
/// wins.
#[derive(Debug, Default)]
pub(crate) struct ReportedSpans(HashSet<Span>);

impl ReportedSpans {
    /// Returns true when the span has not been reported before.
    pub(crate) fn insert(&mut self, span: Span) -> bool {
        self.0.insert(span)
    }
}

/// Runs both analyses over one procedure body. The execution graph and its
/// cycles are built once and shared; findings come back ordered by span.
pub fn analyze_procedure(
    body: &[Stmt],
    host: &dyn AnalysisHost,
    model: &ContainerModel,
) -> Vec<Finding> {
    if body.is_empty() {
        return Vec::new();
    }
    let graph = build_cfg(body);
    let cycles = find_cycles(&graph);
    log::debug!(
        "analyzing procedure: {} flow nodes, {} cycles",
        graph.node_count(),
        cycles.len()
    );

    let mut findings = redundant_access::analyze(&graph, &cycles, host, model);
    findings.extend(loop_await::analyze(&graph, &cycles));
    findings.sort_by_key(|finding| (finding.span.start, finding.span.end));
    findings
}
