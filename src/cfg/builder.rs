//! Builds an [`ExecutionGraph`] from a procedure body by structural
//! recursion. Each construct contributes a fixed wiring pattern; block
//! construction returns the node control falls through to, or `None` when
//! every path out of the block already left it (break/continue/return).

use crate::ast::{CatchClause, Expr, ExprKind, LocalDecl, Stmt, StmtKind, SwitchSection};
use crate::graph::{NodeId, RootedGraph};

use super::{AstRef, ExecutionGraph};

/// Jump targets visible to the block currently being split.
#[derive(Clone, Copy)]
struct ExitTargets {
    procedure_end: NodeId,
    continue_target: Option<NodeId>,
    break_target: Option<NodeId>,
}

/// Builds the execution graph for one procedure body.
///
/// An empty body produces a graph with only the start and end nodes and no
/// edges between them; both analyzers then report nothing.
pub fn build_cfg(body: &[Stmt]) -> ExecutionGraph<'_> {
    let mut builder = Builder {
        graph: ExecutionGraph::new(),
    };
    let root = builder.graph.root();
    let end = builder.graph.end();
    if !body.is_empty() {
        let targets = ExitTargets {
            procedure_end: end,
            continue_target: None,
            break_target: None,
        };
        if let Some(last) = builder.split_block(root, body, targets) {
            builder.graph.add_edge(last, end);
        }
    }
    builder.graph
}

struct Builder<'a> {
    graph: ExecutionGraph<'a>,
}

impl<'a> Builder<'a> {
    /// Splits a statement sequence starting after `start`. Returns the node
    /// representing "control reaches here after the block", or `None` if no
    /// execution path falls off the end.
    fn split_block(
        &mut self,
        start: NodeId,
        stmts: &'a [Stmt],
        targets: ExitTargets,
    ) -> Option<NodeId> {
        let mut prev = start;
        for stmt in stmts {
            let next = self.split_stmt(prev, stmt, targets)?;
            // A join node nothing flows into means every branch exited.
            if next != prev && self.graph.predecessors(next).is_empty() {
                return None;
            }
            prev = next;
        }
        Some(prev)
    }

    fn split_stmt(
        &mut self,
        prev: NodeId,
        stmt: &'a Stmt,
        targets: ExitTargets,
    ) -> Option<NodeId> {
        match &stmt.kind {
            StmtKind::Expr(expr) => Some(self.split_expr(prev, expr)),
            StmtKind::Local(decls) => Some(self.split_local(prev, decls)),
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => Some(self.split_if(prev, cond, then_branch, else_branch.as_deref(), targets)),
            StmtKind::Switch {
                scrutinee,
                sections,
            } => Some(self.split_switch(prev, scrutinee, sections, targets)),
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => Some(self.split_for(prev, init, cond.as_ref(), step, body, targets)),
            StmtKind::Foreach { iterable, body, .. } => {
                Some(self.split_foreach(prev, stmt, iterable, body, targets))
            }
            StmtKind::While { cond, body } => Some(self.split_while(prev, cond, body, targets)),
            StmtKind::DoWhile { body, cond } => {
                Some(self.split_do_while(prev, body, cond, targets))
            }
            StmtKind::Try {
                body,
                catches,
                finally,
            } => Some(self.split_try(prev, body, catches, finally.as_deref(), targets)),
            StmtKind::Continue => {
                let node = self.graph.add_node(Some("continue"), None);
                self.graph.add_edge(prev, node);
                match targets.continue_target {
                    Some(target) => self.graph.add_edge(node, target),
                    None => log::debug!("continue outside of a loop; dropping edge"),
                }
                None
            }
            StmtKind::Break => {
                let node = self.graph.add_node(Some("break"), None);
                self.graph.add_edge(prev, node);
                match targets.break_target {
                    Some(target) => self.graph.add_edge(node, target),
                    None => log::debug!("break outside of a loop or switch; dropping edge"),
                }
                None
            }
            StmtKind::Return(value) => {
                let ast = value.as_ref().map(AstRef::Expr);
                let node = self.graph.add_node(Some("return"), ast);
                self.graph.add_edge(prev, node);
                self.graph.add_edge(node, targets.procedure_end);
                None
            }
            StmtKind::Empty => {
                let node = self.graph.add_node(None, None);
                self.graph.add_edge(prev, node);
                Some(node)
            }
            StmtKind::Other { .. } => {
                let node = self.graph.add_node(None, Some(AstRef::Stmt(stmt)));
                self.graph.add_edge(prev, node);
                Some(node)
            }
        }
    }

    /// Chains an expression into flow nodes so effects attach to the exact
    /// sub-expression. Parenthesized expressions contribute their inner
    /// expression, binary expressions a left chain then a right chain; every
    /// other expression (including `await`, whose whole subtree stays on one
    /// node) is a single node. Each sub-expression ends up on exactly one
    /// node, so the dataflow walk counts it once per execution.
    fn split_expr(&mut self, prev: NodeId, expr: &'a Expr) -> NodeId {
        match &expr.kind {
            ExprKind::Paren(inner) => self.split_expr(prev, inner),
            ExprKind::Binary { lhs, rhs, .. } => {
                let left = self.split_expr(prev, lhs);
                self.split_expr(left, rhs)
            }
            _ => {
                let node = self.graph.add_node(None, Some(AstRef::Expr(expr)));
                self.graph.add_edge(prev, node);
                node
            }
        }
    }

    fn split_local(&mut self, prev: NodeId, decls: &'a [LocalDecl]) -> NodeId {
        let mut last = prev;
        for decl in decls {
            let node = self.graph.add_node(None, Some(AstRef::Decl(decl)));
            self.graph.add_edge(last, node);
            last = node;
        }
        last
    }

    fn split_if(
        &mut self,
        prev: NodeId,
        cond: &'a Expr,
        then_branch: &'a [Stmt],
        else_branch: Option<&'a [Stmt]>,
        targets: ExitTargets,
    ) -> NodeId {
        let cond_node = self
            .graph
            .add_node(Some("begin if"), Some(AstRef::Expr(cond)));
        self.graph.add_edge(prev, cond_node);
        let join = self.graph.add_node(Some("end if"), None);

        if let Some(then_end) = self.split_block(cond_node, then_branch, targets) {
            self.graph.add_edge(then_end, join);
        }
        match else_branch {
            Some(else_branch) => {
                if let Some(else_end) = self.split_block(cond_node, else_branch, targets) {
                    self.graph.add_edge(else_end, join);
                }
            }
            // No else: the condition may fall straight through to the join.
            None => self.graph.add_edge(cond_node, join),
        }
        join
    }

    fn split_switch(
        &mut self,
        prev: NodeId,
        scrutinee: &'a Expr,
        sections: &'a [SwitchSection],
        targets: ExitTargets,
    ) -> NodeId {
        let cond_node = self
            .graph
            .add_node(Some("begin switch"), Some(AstRef::Expr(scrutinee)));
        self.graph.add_edge(prev, cond_node);
        let join = self.graph.add_node(Some("end switch"), None);

        let mut has_default = false;
        for section in sections {
            if section.is_default() {
                has_default = true;
            }
            let section_targets = ExitTargets {
                break_target: Some(join),
                ..targets
            };
            if let Some(section_end) = self.split_block(cond_node, &section.body, section_targets)
            {
                self.graph.add_edge(section_end, join);
            }
        }
        if !has_default {
            self.graph.add_edge(cond_node, join);
        }
        join
    }

    fn split_for(
        &mut self,
        prev: NodeId,
        init: &'a [LocalDecl],
        cond: Option<&'a Expr>,
        step: &'a [Expr],
        body: &'a [Stmt],
        targets: ExitTargets,
    ) -> NodeId {
        let header = self.graph.add_node(Some("begin for"), None);
        self.graph.add_edge(prev, header);
        let after_init = self.split_local(header, init);

        let test = match cond {
            Some(cond) => self.graph.add_node(Some("for test"), Some(AstRef::Expr(cond))),
            None => self.graph.add_node(Some("for test"), None),
        };
        self.graph.add_edge(after_init, test);

        let end = self.graph.add_node(Some("end for"), None);
        // `continue` runs the step expressions before re-testing.
        let step_entry = self.graph.add_node(Some("for step"), None);
        let body_targets = ExitTargets {
            continue_target: Some(step_entry),
            break_target: Some(end),
            ..targets
        };
        if let Some(body_end) = self.split_block(test, body, body_targets) {
            self.graph.add_edge(body_end, step_entry);
        }
        if !self.graph.predecessors(step_entry).is_empty() {
            let mut cursor = step_entry;
            for expr in step {
                cursor = self.split_expr(cursor, expr);
            }
            self.graph.add_edge(cursor, test);
        }
        self.graph.add_edge(test, end);
        end
    }

    fn split_foreach(
        &mut self,
        prev: NodeId,
        stmt: &'a Stmt,
        iterable: &'a Expr,
        body: &'a [Stmt],
        targets: ExitTargets,
    ) -> NodeId {
        let header = self
            .graph
            .add_node(Some("begin foreach"), Some(AstRef::Expr(iterable)));
        self.graph.add_edge(prev, header);

        // The body entry carries the whole statement so the cyclic pass can
        // refresh the iteration variable each time around.
        let body_entry = self
            .graph
            .add_node(Some("begin foreach body"), Some(AstRef::Stmt(stmt)));
        self.graph.add_edge(header, body_entry);

        let end = self.graph.add_node(Some("end foreach"), None);
        // Zero iterations.
        self.graph.add_edge(body_entry, end);

        let body_targets = ExitTargets {
            continue_target: Some(body_entry),
            break_target: Some(end),
            ..targets
        };
        if let Some(body_end) = self.split_block(body_entry, body, body_targets) {
            self.graph.add_edge(body_end, body_entry);
        }
        end
    }

    fn split_while(
        &mut self,
        prev: NodeId,
        cond: &'a Expr,
        body: &'a [Stmt],
        targets: ExitTargets,
    ) -> NodeId {
        let header = self
            .graph
            .add_node(Some("begin while"), Some(AstRef::Expr(cond)));
        self.graph.add_edge(prev, header);
        let end = self.graph.add_node(Some("end while"), None);

        let body_targets = ExitTargets {
            continue_target: Some(header),
            break_target: Some(end),
            ..targets
        };
        if let Some(body_end) = self.split_block(header, body, body_targets) {
            self.graph.add_edge(body_end, header);
        }
        self.graph.add_edge(header, end);
        end
    }

    fn split_do_while(
        &mut self,
        prev: NodeId,
        body: &'a [Stmt],
        cond: &'a Expr,
        targets: ExitTargets,
    ) -> NodeId {
        let entry = self.graph.add_node(Some("begin do"), None);
        self.graph.add_edge(prev, entry);
        let test = self.graph.add_node(Some("do test"), Some(AstRef::Expr(cond)));
        let end = self.graph.add_node(Some("end do"), None);

        // `continue` still reaches the test, unlike the loop body entry.
        let body_targets = ExitTargets {
            continue_target: Some(test),
            break_target: Some(end),
            ..targets
        };
        if let Some(body_end) = self.split_block(entry, body, body_targets) {
            self.graph.add_edge(body_end, test);
        }
        self.graph.add_edge(test, end);
        self.graph.add_edge(test, entry);
        end
    }

    fn split_try(
        &mut self,
        prev: NodeId,
        body: &'a [Stmt],
        catches: &'a [CatchClause],
        finally: Option<&'a [Stmt]>,
        targets: ExitTargets,
    ) -> NodeId {
        let entry = self.graph.add_node(Some("begin try"), None);
        self.graph.add_edge(prev, entry);
        let end = self.graph.add_node(Some("end try"), None);

        let continuation = match finally {
            Some(finally_body) => {
                let finally_node = self.graph.add_node(Some("finally"), None);
                if let Some(finally_end) = self.split_block(finally_node, finally_body, targets) {
                    self.graph.add_edge(finally_end, end);
                }
                finally_node
            }
            None => end,
        };

        if let Some(body_end) = self.split_block(entry, body, targets) {
            self.graph.add_edge(body_end, continuation);
        }

        if catches.is_empty() {
            if continuation != end {
                // No catches but a finally: an exception anywhere in the try
                // body still runs the finally block.
                self.graph.add_edge(entry, continuation);
            }
        } else {
            // Each catch body is an alternative continuation from the try
            // entry, a coarse stand-in for "an exception may occur at any
            // point inside the body".
            for catch in catches {
                if let Some(catch_end) = self.split_block(entry, &catch.body, targets) {
                    self.graph.add_edge(catch_end, continuation);
                }
            }
        }
        end
    }
}
