//! Execution graph: the control-flow representation of one procedure body.

pub mod builder;

pub use builder::build_cfg;

use std::fmt;

use crate::ast::{Expr, LocalDecl, Stmt};
use crate::graph::{NodeId, RootedGraph};

/// What a flow node points back at in the procedure's AST.
///
/// Nodes synthesized purely for control shape (loop headers, join nodes)
/// carry no reference. Declarators get their own variant because their
/// effect (the declared name changes identity) is not visible from the
/// initializer expression alone.
#[derive(Debug, Clone, Copy)]
pub enum AstRef<'a> {
    Expr(&'a Expr),
    Decl(&'a LocalDecl),
    Stmt(&'a Stmt),
}

impl<'a> AstRef<'a> {
    /// Visits every expression reachable from this reference, including
    /// expressions inside nested statements for statement references.
    pub fn for_each_expr(&self, f: &mut impl FnMut(&'a Expr)) {
        match self {
            AstRef::Expr(expr) => expr.for_each(f),
            AstRef::Decl(decl) => {
                if let Some(init) = &decl.init {
                    init.for_each(f);
                }
            }
            AstRef::Stmt(stmt) => stmt.for_each_expr(f),
        }
    }
}

/// A vertex of the execution graph. Owned by the graph's arena; edges are
/// node indices, kept in creation order on both sides.
#[derive(Debug)]
pub struct FlowNode<'a> {
    /// Human-readable label for synthetic nodes ("begin for", "end switch").
    pub label: Option<&'static str>,
    pub ast: Option<AstRef<'a>>,
    pub(crate) successors: Vec<NodeId>,
    pub(crate) predecessors: Vec<NodeId>,
}

impl<'a> FlowNode<'a> {
    fn new(label: Option<&'static str>, ast: Option<AstRef<'a>>) -> Self {
        Self {
            label,
            ast,
            successors: Vec::new(),
            predecessors: Vec::new(),
        }
    }

    pub fn successors(&self) -> &[NodeId] {
        &self.successors
    }

    pub fn predecessors(&self) -> &[NodeId] {
        &self.predecessors
    }
}

impl fmt::Display for FlowNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.label, &self.ast) {
            (Some(label), _) => write!(f, "{label}"),
            (None, Some(AstRef::Expr(expr))) => write!(f, "{expr}"),
            (None, Some(AstRef::Decl(decl))) => write!(f, "decl {}", decl.name.name),
            (None, Some(AstRef::Stmt(_))) => write!(f, "stmt"),
            (None, None) => write!(f, "<node>"),
        }
    }
}

/// Arena-backed CFG for one procedure. Built once, read by both analyzers,
/// then discarded; borrows the procedure body for its lifetime.
#[derive(Debug)]
pub struct ExecutionGraph<'a> {
    nodes: Vec<FlowNode<'a>>,
    root: NodeId,
    end: NodeId,
}

impl<'a> ExecutionGraph<'a> {
    pub(crate) fn new() -> Self {
        let mut graph = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            end: NodeId(0),
        };
        graph.root = graph.add_node(Some("start of procedure"), None);
        graph.end = graph.add_node(Some("end of procedure"), None);
        graph
    }

    pub(crate) fn add_node(
        &mut self,
        label: Option<&'static str>,
        ast: Option<AstRef<'a>>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(FlowNode::new(label, ast));
        id
    }

    pub(crate) fn add_edge(&mut self, from: NodeId, to: NodeId) {
        self.nodes[from.0].successors.push(to);
        self.nodes[to.0].predecessors.push(from);
    }

    pub fn node(&self, id: NodeId) -> &FlowNode<'a> {
        &self.nodes[id.0]
    }

    /// The node every `return` and natural fall-through reaches.
    pub fn end(&self) -> NodeId {
        self.end
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &FlowNode<'a>)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId(i), node))
    }
}

impl RootedGraph for ExecutionGraph<'_> {
    fn root(&self) -> NodeId {
        self.root
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn successors(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].successors
    }

    fn predecessors(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].predecessors
    }
}
