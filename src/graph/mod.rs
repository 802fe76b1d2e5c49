//! Rooted directed graph primitives.
//!
//! Nodes live in an arena owned by the graph and are addressed by index, so
//! cyclic edges never create ownership cycles. Edge lists are ordered:
//! traversals visit successors in the order the builder created them.

pub mod cycles;

pub use cycles::{find_cycles, Cycle};

/// Index of a node inside its owning graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Contract the cycle finder (and any other generic traversal) relies on:
/// a distinguished root and ordered successor/predecessor lists.
pub trait RootedGraph {
    fn root(&self) -> NodeId;

    fn node_count(&self) -> usize;

    fn successors(&self, node: NodeId) -> &[NodeId];

    fn predecessors(&self, node: NodeId) -> &[NodeId];
}
