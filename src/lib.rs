//! Control-flow analysis of procedure bodies for redundant container
//! lookups and per-iteration awaits.
//!
//! A host front end lowers its language's procedure bodies into the
//! [`ast`] types, implements [`AnalysisHost`] for name resolution, and
//! calls [`analyze_procedure`]. The crate builds an execution graph per
//! procedure, runs a confluence-aware dataflow pass for repeated lookups
//! and a cycle scan for awaits, and returns span-ordered findings.

// Export modules for library usage
pub mod analysis;
pub mod ast;
pub mod cfg;
pub mod config;
pub mod graph;
pub mod testkit;

// Re-export commonly used types
pub use crate::analysis::{
    analyze_procedure, AccessKey, AccessTracker, AnalysisHost, Counter, Finding, FindingKind,
    StorageKey, TextualHost,
};
pub use crate::cfg::{build_cfg, AstRef, ExecutionGraph, FlowNode};
pub use crate::config::{ConfigError, ContainerModel, MethodSpec};
pub use crate::graph::{find_cycles, Cycle, NodeId, RootedGraph};
