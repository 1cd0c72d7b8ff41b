//! Directed graph infrastructure for control flow analysis.
//!
//! The graph stores nodes and edges in plain vectors and hands out index handles
//! ([`BlockId`]). Adjacency lists keep insertion order, which makes every traversal and
//! every derived numbering reproducible across runs.
//!
//! # Key Components
//!
//! - [`DirectedGraph`] - Node and edge storage with ordered adjacency
//! - [`BlockId`] - Index handle of a node
//! - [`GraphBase`], [`Successors`], [`Predecessors`], [`RootedGraph`] - Read-only views
//!   the algorithms are written against
//! - [`algorithms`] - Orderings, dominators and dominance frontiers
//!
//! # Examples
//!
//! ```rust
//! use classscope::utils::graph::{algorithms::preorder, DirectedGraph};
//!
//! let mut graph: DirectedGraph<&str, ()> = DirectedGraph::new();
//! let entry = graph.add_node("entry");
//! let exit = graph.add_node("exit");
//! assert!(graph.add_edge(entry, exit, ())?);
//! assert!(!graph.add_edge(entry, exit, ())?);
//!
//! assert_eq!(preorder(&graph, entry), vec![entry, exit]);
//! # Ok::<(), classscope::Error>(())
//! ```

pub mod algorithms;
mod directed;
mod node;
mod traits;

pub use directed::DirectedGraph;
pub use node::BlockId;
pub use traits::{GraphBase, Predecessors, RootedGraph, Successors};
