//! Control flow graphs over expression trees.
//!
//! A [`FlowGraph`] owns the node arena of one method together with its basic blocks.
//! Besides ordinary branches it models the two non-local transfers of the class file
//! format: exception handlers, registered as [`Handler`]s with exception edges from
//! every protected block, and `jsr`/`ret` subroutines, registered as [`Subroutine`]s
//! with explicit `(call block, return block)` paths.
//!
//! # Key Components
//!
//! - [`FlowGraph`] - Blocks, edges, statements, handlers and subroutines
//! - [`Block`] - A label and an ordered statement list
//! - [`EdgeKind`] - Normal, exception and subroutine edges
//! - [`GraphStamp`] - Identifies a graph shape for caches keyed by pre-order index
//!
//! # Lazy Computation
//!
//! Pre-order numbering, dominators and dominance frontiers are computed on demand and
//! cached in [`std::sync::OnceLock`]s. Any change to the block or edge set drops the
//! caches and advances the stamp.
//!
//! # Examples
//!
//! ```rust
//! use classscope::analysis::cfg::{EdgeKind, FlowGraph};
//!
//! let mut cfg = FlowGraph::new(0);
//! let call = cfg.entry();
//! let after = cfg.add_block(3);
//! let body = cfg.add_block(10);
//!
//! let sub = cfg.add_subroutine(body)?;
//! cfg.set_subroutine_exit(sub, body)?;
//! cfg.add_subroutine_call(sub, call, after)?;
//!
//! assert_eq!(cfg.paths(sub)?, vec![(call, after)]);
//! assert_eq!(cfg.edge_kind(body, after), Some(EdgeKind::SubroutineReturn));
//! # Ok::<(), classscope::Error>(())
//! ```

mod block;
mod edge;
mod graph;
mod handler;
mod subroutine;

pub use block::Block;
pub use edge::EdgeKind;
pub use graph::{FlowGraph, GraphStamp};
pub use handler::Handler;
pub use subroutine::{Subroutine, SubroutineId};
