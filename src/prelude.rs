//! # classscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! of the library. Import it to get quick access to the essential types for building
//! expression trees, control flow graphs and SSA form.
//!
//! ```rust
//! use classscope::prelude::*;
//!
//! let mut cfg = FlowGraph::new(0);
//! let join = cfg.add_block(6);
//! cfg.add_edge(cfg.entry(), join)?;
//! assert_eq!(cfg.pre_order(), &[cfg.entry(), join]);
//! # Ok::<(), classscope::Error>(())
//! ```

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all operations
pub use crate::Error;

/// The result type used throughout the crate
pub use crate::Result;

/// Bounds-checked big-endian reader for attribute tables
pub use crate::Parser;

// ================================================================================================
// Class File Building Blocks
// ================================================================================================

/// Field and method descriptors
pub use crate::classfile::Type;

/// Symbolic references to fields and methods
pub use crate::classfile::{MemberRef, NameAndType};

/// Code attribute tables
pub use crate::classfile::{ExceptionTable, LineNumberTable, LocalVariableTable};

// ================================================================================================
// Expression Trees
// ================================================================================================

/// The node arena and node handles
pub use crate::tree::{NodeId, Tree};

/// Node payloads
pub use crate::tree::{ArithOp, Constant, Expr, Node, PhiKind, PhiStmt, Stmt, VarKey};

/// Tree traversal
pub use crate::tree::{Direction, TreeVisitor};

// ================================================================================================
// Control Flow and SSA
// ================================================================================================

/// Control flow graph types
pub use crate::analysis::cfg::{EdgeKind, FlowGraph, Handler, SubroutineId};

/// SSA construction
pub use crate::analysis::ssa::{SsaBuilder, SsaConfig, SsaForm};

/// Block handles
pub use crate::utils::graph::BlockId;
