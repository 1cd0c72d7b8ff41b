//! Program analysis over expression trees.
//!
//! - [`cfg`] - control flow graphs of tree statements, with exception handlers and
//!   subroutines
//! - [`ssa`] - SSA construction on top of a [`cfg::FlowGraph`]
//!
//! Both build on the generic graph layer in [`crate::utils::graph`].

pub mod cfg;
pub mod ssa;
