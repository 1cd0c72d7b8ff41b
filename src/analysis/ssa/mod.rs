//! Static Single Assignment (SSA) form over expression trees.
//!
//! SSA construction rewrites the variables of a [`FlowGraph`] in place: every definition
//! receives a version number, every use is linked to the one definition reaching it,
//! and phi statements are inserted where several definitions meet.
//!
//! # Architecture
//!
//! - [`SsaBuilder`] - drives construction, one variable at a time
//! - [`SsaConstructionInfo`] - per-variable phi slots, real occurrences and defining blocks
//! - [`SsaForm`] - the result, with phi removal and redundant phi collapsing
//! - [`SsaConfig`] - which phi kinds and variables to convert
//! - [`VersionCounter`] - per-variable version numbering
//!
//! # Phi Kinds
//!
//! Three kinds of phi are placed, each at most once per variable and block:
//!
//! - **Join** phis at the iterated dominance frontier of the defining blocks, with one
//!   operand per predecessor
//! - **Catch** phis at handler entries, with one operand per definition that may be live
//!   when the protected region throws; duplicates are dropped whenever the operands are read
//! - **Return** phis at the blocks a subroutine returns to, with one operand per call site
//!
//! When kinds compete for the same block, return beats catch beats join.
//!
//! # Usage
//!
//! ```rust
//! use classscope::{
//!     analysis::{cfg::FlowGraph, ssa::{SsaBuilder, SsaConfig}},
//!     classfile::Type,
//!     tree::{Constant, VarKey},
//! };
//!
//! // b0 -> b1, b0 -> b2, b1 -> b3, b2 -> b3, with l3 assigned in b1 and b2
//! let mut cfg = FlowGraph::new(0);
//! let b0 = cfg.entry();
//! let b1 = cfg.add_block(5);
//! let b2 = cfg.add_block(10);
//! let b3 = cfg.add_block(15);
//! for (from, to) in [(b0, b1), (b0, b2), (b1, b3), (b2, b3)] {
//!     cfg.add_edge(from, to)?;
//! }
//! for (block, value) in [(b1, 1), (b2, 2)] {
//!     let tree = cfg.tree_mut();
//!     let target = tree.new_local(3, Type::Int);
//!     let constant = tree.new_constant(Constant::Int(value));
//!     let store = tree.new_store(target, constant)?;
//!     cfg.append_stmt(block, store)?;
//! }
//! let read = cfg.tree_mut().new_local(3, Type::Int);
//! let ret = cfg.tree_mut().new_return_expr(read)?;
//! cfg.append_stmt(b3, ret)?;
//!
//! let ssa = SsaBuilder::new(&mut cfg, SsaConfig::default()).build()?;
//! let phi = ssa.info(VarKey::Local(3)).unwrap().phi_at_block(&cfg, b3)?.unwrap();
//! assert_eq!(cfg.tree().display(phi).to_string(), "l3_2 := Phi(B1=l3_0, B2=l3_1)");
//! assert_eq!(cfg.tree().display(ret).to_string(), "return l3_2");
//! # Ok::<(), classscope::Error>(())
//! ```
//!
//! # References
//!
//! - Cytron et al., "Efficiently Computing Static Single Assignment Form and the
//!   Control Dependence Graph", ACM TOPLAS 1991
//!
//! [`FlowGraph`]: crate::analysis::cfg::FlowGraph

mod builder;
mod config;
mod form;
mod info;
mod version;

pub use builder::SsaBuilder;
pub use config::SsaConfig;
pub use form::SsaForm;
pub use info::SsaConstructionInfo;
pub use version::VersionCounter;
