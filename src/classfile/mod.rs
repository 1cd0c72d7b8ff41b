//! Class file level types: descriptors, member references and code attribute tables.
//!
//! # Key Components
//!
//! - [`Type`] - Field and method descriptors plus the analysis-only address and null types
//! - [`MemberRef`] / [`NameAndType`] - Symbolic field and method references
//! - [`LineNumberTable`], [`LocalVariableTable`], [`ExceptionTable`] - Code attribute tables
//!
//! The exception table also seeds control flow graph construction, see
//! [`crate::analysis::cfg::FlowGraph::add_exception_table`].

mod member;
mod tables;
mod types;

pub use member::{MemberRef, NameAndType};
pub use tables::{
    Catch, ExceptionTable, LineNumber, LineNumberTable, LocalVariable, LocalVariableTable,
};
pub use types::Type;
