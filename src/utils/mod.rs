//! Shared helpers: generic graph machinery and Graphviz output.

mod dot;
pub mod graph;

pub use dot::escape_dot;
