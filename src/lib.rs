// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]
#![deny(unsafe_code)]

//! # classscope
//!
//! [![Crates.io](https://img.shields.io/crates/v/classscope.svg)](https://crates.io/crates/classscope)
//! [![Documentation](https://docs.rs/classscope/badge.svg)](https://docs.rs/classscope)
//! [![License](https://img.shields.io/badge/license-Apache--2.0-blue.svg)](https://github.com/BinFlip/classscope/blob/main/LICENSE-APACHE)
//!
//! A framework for analyzing JVM bytecode as expression trees. Method bodies are
//! represented as trees of statements and expressions placed in the blocks of a control
//! flow graph, which can then be converted into Static Single Assignment form with
//! join, exception handler and subroutine return phis.
//!
//! ## Features
//!
//! - **🌳 Expression trees** - Arena-backed nodes with parent links, structural equality and
//!   hashing, deep cloning and directional visitors
//! - **🔀 Control flow graphs** - Typed edges, exception handlers, `jsr`/`ret` subroutines,
//!   lazily computed pre-order and dominance information
//! - **🧮 SSA construction** - Cytron-style phi placement with per-kind precedence and
//!   dominator-tree renaming
//! - **📄 Class file building blocks** - Type descriptors, member references and the
//!   `LineNumberTable`, `LocalVariableTable` and exception table attributes
//!
//! ## Quick Start
//!
//! ```rust
//! use classscope::prelude::*;
//!
//! let mut cfg = FlowGraph::new(0);
//! let entry = cfg.entry();
//! let tree = cfg.tree_mut();
//! let target = tree.new_local(1, Type::Int);
//! let value = tree.new_constant(Constant::Int(42));
//! let store = tree.new_store(target, value)?;
//! cfg.append_stmt(entry, store)?;
//!
//! let ssa = SsaBuilder::new(&mut cfg, SsaConfig::default()).build()?;
//! assert_eq!(ssa.version_count(VarKey::Local(1)), 1);
//! assert_eq!(cfg.tree().display(store).to_string(), "l1_0 := 42");
//! # Ok::<(), classscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`tree`] - Expression and statement nodes, equality, visitors and printing
//! - [`analysis::cfg`] - The [`analysis::cfg::FlowGraph`] holding the tree and its blocks
//! - [`analysis::ssa`] - SSA construction and phi maintenance
//! - [`classfile`] - Descriptors, member references and attribute tables
//! - [`utils::graph`] - Generic directed graphs, traversals and dominators
//! - [`prelude`] - Convenient re-exports of commonly used types
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, Error>`](Result). Broken structural
//! invariants are reported as [`Error::InvariantViolation`] rather than panics:
//!
//! ```rust
//! use classscope::{Error, tree::Tree, classfile::Type};
//!
//! let mut tree = Tree::new();
//! let var = tree.new_local(0, Type::Int);
//! let first = tree.new_expr_stmt(var)?;
//!
//! match tree.new_expr_stmt(var) {
//!     Err(Error::InvariantViolation { message, .. }) => println!("refused: {}", message),
//!     Ok(_) => unreachable!("a node cannot have two parents"),
//!     Err(e) => println!("other error: {}", e),
//! }
//! # let _ = first;
//! # Ok::<(), classscope::Error>(())
//! ```
//!
//! ## Development and Testing
//!
//! ### Fuzzing
//!
//! ```bash
//! cargo +nightly fuzz run tables --release
//! ```
//!
//! ### Testing
//!
//! ```bash
//! cargo test
//! cargo bench
//! ```

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

pub mod analysis;
pub mod classfile;
pub mod prelude;
pub mod tree;
pub mod utils;

/// The result type used throughout `classscope`.
///
/// # Example
///
/// ```rust
/// use classscope::{Result, classfile::Type};
///
/// fn return_type(descriptor: &str) -> Result<Option<Type>> {
///     Ok(Type::parse(descriptor)?.return_type().cloned())
/// }
/// assert_eq!(return_type("(I)J")?, Some(Type::Long));
/// # Ok::<(), classscope::Error>(())
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `classscope` Error type
///
/// Every fallible operation of the crate reports one of its variants.
pub use error::Error;

/// Bounds-checked big-endian cursor used by the attribute table decoders.
///
/// # Example
///
/// ```rust
/// use classscope::{Parser, classfile::LineNumberTable};
///
/// let data = [0x00, 0x01, 0x00, 0x00, 0x00, 0x0A];
/// let table = LineNumberTable::read(&mut Parser::new(&data))?;
/// assert_eq!(table.line_at(3), Some(10));
/// # Ok::<(), classscope::Error>(())
/// ```
pub use file::parser::Parser;
