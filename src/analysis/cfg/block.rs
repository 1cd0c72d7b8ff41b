//! Basic blocks.

use crate::tree::NodeId;

/// A basic block: a label and an ordered list of statements.
///
/// The statements are roots in the graph's [`crate::tree::Tree`]. Phi statements always
/// come first.
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub(crate) label: u32,
    pub(crate) stmts: Vec<NodeId>,
}

impl Block {
    pub(crate) fn new(label: u32) -> Self {
        Block {
            label,
            stmts: Vec::new(),
        }
    }

    /// Bytecode offset of the first instruction of the block.
    #[must_use]
    pub const fn label(&self) -> u32 {
        self.label
    }

    /// Statements in execution order.
    #[must_use]
    pub fn stmts(&self) -> &[NodeId] {
        &self.stmts
    }

    /// Number of statements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stmts.len()
    }

    /// Returns `true` if the block holds no statements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }
}
