//! Exception handlers.

use crate::{classfile::Type, utils::graph::BlockId};

/// An exception handler: a set of protected blocks and the block control enters when
/// one of them throws.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handler {
    pub(crate) protected: Vec<BlockId>,
    pub(crate) catch_block: BlockId,
    pub(crate) catch_type: Option<Type>,
}

impl Handler {
    /// Blocks covered by the handler, in insertion order.
    #[must_use]
    pub fn protected(&self) -> &[BlockId] {
        &self.protected
    }

    /// Entry block of the handler.
    #[must_use]
    pub const fn catch_block(&self) -> BlockId {
        self.catch_block
    }

    /// The caught exception class; `None` catches everything.
    #[must_use]
    pub const fn catch_type(&self) -> Option<&Type> {
        self.catch_type.as_ref()
    }

    /// Returns `true` if `block` is covered by this handler.
    #[must_use]
    pub fn protects(&self, block: BlockId) -> bool {
        self.protected.contains(&block)
    }
}
