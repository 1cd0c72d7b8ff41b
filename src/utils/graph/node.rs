//! Block identifier for the directed graphs in this crate.
//!
//! Every graph node in the analysis layer is a basic block, so the identifier is named
//! after it. [`BlockId`] is a plain index into the owning graph's node storage; it carries
//! no reference to the graph and is only meaningful together with the graph that
//! issued it.

use std::fmt;

/// A strongly-typed index of a node (basic block) in a [`crate::utils::graph::DirectedGraph`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub(crate) usize);

impl BlockId {
    /// Create an identifier from a raw index.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        BlockId(index)
    }

    /// The raw index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", self.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

impl From<usize> for BlockId {
    #[inline]
    fn from(index: usize) -> Self {
        BlockId(index)
    }
}

impl From<BlockId> for usize {
    #[inline]
    fn from(block: BlockId) -> Self {
        block.0
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_block_id_roundtrip() {
        let block = BlockId::new(42);
        assert_eq!(block.index(), 42);
        assert_eq!(usize::from(block), 42);
        assert_eq!(BlockId::from(42), block);
    }

    #[test]
    fn test_block_id_formatting() {
        let block = BlockId::new(7);
        assert_eq!(format!("{block}"), "B7");
        assert_eq!(format!("{block:?}"), "BlockId(7)");
    }

    #[test]
    fn test_block_id_ordering_and_hash() {
        assert!(BlockId::new(1) < BlockId::new(2));
        let set: HashSet<_> = [BlockId::new(1), BlockId::new(1), BlockId::new(3)]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
    }
}
