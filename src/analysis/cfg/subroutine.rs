//! Subroutines entered through `jsr` and left through `ret`.
//!
//! A subroutine is modeled by its entry block, its exit block (the one ending in `ret`)
//! and the list of paths through it. Each path pairs the block that called the
//! subroutine with the block control resumes at after the return. Return phis are
//! placed at the second block of every path.

use std::fmt;

use crate::utils::graph::BlockId;

/// Handle of a subroutine within a [`crate::analysis::cfg::FlowGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubroutineId(usize);

impl SubroutineId {
    /// Create a handle from a raw index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        SubroutineId(index)
    }

    /// The raw index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SubroutineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub{}", self.0)
    }
}

/// A `jsr`/`ret` subroutine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subroutine {
    pub(crate) id: SubroutineId,
    pub(crate) entry: BlockId,
    pub(crate) exit: Option<BlockId>,
    pub(crate) paths: Vec<(BlockId, BlockId)>,
}

impl Subroutine {
    pub(crate) fn new(id: SubroutineId, entry: BlockId) -> Self {
        Subroutine {
            id,
            entry,
            exit: None,
            paths: Vec::new(),
        }
    }

    /// The handle of this subroutine.
    #[must_use]
    pub const fn id(&self) -> SubroutineId {
        self.id
    }

    /// The first block of the subroutine.
    #[must_use]
    pub const fn entry(&self) -> BlockId {
        self.entry
    }

    /// The block ending in `ret`, once known. Subroutines that never return have none.
    #[must_use]
    pub const fn exit(&self) -> Option<BlockId> {
        self.exit
    }

    /// The `(call block, return block)` pairs, in the order they were added.
    #[must_use]
    pub fn paths(&self) -> &[(BlockId, BlockId)] {
        &self.paths
    }

    /// Call blocks whose return lands in `ret`.
    pub fn calls_returning_to(&self, ret: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        self.paths
            .iter()
            .filter(move |(_, target)| *target == ret)
            .map(|(call, _)| *call)
    }

    /// The distinct return blocks, in path order.
    #[must_use]
    pub fn return_blocks(&self) -> Vec<BlockId> {
        let mut blocks = Vec::with_capacity(self.paths.len());
        for (_, ret) in &self.paths {
            if !blocks.contains(ret) {
                blocks.push(*ret);
            }
        }
        blocks
    }
}
