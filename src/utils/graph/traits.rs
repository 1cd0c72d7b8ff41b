//! Read-only views over a directed graph.
//!
//! Algorithms in [`crate::utils::graph::algorithms`] are written against these traits so
//! that they run on a bare [`crate::utils::graph::DirectedGraph`] as well as on the
//! control flow graph, which adds its own entry block.

use crate::utils::graph::BlockId;

/// Node enumeration.
pub trait GraphBase {
    /// Number of nodes in the graph.
    fn node_count(&self) -> usize;

    /// All node identifiers in index order.
    fn node_ids(&self) -> impl Iterator<Item = BlockId>;
}

/// Forward adjacency.
pub trait Successors: GraphBase {
    /// Successors of `node`, in edge insertion order.
    fn successors(&self, node: BlockId) -> impl Iterator<Item = BlockId>;
}

/// Backward adjacency.
pub trait Predecessors: GraphBase {
    /// Predecessors of `node`, in edge insertion order.
    fn predecessors(&self, node: BlockId) -> impl Iterator<Item = BlockId>;
}

/// A graph with a distinguished entry node.
pub trait RootedGraph: Successors + Predecessors {
    /// The entry node.
    fn entry(&self) -> BlockId;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EdgeList {
        node_count: usize,
        edges: Vec<(BlockId, BlockId)>,
        entry: BlockId,
    }

    impl GraphBase for EdgeList {
        fn node_count(&self) -> usize {
            self.node_count
        }

        fn node_ids(&self) -> impl Iterator<Item = BlockId> {
            (0..self.node_count).map(BlockId::new)
        }
    }

    impl Successors for EdgeList {
        fn successors(&self, node: BlockId) -> impl Iterator<Item = BlockId> {
            self.edges
                .iter()
                .filter(move |(src, _)| *src == node)
                .map(|(_, dst)| *dst)
        }
    }

    impl Predecessors for EdgeList {
        fn predecessors(&self, node: BlockId) -> impl Iterator<Item = BlockId> {
            self.edges
                .iter()
                .filter(move |(_, dst)| *dst == node)
                .map(|(src, _)| *src)
        }
    }

    impl RootedGraph for EdgeList {
        fn entry(&self) -> BlockId {
            self.entry
        }
    }

    #[test]
    fn test_edge_list_views() {
        let graph = EdgeList {
            node_count: 3,
            edges: vec![
                (BlockId::new(0), BlockId::new(2)),
                (BlockId::new(1), BlockId::new(2)),
            ],
            entry: BlockId::new(1),
        };

        assert_eq!(graph.node_ids().count(), 3);
        assert_eq!(graph.entry(), BlockId::new(1));
        assert_eq!(
            graph.predecessors(BlockId::new(2)).collect::<Vec<_>>(),
            vec![BlockId::new(0), BlockId::new(1)]
        );
        assert_eq!(graph.successors(BlockId::new(2)).count(), 0);
    }
}
