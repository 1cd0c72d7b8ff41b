//! Dominator trees and dominance frontiers.
//!
//! Immediate dominators are computed with the iterative algorithm of Cooper, Harvey and
//! Kennedy ("A Simple, Fast Dominance Algorithm"): nodes are processed in reverse
//! post-order and each node's dominator is the intersection of its processed
//! predecessors' dominator chains, repeated until nothing changes. On the reducible,
//! small graphs produced from method bodies this converges in two or three passes.
//!
//! Dominance frontiers use the same paper's runner walk: for every edge `p -> n`, each
//! node on the dominator chain from `p` up to (excluding) `idom(n)` has `n` in its
//! frontier.
//!
//! Nodes unreachable from the entry have no immediate dominator, no tree children and an
//! empty frontier.

use crate::utils::graph::{
    algorithms::traversal::reverse_postorder, BlockId, Predecessors, RootedGraph,
};

/// Immediate dominator relation over the nodes reachable from an entry.
#[derive(Debug, Clone)]
pub struct DominatorTree {
    entry: BlockId,
    idom: Vec<Option<BlockId>>,
    children: Vec<Vec<BlockId>>,
}

impl DominatorTree {
    /// The root of the tree.
    #[inline]
    #[must_use]
    pub fn entry(&self) -> BlockId {
        self.entry
    }

    /// Immediate dominator of `node`; `None` for the entry and for unreachable nodes.
    #[inline]
    #[must_use]
    pub fn immediate_dominator(&self, node: BlockId) -> Option<BlockId> {
        if node == self.entry {
            None
        } else {
            self.idom.get(node.index()).copied().flatten()
        }
    }

    /// Returns `true` if `node` is reachable from the entry.
    #[must_use]
    pub fn is_reachable(&self, node: BlockId) -> bool {
        node == self.entry || self.immediate_dominator(node).is_some()
    }

    /// Returns `true` if `a` dominates `b`. Every reachable node dominates itself.
    #[must_use]
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        if !self.is_reachable(b) {
            return false;
        }

        let mut current = Some(b);
        while let Some(node) = current {
            if node == a {
                return true;
            }
            current = self.immediate_dominator(node);
        }
        false
    }

    /// Returns `true` if `a` dominates `b` and `a != b`.
    #[inline]
    #[must_use]
    pub fn strictly_dominates(&self, a: BlockId, b: BlockId) -> bool {
        a != b && self.dominates(a, b)
    }

    /// Children of `node` in the dominator tree, in ascending index order.
    #[must_use]
    pub fn children(&self, node: BlockId) -> &[BlockId] {
        self.children.get(node.index()).map_or(&[], Vec::as_slice)
    }

    /// Number of edges between `node` and the entry in the dominator tree.
    #[must_use]
    pub fn depth(&self, node: BlockId) -> usize {
        let mut depth = 0;
        let mut current = self.immediate_dominator(node);
        while let Some(parent) = current {
            depth += 1;
            current = self.immediate_dominator(parent);
        }
        depth
    }

    /// Number of nodes in the underlying graph, reachable or not.
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.idom.len()
    }
}

/// Compute the dominator tree of `graph` rooted at its entry.
pub fn compute_dominators<G: RootedGraph>(graph: &G) -> DominatorTree {
    let entry = graph.entry();
    let node_count = graph.node_count();
    let mut idom: Vec<Option<BlockId>> = vec![None; node_count];
    let mut children = vec![Vec::new(); node_count];

    if entry.index() >= node_count {
        return DominatorTree {
            entry,
            idom,
            children,
        };
    }

    let rpo = reverse_postorder(graph, entry);
    let mut order = vec![usize::MAX; node_count];
    for (position, node) in rpo.iter().enumerate() {
        order[node.index()] = position;
    }

    // The entry temporarily dominates itself so intersections terminate
    idom[entry.index()] = Some(entry);

    let mut changed = true;
    while changed {
        changed = false;
        for &node in rpo.iter().skip(1) {
            let mut new_idom: Option<BlockId> = None;
            for pred in graph.predecessors(node) {
                if idom[pred.index()].is_none() {
                    continue;
                }
                new_idom = Some(match new_idom {
                    None => pred,
                    Some(current) => intersect(&idom, &order, pred, current),
                });
            }

            if new_idom.is_some() && idom[node.index()] != new_idom {
                idom[node.index()] = new_idom;
                changed = true;
            }
        }
    }

    idom[entry.index()] = None;
    for (index, parent) in idom.iter().enumerate() {
        if let Some(parent) = parent {
            children[parent.index()].push(BlockId::new(index));
        }
    }

    DominatorTree {
        entry,
        idom,
        children,
    }
}

fn intersect(idom: &[Option<BlockId>], order: &[usize], a: BlockId, b: BlockId) -> BlockId {
    let mut finger1 = a;
    let mut finger2 = b;
    while finger1 != finger2 {
        while order[finger1.index()] > order[finger2.index()] {
            let Some(next) = idom[finger1.index()] else {
                return finger2;
            };
            finger1 = next;
        }
        while order[finger2.index()] > order[finger1.index()] {
            let Some(next) = idom[finger2.index()] else {
                return finger1;
            };
            finger2 = next;
        }
    }
    finger1
}

/// Compute the dominance frontier of every node.
///
/// The frontier of `n` lists, without duplicates and in discovery order, every node `m`
/// such that `n` dominates a predecessor of `m` but does not strictly dominate `m`.
pub fn compute_dominance_frontiers<G: Predecessors>(
    graph: &G,
    dom_tree: &DominatorTree,
) -> Vec<Vec<BlockId>> {
    let node_count = graph.node_count();
    let mut frontiers: Vec<Vec<BlockId>> = vec![Vec::new(); node_count];

    for node in graph.node_ids() {
        if !dom_tree.is_reachable(node) {
            continue;
        }

        let stop = dom_tree.immediate_dominator(node);
        for pred in graph.predecessors(node) {
            if !dom_tree.is_reachable(pred) {
                continue;
            }

            let mut runner = Some(pred);
            while let Some(current) = runner {
                if Some(current) == stop {
                    break;
                }
                let frontier = &mut frontiers[current.index()];
                if !frontier.contains(&node) {
                    frontier.push(node);
                }
                runner = dom_tree.immediate_dominator(current);
            }
        }
    }

    frontiers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::graph::{DirectedGraph, GraphBase, Predecessors, Successors};

    struct Rooted(DirectedGraph<(), ()>);

    impl GraphBase for Rooted {
        fn node_count(&self) -> usize {
            self.0.node_count()
        }

        fn node_ids(&self) -> impl Iterator<Item = BlockId> {
            self.0.node_ids()
        }
    }

    impl Successors for Rooted {
        fn successors(&self, node: BlockId) -> impl Iterator<Item = BlockId> {
            self.0.successors(node)
        }
    }

    impl Predecessors for Rooted {
        fn predecessors(&self, node: BlockId) -> impl Iterator<Item = BlockId> {
            self.0.predecessors(node)
        }
    }

    impl RootedGraph for Rooted {
        fn entry(&self) -> BlockId {
            BlockId::new(0)
        }
    }

    fn b(i: usize) -> BlockId {
        BlockId::new(i)
    }

    fn graph(nodes: usize, edges: &[(usize, usize)]) -> Rooted {
        let mut graph = DirectedGraph::new();
        for _ in 0..nodes {
            graph.add_node(());
        }
        for &(s, t) in edges {
            graph.add_edge(b(s), b(t), ()).unwrap();
        }
        Rooted(graph)
    }

    #[test]
    fn test_diamond_dominators() {
        let g = graph(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let dom = compute_dominators(&g);

        assert_eq!(dom.immediate_dominator(b(0)), None);
        assert_eq!(dom.immediate_dominator(b(1)), Some(b(0)));
        assert_eq!(dom.immediate_dominator(b(3)), Some(b(0)));
        assert_eq!(dom.children(b(0)), &[b(1), b(2), b(3)]);
        assert!(dom.dominates(b(0), b(3)));
        assert!(!dom.dominates(b(1), b(3)));
        assert!(dom.dominates(b(3), b(3)));
        assert!(!dom.strictly_dominates(b(3), b(3)));
        assert_eq!(dom.depth(b(3)), 1);
    }

    #[test]
    fn test_diamond_frontiers() {
        let g = graph(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let dom = compute_dominators(&g);
        let df = compute_dominance_frontiers(&g, &dom);

        assert!(df[0].is_empty());
        assert_eq!(df[1], vec![b(3)]);
        assert_eq!(df[2], vec![b(3)]);
        assert!(df[3].is_empty());
    }

    #[test]
    fn test_loop_frontiers() {
        // 0 -> 1 -> 2 -> 1, 2 -> 3
        let g = graph(4, &[(0, 1), (1, 2), (2, 1), (2, 3)]);
        let dom = compute_dominators(&g);
        let df = compute_dominance_frontiers(&g, &dom);

        assert_eq!(dom.immediate_dominator(b(2)), Some(b(1)));
        assert_eq!(dom.immediate_dominator(b(3)), Some(b(2)));
        assert_eq!(df[2], vec![b(1)]);
        assert_eq!(df[1], vec![b(1)]);
        assert!(df[0].is_empty());
    }

    #[test]
    fn test_entry_self_loop() {
        let g = graph(2, &[(0, 0), (0, 1)]);
        let dom = compute_dominators(&g);
        let df = compute_dominance_frontiers(&g, &dom);
        assert_eq!(df[0], vec![b(0)]);
        assert!(df[1].is_empty());
    }

    #[test]
    fn test_unreachable_nodes() {
        // 3 is unreachable but points into the graph
        let g = graph(4, &[(0, 1), (1, 2), (3, 2)]);
        let dom = compute_dominators(&g);
        let df = compute_dominance_frontiers(&g, &dom);

        assert!(!dom.is_reachable(b(3)));
        assert_eq!(dom.immediate_dominator(b(2)), Some(b(1)));
        assert!(!dom.dominates(b(3), b(2)));
        assert!(!dom.dominates(b(0), b(3)));
        assert!(df.iter().all(Vec::is_empty));
    }

    #[test]
    fn test_irreducible() {
        // 0 -> 1, 0 -> 2, 1 <-> 2
        let g = graph(3, &[(0, 1), (0, 2), (1, 2), (2, 1)]);
        let dom = compute_dominators(&g);
        let df = compute_dominance_frontiers(&g, &dom);

        assert_eq!(dom.immediate_dominator(b(1)), Some(b(0)));
        assert_eq!(dom.immediate_dominator(b(2)), Some(b(0)));
        assert_eq!(df[1], vec![b(2)]);
        assert_eq!(df[2], vec![b(1)]);
    }
}
