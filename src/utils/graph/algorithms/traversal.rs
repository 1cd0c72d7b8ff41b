//! Depth-first orderings.
//!
//! All orderings visit successors in adjacency order, so results are deterministic for a
//! given graph. Nodes unreachable from `start` are not included.

use crate::utils::graph::{BlockId, Successors};

/// Depth-first pre-order from `start`.
///
/// A node is emitted the first time it is reached; its successors are then explored
/// left to right before any sibling of the node.
pub fn preorder<G: Successors>(graph: &G, start: BlockId) -> Vec<BlockId> {
    let node_count = graph.node_count();
    if start.index() >= node_count {
        return Vec::new();
    }

    let mut visited = vec![false; node_count];
    let mut result = Vec::with_capacity(node_count);
    let mut stack = vec![start];

    while let Some(node) = stack.pop() {
        if visited[node.index()] {
            continue;
        }
        visited[node.index()] = true;
        result.push(node);

        // Push in reverse so the first successor is explored first
        let successors: Vec<BlockId> = graph.successors(node).collect();
        for &succ in successors.iter().rev() {
            if !visited[succ.index()] {
                stack.push(succ);
            }
        }
    }

    result
}

/// Depth-first post-order from `start`.
#[allow(clippy::items_after_statements)]
pub fn postorder<G: Successors>(graph: &G, start: BlockId) -> Vec<BlockId> {
    let node_count = graph.node_count();
    if start.index() >= node_count {
        return Vec::new();
    }

    let mut visited = vec![false; node_count];
    let mut result = Vec::with_capacity(node_count);

    #[derive(Clone, Copy)]
    enum State {
        Enter,
        Exit,
    }

    let mut stack = vec![(start, State::Enter)];

    while let Some((node, state)) = stack.pop() {
        match state {
            State::Enter => {
                if visited[node.index()] {
                    continue;
                }
                visited[node.index()] = true;
                stack.push((node, State::Exit));

                let successors: Vec<BlockId> = graph.successors(node).collect();
                for &succ in successors.iter().rev() {
                    if !visited[succ.index()] {
                        stack.push((succ, State::Enter));
                    }
                }
            }
            State::Exit => result.push(node),
        }
    }

    result
}

/// Reverse post-order from `start`; every node precedes its successors except along
/// back edges.
pub fn reverse_postorder<G: Successors>(graph: &G, start: BlockId) -> Vec<BlockId> {
    let mut result = postorder(graph, start);
    result.reverse();
    result
}

/// Reachability flags from `start`, indexed by node.
pub fn reachable<G: Successors>(graph: &G, start: BlockId) -> Vec<bool> {
    let mut flags = vec![false; graph.node_count()];
    for node in preorder(graph, start) {
        flags[node.index()] = true;
    }
    flags
}
