//! Adjacency-list directed graph with typed node and edge payloads.
//!
//! [`DirectedGraph`] keeps, per node, an ordered list of outgoing edges and an ordered list
//! of incoming sources. Insertion order is preserved so traversal results are
//! deterministic. At most one edge exists between an ordered pair of nodes; adding a
//! second one is reported and ignored. Edges can be removed, nodes cannot, which keeps
//! every issued [`BlockId`] valid for the graph's lifetime.

use crate::{
    utils::graph::{
        node::BlockId,
        traits::{GraphBase, Predecessors, Successors},
    },
    Error, Result,
};

/// A directed graph storing `N` per node and `E` per edge.
#[derive(Debug, Clone)]
pub struct DirectedGraph<N, E> {
    nodes: Vec<N>,
    outgoing: Vec<Vec<(BlockId, E)>>,
    incoming: Vec<Vec<BlockId>>,
    edge_count: usize,
}

impl<N, E> Default for DirectedGraph<N, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N, E> DirectedGraph<N, E> {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        DirectedGraph {
            nodes: Vec::new(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
            edge_count: 0,
        }
    }

    /// Create an empty graph with room for `node_capacity` nodes.
    #[must_use]
    pub fn with_capacity(node_capacity: usize) -> Self {
        DirectedGraph {
            nodes: Vec::with_capacity(node_capacity),
            outgoing: Vec::with_capacity(node_capacity),
            incoming: Vec::with_capacity(node_capacity),
            edge_count: 0,
        }
    }

    /// Add a node and return its identifier.
    pub fn add_node(&mut self, data: N) -> BlockId {
        let id = BlockId::new(self.nodes.len());
        self.nodes.push(data);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        id
    }

    /// Payload of `node`.
    #[must_use]
    pub fn node(&self, node: BlockId) -> Option<&N> {
        self.nodes.get(node.index())
    }

    /// Mutable payload of `node`.
    pub fn node_mut(&mut self, node: BlockId) -> Option<&mut N> {
        self.nodes.get_mut(node.index())
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Returns `true` if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns `true` if `node` was issued by this graph.
    #[must_use]
    pub fn contains_node(&self, node: BlockId) -> bool {
        node.index() < self.nodes.len()
    }

    /// All node identifiers in index order.
    pub fn node_ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        (0..self.nodes.len()).map(BlockId::new)
    }

    /// All nodes with their payloads.
    pub fn nodes(&self) -> impl Iterator<Item = (BlockId, &N)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, data)| (BlockId::new(i), data))
    }

    /// Add an edge `source -> target`.
    ///
    /// Returns `Ok(false)` without touching the graph if the edge already exists.
    ///
    /// # Errors
    /// Returns [`crate::Error::GraphError`] if either endpoint does not exist.
    pub fn add_edge(&mut self, source: BlockId, target: BlockId, data: E) -> Result<bool> {
        if !self.contains_node(source) {
            return Err(Error::GraphError(format!(
                "source node {} does not exist in graph with {} nodes",
                source,
                self.nodes.len()
            )));
        }
        if !self.contains_node(target) {
            return Err(Error::GraphError(format!(
                "target node {} does not exist in graph with {} nodes",
                target,
                self.nodes.len()
            )));
        }
        if self.contains_edge(source, target) {
            return Ok(false);
        }

        self.outgoing[source.index()].push((target, data));
        self.incoming[target.index()].push(source);
        self.edge_count += 1;
        Ok(true)
    }

    /// Remove the edge `source -> target`, returning its payload.
    pub fn remove_edge(&mut self, source: BlockId, target: BlockId) -> Option<E> {
        let out = self.outgoing.get_mut(source.index())?;
        let position = out.iter().position(|(succ, _)| *succ == target)?;
        let (_, data) = out.remove(position);

        let inc = &mut self.incoming[target.index()];
        if let Some(position) = inc.iter().position(|pred| *pred == source) {
            inc.remove(position);
        }

        self.edge_count -= 1;
        Some(data)
    }

    /// Returns `true` if the edge `source -> target` exists.
    #[must_use]
    pub fn contains_edge(&self, source: BlockId, target: BlockId) -> bool {
        self.edge(source, target).is_some()
    }

    /// Payload of the edge `source -> target`.
    #[must_use]
    pub fn edge(&self, source: BlockId, target: BlockId) -> Option<&E> {
        self.outgoing
            .get(source.index())?
            .iter()
            .find(|(succ, _)| *succ == target)
            .map(|(_, data)| data)
    }

    /// All edges as `(source, target, payload)`, grouped by source.
    pub fn edges(&self) -> impl Iterator<Item = (BlockId, BlockId, &E)> + '_ {
        self.outgoing.iter().enumerate().flat_map(|(i, out)| {
            out.iter()
                .map(move |(target, data)| (BlockId::new(i), *target, data))
        })
    }

    /// Successors of `node` in insertion order.
    pub fn successors(&self, node: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        self.outgoing
            .get(node.index())
            .into_iter()
            .flatten()
            .map(|(succ, _)| *succ)
    }

    /// Predecessors of `node` in insertion order.
    pub fn predecessors(&self, node: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        self.incoming.get(node.index()).into_iter().flatten().copied()
    }

    /// Outgoing edges of `node` with their payloads.
    pub fn outgoing_edges(&self, node: BlockId) -> impl Iterator<Item = (BlockId, &E)> + '_ {
        self.outgoing
            .get(node.index())
            .into_iter()
            .flatten()
            .map(|(succ, data)| (*succ, data))
    }

    /// Number of outgoing edges.
    #[must_use]
    pub fn out_degree(&self, node: BlockId) -> usize {
        self.outgoing.get(node.index()).map_or(0, Vec::len)
    }

    /// Number of incoming edges.
    #[must_use]
    pub fn in_degree(&self, node: BlockId) -> usize {
        self.incoming.get(node.index()).map_or(0, Vec::len)
    }
}

impl<N, E> GraphBase for DirectedGraph<N, E> {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn node_ids(&self) -> impl Iterator<Item = BlockId> {
        (0..self.nodes.len()).map(BlockId::new)
    }
}

impl<N, E> Successors for DirectedGraph<N, E> {
    fn successors(&self, node: BlockId) -> impl Iterator<Item = BlockId> {
        DirectedGraph::successors(self, node)
    }
}

impl<N, E> Predecessors for DirectedGraph<N, E> {
    fn predecessors(&self, node: BlockId) -> impl Iterator<Item = BlockId> {
        DirectedGraph::predecessors(self, node)
    }
}
