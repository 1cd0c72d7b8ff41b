//! The control flow graph of one method body.

use std::{fmt::Write, sync::OnceLock};

use crate::{
    analysis::cfg::{Block, EdgeKind, Handler, Subroutine, SubroutineId},
    classfile::{ExceptionTable, Type},
    tree::{Direction, NodeId, Tree, TreeVisitor},
    utils::{
        escape_dot,
        graph::{
            algorithms::{self, DominatorTree},
            BlockId, DirectedGraph, GraphBase, Predecessors, RootedGraph, Successors,
        },
    },
    Error, Result,
};

/// Identifies one shape of a [`FlowGraph`].
///
/// Per-block data that is laid out by pre-order index stays valid only as long as the
/// stamp it was built against matches [`FlowGraph::stamp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphStamp {
    /// Incremented on every structural edit
    pub version: u64,
    /// Number of blocks at the time of the snapshot
    pub block_count: usize,
}

/// Depth-first numbering of all blocks.
#[derive(Debug, Clone)]
struct PreOrder {
    order: Vec<BlockId>,
    index: Vec<usize>,
}

/// A control flow graph of basic blocks holding expression trees.
///
/// The graph owns the [`Tree`] arena of its method, the blocks with their statement
/// lists, the exception handlers and the subroutines. Successor and predecessor lists
/// keep insertion order so every traversal is reproducible.
///
/// # Lazy Computation
///
/// Pre-order numbering, the dominator tree and the dominance frontiers are computed on
/// first access and cached. Every edit of the block or edge set drops the caches and
/// advances the [`GraphStamp`]; statement edits leave them alone.
///
/// # Examples
///
/// ```rust
/// use classscope::analysis::cfg::FlowGraph;
///
/// let mut cfg = FlowGraph::new(0);
/// let entry = cfg.entry();
/// let left = cfg.add_block(4);
/// let right = cfg.add_block(8);
/// let join = cfg.add_block(12);
/// cfg.add_edge(entry, left)?;
/// cfg.add_edge(entry, right)?;
/// cfg.add_edge(left, join)?;
/// cfg.add_edge(right, join)?;
///
/// assert_eq!(cfg.preds(join).collect::<Vec<_>>(), vec![left, right]);
/// assert_eq!(cfg.dominators().immediate_dominator(join), Some(entry));
/// assert_eq!(cfg.dominance_frontiers()[left.index()], vec![join]);
/// # Ok::<(), classscope::Error>(())
/// ```
#[derive(Debug)]
pub struct FlowGraph {
    tree: Tree,
    graph: DirectedGraph<Block, EdgeKind>,
    entry: BlockId,
    handlers: Vec<Handler>,
    subroutines: Vec<Subroutine>,
    version: u64,
    pre_order: OnceLock<PreOrder>,
    dominators: OnceLock<DominatorTree>,
    dominance_frontiers: OnceLock<Vec<Vec<BlockId>>>,
}

impl FlowGraph {
    /// Create a graph consisting of an empty entry block at `entry_label`.
    #[must_use]
    pub fn new(entry_label: u32) -> Self {
        let mut graph = DirectedGraph::new();
        let entry = graph.add_node(Block::new(entry_label));
        FlowGraph {
            tree: Tree::new(),
            graph,
            entry,
            handlers: Vec::new(),
            subroutines: Vec::new(),
            version: 0,
            pre_order: OnceLock::new(),
            dominators: OnceLock::new(),
            dominance_frontiers: OnceLock::new(),
        }
    }

    fn invalidate(&mut self) {
        self.version += 1;
        self.pre_order = OnceLock::new();
        self.dominators = OnceLock::new();
        self.dominance_frontiers = OnceLock::new();
    }

    fn check_block(&self, block: BlockId) -> Result<()> {
        if self.graph.contains_node(block) {
            Ok(())
        } else {
            Err(Error::ForeignBlock(block))
        }
    }

    /// The node arena of this method.
    #[must_use]
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Mutable access to the node arena.
    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    /// The entry block.
    #[must_use]
    pub const fn entry(&self) -> BlockId {
        self.entry
    }

    /// Number of blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns `true` if `block` belongs to this graph.
    #[must_use]
    pub fn contains_block(&self, block: BlockId) -> bool {
        self.graph.contains_node(block)
    }

    /// The block behind `block`, `None` for foreign handles.
    #[must_use]
    pub fn block(&self, block: BlockId) -> Option<&Block> {
        self.graph.node(block)
    }

    /// All block handles in creation order.
    pub fn blocks(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.graph.node_ids()
    }

    /// The block whose label is `label`.
    #[must_use]
    pub fn block_at_label(&self, label: u32) -> Option<BlockId> {
        self.graph
            .nodes()
            .find(|(_, block)| block.label == label)
            .map(|(id, _)| id)
    }

    /// Add an empty block starting at bytecode offset `label`.
    pub fn add_block(&mut self, label: u32) -> BlockId {
        let id = self.graph.add_node(Block::new(label));
        self.invalidate();
        id
    }

    /// Add a normal edge `from -> to`. Returns `false` if the edge already existed.
    ///
    /// # Errors
    /// Returns [`Error::ForeignBlock`] if either block does not belong to the graph.
    pub fn add_edge(&mut self, from: BlockId, to: BlockId) -> Result<bool> {
        self.add_edge_kind(from, to, EdgeKind::Normal)
    }

    /// Add an edge of the given kind. Duplicate edges are ignored and keep their
    /// original kind.
    ///
    /// # Errors
    /// Returns [`Error::ForeignBlock`] if either block does not belong to the graph.
    pub fn add_edge_kind(&mut self, from: BlockId, to: BlockId, kind: EdgeKind) -> Result<bool> {
        self.check_block(from)?;
        self.check_block(to)?;
        let added = self.graph.add_edge(from, to, kind)?;
        if added {
            self.invalidate();
        }
        Ok(added)
    }

    /// Remove the edge `from -> to`, returning its kind.
    pub fn remove_edge(&mut self, from: BlockId, to: BlockId) -> Option<EdgeKind> {
        let kind = self.graph.remove_edge(from, to)?;
        self.invalidate();
        Some(kind)
    }

    /// The kind of the edge `from -> to`.
    #[must_use]
    pub fn edge_kind(&self, from: BlockId, to: BlockId) -> Option<EdgeKind> {
        self.graph.edge(from, to).copied()
    }

    /// Successors of `block` in insertion order.
    pub fn succs(&self, block: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        self.graph.successors(block)
    }

    /// Predecessors of `block` in insertion order.
    pub fn preds(&self, block: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        self.graph.predecessors(block)
    }

    /// The statements of `block`; empty for foreign handles.
    #[must_use]
    pub fn stmts(&self, block: BlockId) -> &[NodeId] {
        self.graph.node(block).map(Block::stmts).unwrap_or_default()
    }

    fn check_placeable(&self, stmt: NodeId) -> Result<()> {
        if !self.tree.is_stmt(stmt) {
            return Err(invariant_error!("{} is not a live statement", stmt));
        }
        if let Some(block) = self.tree.block_of(stmt)? {
            return Err(invariant_error!("{} is already placed in {}", stmt, block));
        }
        Ok(())
    }

    fn leading_phis(&self, block: BlockId) -> usize {
        self.stmts(block)
            .iter()
            .take_while(|stmt| self.tree.phi_kind(**stmt).is_some())
            .count()
    }

    /// Append `stmt` to the end of `block`.
    ///
    /// # Errors
    /// Returns [`Error::ForeignBlock`] for foreign blocks and
    /// [`Error::InvariantViolation`] if `stmt` is not a free statement.
    pub fn append_stmt(&mut self, block: BlockId, stmt: NodeId) -> Result<()> {
        let index = self.stmts(block).len();
        self.insert_stmt(block, index, stmt)
    }

    /// Insert `stmt` at the head of `block`, after any phi statements.
    ///
    /// # Errors
    /// Same as [`FlowGraph::append_stmt`].
    pub fn prepend_stmt(&mut self, block: BlockId, stmt: NodeId) -> Result<()> {
        let index = self.leading_phis(block);
        self.insert_stmt(block, index, stmt)
    }

    /// Insert `stmt` at position `index` of `block`.
    ///
    /// # Errors
    /// Same as [`FlowGraph::append_stmt`]; an index past the end is
    /// [`Error::OutOfBounds`].
    pub fn insert_stmt(&mut self, block: BlockId, index: usize, stmt: NodeId) -> Result<()> {
        self.check_block(block)?;
        self.check_placeable(stmt)?;

        let data = self
            .graph
            .node_mut(block)
            .ok_or(Error::ForeignBlock(block))?;
        if index > data.stmts.len() {
            return Err(Error::OutOfBounds);
        }
        data.stmts.insert(index, stmt);
        self.tree.set_block(stmt, Some(block))
    }

    /// Take `stmt` out of its block without invalidating it. Returns the block.
    ///
    /// # Errors
    /// Returns [`Error::InvariantViolation`] if `stmt` is not placed in a block.
    pub fn remove_stmt(&mut self, stmt: NodeId) -> Result<BlockId> {
        let block = self
            .tree
            .block_of(stmt)?
            .ok_or_else(|| invariant_error!("{} is not placed in a block", stmt))?;

        let data = self
            .graph
            .node_mut(block)
            .ok_or(Error::ForeignBlock(block))?;
        data.stmts.retain(|s| *s != stmt);
        self.tree.set_block(stmt, None)?;
        Ok(block)
    }

    /// Remove `node` from its block if it is a placed statement, then clean it up
    /// together with its subtree.
    ///
    /// # Errors
    /// Returns [`Error::InvalidNode`] if `node` is already dead.
    pub fn cleanup_node(&mut self, node: NodeId) -> Result<()> {
        if self.tree.is_stmt(node) && self.tree.block_of(node)?.is_some() {
            self.remove_stmt(node)?;
        }
        self.tree.cleanup(node)
    }

    fn pre_order_data(&self) -> &PreOrder {
        self.pre_order.get_or_init(|| {
            let mut order = algorithms::preorder(self, self.entry);
            let mut index = vec![usize::MAX; self.graph.node_count()];
            for (position, block) in order.iter().enumerate() {
                index[block.index()] = position;
            }
            for block in self.graph.node_ids() {
                if index[block.index()] == usize::MAX {
                    index[block.index()] = order.len();
                    order.push(block);
                }
            }
            PreOrder { order, index }
        })
    }

    /// All blocks in depth-first pre-order from the entry, followed by unreachable
    /// blocks in creation order.
    #[must_use]
    pub fn pre_order(&self) -> &[BlockId] {
        &self.pre_order_data().order
    }

    /// Dense pre-order number of `block`.
    ///
    /// # Errors
    /// Returns [`Error::ForeignBlock`] if `block` does not belong to the graph.
    pub fn pre_order_index(&self, block: BlockId) -> Result<usize> {
        self.check_block(block)?;
        self.pre_order_data()
            .index
            .get(block.index())
            .copied()
            .ok_or(Error::ForeignBlock(block))
    }

    /// Returns `true` if `block` is reachable from the entry.
    #[must_use]
    pub fn is_reachable(&self, block: BlockId) -> bool {
        self.dominators().is_reachable(block)
    }

    /// The current shape of the graph.
    #[must_use]
    pub fn stamp(&self) -> GraphStamp {
        GraphStamp {
            version: self.version,
            block_count: self.graph.node_count(),
        }
    }

    /// Fails if the graph changed shape since `stamp` was taken.
    ///
    /// # Errors
    /// Returns [`Error::StaleGraph`] on mismatch.
    pub fn check_stamp(&self, stamp: GraphStamp) -> Result<()> {
        if self.stamp() == stamp {
            Ok(())
        } else {
            Err(Error::StaleGraph)
        }
    }

    /// The dominator tree, computed on first access.
    #[must_use]
    pub fn dominators(&self) -> &DominatorTree {
        self.dominators
            .get_or_init(|| algorithms::compute_dominators(self))
    }

    /// The dominance frontier of every block, indexed by [`BlockId::index`].
    #[must_use]
    pub fn dominance_frontiers(&self) -> &[Vec<BlockId>] {
        self.dominance_frontiers
            .get_or_init(|| algorithms::compute_dominance_frontiers(self, self.dominators()))
    }

    /// Register an exception handler and add exception edges from every protected block
    /// to `catch_block`. Returns the handler's index.
    ///
    /// # Errors
    /// Returns [`Error::ForeignBlock`] if a block does not belong to the graph.
    pub fn add_handler(
        &mut self,
        protected: Vec<BlockId>,
        catch_block: BlockId,
        catch_type: Option<Type>,
    ) -> Result<usize> {
        self.check_block(catch_block)?;
        for &block in &protected {
            self.check_block(block)?;
        }
        for &block in &protected {
            self.add_edge_kind(block, catch_block, EdgeKind::Exception)?;
        }

        self.handlers.push(Handler {
            protected,
            catch_block,
            catch_type,
        });
        Ok(self.handlers.len() - 1)
    }

    /// Map the entries of a `Code` attribute's exception table onto blocks.
    ///
    /// Each entry protects the blocks whose label lies in `[start_pc, end_pc)` and
    /// transfers to the block labelled `handler_pc`. `resolve` turns a non-zero
    /// constant pool index into the caught class.
    ///
    /// Every entry is resolved before any handler is registered, so a failing entry
    /// leaves the graph unchanged.
    ///
    /// # Errors
    /// Returns [`Error::GraphError`] if the handler offset does not start a block or no
    /// block lies in the protected range, and whatever `resolve` fails with.
    pub fn add_exception_table<F>(&mut self, table: &ExceptionTable, mut resolve: F) -> Result<()>
    where
        F: FnMut(u16) -> Result<Type>,
    {
        let mut staged = Vec::with_capacity(table.entries().len());
        for catch in table.entries() {
            let catch_block = self
                .block_at_label(u32::from(catch.handler_pc))
                .ok_or_else(|| {
                    Error::GraphError(format!(
                        "Handler offset {} does not start a block",
                        catch.handler_pc
                    ))
                })?;

            let protected: Vec<BlockId> = self
                .graph
                .nodes()
                .filter(|(_, block)| catch.protects(block.label))
                .map(|(id, _)| id)
                .collect();
            if protected.is_empty() {
                return Err(Error::GraphError(format!(
                    "No block starts in protected range {}..{}",
                    catch.start_pc, catch.end_pc
                )));
            }

            let catch_type = if catch.is_catch_all() {
                None
            } else {
                Some(resolve(catch.catch_type)?)
            };
            staged.push((protected, catch_block, catch_type));
        }

        for (protected, catch_block, catch_type) in staged {
            self.add_handler(protected, catch_block, catch_type)?;
        }
        Ok(())
    }

    /// All exception handlers in registration order.
    #[must_use]
    pub fn handlers(&self) -> &[Handler] {
        &self.handlers
    }

    /// Handlers covering `block`.
    pub fn handlers_protecting(&self, block: BlockId) -> impl Iterator<Item = &Handler> + '_ {
        self.handlers.iter().filter(move |h| h.protects(block))
    }

    /// Distinct handler entry blocks, in registration order.
    #[must_use]
    pub fn catch_blocks(&self) -> Vec<BlockId> {
        let mut blocks = Vec::with_capacity(self.handlers.len());
        for handler in &self.handlers {
            if !blocks.contains(&handler.catch_block) {
                blocks.push(handler.catch_block);
            }
        }
        blocks
    }

    /// Register a subroutine starting at `entry`.
    ///
    /// # Errors
    /// Returns [`Error::ForeignBlock`] for foreign blocks and
    /// [`Error::SubroutineConflict`] if another subroutine already starts there.
    pub fn add_subroutine(&mut self, entry: BlockId) -> Result<SubroutineId> {
        self.check_block(entry)?;
        if self.subroutines.iter().any(|sub| sub.entry == entry) {
            return Err(Error::SubroutineConflict(entry));
        }

        let id = SubroutineId::new(self.subroutines.len());
        self.subroutines.push(Subroutine::new(id, entry));
        Ok(id)
    }

    fn subroutine_mut(&mut self, sub: SubroutineId) -> Result<&mut Subroutine> {
        self.subroutines
            .get_mut(sub.index())
            .ok_or_else(|| invariant_error!("Unknown subroutine {}", sub))
    }

    /// Set the block of `sub` that ends in `ret` and add the return edges of all known
    /// paths.
    ///
    /// # Errors
    /// Returns [`Error::ForeignBlock`] for foreign blocks,
    /// [`Error::InvariantViolation`] for unknown subroutines and
    /// [`Error::SubroutineConflict`] if a different exit was already set.
    pub fn set_subroutine_exit(&mut self, sub: SubroutineId, exit: BlockId) -> Result<()> {
        self.check_block(exit)?;
        let subroutine = self.subroutine_mut(sub)?;
        match subroutine.exit {
            Some(current) if current != exit => return Err(Error::SubroutineConflict(exit)),
            _ => subroutine.exit = Some(exit),
        }

        let returns = subroutine.return_blocks();
        for ret in returns {
            self.add_edge_kind(exit, ret, EdgeKind::SubroutineReturn)?;
        }
        Ok(())
    }

    /// Record that `call` invokes `sub` and control resumes at `ret` afterwards.
    ///
    /// Adds the call edge and, if the exit is known, the return edge. Adding the same
    /// path twice is a no-op.
    ///
    /// # Errors
    /// Returns [`Error::SubroutineConflict`] if `ret` is already the return block of a
    /// different call site or if the subroutine would call itself from its entry,
    /// [`Error::ForeignBlock`] for foreign blocks and [`Error::InvariantViolation`] for
    /// unknown subroutines.
    pub fn add_subroutine_call(
        &mut self,
        sub: SubroutineId,
        call: BlockId,
        ret: BlockId,
    ) -> Result<()> {
        self.check_block(call)?;
        self.check_block(ret)?;

        let conflict = self.subroutines.iter().any(|other| {
            other
                .paths
                .iter()
                .any(|(c, r)| *r == ret && (*c != call || other.id != sub))
        });
        if conflict {
            return Err(Error::SubroutineConflict(ret));
        }

        let subroutine = self.subroutine_mut(sub)?;
        if subroutine.entry == call {
            return Err(Error::SubroutineConflict(call));
        }
        if subroutine.paths.contains(&(call, ret)) {
            return Ok(());
        }
        subroutine.paths.push((call, ret));
        let (entry, exit) = (subroutine.entry, subroutine.exit);

        self.add_edge_kind(call, entry, EdgeKind::JsrCall)?;
        if let Some(exit) = exit {
            self.add_edge_kind(exit, ret, EdgeKind::SubroutineReturn)?;
        }
        Ok(())
    }

    /// The subroutine behind `sub`.
    #[must_use]
    pub fn subroutine(&self, sub: SubroutineId) -> Option<&Subroutine> {
        self.subroutines.get(sub.index())
    }

    /// All subroutines in registration order.
    #[must_use]
    pub fn subroutines(&self) -> &[Subroutine] {
        &self.subroutines
    }

    /// The materialized `(call, return)` path list of `sub`.
    ///
    /// # Errors
    /// Returns [`Error::InvariantViolation`] for unknown subroutines.
    pub fn paths(&self, sub: SubroutineId) -> Result<Vec<(BlockId, BlockId)>> {
        self.subroutine(sub)
            .map(|s| s.paths.clone())
            .ok_or_else(|| invariant_error!("Unknown subroutine {}", sub))
    }

    /// Visit every block, in pre-order or reverse pre-order depending on the visitor's
    /// direction.
    pub fn visit_children<V: TreeVisitor + ?Sized>(&self, visitor: &mut V) {
        let order = self.pre_order().to_vec();
        if visitor.direction() == Direction::Reverse {
            for block in order.into_iter().rev() {
                visitor.visit_block(self, block);
            }
        } else {
            for block in order {
                visitor.visit_block(self, block);
            }
        }
    }

    /// Visit the statements of `block` in the visitor's direction.
    pub fn visit_block_children<V: TreeVisitor + ?Sized>(&self, block: BlockId, visitor: &mut V) {
        let stmts = self.stmts(block);
        if visitor.direction() == Direction::Reverse {
            for &stmt in stmts.iter().rev() {
                self.tree.visit(stmt, visitor);
            }
        } else {
            for &stmt in stmts {
                self.tree.visit(stmt, visitor);
            }
        }
    }

    /// Render the graph in Graphviz DOT format, one record per block.
    #[must_use]
    pub fn to_dot(&self, title: Option<&str>) -> String {
        let mut dot = String::new();

        dot.push_str("digraph CFG {\n");
        if let Some(name) = title {
            let _ = writeln!(dot, "    label=\"CFG: {}\";", escape_dot(name));
        }
        dot.push_str("    labelloc=t;\n");
        dot.push_str("    node [shape=box, fontname=\"Courier\", fontsize=10];\n\n");

        for (id, block) in self.graph.nodes() {
            let mut label = format!("{id} @{}", block.label);
            if id == self.entry {
                label.push_str(" (entry)");
            }
            label.push_str("\\l");
            for &stmt in &block.stmts {
                let _ = write!(label, "{}\\l", escape_dot(&self.tree.display(stmt).to_string()));
            }

            let style = if id == self.entry {
                ", style=filled, fillcolor=lightgreen"
            } else if self.handlers.iter().any(|h| h.catch_block == id) {
                ", style=filled, fillcolor=lightyellow"
            } else {
                ""
            };
            let _ = writeln!(dot, "    {id} [label=\"{label}\"{style}];");
        }

        dot.push('\n');
        for (from, to, kind) in self.graph.edges() {
            let style = match kind {
                EdgeKind::Normal => "",
                EdgeKind::Exception => " [style=dashed, color=red]",
                EdgeKind::JsrCall | EdgeKind::SubroutineReturn => " [style=dotted, color=blue]",
            };
            let _ = writeln!(dot, "    {from} -> {to}{style};");
        }

        dot.push_str("}\n");
        dot
    }
}

impl GraphBase for FlowGraph {
    fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn node_ids(&self) -> impl Iterator<Item = BlockId> {
        self.graph.node_ids()
    }
}

impl Successors for FlowGraph {
    fn successors(&self, node: BlockId) -> impl Iterator<Item = BlockId> {
        self.graph.successors(node)
    }
}

impl Predecessors for FlowGraph {
    fn predecessors(&self, node: BlockId) -> impl Iterator<Item = BlockId> {
        self.graph.predecessors(node)
    }
}

impl RootedGraph for FlowGraph {
    fn entry(&self) -> BlockId {
        self.entry
    }
}
