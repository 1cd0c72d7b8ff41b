//! Expression tree intermediate representation.
//!
//! Method bodies are lowered into statements, each the root of a small expression tree.
//! All nodes live in one [`Tree`] arena per method and refer to each other through
//! [`NodeId`] handles: children by handle, parents by a back-link that is maintained by
//! the arena itself. Ownership only changes through the arena's constructors,
//! [`Tree::replace`] and [`Tree::cleanup`], so a node can never have two parents.
//!
//! # Key Components
//!
//! - [`Tree`] - Node arena with parent links, deep cloning and cleanup
//! - [`Node`], [`Expr`], [`Stmt`], [`PhiStmt`] - The closed variant set
//! - [`TreeVisitor`] - Double-dispatch visitor with category fallbacks
//! - [`ExprKey`] - Structural equality and hashing wrapper for expressions
//!
//! # Examples
//!
//! ```rust
//! use classscope::{classfile::Type, tree::{ArithOp, Constant, Tree}};
//!
//! let mut tree = Tree::new();
//! let x = tree.new_local(1, Type::Int);
//! let one = tree.new_constant(Constant::Int(1));
//! let sum = tree.new_arith(ArithOp::Add, x, one, Type::Int)?;
//! let target = tree.new_local(1, Type::Int);
//! let store = tree.new_store(target, sum)?;
//!
//! assert_eq!(tree.display(store).to_string(), "l1 := (l1 + 1)");
//! assert_eq!(tree.parent(one)?, Some(sum));
//! # Ok::<(), classscope::Error>(())
//! ```

mod display;
mod equality;
mod expr;
mod node;
mod phi;
mod stmt;
mod visitor;

pub use display::NodeDisplay;
pub use equality::ExprKey;
pub use expr::{ArithExpr, ArithOp, Constant, ConstantExpr, VarExpr, VarKey};
pub use node::{Expr, Node, NodeId, PhiKind, PhiStmt, Stmt};
pub use stmt::{
    AddressStoreStmt, ExprStmt, PhiCatchStmt, PhiJoinStmt, PhiReturnStmt, ReturnExprStmt,
    StackManipKind, StackManipStmt, StoreStmt,
};
pub use visitor::{Direction, TreeVisitor};

use crate::{tree::node::NodeData, utils::graph::BlockId, Error, Result};

/// Arena owning every node of one method body.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<NodeData>,
}

impl Tree {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Tree { nodes: Vec::new() }
    }

    /// Number of node slots ever allocated, including cleaned up ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no node was ever allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes that have not been cleaned up.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.nodes.iter().filter(|data| data.valid).count()
    }

    pub(crate) fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(NodeData::new(node));
        id
    }

    pub(crate) fn data(&self, id: NodeId) -> Result<&NodeData> {
        match self.nodes.get(id.index()) {
            Some(data) if data.valid => Ok(data),
            _ => Err(Error::InvalidNode(id)),
        }
    }

    pub(crate) fn data_mut(&mut self, id: NodeId) -> Result<&mut NodeData> {
        match self.nodes.get_mut(id.index()) {
            Some(data) if data.valid => Ok(data),
            _ => Err(Error::InvalidNode(id)),
        }
    }

    /// Returns `true` if `id` refers to a node that has not been cleaned up.
    #[must_use]
    pub fn is_valid(&self, id: NodeId) -> bool {
        self.nodes.get(id.index()).is_some_and(|data| data.valid)
    }

    /// The node behind `id`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidNode`] for cleaned up or unknown handles.
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        Ok(&self.data(id)?.node)
    }

    /// The expression behind `id`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidNode`] for dead handles and
    /// [`crate::Error::InvariantViolation`] if `id` is a statement.
    pub fn expr(&self, id: NodeId) -> Result<&Expr> {
        match self.node(id)? {
            Node::Expr(expr) => Ok(expr),
            Node::Stmt(_) => Err(invariant_error!("{} is a statement, not an expression", id)),
        }
    }

    /// The statement behind `id`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidNode`] for dead handles and
    /// [`crate::Error::InvariantViolation`] if `id` is an expression.
    pub fn stmt(&self, id: NodeId) -> Result<&Stmt> {
        match self.node(id)? {
            Node::Stmt(stmt) => Ok(stmt),
            Node::Expr(_) => Err(invariant_error!("{} is an expression, not a statement", id)),
        }
    }

    /// Returns `true` if `id` is a live statement.
    #[must_use]
    pub fn is_stmt(&self, id: NodeId) -> bool {
        matches!(self.node(id), Ok(Node::Stmt(_)))
    }

    /// The parent of `id`, `None` for roots.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidNode`] for dead handles.
    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.data(id)?.parent)
    }

    /// The root of the tree containing `id`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidNode`] for dead handles.
    pub fn root(&self, id: NodeId) -> Result<NodeId> {
        let mut current = id;
        while let Some(parent) = self.parent(current)? {
            current = parent;
        }
        Ok(current)
    }

    /// The statement enclosing `id`, or `id` itself if it is a statement.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidNode`] for dead handles.
    pub fn stmt_of(&self, id: NodeId) -> Result<Option<NodeId>> {
        let root = self.root(id)?;
        Ok(self.is_stmt(root).then_some(root))
    }

    /// The block holding the statement that encloses `id`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidNode`] for dead handles.
    pub fn block_of(&self, id: NodeId) -> Result<Option<BlockId>> {
        let root = self.root(id)?;
        Ok(self.data(root)?.block)
    }

    pub(crate) fn set_block(&mut self, stmt: NodeId, block: Option<BlockId>) -> Result<()> {
        self.data_mut(stmt)?.block = block;
        Ok(())
    }

    /// Children of `id` in declaration order.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidNode`] for dead handles.
    pub fn children(&self, id: NodeId) -> Result<Vec<NodeId>> {
        Ok(child_slots(&self.data(id)?.node))
    }

    /// Fails unless `child` is a live, parentless expression outside any block.
    pub(crate) fn check_detached(&self, child: NodeId) -> Result<()> {
        let data = self.data(child)?;
        if matches!(data.node, Node::Stmt(_)) {
            return Err(invariant_error!("Statement {} cannot be used as a child", child));
        }
        if let Some(parent) = data.parent {
            return Err(invariant_error!(
                "{} already belongs to {}; clone it or detach it first",
                child,
                parent
            ));
        }
        Ok(())
    }

    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_detached(child)?;
        self.data_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Allocate `node` and take ownership of all of its children.
    pub(crate) fn alloc_with_children(&mut self, node: Node) -> Result<NodeId> {
        let children = child_slots(&node);
        for (i, child) in children.iter().enumerate() {
            self.check_detached(*child)?;
            if children[..i].contains(child) {
                return Err(invariant_error!("{} used twice as a child", child));
            }
        }

        let id = self.alloc(node);
        for child in children {
            self.attach(id, child)?;
        }
        Ok(id)
    }

    /// Put `new` in the place of `old` within `old`'s parent, then clean up `old`.
    ///
    /// If `old` was a variable definition, `new` must be a variable and becomes a
    /// definition.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if `old` has no parent or `new` is
    /// already owned, and [`crate::Error::InvalidNode`] for dead handles.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<()> {
        let parent = self
            .parent(old)?
            .ok_or_else(|| invariant_error!("{} has no parent to be replaced in", old))?;
        self.check_detached(new)?;

        let old_is_def = self.var(old).is_ok_and(|var| var.is_def);
        if old_is_def {
            self.var_mut(new)?.is_def = true;
        }

        let data = self.data_mut(parent)?;
        for slot in child_slots_mut(&mut data.node) {
            if *slot == old {
                *slot = new;
            }
        }
        self.data_mut(new)?.parent = Some(parent);
        self.data_mut(old)?.parent = None;
        self.cleanup(old)
    }

    /// Detach `id` from its parent and invalidate it and its whole subtree.
    ///
    /// The parent's reference is not rewritten; callers that keep the parent alive use
    /// [`Tree::replace`] instead. Use-to-definition links out of the subtree are cleared.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidNode`] if `id` is already dead.
    pub fn cleanup(&mut self, id: NodeId) -> Result<()> {
        self.data(id)?;

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let data = &mut self.nodes[current.index()];
            data.valid = false;
            data.parent = None;
            data.block = None;
            if let Node::Expr(Expr::Local(var) | Expr::Stack(var)) = &mut data.node {
                var.def = None;
            }

            for child in child_slots(&data.node) {
                if self
                    .nodes
                    .get(child.index())
                    .is_some_and(|c| c.valid && c.parent == Some(current))
                {
                    stack.push(child);
                }
            }
        }
        Ok(())
    }

    /// Deep-copy the subtree rooted at `id`.
    ///
    /// The copy has no parent and no block. Variable uses keep pointing at the same
    /// definitions as the originals.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidNode`] if `id` or a descendant is dead.
    pub fn clone_subtree(&mut self, id: NodeId) -> Result<NodeId> {
        let mut node = self.data(id)?.node.clone();
        for slot in child_slots_mut(&mut node) {
            *slot = self.clone_subtree(*slot)?;
        }

        let children = child_slots(&node);
        let copy = self.alloc(node);
        for child in children {
            self.data_mut(child)?.parent = Some(copy);
        }
        Ok(copy)
    }
}

pub(crate) fn child_slots(node: &Node) -> Vec<NodeId> {
    match node {
        Node::Expr(Expr::Arith(arith)) => vec![arith.left, arith.right],
        Node::Expr(_) => Vec::new(),
        Node::Stmt(stmt) => match stmt {
            Stmt::Expr(s) => vec![s.expr],
            Stmt::Store(s) => vec![s.target, s.value],
            Stmt::StackManip(s) => s.target.iter().chain(s.source.iter()).copied().collect(),
            Stmt::ReturnExpr(s) => vec![s.expr],
            Stmt::Return | Stmt::AddressStore(_) => Vec::new(),
            Stmt::Phi(PhiStmt::Join(phi)) => std::iter::once(phi.target)
                .chain(phi.operands.iter().map(|(_, op)| *op))
                .collect(),
            Stmt::Phi(PhiStmt::Catch(phi)) => std::iter::once(phi.target)
                .chain(phi.operands.iter().copied())
                .collect(),
            Stmt::Phi(PhiStmt::Return(phi)) => std::iter::once(phi.target)
                .chain(phi.operands.iter().map(|(_, op)| *op))
                .collect(),
        },
    }
}

fn child_slots_mut(node: &mut Node) -> Vec<&mut NodeId> {
    match node {
        Node::Expr(Expr::Arith(arith)) => vec![&mut arith.left, &mut arith.right],
        Node::Expr(_) => Vec::new(),
        Node::Stmt(stmt) => match stmt {
            Stmt::Expr(s) => vec![&mut s.expr],
            Stmt::Store(s) => vec![&mut s.target, &mut s.value],
            Stmt::StackManip(s) => s.target.iter_mut().chain(s.source.iter_mut()).collect(),
            Stmt::ReturnExpr(s) => vec![&mut s.expr],
            Stmt::Return | Stmt::AddressStore(_) => Vec::new(),
            Stmt::Phi(PhiStmt::Join(phi)) => std::iter::once(&mut phi.target)
                .chain(phi.operands.iter_mut().map(|(_, op)| op))
                .collect(),
            Stmt::Phi(PhiStmt::Catch(phi)) => std::iter::once(&mut phi.target)
                .chain(phi.operands.iter_mut())
                .collect(),
            Stmt::Phi(PhiStmt::Return(phi)) => std::iter::once(&mut phi.target)
                .chain(phi.operands.iter_mut().map(|(_, op)| op))
                .collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::Type;

    fn sample(tree: &mut Tree) -> (NodeId, NodeId, NodeId, NodeId) {
        let x = tree.new_local(2, Type::Int);
        let c = tree.new_constant(Constant::Int(7));
        let mul = tree.new_arith(ArithOp::Mul, x, c, Type::Int).unwrap();
        let stmt = tree.new_expr_stmt(mul).unwrap();
        (stmt, mul, x, c)
    }

    #[test]
    fn test_parent_links() {
        let mut tree = Tree::new();
        let (stmt, mul, x, c) = sample(&mut tree);

        assert_eq!(tree.parent(x).unwrap(), Some(mul));
        assert_eq!(tree.parent(c).unwrap(), Some(mul));
        assert_eq!(tree.parent(mul).unwrap(), Some(stmt));
        assert_eq!(tree.parent(stmt).unwrap(), None);
        assert_eq!(tree.root(x).unwrap(), stmt);
        assert_eq!(tree.stmt_of(c).unwrap(), Some(stmt));
        assert_eq!(tree.children(mul).unwrap(), vec![x, c]);
        assert_eq!(tree.block_of(x).unwrap(), None);
    }

    #[test]
    fn test_second_owner_rejected() {
        let mut tree = Tree::new();
        let (_, _, x, _) = sample(&mut tree);
        let other = tree.new_constant(Constant::Int(1));

        let result = tree.new_arith(ArithOp::Add, x, other, Type::Int);
        assert!(matches!(result, Err(Error::InvariantViolation { .. })));
        // The failed constructor must not steal the free operand
        assert_eq!(tree.parent(other).unwrap(), None);
    }

    #[test]
    fn test_same_child_twice_rejected() {
        let mut tree = Tree::new();
        let x = tree.new_local(0, Type::Int);
        let result = tree.new_arith(ArithOp::Add, x, x, Type::Int);
        assert!(matches!(result, Err(Error::InvariantViolation { .. })));
    }

    #[test]
    fn test_statement_as_child_rejected() {
        let mut tree = Tree::new();
        let ret = tree.new_return();
        let result = tree.new_expr_stmt(ret);
        assert!(matches!(result, Err(Error::InvariantViolation { .. })));
    }

    #[test]
    fn test_cleanup_invalidates_subtree() {
        let mut tree = Tree::new();
        let (stmt, mul, x, c) = sample(&mut tree);
        let live = tree.live_count();

        tree.cleanup(mul).unwrap();
        assert!(!tree.is_valid(mul));
        assert!(!tree.is_valid(x));
        assert!(!tree.is_valid(c));
        assert!(tree.is_valid(stmt));
        assert_eq!(tree.live_count(), live - 3);
        assert!(matches!(tree.node(x), Err(Error::InvalidNode(_))));
        assert!(matches!(tree.cleanup(mul), Err(Error::InvalidNode(_))));
    }

    #[test]
    fn test_replace() {
        let mut tree = Tree::new();
        let (_, mul, x, c) = sample(&mut tree);
        let eight = tree.new_constant(Constant::Int(8));

        tree.replace(c, eight).unwrap();
        assert_eq!(tree.children(mul).unwrap(), vec![x, eight]);
        assert_eq!(tree.parent(eight).unwrap(), Some(mul));
        assert!(!tree.is_valid(c));
    }

    #[test]
    fn test_replace_root_rejected() {
        let mut tree = Tree::new();
        let (stmt, ..) = sample(&mut tree);
        let ret = tree.new_return();
        assert!(matches!(
            tree.replace(stmt, ret),
            Err(Error::InvariantViolation { .. })
        ));
    }

    #[test]
    fn test_replace_store_target_keeps_def() {
        let mut tree = Tree::new();
        let target = tree.new_local(1, Type::Int);
        let value = tree.new_constant(Constant::Int(3));
        let store = tree.new_store(target, value).unwrap();
        let other = tree.new_local(4, Type::Int);

        tree.replace(target, other).unwrap();
        assert!(tree.is_def(other).unwrap());
        assert_eq!(tree.children(store).unwrap(), vec![other, value]);
    }

    #[test]
    fn test_clone_subtree_is_independent() {
        let mut tree = Tree::new();
        let (stmt, mul, ..) = sample(&mut tree);

        let copy = tree.clone_subtree(stmt).unwrap();
        assert_ne!(copy, stmt);
        assert_eq!(tree.parent(copy).unwrap(), None);

        let copied_mul = tree.children(copy).unwrap()[0];
        assert_ne!(copied_mul, mul);
        assert_eq!(tree.parent(copied_mul).unwrap(), Some(copy));
        assert!(tree.equals_expr(copied_mul, mul));

        // Editing the copy leaves the original alone
        let copied_const = tree.children(copied_mul).unwrap()[1];
        let nine = tree.new_constant(Constant::Int(9));
        tree.replace(copied_const, nine).unwrap();
        assert!(!tree.equals_expr(copied_mul, mul));
        assert_eq!(tree.display(stmt).to_string(), "eval (l2 * 7)");
        assert_eq!(tree.display(copy).to_string(), "eval (l2 * 9)");
    }
}
