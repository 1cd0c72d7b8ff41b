//! Double-dispatch traversal of trees and flow graphs.
//!
//! [`Tree::visit`] calls the [`TreeVisitor`] method for the exact variant of a node. Every
//! method falls back to the method of the enclosing category, so an implementation only
//! overrides what it cares about:
//!
//! ```text
//! visit_local_expr / visit_stack_expr -> visit_var_expr -> visit_mem_expr
//!     -> visit_def_expr -> visit_expr -> visit_node
//! visit_phi_join_stmt / visit_phi_catch_stmt / visit_phi_return_stmt
//!     -> visit_phi_stmt -> visit_stmt -> visit_node
//! ```
//!
//! [`TreeVisitor::visit_node`] descends into the children, in evaluation order for
//! [`Direction::Forward`] and the mirror image for [`Direction::Reverse`]. Returning `true`
//! from [`TreeVisitor::prune`] stops the descent below the current node.
//!
//! # Examples
//!
//! ```rust
//! use classscope::{classfile::Type, tree::{ArithOp, NodeId, Tree, TreeVisitor}};
//!
//! #[derive(Default)]
//! struct Locals(Vec<u16>);
//!
//! impl TreeVisitor for Locals {
//!     fn visit_local_expr(&mut self, tree: &Tree, id: NodeId) {
//!         if let Ok(var) = tree.var(id) {
//!             self.0.push(var.index());
//!         }
//!     }
//! }
//!
//! let mut tree = Tree::new();
//! let a = tree.new_local(1, Type::Int);
//! let b = tree.new_local(2, Type::Int);
//! let sum = tree.new_arith(ArithOp::Add, a, b, Type::Int)?;
//!
//! let mut locals = Locals::default();
//! tree.visit(sum, &mut locals);
//! assert_eq!(locals.0, vec![1, 2]);
//! # Ok::<(), classscope::Error>(())
//! ```

use crate::{
    analysis::cfg::FlowGraph,
    tree::{Expr, Node, NodeId, PhiStmt, Stmt, Tree},
    utils::graph::BlockId,
};

/// Order in which siblings, statements and blocks are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Evaluation order
    #[default]
    Forward,
    /// Reverse evaluation order
    Reverse,
}

/// Visitor over flow graphs, blocks, statements and expressions.
#[allow(unused_variables)]
pub trait TreeVisitor {
    /// Traversal direction.
    fn direction(&self) -> Direction {
        Direction::Forward
    }

    /// When `true`, [`Tree::visit_children`] does not descend.
    fn prune(&self) -> bool {
        false
    }

    /// Shorthand for `direction() == Direction::Reverse`.
    fn reverse(&self) -> bool {
        self.direction() == Direction::Reverse
    }

    /// Visit all blocks in pre-order (reversed for [`Direction::Reverse`]).
    fn visit_flow_graph(&mut self, cfg: &FlowGraph) {
        cfg.visit_children(self);
    }

    /// Visit the statements of `block`.
    fn visit_block(&mut self, cfg: &FlowGraph, block: BlockId) {
        cfg.visit_block_children(block, self);
    }

    /// Fallback for every node; descends into the children.
    fn visit_node(&mut self, tree: &Tree, id: NodeId) {
        tree.visit_children(id, self);
    }

    /// Fallback for statements.
    fn visit_stmt(&mut self, tree: &Tree, id: NodeId) {
        self.visit_node(tree, id);
    }

    /// Fallback for expressions.
    fn visit_expr(&mut self, tree: &Tree, id: NodeId) {
        self.visit_node(tree, id);
    }

    /// Expression statements.
    fn visit_expr_stmt(&mut self, tree: &Tree, id: NodeId) {
        self.visit_stmt(tree, id);
    }

    /// Stores.
    fn visit_store_stmt(&mut self, tree: &Tree, id: NodeId) {
        self.visit_stmt(tree, id);
    }

    /// Stack shuffles.
    fn visit_stack_manip_stmt(&mut self, tree: &Tree, id: NodeId) {
        self.visit_stmt(tree, id);
    }

    /// Returns with a value.
    fn visit_return_expr_stmt(&mut self, tree: &Tree, id: NodeId) {
        self.visit_stmt(tree, id);
    }

    /// Returns without a value.
    fn visit_return_stmt(&mut self, tree: &Tree, id: NodeId) {
        self.visit_stmt(tree, id);
    }

    /// Return address stores.
    fn visit_address_store_stmt(&mut self, tree: &Tree, id: NodeId) {
        self.visit_stmt(tree, id);
    }

    /// Fallback for the three phi kinds.
    fn visit_phi_stmt(&mut self, tree: &Tree, id: NodeId) {
        self.visit_stmt(tree, id);
    }

    /// Join phis.
    fn visit_phi_join_stmt(&mut self, tree: &Tree, id: NodeId) {
        self.visit_phi_stmt(tree, id);
    }

    /// Catch phis.
    fn visit_phi_catch_stmt(&mut self, tree: &Tree, id: NodeId) {
        self.visit_phi_stmt(tree, id);
    }

    /// Return phis.
    fn visit_phi_return_stmt(&mut self, tree: &Tree, id: NodeId) {
        self.visit_phi_stmt(tree, id);
    }

    /// Fallback for expressions that can be definitions.
    fn visit_def_expr(&mut self, tree: &Tree, id: NodeId) {
        self.visit_expr(tree, id);
    }

    /// Fallback for memory locations.
    fn visit_mem_expr(&mut self, tree: &Tree, id: NodeId) {
        self.visit_def_expr(tree, id);
    }

    /// Fallback for local and stack variables.
    fn visit_var_expr(&mut self, tree: &Tree, id: NodeId) {
        self.visit_mem_expr(tree, id);
    }

    /// Local variables.
    fn visit_local_expr(&mut self, tree: &Tree, id: NodeId) {
        self.visit_var_expr(tree, id);
    }

    /// Stack variables.
    fn visit_stack_expr(&mut self, tree: &Tree, id: NodeId) {
        self.visit_var_expr(tree, id);
    }

    /// Literals.
    fn visit_constant_expr(&mut self, tree: &Tree, id: NodeId) {
        self.visit_expr(tree, id);
    }

    /// Binary operations.
    fn visit_arith_expr(&mut self, tree: &Tree, id: NodeId) {
        self.visit_expr(tree, id);
    }

    /// Return addresses.
    fn visit_return_address_expr(&mut self, tree: &Tree, id: NodeId) {
        self.visit_expr(tree, id);
    }
}

impl Tree {
    /// Dispatch `visitor` on the variant of `id`. Dead nodes are skipped.
    pub fn visit<V: TreeVisitor + ?Sized>(&self, id: NodeId, visitor: &mut V) {
        let Ok(node) = self.node(id) else {
            return;
        };

        match node {
            Node::Expr(expr) => match expr {
                Expr::Local(_) => visitor.visit_local_expr(self, id),
                Expr::Stack(_) => visitor.visit_stack_expr(self, id),
                Expr::Constant(_) => visitor.visit_constant_expr(self, id),
                Expr::Arith(_) => visitor.visit_arith_expr(self, id),
                Expr::ReturnAddress => visitor.visit_return_address_expr(self, id),
            },
            Node::Stmt(stmt) => match stmt {
                Stmt::Expr(_) => visitor.visit_expr_stmt(self, id),
                Stmt::Store(_) => visitor.visit_store_stmt(self, id),
                Stmt::StackManip(_) => visitor.visit_stack_manip_stmt(self, id),
                Stmt::ReturnExpr(_) => visitor.visit_return_expr_stmt(self, id),
                Stmt::Return => visitor.visit_return_stmt(self, id),
                Stmt::AddressStore(_) => visitor.visit_address_store_stmt(self, id),
                Stmt::Phi(PhiStmt::Join(_)) => visitor.visit_phi_join_stmt(self, id),
                Stmt::Phi(PhiStmt::Catch(_)) => visitor.visit_phi_catch_stmt(self, id),
                Stmt::Phi(PhiStmt::Return(_)) => visitor.visit_phi_return_stmt(self, id),
            },
        }
    }

    /// Visit the children of `id` unless the visitor prunes.
    pub fn visit_children<V: TreeVisitor + ?Sized>(&self, id: NodeId, visitor: &mut V) {
        if !visitor.prune() {
            self.visit_force_children(id, visitor);
        }
    }

    /// Visit the children of `id` regardless of pruning.
    pub fn visit_force_children<V: TreeVisitor + ?Sized>(&self, id: NodeId, visitor: &mut V) {
        for child in self.visit_order(id, visitor.direction()) {
            self.visit(child, visitor);
        }
    }

    /// Children of `id` in visiting order for `direction`.
    ///
    /// Forward order is evaluation order: a store's value before its target, a shuffle's
    /// sources before its targets, a phi's operands before its target.
    #[must_use]
    pub fn visit_order(&self, id: NodeId, direction: Direction) -> Vec<NodeId> {
        let Ok(node) = self.node(id) else {
            return Vec::new();
        };

        let forward = direction == Direction::Forward;
        match node {
            Node::Expr(Expr::Arith(arith)) => {
                if forward {
                    vec![arith.left, arith.right]
                } else {
                    vec![arith.right, arith.left]
                }
            }
            Node::Expr(_) => Vec::new(),
            Node::Stmt(stmt) => match stmt {
                Stmt::Expr(s) => vec![s.expr],
                Stmt::ReturnExpr(s) => vec![s.expr],
                Stmt::Return | Stmt::AddressStore(_) => Vec::new(),
                Stmt::Store(s) => {
                    if forward {
                        vec![s.value, s.target]
                    } else {
                        vec![s.target, s.value]
                    }
                }
                Stmt::StackManip(s) => {
                    if forward {
                        s.source.iter().chain(s.target.iter()).copied().collect()
                    } else {
                        s.target.iter().rev().chain(s.source.iter().rev()).copied().collect()
                    }
                }
                Stmt::Phi(phi) => {
                    let target = phi.target();
                    let operands = self.phi_operands(id).unwrap_or_default();
                    if forward {
                        operands.into_iter().chain(std::iter::once(target)).collect()
                    } else {
                        std::iter::once(target)
                            .chain(operands.into_iter().rev())
                            .collect()
                    }
                }
            },
        }
    }
}
