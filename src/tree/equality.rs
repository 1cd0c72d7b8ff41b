//! Structural equality and hashing of expressions.
//!
//! Two expressions are equal when they have the same variant, the same operator, type or
//! literal, and pairwise equal children. Variables additionally compare by the
//! definition they stand for, so two uses of different SSA versions of a slot differ
//! while a use and its own definition are equal. Node identity never matters.
//!
//! [`Tree::expr_hash`] is consistent with [`Tree::equals_expr`]; [`ExprKey`] packages
//! both for use as a hash map key.

use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use crate::tree::{Expr, NodeId, Tree};

impl Tree {
    /// Structural equality of two expressions. Dead or non-expression nodes are never
    /// equal to anything.
    #[must_use]
    pub fn equals_expr(&self, a: NodeId, b: NodeId) -> bool {
        let (Ok(left), Ok(right)) = (self.expr(a), self.expr(b)) else {
            return false;
        };

        match (left, right) {
            (Expr::Local(x), Expr::Local(y)) | (Expr::Stack(x), Expr::Stack(y)) => {
                x.index == y.index
                    && x.ty == y.ty
                    && self.underlying_def(a).ok() == self.underlying_def(b).ok()
            }
            (Expr::Constant(x), Expr::Constant(y)) => x.value == y.value,
            (Expr::Arith(x), Expr::Arith(y)) => {
                x.op == y.op
                    && x.ty == y.ty
                    && self.equals_expr(x.left, y.left)
                    && self.equals_expr(x.right, y.right)
            }
            (Expr::ReturnAddress, Expr::ReturnAddress) => true,
            _ => false,
        }
    }

    /// Feed the structure of an expression into `state`.
    pub fn hash_expr<H: Hasher>(&self, id: NodeId, state: &mut H) {
        let Ok(expr) = self.expr(id) else {
            u8::MAX.hash(state);
            return;
        };

        std::mem::discriminant(expr).hash(state);
        match expr {
            Expr::Local(var) | Expr::Stack(var) => {
                var.index.hash(state);
                var.ty.hash(state);
                self.underlying_def(id).ok().flatten().hash(state);
            }
            Expr::Constant(constant) => constant.value.hash(state),
            Expr::Arith(arith) => {
                arith.op.hash(state);
                arith.ty.hash(state);
                self.hash_expr(arith.left, state);
                self.hash_expr(arith.right, state);
            }
            Expr::ReturnAddress => {}
        }
    }

    /// Structural hash of an expression.
    #[must_use]
    pub fn expr_hash(&self, id: NodeId) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash_expr(id, &mut hasher);
        hasher.finish()
    }

    /// Wrap `id` for use as a structural hash map key.
    #[must_use]
    pub fn expr_key(&self, id: NodeId) -> ExprKey<'_> {
        ExprKey { tree: self, id }
    }
}

/// An expression handle that hashes and compares structurally.
///
/// # Examples
///
/// ```rust
/// use std::collections::HashSet;
/// use classscope::{classfile::Type, tree::{ArithOp, Constant, Tree}};
///
/// let mut tree = Tree::new();
/// let mut sums = Vec::new();
/// for _ in 0..2 {
///     let x = tree.new_local(0, Type::Int);
///     let one = tree.new_constant(Constant::Int(1));
///     sums.push(tree.new_arith(ArithOp::Add, x, one, Type::Int)?);
/// }
///
/// let unique: HashSet<_> = sums.iter().map(|&id| tree.expr_key(id)).collect();
/// assert_eq!(unique.len(), 1);
/// # Ok::<(), classscope::Error>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ExprKey<'a> {
    tree: &'a Tree,
    id: NodeId,
}

impl ExprKey<'_> {
    /// The wrapped handle.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }
}

impl PartialEq for ExprKey<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.tree.equals_expr(self.id, other.id)
    }
}

impl Eq for ExprKey<'_> {}

impl Hash for ExprKey<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tree.hash_expr(self.id, state);
    }
}
