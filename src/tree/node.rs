//! Node handles and the closed set of node variants.
//!
//! Every expression and statement lives in a [`crate::tree::Tree`] arena and is addressed
//! by a [`NodeId`]. The variant hierarchy is two levels deep: a [`Node`] is either an
//! [`Expr`] or a [`Stmt`], and the phi statements are grouped under [`PhiStmt`]. Visitor
//! fallbacks follow the same grouping.

use std::fmt;

use crate::{
    classfile::Type,
    tree::{
        expr::{ArithExpr, ConstantExpr, VarExpr},
        stmt::{
            AddressStoreStmt, ExprStmt, PhiCatchStmt, PhiJoinStmt, PhiReturnStmt, ReturnExprStmt,
            StackManipStmt, StoreStmt,
        },
    },
    utils::graph::BlockId,
};

/// Index handle of a node in a [`crate::tree::Tree`].
///
/// Handles stay unique for the lifetime of the arena; a cleaned up node keeps its slot
/// and is reported as invalid instead of being reused.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Create a handle from a raw index.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// The raw index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A tree node: an expression or a statement.
#[derive(Debug, Clone)]
pub enum Node {
    /// An expression
    Expr(Expr),
    /// A statement
    Stmt(Stmt),
}

/// Expression variants.
#[derive(Debug, Clone)]
pub enum Expr {
    /// A local variable slot, as definition or use
    Local(VarExpr),
    /// An operand stack slot, as definition or use
    Stack(VarExpr),
    /// A literal
    Constant(ConstantExpr),
    /// A binary arithmetic or comparison operation
    Arith(ArithExpr),
    /// The return address pushed by a subroutine call
    ReturnAddress,
}

/// Statement variants.
#[derive(Debug, Clone)]
pub enum Stmt {
    /// An expression evaluated for its side effects
    Expr(ExprStmt),
    /// Assignment of a value to a variable
    Store(StoreStmt),
    /// One of the stack shuffling instructions
    StackManip(StackManipStmt),
    /// Return with a value
    ReturnExpr(ReturnExprStmt),
    /// Return without a value
    Return,
    /// Stores a subroutine's return address; never reloaded as an ordinary value
    AddressStore(AddressStoreStmt),
    /// A phi function
    Phi(PhiStmt),
}

/// Phi statement variants, ranked by [`PhiKind`].
#[derive(Debug, Clone)]
pub enum PhiStmt {
    /// Merge at a control flow join, one operand per predecessor
    Join(PhiJoinStmt),
    /// Merge at an exception handler entry, one operand per distinct reaching definition
    Catch(PhiCatchStmt),
    /// Merge after a subroutine returns, one operand per call site
    Return(PhiReturnStmt),
}

/// Rank of a phi kind.
///
/// At most one phi per variable may live in a block. When two kinds compete for the same
/// block the higher-ranked one wins: return phis over catch phis over join phis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PhiKind {
    /// [`PhiStmt::Join`]
    Join,
    /// [`PhiStmt::Catch`]
    Catch,
    /// [`PhiStmt::Return`]
    Return,
}

impl fmt::Display for PhiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhiKind::Join => write!(f, "join"),
            PhiKind::Catch => write!(f, "catch"),
            PhiKind::Return => write!(f, "return"),
        }
    }
}

impl PhiStmt {
    /// The kind of this phi.
    #[must_use]
    pub const fn kind(&self) -> PhiKind {
        match self {
            PhiStmt::Join(_) => PhiKind::Join,
            PhiStmt::Catch(_) => PhiKind::Catch,
            PhiStmt::Return(_) => PhiKind::Return,
        }
    }

    /// The variable defined by this phi.
    #[must_use]
    pub const fn target(&self) -> NodeId {
        match self {
            PhiStmt::Join(phi) => phi.target,
            PhiStmt::Catch(phi) => phi.target,
            PhiStmt::Return(phi) => phi.target,
        }
    }
}

impl Expr {
    /// The variable payload of a local or stack expression.
    #[must_use]
    pub const fn as_var(&self) -> Option<&VarExpr> {
        match self {
            Expr::Local(var) | Expr::Stack(var) => Some(var),
            _ => None,
        }
    }

    /// The static type of the expression.
    #[must_use]
    pub fn ty(&self) -> Type {
        match self {
            Expr::Local(var) | Expr::Stack(var) => var.ty.clone(),
            Expr::Constant(constant) => constant.value.ty(),
            Expr::Arith(arith) => arith.ty.clone(),
            Expr::ReturnAddress => Type::Address,
        }
    }
}

/// Arena slot of a node.
#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub(crate) node: Node,
    pub(crate) parent: Option<NodeId>,
    /// Set on statements placed in a block
    pub(crate) block: Option<BlockId>,
    pub(crate) valid: bool,
}

impl NodeData {
    pub(crate) fn new(node: Node) -> Self {
        NodeData {
            node,
            parent: None,
            block: None,
            valid: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phi_kind_ranking() {
        assert!(PhiKind::Return > PhiKind::Catch);
        assert!(PhiKind::Catch > PhiKind::Join);
        assert_eq!(
            [PhiKind::Catch, PhiKind::Return, PhiKind::Join]
                .into_iter()
                .max(),
            Some(PhiKind::Return)
        );
    }

    #[test]
    fn test_node_id_formatting() {
        let id = NodeId::new(12);
        assert_eq!(id.index(), 12);
        assert_eq!(format!("{id}"), "#12");
        assert_eq!(format!("{id:?}"), "NodeId(12)");
    }
}
