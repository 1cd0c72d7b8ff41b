//! Statement payloads and constructors.
//!
//! Statements are the roots of expression trees. A statement only gains a block once the
//! control flow graph places it, see [`crate::analysis::cfg::FlowGraph::append_stmt`].

use std::fmt;

use strum::{EnumCount, EnumIter};

use crate::{
    analysis::cfg::SubroutineId,
    tree::{Node, NodeId, PhiStmt, Stmt, Tree},
    utils::graph::BlockId,
    Result,
};

/// The stack shuffling instructions.
///
/// Each kind reads a fixed number of stack slots and writes a fixed number back; the
/// [`StackManipKind::mapping`] gives, for every written slot, the read slot it copies.
/// Slot lists are ordered from the deepest slot to the top of the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum StackManipKind {
    /// `a b -> b a`
    Swap,
    /// `a -> a a`
    Dup,
    /// `a b -> b a b`
    DupX1,
    /// `a b c -> c a b c`
    DupX2,
    /// `a b -> a b a b`
    Dup2,
    /// `a b c -> b c a b c`
    Dup2X1,
    /// `a b c d -> c d a b c d`
    Dup2X2,
}

impl StackManipKind {
    /// For every written slot, the index of the read slot it receives.
    #[must_use]
    pub const fn mapping(self) -> &'static [usize] {
        match self {
            StackManipKind::Swap => &[1, 0],
            StackManipKind::Dup => &[0, 0],
            StackManipKind::DupX1 => &[1, 0, 1],
            StackManipKind::DupX2 => &[2, 0, 1, 2],
            StackManipKind::Dup2 => &[0, 1, 0, 1],
            StackManipKind::Dup2X1 => &[1, 2, 0, 1, 2],
            StackManipKind::Dup2X2 => &[2, 3, 0, 1, 2, 3],
        }
    }

    /// Number of slots read.
    #[must_use]
    pub const fn source_len(self) -> usize {
        match self {
            StackManipKind::Dup => 1,
            StackManipKind::Swap | StackManipKind::DupX1 | StackManipKind::Dup2 => 2,
            StackManipKind::DupX2 | StackManipKind::Dup2X1 => 3,
            StackManipKind::Dup2X2 => 4,
        }
    }

    /// Number of slots written.
    #[must_use]
    pub const fn target_len(self) -> usize {
        self.mapping().len()
    }

    /// The instruction mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            StackManipKind::Swap => "swap",
            StackManipKind::Dup => "dup",
            StackManipKind::DupX1 => "dup_x1",
            StackManipKind::DupX2 => "dup_x2",
            StackManipKind::Dup2 => "dup2",
            StackManipKind::Dup2X1 => "dup2_x1",
            StackManipKind::Dup2X2 => "dup2_x2",
        }
    }
}

impl fmt::Display for StackManipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// An expression evaluated for its side effects.
#[derive(Debug, Clone)]
pub struct ExprStmt {
    pub(crate) expr: NodeId,
}

impl ExprStmt {
    /// The evaluated expression.
    #[must_use]
    pub const fn expr(&self) -> NodeId {
        self.expr
    }
}

/// `target := value`.
#[derive(Debug, Clone)]
pub struct StoreStmt {
    pub(crate) target: NodeId,
    pub(crate) value: NodeId,
}

impl StoreStmt {
    /// The defined variable.
    #[must_use]
    pub const fn target(&self) -> NodeId {
        self.target
    }

    /// The stored value.
    #[must_use]
    pub const fn value(&self) -> NodeId {
        self.value
    }
}

/// A stack shuffle: every target slot is defined as a copy of a source slot.
#[derive(Debug, Clone)]
pub struct StackManipStmt {
    pub(crate) target: Vec<NodeId>,
    pub(crate) source: Vec<NodeId>,
    pub(crate) kind: StackManipKind,
}

impl StackManipStmt {
    /// Defined stack slots, deepest first.
    #[must_use]
    pub fn target(&self) -> &[NodeId] {
        &self.target
    }

    /// Read stack slots, deepest first.
    #[must_use]
    pub fn source(&self) -> &[NodeId] {
        &self.source
    }

    /// Which shuffle this is.
    #[must_use]
    pub const fn kind(&self) -> StackManipKind {
        self.kind
    }
}

/// `return expr`.
#[derive(Debug, Clone)]
pub struct ReturnExprStmt {
    pub(crate) expr: NodeId,
}

impl ReturnExprStmt {
    /// The returned value.
    #[must_use]
    pub const fn expr(&self) -> NodeId {
        self.expr
    }
}

/// Stores the return address of a subroutine at its entry.
#[derive(Debug, Clone)]
pub struct AddressStoreStmt {
    pub(crate) sub: SubroutineId,
}

impl AddressStoreStmt {
    /// The subroutine whose return address is stored.
    #[must_use]
    pub const fn sub(&self) -> SubroutineId {
        self.sub
    }
}

/// Join phi: one operand per predecessor block of `block`.
#[derive(Debug, Clone)]
pub struct PhiJoinStmt {
    pub(crate) target: NodeId,
    pub(crate) block: BlockId,
    pub(crate) operands: Vec<(BlockId, NodeId)>,
}

impl PhiJoinStmt {
    /// The defined variable.
    #[must_use]
    pub const fn target(&self) -> NodeId {
        self.target
    }

    /// The join block the phi was created for.
    #[must_use]
    pub const fn block(&self) -> BlockId {
        self.block
    }

    /// Operands keyed by predecessor, as currently stored.
    #[must_use]
    pub fn operands(&self) -> &[(BlockId, NodeId)] {
        &self.operands
    }
}

/// Catch phi: one operand per distinct definition live in the protected region.
#[derive(Debug, Clone)]
pub struct PhiCatchStmt {
    pub(crate) target: NodeId,
    pub(crate) operands: Vec<NodeId>,
}

impl PhiCatchStmt {
    /// The defined variable.
    #[must_use]
    pub const fn target(&self) -> NodeId {
        self.target
    }
}

/// Return phi: one operand per call site of `sub`, keyed by the call block.
#[derive(Debug, Clone)]
pub struct PhiReturnStmt {
    pub(crate) target: NodeId,
    pub(crate) sub: SubroutineId,
    pub(crate) operands: Vec<(BlockId, NodeId)>,
}

impl PhiReturnStmt {
    /// The defined variable.
    #[must_use]
    pub const fn target(&self) -> NodeId {
        self.target
    }

    /// The subroutine whose returns are merged.
    #[must_use]
    pub const fn sub(&self) -> SubroutineId {
        self.sub
    }

    /// Operands keyed by call block.
    #[must_use]
    pub fn operands(&self) -> &[(BlockId, NodeId)] {
        &self.operands
    }
}

impl Tree {
    /// Allocate an expression statement owning `expr`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if `expr` is already owned.
    pub fn new_expr_stmt(&mut self, expr: NodeId) -> Result<NodeId> {
        self.alloc_with_children(Node::Stmt(Stmt::Expr(ExprStmt { expr })))
    }

    /// Allocate `target := value`; `target` becomes a definition.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if `target` is not a variable or either
    /// operand is already owned.
    pub fn new_store(&mut self, target: NodeId, value: NodeId) -> Result<NodeId> {
        self.var(target)?;
        let stmt = self.alloc_with_children(Node::Stmt(Stmt::Store(StoreStmt { target, value })))?;
        self.mark_def(target)?;
        Ok(stmt)
    }

    /// Allocate a stack shuffle; every target becomes a definition.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if the slot counts do not match
    /// `kind`, a slot is not a stack variable, or a slot is already owned.
    pub fn new_stack_manip(
        &mut self,
        target: Vec<NodeId>,
        source: Vec<NodeId>,
        kind: StackManipKind,
    ) -> Result<NodeId> {
        if target.len() != kind.target_len() || source.len() != kind.source_len() {
            return Err(invariant_error!(
                "{} writes {} and reads {} slots, got {} and {}",
                kind,
                kind.target_len(),
                kind.source_len(),
                target.len(),
                source.len()
            ));
        }
        for &slot in target.iter().chain(source.iter()) {
            if !matches!(self.var_key(slot)?, crate::tree::VarKey::Stack(_)) {
                return Err(invariant_error!("{} is not a stack slot", slot));
            }
        }

        let defs = target.clone();
        let stmt = self.alloc_with_children(Node::Stmt(Stmt::StackManip(StackManipStmt {
            target,
            source,
            kind,
        })))?;
        for def in defs {
            self.mark_def(def)?;
        }
        Ok(stmt)
    }

    /// Allocate `return expr`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if `expr` is already owned.
    pub fn new_return_expr(&mut self, expr: NodeId) -> Result<NodeId> {
        self.alloc_with_children(Node::Stmt(Stmt::ReturnExpr(ReturnExprStmt { expr })))
    }

    /// Allocate a `return` without value.
    pub fn new_return(&mut self) -> NodeId {
        self.alloc(Node::Stmt(Stmt::Return))
    }

    /// Allocate the return address store at the entry of `sub`.
    pub fn new_address_store(&mut self, sub: SubroutineId) -> NodeId {
        self.alloc(Node::Stmt(Stmt::AddressStore(AddressStoreStmt { sub })))
    }

    /// Allocate a join phi at `block` defining `target`, with one unlinked operand per
    /// entry of `preds`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if `target` is not a free variable.
    pub fn new_phi_join(
        &mut self,
        target: NodeId,
        block: BlockId,
        preds: &[BlockId],
    ) -> Result<NodeId> {
        self.check_detached(target)?;
        let mut operands = Vec::with_capacity(preds.len());
        for &pred in preds {
            operands.push((pred, self.new_var_like(target)?));
        }

        let stmt = self.alloc_with_children(Node::Stmt(Stmt::Phi(PhiStmt::Join(PhiJoinStmt {
            target,
            block,
            operands,
        }))))?;
        self.mark_def(target)?;
        Ok(stmt)
    }

    /// Allocate a catch phi defining `target`, without operands.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if `target` is not a free variable.
    pub fn new_phi_catch(&mut self, target: NodeId) -> Result<NodeId> {
        self.var(target)?;
        let stmt = self.alloc_with_children(Node::Stmt(Stmt::Phi(PhiStmt::Catch(
            PhiCatchStmt {
                target,
                operands: Vec::new(),
            },
        ))))?;
        self.mark_def(target)?;
        Ok(stmt)
    }

    /// Allocate a return phi for `sub` defining `target`, with one unlinked operand per
    /// call block.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if `target` is not a free variable.
    pub fn new_phi_return(
        &mut self,
        target: NodeId,
        sub: SubroutineId,
        calls: &[BlockId],
    ) -> Result<NodeId> {
        self.check_detached(target)?;
        let mut operands = Vec::with_capacity(calls.len());
        for &call in calls {
            operands.push((call, self.new_var_like(target)?));
        }

        let stmt = self.alloc_with_children(Node::Stmt(Stmt::Phi(PhiStmt::Return(
            PhiReturnStmt {
                target,
                sub,
                operands,
            },
        ))))?;
        self.mark_def(target)?;
        Ok(stmt)
    }
}
