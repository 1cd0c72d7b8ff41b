//! Expression payloads, operators, literals and variable bookkeeping.
//!
//! Variables come in two flavours, local variable slots and operand stack slots, both
//! represented by [`VarExpr`]. A variable node is either a definition (the target of a
//! store, a stack shuffle or a phi) or a use; a use may link to the definition that
//! reaches it. That link is what SSA renaming fills in.

use std::{fmt, hash::Hash};

use strum::{EnumCount, EnumIter};

use crate::{
    classfile::Type,
    tree::{Expr, Node, NodeId, Tree},
    Result,
};

/// Binary operators of [`ArithExpr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum ArithOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `&`
    And,
    /// `|`
    Or,
    /// `^`
    Xor,
    /// `?`, three-way compare of longs
    Cmp,
    /// `<`, three-way compare, NaN yields -1
    CmpL,
    /// `>`, three-way compare, NaN yields 1
    CmpG,
}

impl ArithOp {
    /// The one-character symbol of the operator.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            ArithOp::Add => '+',
            ArithOp::Sub => '-',
            ArithOp::Mul => '*',
            ArithOp::Div => '/',
            ArithOp::Rem => '%',
            ArithOp::And => '&',
            ArithOp::Or => '|',
            ArithOp::Xor => '^',
            ArithOp::Cmp => '?',
            ArithOp::CmpL => '<',
            ArithOp::CmpG => '>',
        }
    }

    /// Look up an operator by its symbol.
    #[must_use]
    pub fn from_symbol(symbol: char) -> Option<Self> {
        use strum::IntoEnumIterator;
        ArithOp::iter().find(|op| op.symbol() == symbol)
    }

    /// Returns `true` for the comparison operators, whose result is always `int`.
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(self, ArithOp::Cmp | ArithOp::CmpL | ArithOp::CmpG)
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A literal value.
///
/// Floating point literals compare and hash by bit pattern, so `NaN` equals itself and
/// `0.0` differs from `-0.0`.
#[derive(Debug, Clone)]
pub enum Constant {
    /// `int` (also `boolean`, `byte`, `char`, `short`)
    Int(i32),
    /// `long`
    Long(i64),
    /// `float`
    Float(f32),
    /// `double`
    Double(f64),
    /// `java/lang/String` literal
    String(String),
    /// Class literal
    Class(Type),
    /// `null`
    Null,
}

impl Constant {
    /// The type of the literal.
    #[must_use]
    pub fn ty(&self) -> Type {
        match self {
            Constant::Int(_) => Type::Int,
            Constant::Long(_) => Type::Long,
            Constant::Float(_) => Type::Float,
            Constant::Double(_) => Type::Double,
            Constant::String(_) => Type::object("java/lang/String"),
            Constant::Class(_) => Type::object("java/lang/Class"),
            Constant::Null => Type::Null,
        }
    }
}

impl PartialEq for Constant {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Constant::Int(a), Constant::Int(b)) => a == b,
            (Constant::Long(a), Constant::Long(b)) => a == b,
            (Constant::Float(a), Constant::Float(b)) => a.to_bits() == b.to_bits(),
            (Constant::Double(a), Constant::Double(b)) => a.to_bits() == b.to_bits(),
            (Constant::String(a), Constant::String(b)) => a == b,
            (Constant::Class(a), Constant::Class(b)) => a == b,
            (Constant::Null, Constant::Null) => true,
            _ => false,
        }
    }
}

impl Eq for Constant {}

impl Hash for Constant {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Constant::Int(v) => v.hash(state),
            Constant::Long(v) => v.hash(state),
            Constant::Float(v) => v.to_bits().hash(state),
            Constant::Double(v) => v.to_bits().hash(state),
            Constant::String(v) => v.hash(state),
            Constant::Class(v) => v.hash(state),
            Constant::Null => {}
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(v) => write!(f, "{v}"),
            Constant::Long(v) => write!(f, "{v}L"),
            Constant::Float(v) => write!(f, "{v}F"),
            Constant::Double(v) => write!(f, "{v}D"),
            Constant::String(v) => write!(f, "{v:?}"),
            Constant::Class(v) => write!(f, "{v}.class"),
            Constant::Null => write!(f, "null"),
        }
    }
}

/// Identity of a variable independent of any particular occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VarKey {
    /// Local variable slot
    Local(u16),
    /// Operand stack slot
    Stack(u16),
}

impl VarKey {
    /// The slot index.
    #[must_use]
    pub const fn index(self) -> u16 {
        match self {
            VarKey::Local(index) | VarKey::Stack(index) => index,
        }
    }

    /// Returns `true` for local variable slots.
    #[must_use]
    pub const fn is_local(self) -> bool {
        matches!(self, VarKey::Local(_))
    }
}

impl fmt::Display for VarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarKey::Local(index) => write!(f, "l{index}"),
            VarKey::Stack(index) => write!(f, "s{index}"),
        }
    }
}

/// An occurrence of a local or stack variable.
#[derive(Debug, Clone)]
pub struct VarExpr {
    pub(crate) index: u16,
    pub(crate) ty: Type,
    pub(crate) is_def: bool,
    pub(crate) def: Option<NodeId>,
    pub(crate) version: Option<u32>,
}

impl VarExpr {
    /// The slot index.
    #[must_use]
    pub const fn index(&self) -> u16 {
        self.index
    }

    /// The declared type.
    #[must_use]
    pub const fn ty(&self) -> &Type {
        &self.ty
    }

    /// Returns `true` if this occurrence defines the variable.
    #[must_use]
    pub const fn is_def(&self) -> bool {
        self.is_def
    }

    /// For a use, the definition reaching it.
    #[must_use]
    pub const fn def(&self) -> Option<NodeId> {
        self.def
    }

    /// For a definition, its SSA version once renamed.
    #[must_use]
    pub const fn version(&self) -> Option<u32> {
        self.version
    }
}

/// A literal expression.
#[derive(Debug, Clone)]
pub struct ConstantExpr {
    pub(crate) value: Constant,
}

impl ConstantExpr {
    /// The literal value.
    #[must_use]
    pub const fn value(&self) -> &Constant {
        &self.value
    }
}

/// A binary operation.
#[derive(Debug, Clone)]
pub struct ArithExpr {
    pub(crate) op: ArithOp,
    pub(crate) left: NodeId,
    pub(crate) right: NodeId,
    pub(crate) ty: Type,
}

impl ArithExpr {
    /// The operator.
    #[must_use]
    pub const fn op(&self) -> ArithOp {
        self.op
    }

    /// Left operand.
    #[must_use]
    pub const fn left(&self) -> NodeId {
        self.left
    }

    /// Right operand.
    #[must_use]
    pub const fn right(&self) -> NodeId {
        self.right
    }

    /// Result type.
    #[must_use]
    pub const fn ty(&self) -> &Type {
        &self.ty
    }
}

impl Tree {
    /// Allocate a use of local variable slot `index`.
    pub fn new_local(&mut self, index: u16, ty: Type) -> NodeId {
        self.alloc(Node::Expr(Expr::Local(VarExpr::new(index, ty))))
    }

    /// Allocate a use of operand stack slot `index`.
    pub fn new_stack(&mut self, index: u16, ty: Type) -> NodeId {
        self.alloc(Node::Expr(Expr::Stack(VarExpr::new(index, ty))))
    }

    /// Allocate a fresh parentless use of the same variable as `var`.
    pub(crate) fn new_var_like(&mut self, var: NodeId) -> Result<NodeId> {
        let key = self.var_key(var)?;
        let ty = self.var(var)?.ty.clone();
        Ok(match key {
            VarKey::Local(index) => self.new_local(index, ty),
            VarKey::Stack(index) => self.new_stack(index, ty),
        })
    }

    /// Allocate a literal.
    pub fn new_constant(&mut self, value: Constant) -> NodeId {
        self.alloc(Node::Expr(Expr::Constant(ConstantExpr { value })))
    }

    /// Allocate the return address pushed by a subroutine call.
    pub fn new_return_address(&mut self) -> NodeId {
        self.alloc(Node::Expr(Expr::ReturnAddress))
    }

    /// Allocate `left op right`, taking ownership of both operands.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if an operand is already owned or is a
    /// statement.
    pub fn new_arith(
        &mut self,
        op: ArithOp,
        left: NodeId,
        right: NodeId,
        ty: Type,
    ) -> Result<NodeId> {
        self.alloc_with_children(Node::Expr(Expr::Arith(ArithExpr {
            op,
            left,
            right,
            ty,
        })))
    }

    /// The variable payload of `id`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if `id` is not a variable.
    pub fn var(&self, id: NodeId) -> Result<&VarExpr> {
        self.expr(id)?
            .as_var()
            .ok_or_else(|| invariant_error!("{} is not a variable", id))
    }

    pub(crate) fn var_mut(&mut self, id: NodeId) -> Result<&mut VarExpr> {
        match &mut self.data_mut(id)?.node {
            Node::Expr(Expr::Local(var) | Expr::Stack(var)) => Ok(var),
            _ => Err(invariant_error!("{} is not a variable", id)),
        }
    }

    /// The variable identity of `id`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if `id` is not a variable.
    pub fn var_key(&self, id: NodeId) -> Result<VarKey> {
        match self.expr(id)? {
            Expr::Local(var) => Ok(VarKey::Local(var.index)),
            Expr::Stack(var) => Ok(VarKey::Stack(var.index)),
            _ => Err(invariant_error!("{} is not a variable", id)),
        }
    }

    /// Returns `true` if `id` is a variable definition.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if `id` is not a variable.
    pub fn is_def(&self, id: NodeId) -> Result<bool> {
        Ok(self.var(id)?.is_def)
    }

    /// The definition a use links to; `None` for definitions and unlinked uses.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if `id` is not a variable.
    pub fn def_of(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.var(id)?.def)
    }

    /// The definition an occurrence stands for: the node itself for a definition,
    /// otherwise the linked definition.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if `id` is not a variable.
    pub fn underlying_def(&self, id: NodeId) -> Result<Option<NodeId>> {
        let var = self.var(id)?;
        Ok(if var.is_def { Some(id) } else { var.def })
    }

    /// Link the use `id` to the definition `def`, or unlink it.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if `id` is a definition or `def` is not
    /// a live definition of the same variable.
    pub fn set_def(&mut self, id: NodeId, def: Option<NodeId>) -> Result<()> {
        if self.is_def(id)? {
            return Err(invariant_error!("{} is a definition and cannot link to another", id));
        }
        if let Some(def) = def {
            if !self.is_def(def)? {
                return Err(invariant_error!("{} is not a definition", def));
            }
            let (use_key, def_key) = (self.var_key(id)?, self.var_key(def)?);
            if use_key != def_key {
                return Err(invariant_error!(
                    "Use of {} cannot link to a definition of {}",
                    use_key,
                    def_key
                ));
            }
        }

        self.var_mut(id)?.def = def;
        Ok(())
    }

    /// The SSA version of the definition an occurrence stands for.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if `id` is not a variable.
    pub fn version_of(&self, id: NodeId) -> Result<Option<u32>> {
        match self.underlying_def(id)? {
            Some(def) if self.is_valid(def) => Ok(self.var(def)?.version),
            _ => Ok(None),
        }
    }

    pub(crate) fn set_version(&mut self, def: NodeId, version: u32) -> Result<()> {
        self.var_mut(def)?.version = Some(version);
        Ok(())
    }

    pub(crate) fn mark_def(&mut self, id: NodeId) -> Result<()> {
        let var = self.var_mut(id)?;
        var.is_def = true;
        var.def = None;
        Ok(())
    }
}

impl VarExpr {
    fn new(index: u16, ty: Type) -> Self {
        VarExpr {
            index,
            ty,
            is_def: false,
            def: None,
            version: None,
        }
    }
}
