//! Human readable rendering of nodes for logs and test assertions.

use std::fmt;

use crate::tree::{Expr, Node, NodeId, PhiStmt, Stmt, Tree, VarKey};

/// Renders the subtree rooted at a node; created by [`Tree::display`].
///
/// Renamed variables carry their version as a suffix (`l3_2`). Statements use an
/// assignment syntax: `l1 := (l1 + 1)`, `l3_2 := Phi(B1=l3_0, B2=l3_1)`.
pub struct NodeDisplay<'a> {
    tree: &'a Tree,
    id: NodeId,
}

impl Tree {
    /// A [`fmt::Display`] adapter for the subtree rooted at `id`.
    #[must_use]
    pub fn display(&self, id: NodeId) -> NodeDisplay<'_> {
        NodeDisplay { tree: self, id }
    }
}

impl NodeDisplay<'_> {
    fn child(&self, id: NodeId) -> Self {
        NodeDisplay {
            tree: self.tree,
            id,
        }
    }

    fn list(&self, f: &mut fmt::Formatter<'_>, ids: &[NodeId]) -> fmt::Result {
        for (i, id) in ids.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", self.child(*id))?;
        }
        Ok(())
    }
}

impl fmt::Display for NodeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Ok(node) = self.tree.node(self.id) else {
            return write!(f, "<invalid>");
        };

        match node {
            Node::Expr(expr) => match expr {
                Expr::Local(var) | Expr::Stack(var) => {
                    let key = if matches!(expr, Expr::Local(_)) {
                        VarKey::Local(var.index)
                    } else {
                        VarKey::Stack(var.index)
                    };
                    match self.tree.version_of(self.id).ok().flatten() {
                        Some(version) => write!(f, "{key}_{version}"),
                        None => write!(f, "{key}"),
                    }
                }
                Expr::Constant(constant) => write!(f, "{}", constant.value),
                Expr::Arith(arith) => write!(
                    f,
                    "({} {} {})",
                    self.child(arith.left),
                    arith.op,
                    self.child(arith.right)
                ),
                Expr::ReturnAddress => write!(f, "<return address>"),
            },
            Node::Stmt(stmt) => match stmt {
                Stmt::Expr(s) => write!(f, "eval {}", self.child(s.expr)),
                Stmt::Store(s) => write!(f, "{} := {}", self.child(s.target), self.child(s.value)),
                Stmt::StackManip(s) => {
                    write!(f, "(")?;
                    self.list(f, &s.target)?;
                    write!(f, ") := {}(", s.kind)?;
                    self.list(f, &s.source)?;
                    write!(f, ")")
                }
                Stmt::ReturnExpr(s) => write!(f, "return {}", self.child(s.expr)),
                Stmt::Return => write!(f, "return"),
                Stmt::AddressStore(s) => write!(f, "store return address of {}", s.sub),
                Stmt::Phi(phi) => {
                    write!(f, "{} := ", self.child(phi.target()))?;
                    match phi {
                        PhiStmt::Join(p) => {
                            write!(f, "Phi(")?;
                            for (i, (pred, op)) in p.operands.iter().enumerate() {
                                if i > 0 {
                                    write!(f, ", ")?;
                                }
                                write!(f, "{pred}={}", self.child(*op))?;
                            }
                        }
                        PhiStmt::Catch(p) => {
                            write!(f, "Phi-Catch(")?;
                            self.list(f, &p.operands)?;
                        }
                        PhiStmt::Return(p) => {
                            write!(f, "Phi-Return(")?;
                            for (i, (call, op)) in p.operands.iter().enumerate() {
                                if i > 0 {
                                    write!(f, ", ")?;
                                }
                                write!(f, "{call}={}", self.child(*op))?;
                            }
                        }
                    }
                    write!(f, ")")
                }
            },
        }
    }
}

impl fmt::Debug for NodeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self)
    }
}
