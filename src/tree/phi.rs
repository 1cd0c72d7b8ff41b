//! Phi operand management.
//!
//! The three phi kinds store their operands differently. Join phis key operands by
//! predecessor block and drop operands whose predecessor edge has gone away. Catch phis
//! keep a plain list and collapse operands that stand for the same definition whenever
//! the list is read. Return phis key operands by the block that called the subroutine.
//!
//! Operands are always variable uses of the phi's own variable, owned by the phi.
//! Replaced and dropped operands are cleaned up.

use crate::{
    tree::{Node, NodeId, PhiKind, PhiStmt, Stmt, Tree},
    utils::graph::BlockId,
    Result,
};

impl Tree {
    /// The phi statement behind `id`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if `id` is not a phi.
    pub fn phi(&self, id: NodeId) -> Result<&PhiStmt> {
        match self.stmt(id)? {
            Stmt::Phi(phi) => Ok(phi),
            _ => Err(invariant_error!("{} is not a phi", id)),
        }
    }

    fn phi_mut(&mut self, id: NodeId) -> Result<&mut PhiStmt> {
        match &mut self.data_mut(id)?.node {
            Node::Stmt(Stmt::Phi(phi)) => Ok(phi),
            _ => Err(invariant_error!("{} is not a phi", id)),
        }
    }

    /// The kind of phi behind `id`; `None` for anything else.
    #[must_use]
    pub fn phi_kind(&self, id: NodeId) -> Option<PhiKind> {
        self.phi(id).ok().map(PhiStmt::kind)
    }

    /// The variable defined by the phi.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if `id` is not a phi.
    pub fn phi_target(&self, id: NodeId) -> Result<NodeId> {
        Ok(self.phi(id)?.target())
    }

    /// The operands as currently stored, without pruning or deduplication.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if `id` is not a phi.
    pub fn phi_operands(&self, id: NodeId) -> Result<Vec<NodeId>> {
        Ok(match self.phi(id)? {
            PhiStmt::Join(phi) => phi.operands.iter().map(|(_, op)| *op).collect(),
            PhiStmt::Catch(phi) => phi.operands.clone(),
            PhiStmt::Return(phi) => phi.operands.iter().map(|(_, op)| *op).collect(),
        })
    }

    fn check_operand(&self, phi: NodeId, operand: NodeId) -> Result<()> {
        let target = self.phi_target(phi)?;
        self.check_detached(operand)?;
        if self.is_def(operand)? {
            return Err(invariant_error!("Phi operand {} must be a use", operand));
        }
        if self.var_key(operand)? != self.var_key(target)? {
            return Err(invariant_error!(
                "Phi operand {} is not a use of {}",
                operand,
                self.var_key(target)?
            ));
        }
        Ok(())
    }

    fn adopt_operand(&mut self, phi: NodeId, operand: NodeId, old: Option<NodeId>) -> Result<()> {
        self.data_mut(operand)?.parent = Some(phi);
        if let Some(old) = old {
            self.data_mut(old)?.parent = None;
            self.cleanup(old)?;
        }
        Ok(())
    }

    /// Operand of a join phi for the edge from `pred`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if `phi` is not a join phi.
    pub fn join_operand_at(&self, phi: NodeId, pred: BlockId) -> Result<Option<NodeId>> {
        match self.phi(phi)? {
            PhiStmt::Join(join) => Ok(join
                .operands
                .iter()
                .find(|(block, _)| *block == pred)
                .map(|(_, op)| *op)),
            _ => Err(invariant_error!("{} is not a join phi", phi)),
        }
    }

    /// Set the operand of a join phi for the edge from `pred`, cleaning up any previous
    /// one.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if `phi` is not a join phi or
    /// `operand` is not a free use of the phi's variable.
    pub fn set_join_operand_at(
        &mut self,
        phi: NodeId,
        pred: BlockId,
        operand: NodeId,
    ) -> Result<()> {
        self.check_operand(phi, operand)?;
        let PhiStmt::Join(join) = self.phi_mut(phi)? else {
            return Err(invariant_error!("{} is not a join phi", phi));
        };

        let old = match join.operands.iter_mut().find(|(block, _)| *block == pred) {
            Some(slot) => Some(std::mem::replace(&mut slot.1, operand)),
            None => {
                join.operands.push((pred, operand));
                None
            }
        };
        self.adopt_operand(phi, operand, old)
    }

    /// Drop the operands of a join phi whose block is not in `preds`, and return the
    /// remaining ones in `preds` order.
    ///
    /// Predecessors without an operand are skipped in the result.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if `phi` is not a join phi.
    pub fn retain_join_operands(&mut self, phi: NodeId, preds: &[BlockId]) -> Result<Vec<NodeId>> {
        let PhiStmt::Join(join) = self.phi_mut(phi)? else {
            return Err(invariant_error!("{} is not a join phi", phi));
        };

        let mut dropped = Vec::new();
        join.operands.retain(|(block, op)| {
            let keep = preds.contains(block);
            if !keep {
                dropped.push(*op);
            }
            keep
        });
        let kept: Vec<NodeId> = preds
            .iter()
            .filter_map(|pred| {
                join.operands
                    .iter()
                    .find(|(block, _)| block == pred)
                    .map(|(_, op)| *op)
            })
            .collect();

        for op in dropped {
            log::trace!("dropping operand {} of {} for a removed edge", op, phi);
            self.data_mut(op)?.parent = None;
            self.cleanup(op)?;
        }
        Ok(kept)
    }

    /// Append an operand to a catch phi.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if `phi` is not a catch phi, `operand`
    /// is not a free use of the phi's variable, or an existing operand already stands
    /// for the same definition.
    pub fn add_catch_operand(&mut self, phi: NodeId, operand: NodeId) -> Result<()> {
        self.check_operand(phi, operand)?;
        let def = self.underlying_def(operand)?;
        if self.has_catch_operand_def(phi, def)? {
            return Err(invariant_error!(
                "Catch phi {} already has an operand for definition {:?}",
                phi,
                def
            ));
        }

        let PhiStmt::Catch(catch) = self.phi_mut(phi)? else {
            return Err(invariant_error!("{} is not a catch phi", phi));
        };
        catch.operands.push(operand);
        self.adopt_operand(phi, operand, None)
    }

    /// Returns `true` if some operand of the catch phi stands for `def`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if `phi` is not a catch phi.
    pub fn has_catch_operand_def(&self, phi: NodeId, def: Option<NodeId>) -> Result<bool> {
        let PhiStmt::Catch(catch) = self.phi(phi)? else {
            return Err(invariant_error!("{} is not a catch phi", phi));
        };
        for &op in &catch.operands {
            if self.underlying_def(op)? == def {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Operand `index` of a catch phi, in insertion order.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if `phi` is not a catch phi, or
    /// [`crate::Error::OutOfBounds`] if `index` is past the last operand.
    pub fn catch_operand_at(&self, phi: NodeId, index: usize) -> Result<NodeId> {
        let PhiStmt::Catch(catch) = self.phi(phi)? else {
            return Err(invariant_error!("{} is not a catch phi", phi));
        };
        catch
            .operands
            .get(index)
            .copied()
            .ok_or(crate::Error::OutOfBounds)
    }

    /// Replace operand `index` of a catch phi, cleaning up the previous one.
    ///
    /// Uniqueness is not checked here; it is restored the next time the operands are
    /// read through [`Tree::catch_phi_operands`].
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if `phi` is not a catch phi or
    /// `operand` is not a free use of the phi's variable, or
    /// [`crate::Error::OutOfBounds`] if `index` is past the last operand.
    pub fn set_catch_operand_at(&mut self, phi: NodeId, index: usize, operand: NodeId) -> Result<()> {
        self.check_operand(phi, operand)?;
        let PhiStmt::Catch(catch) = self.phi_mut(phi)? else {
            return Err(invariant_error!("{} is not a catch phi", phi));
        };
        let slot = catch
            .operands
            .get_mut(index)
            .ok_or(crate::Error::OutOfBounds)?;
        let old = std::mem::replace(slot, operand);
        self.adopt_operand(phi, operand, Some(old))
    }

    /// Operands of a catch phi, one per distinct definition.
    ///
    /// Definitions may have changed since operands were added, so duplicates are removed
    /// and cleaned up here, keeping the first operand for each definition.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if `phi` is not a catch phi.
    pub fn catch_phi_operands(&mut self, phi: NodeId) -> Result<Vec<NodeId>> {
        let PhiStmt::Catch(catch) = self.phi(phi)? else {
            return Err(invariant_error!("{} is not a catch phi", phi));
        };
        let operands = catch.operands.clone();

        let mut seen = Vec::with_capacity(operands.len());
        let mut kept = Vec::with_capacity(operands.len());
        let mut dropped = Vec::new();
        for op in operands {
            let def = self.underlying_def(op)?;
            if seen.contains(&def) {
                dropped.push(op);
            } else {
                seen.push(def);
                kept.push(op);
            }
        }

        if !dropped.is_empty() {
            if let PhiStmt::Catch(catch) = self.phi_mut(phi)? {
                catch.operands.clone_from(&kept);
            }
            for op in dropped {
                log::trace!("dropping duplicate catch operand {} of {}", op, phi);
                self.data_mut(op)?.parent = None;
                self.cleanup(op)?;
            }
        }
        Ok(kept)
    }

    /// Operand of a return phi for the path through call block `call`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if `phi` is not a return phi.
    pub fn return_operand_at(&self, phi: NodeId, call: BlockId) -> Result<Option<NodeId>> {
        match self.phi(phi)? {
            PhiStmt::Return(ret) => Ok(ret
                .operands
                .iter()
                .find(|(block, _)| *block == call)
                .map(|(_, op)| *op)),
            _ => Err(invariant_error!("{} is not a return phi", phi)),
        }
    }

    /// Set the operand of a return phi for call block `call`, cleaning up any previous
    /// one.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if `phi` is not a return phi or
    /// `operand` is not a free use of the phi's variable.
    pub fn set_return_operand_at(
        &mut self,
        phi: NodeId,
        call: BlockId,
        operand: NodeId,
    ) -> Result<()> {
        self.check_operand(phi, operand)?;
        let PhiStmt::Return(ret) = self.phi_mut(phi)? else {
            return Err(invariant_error!("{} is not a return phi", phi));
        };

        let old = match ret.operands.iter_mut().find(|(block, _)| *block == call) {
            Some(slot) => Some(std::mem::replace(&mut slot.1, operand)),
            None => {
                ret.operands.push((call, operand));
                None
            }
        };
        self.adopt_operand(phi, operand, old)
    }
}
