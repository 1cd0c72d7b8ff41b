//! Per-variable bookkeeping for SSA construction.

use log::debug;

use crate::{
    analysis::cfg::{FlowGraph, GraphStamp, SubroutineId},
    tree::{NodeId, PhiKind, Tree, VarKey},
    utils::graph::BlockId,
    Error, Result,
};

/// Everything the SSA builder knows about one variable.
///
/// Per-block data is stored in arrays indexed by the pre-order number of the block,
/// so the info is tied to the graph shape it was created for. Every block-indexed call
/// checks the graph's [`GraphStamp`] first and fails with [`Error::StaleGraph`] once
/// blocks or edges were added or removed.
///
/// Each block holds at most one phi for the variable. When two phi kinds compete for
/// a block, the higher [`PhiKind`] wins: a return phi replaces a catch or join phi,
/// a catch phi replaces a join phi, and a lower or equal kind is refused.
///
/// # Examples
///
/// ```rust
/// use classscope::{
///     analysis::{cfg::FlowGraph, ssa::SsaConstructionInfo},
///     classfile::Type,
///     tree::{Constant, PhiKind},
/// };
///
/// let mut cfg = FlowGraph::new(0);
/// let join = cfg.add_block(8);
/// cfg.add_edge(cfg.entry(), join)?;
///
/// let target = cfg.tree_mut().new_local(3, Type::Int);
/// let value = cfg.tree_mut().new_constant(Constant::Int(1));
/// let store = cfg.tree_mut().new_store(target, value)?;
/// cfg.append_stmt(cfg.entry(), store)?;
///
/// let mut info = SsaConstructionInfo::new(&mut cfg, target)?;
/// info.add_real(&cfg, target)?;
/// assert_eq!(info.def_blocks(), &[cfg.entry()]);
///
/// assert!(info.add_phi(&mut cfg, join)?);
/// assert!(info.add_catch_phi(&mut cfg, join)?);
/// assert!(!info.add_phi(&mut cfg, join)?);
/// let phi = info.phi_at_block(&cfg, join)?.unwrap();
/// assert_eq!(cfg.tree().phi_kind(phi), Some(PhiKind::Catch));
///
/// assert!(info.remove_phi_at_block(&mut cfg, join)?);
/// assert_eq!(info.phi_at_block(&cfg, join)?, None);
/// # Ok::<(), classscope::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct SsaConstructionInfo {
    var: VarKey,
    prototype: NodeId,
    stamp: GraphStamp,
    phis: Vec<Option<NodeId>>,
    reals: Vec<Vec<NodeId>>,
    all_reals: Vec<NodeId>,
    def_blocks: Vec<BlockId>,
}

impl SsaConstructionInfo {
    /// Create the info for the variable `occurrence` belongs to, laid out for the
    /// current shape of `cfg`.
    ///
    /// A fresh, parentless and definition-less copy of the variable is allocated as
    /// the prototype for phi targets and operands.
    ///
    /// # Errors
    /// Returns [`Error::InvariantViolation`] if `occurrence` is not a variable.
    pub fn new(cfg: &mut FlowGraph, occurrence: NodeId) -> Result<Self> {
        let var = cfg.tree().var_key(occurrence)?;
        let prototype = cfg.tree_mut().new_var_like(occurrence)?;
        let block_count = cfg.block_count();

        Ok(SsaConstructionInfo {
            var,
            prototype,
            stamp: cfg.stamp(),
            phis: vec![None; block_count],
            reals: vec![Vec::new(); block_count],
            all_reals: Vec::new(),
            def_blocks: Vec::new(),
        })
    }

    /// The variable this info describes.
    #[must_use]
    pub const fn var(&self) -> VarKey {
        self.var
    }

    /// The template node new phi targets and operands are copied from.
    #[must_use]
    pub const fn prototype(&self) -> NodeId {
        self.prototype
    }

    /// The graph shape this info is laid out for.
    #[must_use]
    pub const fn stamp(&self) -> GraphStamp {
        self.stamp
    }

    fn slot(&self, cfg: &FlowGraph, block: BlockId) -> Result<usize> {
        cfg.check_stamp(self.stamp)?;
        let index = cfg.pre_order_index(block)?;
        if index < self.phis.len() {
            Ok(index)
        } else {
            Err(Error::StaleGraph)
        }
    }

    /// Record that `block` defines the variable. Duplicates are ignored.
    ///
    /// # Errors
    /// Returns [`Error::StaleGraph`] or [`Error::ForeignBlock`] for unusable blocks.
    pub fn add_def_block(&mut self, cfg: &FlowGraph, block: BlockId) -> Result<()> {
        self.slot(cfg, block)?;
        if !self.def_blocks.contains(&block) {
            self.def_blocks.push(block);
        }
        Ok(())
    }

    /// Blocks defining the variable, in the order they were recorded. Blocks that
    /// received a phi count as defining blocks.
    #[must_use]
    pub fn def_blocks(&self) -> &[BlockId] {
        &self.def_blocks
    }

    /// The phi for the variable at `block`, if any.
    ///
    /// # Errors
    /// Returns [`Error::StaleGraph`] or [`Error::ForeignBlock`] for unusable blocks.
    pub fn phi_at_block(&self, cfg: &FlowGraph, block: BlockId) -> Result<Option<NodeId>> {
        let slot = self.slot(cfg, block)?;
        Ok(self.phis[slot].filter(|phi| cfg.tree().is_valid(*phi)))
    }

    /// All phis currently held, in pre-order of their blocks.
    pub fn phis(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.phis.iter().flatten().copied()
    }

    /// Number of phis currently held.
    #[must_use]
    pub fn phi_count(&self) -> usize {
        self.phis.iter().flatten().count()
    }

    /// Remove the phi at `block` from its block, clean it up together with all of its
    /// operands and empty the slot. Returns `false` if there was no phi.
    ///
    /// # Errors
    /// Returns [`Error::StaleGraph`] or [`Error::ForeignBlock`] for unusable blocks.
    pub fn remove_phi_at_block(&mut self, cfg: &mut FlowGraph, block: BlockId) -> Result<bool> {
        let slot = self.slot(cfg, block)?;
        let Some(phi) = self.phis[slot].take() else {
            return Ok(false);
        };
        if !cfg.tree().is_valid(phi) {
            return Ok(false);
        }

        debug!("removing phi {} for {} at {}", phi, self.var, block);
        cfg.cleanup_node(phi)?;
        Ok(true)
    }

    /// Place a phi of `kind` at `block` unless an equal or higher ranked phi is
    /// already there. A lower ranked occupant is removed first.
    fn place<F>(
        &mut self,
        cfg: &mut FlowGraph,
        block: BlockId,
        kind: PhiKind,
        build: F,
    ) -> Result<bool>
    where
        F: FnOnce(&mut Tree, NodeId) -> Result<NodeId>,
    {
        if let Some(existing) = self.phi_at_block(cfg, block)? {
            let existing_kind = cfg.tree().phi_kind(existing).ok_or_else(|| {
                invariant_error!("Phi slot of {} at {} holds non-phi {}", self.var, block, existing)
            })?;
            if existing_kind >= kind {
                return Ok(false);
            }
            debug!(
                "{} phi for {} at {} replaces the {} phi",
                kind, self.var, block, existing_kind
            );
            self.remove_phi_at_block(cfg, block)?;
        }

        let target = cfg.tree_mut().new_var_like(self.prototype)?;
        let phi = build(cfg.tree_mut(), target)?;
        cfg.prepend_stmt(block, phi)?;

        let slot = self.slot(cfg, block)?;
        self.phis[slot] = Some(phi);
        self.add_def_block(cfg, block)?;
        debug!("place {} phi for {} in {}", kind, self.var, block);
        Ok(true)
    }

    /// Place a join phi at `block` with one operand per predecessor. Returns `false`
    /// if a phi already occupies the block.
    ///
    /// # Errors
    /// Returns [`Error::StaleGraph`] or [`Error::ForeignBlock`] for unusable blocks.
    pub fn add_phi(&mut self, cfg: &mut FlowGraph, block: BlockId) -> Result<bool> {
        let preds: Vec<BlockId> = cfg.preds(block).collect();
        self.place(cfg, block, PhiKind::Join, |tree, target| {
            tree.new_phi_join(target, block, &preds)
        })
    }

    /// Place an empty catch phi at the handler entry `block`, replacing a join phi.
    /// Stack variables never receive catch phis; for them this returns `false`.
    ///
    /// # Errors
    /// Returns [`Error::StaleGraph`] or [`Error::ForeignBlock`] for unusable blocks.
    pub fn add_catch_phi(&mut self, cfg: &mut FlowGraph, block: BlockId) -> Result<bool> {
        if !self.var.is_local() {
            return Ok(false);
        }
        self.place(cfg, block, PhiKind::Catch, |tree, target| tree.new_phi_catch(target))
    }

    /// Place a return phi at the return block of every path of `sub`, with one operand
    /// per call block returning there. Returns the blocks that received a phi.
    ///
    /// # Errors
    /// Returns [`Error::InvariantViolation`] for unknown subroutines and
    /// [`Error::StaleGraph`] or [`Error::ForeignBlock`] for unusable blocks.
    pub fn add_ret_phis(
        &mut self,
        cfg: &mut FlowGraph,
        sub: SubroutineId,
    ) -> Result<Vec<BlockId>> {
        let subroutine = cfg
            .subroutine(sub)
            .ok_or_else(|| invariant_error!("Unknown subroutine {}", sub))?;
        let targets: Vec<(BlockId, Vec<BlockId>)> = subroutine
            .return_blocks()
            .into_iter()
            .map(|ret| (ret, subroutine.calls_returning_to(ret).collect()))
            .collect();

        let mut placed = Vec::with_capacity(targets.len());
        for (ret, calls) in targets {
            let added = self.place(cfg, ret, PhiKind::Return, |tree, target| {
                tree.new_phi_return(target, sub, &calls)
            })?;
            if added {
                placed.push(ret);
            }
        }
        Ok(placed)
    }

    /// Record a real (non-phi) occurrence. Definitions mark their block as a defining
    /// block.
    ///
    /// # Errors
    /// Returns [`Error::InvariantViolation`] if `real` is not an occurrence of this
    /// variable placed in a block, and [`Error::StaleGraph`] for a changed graph.
    pub fn add_real(&mut self, cfg: &FlowGraph, real: NodeId) -> Result<()> {
        let tree = cfg.tree();
        let key = tree.var_key(real)?;
        if key != self.var {
            return Err(invariant_error!(
                "Occurrence {} of {} recorded for {}",
                real,
                key,
                self.var
            ));
        }
        let block = tree
            .block_of(real)?
            .ok_or_else(|| invariant_error!("Occurrence {} is not placed in a block", real))?;

        let slot = self.slot(cfg, block)?;
        if self.reals[slot].contains(&real) {
            return Ok(());
        }
        self.reals[slot].push(real);
        self.all_reals.push(real);
        if tree.is_def(real)? {
            self.add_def_block(cfg, block)?;
        }
        Ok(())
    }

    /// All real occurrences in the order they were recorded.
    #[must_use]
    pub fn reals(&self) -> &[NodeId] {
        &self.all_reals
    }

    /// Real occurrences inside `block`, in the order they were recorded.
    ///
    /// # Errors
    /// Returns [`Error::StaleGraph`] or [`Error::ForeignBlock`] for unusable blocks.
    pub fn reals_at_block(&self, cfg: &FlowGraph, block: BlockId) -> Result<&[NodeId]> {
        let slot = self.slot(cfg, block)?;
        Ok(&self.reals[slot])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{classfile::Type, tree::Constant};

    fn setup() -> (FlowGraph, NodeId, [BlockId; 4]) {
        let mut cfg = FlowGraph::new(0);
        let b0 = cfg.entry();
        let b1 = cfg.add_block(4);
        let b2 = cfg.add_block(8);
        let b3 = cfg.add_block(12);
        for (from, to) in [(b0, b1), (b0, b2), (b1, b3), (b2, b3)] {
            cfg.add_edge(from, to).unwrap();
        }

        let tree = cfg.tree_mut();
        let target = tree.new_local(3, Type::Int);
        let value = tree.new_constant(Constant::Int(0));
        let store = tree.new_store(target, value).unwrap();
        cfg.append_stmt(b1, store).unwrap();
        (cfg, target, [b0, b1, b2, b3])
    }

    #[test]
    fn test_reals_and_def_blocks() {
        let (mut cfg, target, [_, b1, b2, b3]) = setup();
        let mut info = SsaConstructionInfo::new(&mut cfg, target).unwrap();
        assert_eq!(info.var(), VarKey::Local(3));

        let use_ = cfg.tree_mut().new_local(3, Type::Int);
        let stmt = cfg.tree_mut().new_return_expr(use_).unwrap();
        cfg.append_stmt(b3, stmt).unwrap();

        info.add_real(&cfg, target).unwrap();
        info.add_real(&cfg, use_).unwrap();
        info.add_real(&cfg, use_).unwrap();
        assert_eq!(info.reals(), &[target, use_]);
        assert_eq!(info.reals_at_block(&cfg, b3).unwrap(), &[use_]);
        assert!(info.reals_at_block(&cfg, b2).unwrap().is_empty());
        assert_eq!(info.def_blocks(), &[b1]);

        let other = cfg.tree_mut().new_local(4, Type::Int);
        assert!(matches!(
            info.add_real(&cfg, other),
            Err(Error::InvariantViolation { .. })
        ));
    }

    #[test]
    fn test_join_phi_operands_follow_preds() {
        let (mut cfg, target, [_, b1, b2, b3]) = setup();
        let mut info = SsaConstructionInfo::new(&mut cfg, target).unwrap();

        assert!(info.add_phi(&mut cfg, b3).unwrap());
        let phi = info.phi_at_block(&cfg, b3).unwrap().unwrap();
        assert_eq!(cfg.stmts(b3), &[phi]);
        assert_eq!(cfg.tree().phi_operands(phi).unwrap().len(), 2);
        assert!(cfg.tree().join_operand_at(phi, b1).unwrap().is_some());
        assert!(cfg.tree().join_operand_at(phi, b2).unwrap().is_some());
        assert_eq!(info.def_blocks(), &[b3]);
        assert_eq!(info.phi_count(), 1);
    }

    #[test]
    fn test_precedence() {
        let (mut cfg, target, [_, _, _, b3]) = setup();
        let mut info = SsaConstructionInfo::new(&mut cfg, target).unwrap();

        assert!(info.add_catch_phi(&mut cfg, b3).unwrap());
        let catch = info.phi_at_block(&cfg, b3).unwrap().unwrap();
        // A join phi cannot displace a catch phi
        assert!(!info.add_phi(&mut cfg, b3).unwrap());
        assert!(!info.add_catch_phi(&mut cfg, b3).unwrap());
        assert_eq!(info.phi_at_block(&cfg, b3).unwrap(), Some(catch));
        assert_eq!(cfg.stmts(b3).len(), 1);
    }

    #[test]
    fn test_catch_replaces_join() {
        let (mut cfg, target, [_, _, _, b3]) = setup();
        let mut info = SsaConstructionInfo::new(&mut cfg, target).unwrap();

        info.add_phi(&mut cfg, b3).unwrap();
        let join = info.phi_at_block(&cfg, b3).unwrap().unwrap();
        let operands = cfg.tree().phi_operands(join).unwrap();

        assert!(info.add_catch_phi(&mut cfg, b3).unwrap());
        assert!(!cfg.tree().is_valid(join));
        assert!(operands.iter().all(|op| !cfg.tree().is_valid(*op)));
        let catch = info.phi_at_block(&cfg, b3).unwrap().unwrap();
        assert_eq!(cfg.tree().phi_kind(catch), Some(PhiKind::Catch));
        assert_eq!(cfg.stmts(b3), &[catch]);
    }

    #[test]
    fn test_stack_variables_get_no_catch_phi() {
        let (mut cfg, _, [_, _, _, b3]) = setup();
        let slot = cfg.tree_mut().new_stack(0, Type::Int);
        let stmt = cfg.tree_mut().new_expr_stmt(slot).unwrap();
        cfg.append_stmt(b3, stmt).unwrap();

        let mut info = SsaConstructionInfo::new(&mut cfg, slot).unwrap();
        assert!(!info.add_catch_phi(&mut cfg, b3).unwrap());
        assert_eq!(info.phi_at_block(&cfg, b3).unwrap(), None);
    }

    #[test]
    fn test_stale_and_foreign_blocks() {
        let (mut cfg, target, [_, _, _, b3]) = setup();
        let mut info = SsaConstructionInfo::new(&mut cfg, target).unwrap();

        assert!(matches!(
            info.phi_at_block(&cfg, BlockId::new(42)),
            Err(Error::ForeignBlock(_))
        ));

        cfg.add_block(16);
        assert!(matches!(info.phi_at_block(&cfg, b3), Err(Error::StaleGraph)));
        assert!(matches!(info.add_phi(&mut cfg, b3), Err(Error::StaleGraph)));
        assert!(matches!(info.add_real(&cfg, target), Err(Error::StaleGraph)));
    }

    #[test]
    fn test_remove_missing_phi() {
        let (mut cfg, target, [b0, ..]) = setup();
        let mut info = SsaConstructionInfo::new(&mut cfg, target).unwrap();
        assert!(!info.remove_phi_at_block(&mut cfg, b0).unwrap());
    }
}
