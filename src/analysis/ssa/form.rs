//! The result of SSA construction.

use std::collections::BTreeMap;

use log::debug;

use crate::{
    analysis::{
        cfg::FlowGraph,
        ssa::{SsaConstructionInfo, VersionCounter},
    },
    tree::{NodeId, PhiKind, VarKey},
    utils::graph::BlockId,
    Result,
};

/// Per-variable construction state of a converted [`FlowGraph`].
///
/// The form does not own the graph; every operation that inspects phis takes the graph
/// the form was built from.
#[derive(Debug)]
pub struct SsaForm {
    infos: BTreeMap<VarKey, SsaConstructionInfo>,
    versions: VersionCounter,
}

impl SsaForm {
    pub(crate) fn new(
        infos: BTreeMap<VarKey, SsaConstructionInfo>,
        versions: VersionCounter,
    ) -> Self {
        SsaForm { infos, versions }
    }

    /// Construction state of `var`, if it occurs in the graph.
    #[must_use]
    pub fn info(&self, var: VarKey) -> Option<&SsaConstructionInfo> {
        self.infos.get(&var)
    }

    /// Construction state of every converted variable, ordered by variable.
    pub fn infos(&self) -> impl Iterator<Item = &SsaConstructionInfo> + '_ {
        self.infos.values()
    }

    /// The converted variables.
    pub fn variables(&self) -> impl Iterator<Item = VarKey> + '_ {
        self.infos.keys().copied()
    }

    /// Number of phis currently placed, over all variables.
    #[must_use]
    pub fn phi_count(&self) -> usize {
        self.infos.values().map(SsaConstructionInfo::phi_count).sum()
    }

    /// Number of versions handed out for `var`.
    #[must_use]
    pub fn version_count(&self, var: VarKey) -> u32 {
        self.versions.count(var)
    }

    /// Remove the phi of `var` at `block`.
    ///
    /// Operands of other phis and uses that still link to the removed target are left
    /// dangling; [`crate::tree::Tree::version_of`] reports `None` for them.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StaleGraph`] if the graph changed shape since construction.
    pub fn remove_phi_at_block(
        &mut self,
        cfg: &mut FlowGraph,
        var: VarKey,
        block: BlockId,
    ) -> Result<bool> {
        match self.infos.get_mut(&var) {
            Some(info) => info.remove_phi_at_block(cfg, block),
            None => Ok(false),
        }
    }

    /// Remove phis whose operands all name the same definition (or the phi itself),
    /// redirecting their uses to that definition. Runs until nothing changes and returns
    /// the number of phis removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph changed shape since construction or a phi was
    /// modified into an inconsistent state.
    pub fn collapse_redundant_phis(&mut self, cfg: &mut FlowGraph) -> Result<usize> {
        let mut removed = 0;
        loop {
            let mut changed = false;
            for info in self.infos.values_mut() {
                let phis: Vec<NodeId> = info.phis().collect();
                for phi in phis {
                    if !cfg.tree().is_valid(phi) {
                        continue;
                    }
                    let Some(replacement) = redundant_def(cfg, phi)? else {
                        continue;
                    };
                    let target = cfg.tree().phi_target(phi)?;
                    redirect_uses(cfg, info, target, replacement)?;

                    let Some(block) = cfg.tree().block_of(phi)? else {
                        continue;
                    };
                    if info.remove_phi_at_block(cfg, block)? {
                        debug!("collapsed {} into {}", target, replacement);
                        removed += 1;
                        changed = true;
                    }
                }
            }
            if !changed {
                return Ok(removed);
            }
        }
    }
}

/// The single definition `phi` merges, if it merges only one.
fn redundant_def(cfg: &mut FlowGraph, phi: NodeId) -> Result<Option<NodeId>> {
    let tree = cfg.tree_mut();
    let target = tree.phi_target(phi)?;
    let operands = if tree.phi_kind(phi) == Some(PhiKind::Catch) {
        tree.catch_phi_operands(phi)?
    } else {
        tree.phi_operands(phi)?
    };

    let mut single = None;
    for operand in operands {
        match tree.underlying_def(operand)? {
            None => return Ok(None),
            Some(def) if def == target => {}
            Some(def) => match single {
                None => single = Some(def),
                Some(seen) if seen == def => {}
                Some(_) => return Ok(None),
            },
        }
    }
    Ok(single)
}

/// Point every use of `target` among the reals and phi operands of `info` at
/// `replacement`.
fn redirect_uses(
    cfg: &mut FlowGraph,
    info: &SsaConstructionInfo,
    target: NodeId,
    replacement: NodeId,
) -> Result<()> {
    let mut uses: Vec<NodeId> = info.reals().to_vec();
    for phi in info.phis() {
        if cfg.tree().is_valid(phi) {
            uses.extend(cfg.tree().phi_operands(phi)?);
        }
    }

    let tree = cfg.tree_mut();
    for id in uses {
        if tree.is_valid(id) && !tree.is_def(id)? && tree.def_of(id)? == Some(target) {
            tree.set_def(id, Some(replacement))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::ssa::{SsaBuilder, SsaConfig},
        classfile::Type,
        tree::Constant,
    };

    /// b0: l0 := 7; b0 -> b1 -> b2 -> b1, b1 -> b3; b2: l0 := l0; b3: return l0
    fn copy_loop() -> (FlowGraph, NodeId, NodeId, BlockId) {
        let mut cfg = FlowGraph::new(0);
        let b0 = cfg.entry();
        let b1 = cfg.add_block(2);
        let b2 = cfg.add_block(4);
        let b3 = cfg.add_block(8);
        cfg.add_edge(b0, b1).unwrap();
        cfg.add_edge(b1, b2).unwrap();
        cfg.add_edge(b2, b1).unwrap();
        cfg.add_edge(b1, b3).unwrap();

        let tree = cfg.tree_mut();
        let target = tree.new_local(0, Type::Int);
        let value = tree.new_constant(Constant::Int(7));
        let store = tree.new_store(target, value).unwrap();
        cfg.append_stmt(b0, store).unwrap();

        let tree = cfg.tree_mut();
        let read = tree.new_local(0, Type::Int);
        let ret = tree.new_return_expr(read).unwrap();
        cfg.append_stmt(b3, ret).unwrap();

        let tree = cfg.tree_mut();
        let again = tree.new_local(0, Type::Int);
        let copy = tree.new_local(0, Type::Int);
        let stmt = tree.new_store(again, copy).unwrap();
        cfg.append_stmt(b2, stmt).unwrap();

        (cfg, target, read, b1)
    }

    #[test]
    fn test_collapse_copy_loop() {
        let (mut cfg, target, read, header) = copy_loop();
        let mut ssa = SsaBuilder::new(&mut cfg, SsaConfig::default())
            .build()
            .unwrap();
        let info = ssa.info(VarKey::Local(0)).unwrap();
        let phi = info.phi_at_block(&cfg, header).unwrap().unwrap();
        assert_eq!(ssa.phi_count(), 1);

        // the copy in the body is a second definition reaching the header
        assert_eq!(ssa.collapse_redundant_phis(&mut cfg).unwrap(), 0);
        assert!(cfg.tree().is_valid(phi));
        assert_ne!(cfg.tree().def_of(read).unwrap(), Some(target));
    }

    #[test]
    fn test_collapse_single_definition() {
        // b0: l0 := 1; b1: l0 := 2; b0 -> b1, b0 -> b2, b1 -> b3, b2 -> b3; b3: return l0
        let mut cfg = FlowGraph::new(0);
        let b0 = cfg.entry();
        let b1 = cfg.add_block(1);
        let b2 = cfg.add_block(2);
        let b3 = cfg.add_block(3);
        cfg.add_edge(b0, b1).unwrap();
        cfg.add_edge(b0, b2).unwrap();
        cfg.add_edge(b1, b3).unwrap();
        cfg.add_edge(b2, b3).unwrap();

        let tree = cfg.tree_mut();
        let target = tree.new_local(0, Type::Int);
        let value = tree.new_constant(Constant::Int(1));
        let store = tree.new_store(target, value).unwrap();
        cfg.append_stmt(b0, store).unwrap();
        let tree = cfg.tree_mut();
        let other = tree.new_local(0, Type::Int);
        let value = tree.new_constant(Constant::Int(2));
        let store = tree.new_store(other, value).unwrap();
        cfg.append_stmt(b1, store).unwrap();
        let tree = cfg.tree_mut();
        let read = tree.new_local(0, Type::Int);
        let ret = tree.new_return_expr(read).unwrap();
        cfg.append_stmt(b3, ret).unwrap();

        let mut ssa = SsaBuilder::new(&mut cfg, SsaConfig::default())
            .build()
            .unwrap();
        let phi = ssa
            .info(VarKey::Local(0))
            .unwrap()
            .phi_at_block(&cfg, b3)
            .unwrap()
            .unwrap();

        // point the b1 operand back at the entry definition
        let from_b1 = cfg.tree().join_operand_at(phi, b1).unwrap().unwrap();
        cfg.tree_mut().set_def(from_b1, Some(target)).unwrap();

        assert_eq!(ssa.collapse_redundant_phis(&mut cfg).unwrap(), 1);
        assert!(!cfg.tree().is_valid(phi));
        assert_eq!(cfg.tree().def_of(read).unwrap(), Some(target));
        assert_eq!(ssa.phi_count(), 0);
    }

    #[test]
    fn test_remove_phi_of_unknown_variable() {
        let mut cfg = FlowGraph::new(0);
        let entry = cfg.entry();
        let mut ssa = SsaBuilder::new(&mut cfg, SsaConfig::default())
            .build()
            .unwrap();
        assert!(!ssa
            .remove_phi_at_block(&mut cfg, VarKey::Local(9), entry)
            .unwrap());
        assert_eq!(ssa.variables().count(), 0);
    }
}
