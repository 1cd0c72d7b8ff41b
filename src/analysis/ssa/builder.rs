//! SSA construction over expression trees.
//!
//! Variables are converted one at a time. For each variable the builder
//!
//! 1. collects the real (non-phi) occurrences from every block,
//! 2. places return phis after the calls of subroutines whose return blocks reach an
//!    occurrence,
//! 3. places catch phis at handler entries that reach an occurrence (locals only),
//! 4. places join phis on the iterated dominance frontier of the defining blocks
//!    (Cytron et al., "Efficiently Computing Static Single Assignment Form and the
//!    Control Dependence Graph", TOPLAS 1991),
//! 5. walks the dominator tree with a stack of reaching definitions, numbering every
//!    definition and linking every use and phi operand to the definition reaching it.
//!
//! Phis are placed directly at the head of their blocks; return phis outrank catch
//! phis, which outrank join phis (see [`SsaConstructionInfo`]).

use std::collections::BTreeMap;

use log::{trace, warn};

use crate::{
    analysis::{
        cfg::{FlowGraph, Handler, SubroutineId},
        ssa::{SsaConfig, SsaConstructionInfo, SsaForm, VersionCounter},
    },
    tree::{NodeId, PhiKind, PhiStmt, Tree, TreeVisitor, VarKey},
    utils::graph::{
        algorithms::{self, DominatorTree},
        BlockId,
    },
    Error, Result,
};

/// Collects the real occurrences of every variable in block order.
struct OccurrenceCollector {
    stack_variables: bool,
    occurrences: BTreeMap<VarKey, Vec<NodeId>>,
    phis: usize,
}

impl TreeVisitor for OccurrenceCollector {
    fn visit_phi_stmt(&mut self, _tree: &Tree, _id: NodeId) {
        self.phis += 1;
    }

    fn visit_var_expr(&mut self, tree: &Tree, id: NodeId) {
        if let Ok(key) = tree.var_key(id) {
            if key.is_local() || self.stack_variables {
                self.occurrences.entry(key).or_default().push(id);
            }
        }
    }
}

/// Converts the variables of a [`FlowGraph`] into SSA form in place.
///
/// # Examples
///
/// ```rust
/// use classscope::{
///     analysis::{cfg::FlowGraph, ssa::{SsaBuilder, SsaConfig}},
///     classfile::Type,
///     tree::{Constant, VarKey},
/// };
///
/// let mut cfg = FlowGraph::new(0);
/// let entry = cfg.entry();
/// let exit = cfg.add_block(4);
/// cfg.add_edge(entry, exit)?;
///
/// let tree = cfg.tree_mut();
/// let target = tree.new_local(0, Type::Int);
/// let value = tree.new_constant(Constant::Int(5));
/// let store = tree.new_store(target, value)?;
/// let read = tree.new_local(0, Type::Int);
/// let ret = tree.new_return_expr(read)?;
/// cfg.append_stmt(entry, store)?;
/// cfg.append_stmt(exit, ret)?;
///
/// let ssa = SsaBuilder::new(&mut cfg, SsaConfig::default()).build()?;
/// assert_eq!(ssa.phi_count(), 0);
/// assert_eq!(cfg.tree().def_of(read)?, Some(target));
/// assert_eq!(cfg.tree().display(ret).to_string(), "return l0_0");
/// # Ok::<(), classscope::Error>(())
/// ```
#[derive(Debug)]
pub struct SsaBuilder<'a> {
    cfg: &'a mut FlowGraph,
    config: SsaConfig,
    versions: VersionCounter,
}

impl<'a> SsaBuilder<'a> {
    /// Create a builder for `cfg`.
    pub fn new(cfg: &'a mut FlowGraph, config: SsaConfig) -> Self {
        SsaBuilder {
            cfg,
            config,
            versions: VersionCounter::new(),
        }
    }

    /// Convert every variable and return the per-variable construction state.
    ///
    /// A graph converts once: one that already holds phis or numbered definitions is
    /// rejected before anything is changed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if the graph is already in SSA form, or an error if
    /// an invariant of the tree or the graph is violated on the way. The graph is then
    /// left partially converted and must be discarded.
    pub fn build(mut self) -> Result<SsaForm> {
        let occurrences = self.collect_occurrences()?;

        let mut infos = BTreeMap::new();
        for (var, reals) in occurrences {
            let info = self.convert(var, &reals)?;
            infos.insert(var, info);
        }

        let mut form = SsaForm::new(infos, self.versions);
        if self.config.collapse_redundant_phis {
            form.collapse_redundant_phis(self.cfg)?;
        }
        Ok(form)
    }

    fn collect_occurrences(&self) -> Result<BTreeMap<VarKey, Vec<NodeId>>> {
        let mut collector = OccurrenceCollector {
            stack_variables: self.config.stack_variables,
            occurrences: BTreeMap::new(),
            phis: 0,
        };
        collector.visit_flow_graph(self.cfg);
        if collector.phis > 0 {
            return Err(Error::GraphError(format!(
                "Graph already holds {} phis",
                collector.phis
            )));
        }

        let tree = self.cfg.tree();
        for (var, reals) in &collector.occurrences {
            for &real in reals {
                if tree.is_def(real)? && tree.version_of(real)?.is_some() {
                    return Err(Error::GraphError(format!(
                        "{} is already numbered",
                        tree.display(real)
                    )));
                }
            }
            trace!("{} has {} occurrences", var, reals.len());
        }
        Ok(collector.occurrences)
    }

    fn convert(&mut self, var: VarKey, reals: &[NodeId]) -> Result<SsaConstructionInfo> {
        let Some(&first) = reals.first() else {
            return Err(invariant_error!("No occurrences collected for {}", var));
        };

        let mut info = SsaConstructionInfo::new(self.cfg, first)?;
        let mut unreachable = 0usize;
        for &real in reals {
            info.add_real(self.cfg, real)?;
            if let Some(block) = self.cfg.tree().block_of(real)? {
                if !self.cfg.is_reachable(block) {
                    unreachable += 1;
                }
            }
        }
        if unreachable > 0 {
            warn!(
                "{} occurrences of {} lie in unreachable blocks and are left unrenamed",
                unreachable, var
            );
        }

        if self.config.insert_return_phis {
            self.place_return_phis(&mut info)?;
        }
        if self.config.insert_catch_phis && var.is_local() {
            self.place_catch_phis(&mut info)?;
        }
        self.place_join_phis(&mut info)?;
        self.rename(&info)?;
        Ok(info)
    }

    /// Returns `true` if an occurrence of the variable is reachable from `from`.
    fn reaches_real(&self, info: &SsaConstructionInfo, from: BlockId) -> Result<bool> {
        let reachable = algorithms::reachable(&*self.cfg, from);
        for &real in info.reals() {
            if let Some(block) = self.cfg.tree().block_of(real)? {
                if reachable.get(block.index()).copied().unwrap_or(false) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn place_return_phis(&mut self, info: &mut SsaConstructionInfo) -> Result<()> {
        let subs: Vec<(SubroutineId, Vec<BlockId>)> = self
            .cfg
            .subroutines()
            .iter()
            .filter(|sub| sub.exit().is_some())
            .map(|sub| (sub.id(), sub.return_blocks()))
            .collect();

        for (sub, returns) in subs {
            let mut live = false;
            for ret in returns {
                if self.reaches_real(info, ret)? {
                    live = true;
                    break;
                }
            }
            if live {
                info.add_ret_phis(self.cfg, sub)?;
            }
        }
        Ok(())
    }

    fn place_catch_phis(&mut self, info: &mut SsaConstructionInfo) -> Result<()> {
        for catch in self.cfg.catch_blocks() {
            if self.reaches_real(info, catch)? {
                info.add_catch_phi(self.cfg, catch)?;
            }
        }
        Ok(())
    }

    fn place_join_phis(&mut self, info: &mut SsaConstructionInfo) -> Result<()> {
        let frontiers = self.cfg.dominance_frontiers().to_vec();
        let mut queued = vec![false; frontiers.len()];
        let mut worklist: Vec<BlockId> = info.def_blocks().to_vec();
        for block in &worklist {
            queued[block.index()] = true;
        }

        while let Some(block) = worklist.pop() {
            for &frontier in &frontiers[block.index()] {
                if info.phi_at_block(self.cfg, frontier)?.is_some() {
                    continue;
                }
                if info.add_phi(self.cfg, frontier)? && !queued[frontier.index()] {
                    queued[frontier.index()] = true;
                    worklist.push(frontier);
                }
            }
        }
        Ok(())
    }

    fn rename(&mut self, info: &SsaConstructionInfo) -> Result<()> {
        let entry = self.cfg.entry();
        let dominators = self.cfg.dominators().clone();
        let mut reaching: Vec<NodeId> = Vec::new();
        self.rename_block(info, entry, &dominators, &mut reaching)
    }

    fn define(&mut self, var: VarKey, def: NodeId) -> Result<()> {
        let version = self.versions.next(var);
        self.cfg.tree_mut().set_version(def, version)?;
        trace!("{} defines {}_{}", def, var, version);
        Ok(())
    }

    /// Rename the occurrences in `block`, fill the phi operands fed by it and recurse
    /// into the blocks it immediately dominates.
    fn rename_block(
        &mut self,
        info: &SsaConstructionInfo,
        block: BlockId,
        dominators: &DominatorTree,
        reaching: &mut Vec<NodeId>,
    ) -> Result<()> {
        let var = info.var();
        let depth = reaching.len();

        // Definitions that may be live when an exception leaves this block
        let mut live: Vec<NodeId> = Vec::new();

        if let Some(phi) = info.phi_at_block(self.cfg, block)? {
            let target = self.cfg.tree().phi_target(phi)?;
            self.define(var, target)?;
            reaching.push(target);
        }
        live.extend(reaching.last().copied());

        for &real in info.reals_at_block(self.cfg, block)? {
            if self.cfg.tree().is_def(real)? {
                self.define(var, real)?;
                reaching.push(real);
                live.push(real);
            } else {
                let def = reaching.last().copied();
                self.cfg.tree_mut().set_def(real, def)?;
                trace!("{} in {} uses {:?}", real, block, def);
            }
        }

        self.fill_catch_operands(info, block, &live)?;
        self.fill_successor_operands(info, block, reaching.last().copied())?;

        for &child in dominators.children(block) {
            self.rename_block(info, child, dominators, reaching)?;
        }

        reaching.truncate(depth);
        Ok(())
    }

    /// Add an operand for each definition in `live` to the catch phis of the handlers
    /// protecting `block`, skipping definitions the phi already has.
    fn fill_catch_operands(
        &mut self,
        info: &SsaConstructionInfo,
        block: BlockId,
        live: &[NodeId],
    ) -> Result<()> {
        if live.is_empty() {
            return Ok(());
        }

        let catch_blocks: Vec<BlockId> = self
            .cfg
            .handlers_protecting(block)
            .map(Handler::catch_block)
            .collect();
        for catch in catch_blocks {
            let Some(phi) = info.phi_at_block(self.cfg, catch)? else {
                continue;
            };
            if self.cfg.tree().phi_kind(phi) != Some(PhiKind::Catch) {
                continue;
            }

            for &def in live {
                let tree = self.cfg.tree_mut();
                if tree.has_catch_operand_def(phi, Some(def))? {
                    continue;
                }
                let operand = tree.new_var_like(info.prototype())?;
                tree.set_def(operand, Some(def))?;
                tree.add_catch_operand(phi, operand)?;
            }
        }
        Ok(())
    }

    /// Link the join and return phi operands that flow out of `block` to `def`.
    fn fill_successor_operands(
        &mut self,
        info: &SsaConstructionInfo,
        block: BlockId,
        def: Option<NodeId>,
    ) -> Result<()> {
        let succs: Vec<BlockId> = self.cfg.succs(block).collect();
        for succ in succs {
            let Some(phi) = info.phi_at_block(self.cfg, succ)? else {
                continue;
            };

            let operands: Vec<NodeId> = match self.cfg.tree().phi(phi)? {
                PhiStmt::Join(_) => self
                    .cfg
                    .tree()
                    .join_operand_at(phi, block)?
                    .into_iter()
                    .collect(),
                PhiStmt::Return(ret) => {
                    let Some(sub) = self.cfg.subroutine(ret.sub()) else {
                        continue;
                    };
                    if sub.exit() != Some(block) {
                        continue;
                    }
                    let mut operands = Vec::new();
                    for call in sub.calls_returning_to(succ) {
                        operands.extend(self.cfg.tree().return_operand_at(phi, call)?);
                    }
                    operands
                }
                PhiStmt::Catch(_) => continue,
            };

            for operand in operands {
                self.cfg.tree_mut().set_def(operand, def)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        classfile::Type,
        tree::{ArithOp, Constant},
    };

    fn store(cfg: &mut FlowGraph, block: BlockId, slot: u16, value: i32) -> NodeId {
        let tree = cfg.tree_mut();
        let target = tree.new_local(slot, Type::Int);
        let constant = tree.new_constant(Constant::Int(value));
        let stmt = tree.new_store(target, constant).unwrap();
        cfg.append_stmt(block, stmt).unwrap();
        target
    }

    fn read(cfg: &mut FlowGraph, block: BlockId, slot: u16) -> NodeId {
        let tree = cfg.tree_mut();
        let var = tree.new_local(slot, Type::Int);
        let stmt = tree.new_expr_stmt(var).unwrap();
        cfg.append_stmt(block, stmt).unwrap();
        var
    }

    #[test]
    fn test_loop_phi() {
        // b0: l1 := 0; b1: l1 := l1 + 1; b1 -> b1, b1 -> b2; b2: eval l1
        let mut cfg = FlowGraph::new(0);
        let b0 = cfg.entry();
        let b1 = cfg.add_block(2);
        let b2 = cfg.add_block(9);
        cfg.add_edge(b0, b1).unwrap();
        cfg.add_edge(b1, b1).unwrap();
        cfg.add_edge(b1, b2).unwrap();

        let init = store(&mut cfg, b0, 1, 0);
        let tree = cfg.tree_mut();
        let old = tree.new_local(1, Type::Int);
        let one = tree.new_constant(Constant::Int(1));
        let sum = tree.new_arith(ArithOp::Add, old, one, Type::Int).unwrap();
        let new = tree.new_local(1, Type::Int);
        let inc = tree.new_store(new, sum).unwrap();
        cfg.append_stmt(b1, inc).unwrap();
        let after = read(&mut cfg, b2, 1);

        let ssa = SsaBuilder::new(&mut cfg, SsaConfig::default())
            .build()
            .unwrap();
        let info = ssa.info(VarKey::Local(1)).unwrap();
        let phi = info.phi_at_block(&cfg, b1).unwrap().unwrap();
        let tree = cfg.tree();
        let target = tree.phi_target(phi).unwrap();

        assert_eq!(info.phi_count(), 1);
        assert_eq!(tree.def_of(old).unwrap(), Some(target));
        assert_eq!(tree.def_of(after).unwrap(), Some(new));
        let from_entry = tree.join_operand_at(phi, b0).unwrap().unwrap();
        let from_back_edge = tree.join_operand_at(phi, b1).unwrap().unwrap();
        assert_eq!(tree.def_of(from_entry).unwrap(), Some(init));
        assert_eq!(tree.def_of(from_back_edge).unwrap(), Some(new));
        assert_eq!(
            tree.display(phi).to_string(),
            "l1_1 := Phi(B0=l1_0, B1=l1_2)"
        );
        assert_eq!(tree.display(inc).to_string(), "l1_2 := (l1_1 + 1)");
    }

    #[test]
    fn test_straight_line_needs_no_phi() {
        let mut cfg = FlowGraph::new(0);
        let b0 = cfg.entry();
        let b1 = cfg.add_block(3);
        cfg.add_edge(b0, b1).unwrap();
        let first = store(&mut cfg, b0, 2, 1);
        let second = store(&mut cfg, b1, 2, 2);
        let use_ = read(&mut cfg, b1, 2);

        let ssa = SsaBuilder::new(&mut cfg, SsaConfig::default())
            .build()
            .unwrap();
        assert_eq!(ssa.phi_count(), 0);
        assert_eq!(cfg.tree().version_of(first).unwrap(), Some(0));
        assert_eq!(cfg.tree().version_of(second).unwrap(), Some(1));
        assert_eq!(cfg.tree().def_of(use_).unwrap(), Some(second));
        assert_eq!(ssa.version_count(VarKey::Local(2)), 2);
    }

    #[test]
    fn test_converted_graph_is_rejected() {
        // straight line: numbered definitions only
        let mut cfg = FlowGraph::new(0);
        let b0 = cfg.entry();
        store(&mut cfg, b0, 0, 1);
        read(&mut cfg, b0, 0);
        SsaBuilder::new(&mut cfg, SsaConfig::default())
            .build()
            .unwrap();
        let stamp = cfg.stamp();
        let result = SsaBuilder::new(&mut cfg, SsaConfig::default()).build();
        assert!(matches!(result, Err(Error::GraphError(_))));
        assert_eq!(cfg.stamp(), stamp);

        // diamond: a join phi is already in place
        let mut cfg = FlowGraph::new(0);
        let b0 = cfg.entry();
        let b1 = cfg.add_block(1);
        let b2 = cfg.add_block(2);
        let b3 = cfg.add_block(3);
        cfg.add_edge(b0, b1).unwrap();
        cfg.add_edge(b0, b2).unwrap();
        cfg.add_edge(b1, b3).unwrap();
        cfg.add_edge(b2, b3).unwrap();
        store(&mut cfg, b1, 0, 1);
        store(&mut cfg, b2, 0, 2);
        read(&mut cfg, b3, 0);
        let ssa = SsaBuilder::new(&mut cfg, SsaConfig::default())
            .build()
            .unwrap();
        assert_eq!(ssa.phi_count(), 1);
        let stmts = cfg.stmts(b3).len();

        let result = SsaBuilder::new(&mut cfg, SsaConfig::default()).build();
        assert!(matches!(result, Err(Error::GraphError(message)) if message.contains("1 phis")));
        assert_eq!(cfg.stmts(b3).len(), stmts);
    }

    #[test]
    fn test_use_without_definition() {
        let mut cfg = FlowGraph::new(0);
        let b0 = cfg.entry();
        let use_ = read(&mut cfg, b0, 0);

        SsaBuilder::new(&mut cfg, SsaConfig::default())
            .build()
            .unwrap();
        assert_eq!(cfg.tree().def_of(use_).unwrap(), None);
        assert_eq!(cfg.tree().version_of(use_).unwrap(), None);
    }

    #[test]
    fn test_stack_variables_can_be_skipped() {
        let mut cfg = FlowGraph::new(0);
        let b0 = cfg.entry();
        let tree = cfg.tree_mut();
        let slot = tree.new_stack(0, Type::Int);
        let stmt = tree.new_expr_stmt(slot).unwrap();
        cfg.append_stmt(b0, stmt).unwrap();
        read(&mut cfg, b0, 1);

        let ssa = SsaBuilder::new(&mut cfg, SsaConfig::default().with_stack_variables(false))
            .build()
            .unwrap();
        assert!(ssa.info(VarKey::Stack(0)).is_none());
        assert!(ssa.info(VarKey::Local(1)).is_some());
    }

    #[test]
    fn test_unreachable_block_is_left_alone() {
        let mut cfg = FlowGraph::new(0);
        let b0 = cfg.entry();
        let dead = cfg.add_block(50);
        store(&mut cfg, b0, 0, 1);
        let use_ = read(&mut cfg, dead, 0);

        SsaBuilder::new(&mut cfg, SsaConfig::default())
            .build()
            .unwrap();
        assert_eq!(cfg.tree().def_of(use_).unwrap(), None);
    }

    #[test]
    fn test_catch_phi_collects_live_definitions() {
        // b0 -> b1 -> b2, b1 protected by handler b3 which reads l0
        let mut cfg = FlowGraph::new(0);
        let b0 = cfg.entry();
        let b1 = cfg.add_block(2);
        let b2 = cfg.add_block(6);
        let b3 = cfg.add_block(10);
        cfg.add_edge(b0, b1).unwrap();
        cfg.add_edge(b1, b2).unwrap();
        cfg.add_handler(vec![b1], b3, None).unwrap();

        let before = store(&mut cfg, b0, 0, 1);
        let inside = store(&mut cfg, b1, 0, 2);
        let handled = read(&mut cfg, b3, 0);

        let ssa = SsaBuilder::new(&mut cfg, SsaConfig::default())
            .build()
            .unwrap();
        let phi = ssa
            .info(VarKey::Local(0))
            .unwrap()
            .phi_at_block(&cfg, b3)
            .unwrap()
            .unwrap();

        let tree = cfg.tree_mut();
        assert_eq!(tree.phi_kind(phi), Some(PhiKind::Catch));
        let operands = tree.catch_phi_operands(phi).unwrap();
        let defs: Vec<Option<NodeId>> = operands
            .iter()
            .map(|op| tree.underlying_def(*op).unwrap())
            .collect();
        assert_eq!(defs, vec![Some(before), Some(inside)]);
        assert_eq!(tree.def_of(handled).unwrap(), Some(tree.phi_target(phi).unwrap()));
    }
}
