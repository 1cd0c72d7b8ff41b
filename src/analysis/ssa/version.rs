//! Per-pass SSA version numbering.

use std::collections::HashMap;

use crate::tree::VarKey;

/// Hands out consecutive version numbers per variable, starting at 0.
///
/// One counter lives in each [`crate::analysis::ssa::SsaBuilder`] and moves into the
/// resulting [`crate::analysis::ssa::SsaForm`]; there is no shared numbering between
/// conversions.
#[derive(Debug, Clone, Default)]
pub struct VersionCounter {
    next: HashMap<VarKey, u32>,
}

impl VersionCounter {
    /// Create a counter with no versions handed out.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next version of `var`.
    pub fn next(&mut self, var: VarKey) -> u32 {
        let slot = self.next.entry(var).or_insert(0);
        let version = *slot;
        *slot += 1;
        version
    }

    /// Number of versions handed out for `var` so far.
    #[must_use]
    pub fn count(&self, var: VarKey) -> u32 {
        self.next.get(&var).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_per_variable() {
        let mut counter = VersionCounter::new();
        assert_eq!(counter.next(VarKey::Local(1)), 0);
        assert_eq!(counter.next(VarKey::Local(1)), 1);
        assert_eq!(counter.next(VarKey::Stack(1)), 0);
        assert_eq!(counter.count(VarKey::Local(1)), 2);
        assert_eq!(counter.count(VarKey::Local(9)), 0);
    }
}
