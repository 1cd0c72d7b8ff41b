//! Configuration for SSA construction.

/// Controls which phi kinds are inserted and which variables are converted.
///
/// # Examples
///
/// ```rust
/// use classscope::analysis::ssa::SsaConfig;
///
/// let config = SsaConfig::new()
///     .with_stack_variables(false)
///     .with_collapse_redundant_phis(true);
/// assert!(config.insert_catch_phis);
/// assert!(!config.stack_variables);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SsaConfig {
    /// Insert return phis after subroutine calls (default: true).
    pub insert_return_phis: bool,

    /// Insert catch phis at exception handler entries (default: true).
    ///
    /// Only local variables receive catch phis; stack slots are empty when a handler
    /// is entered.
    pub insert_catch_phis: bool,

    /// Convert operand stack slots as well as local variables (default: true).
    pub stack_variables: bool,

    /// After renaming, remove phis whose operands all resolve to one definition
    /// (default: false).
    pub collapse_redundant_phis: bool,
}

impl Default for SsaConfig {
    fn default() -> Self {
        Self {
            insert_return_phis: true,
            insert_catch_phis: true,
            stack_variables: true,
            collapse_redundant_phis: false,
        }
    }
}

impl SsaConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only join phis, locals only, no cleanup.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            insert_return_phis: false,
            insert_catch_phis: false,
            stack_variables: false,
            collapse_redundant_phis: false,
        }
    }

    /// Enables or disables return phis.
    #[must_use]
    pub fn with_return_phis(mut self, enable: bool) -> Self {
        self.insert_return_phis = enable;
        self
    }

    /// Enables or disables catch phis.
    #[must_use]
    pub fn with_catch_phis(mut self, enable: bool) -> Self {
        self.insert_catch_phis = enable;
        self
    }

    /// Enables or disables conversion of stack slots.
    #[must_use]
    pub fn with_stack_variables(mut self, enable: bool) -> Self {
        self.stack_variables = enable;
        self
    }

    /// Enables or disables the redundant phi cleanup after renaming.
    #[must_use]
    pub fn with_collapse_redundant_phis(mut self, enable: bool) -> Self {
        self.collapse_redundant_phis = enable;
        self
    }
}
