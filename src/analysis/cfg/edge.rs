//! Control flow edge kinds.

use std::fmt;

/// The kind of control transfer an edge represents.
///
/// Edge kinds do not influence dominance or phi placement; every edge is a control
/// flow edge. They are kept so graph dumps and later passes can tell ordinary flow
/// from handler entries and subroutine transfers.
///
/// # Examples
///
/// ```rust
/// use classscope::analysis::cfg::EdgeKind;
///
/// assert!(EdgeKind::Exception.is_exceptional());
/// assert!(EdgeKind::JsrCall.is_subroutine());
/// assert!(!EdgeKind::Normal.is_subroutine());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EdgeKind {
    /// Fall-through, branch, switch target or goto.
    #[default]
    Normal,

    /// From a protected block to the entry of its exception handler.
    Exception,

    /// From a calling block to the entry of a subroutine.
    JsrCall,

    /// From the exit block of a subroutine to the block following one call site.
    SubroutineReturn,
}

impl EdgeKind {
    /// Returns `true` for edges into exception handlers.
    #[must_use]
    pub const fn is_exceptional(self) -> bool {
        matches!(self, EdgeKind::Exception)
    }

    /// Returns `true` for subroutine call and return edges.
    #[must_use]
    pub const fn is_subroutine(self) -> bool {
        matches!(self, EdgeKind::JsrCall | EdgeKind::SubroutineReturn)
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Normal => write!(f, "normal"),
            EdgeKind::Exception => write!(f, "exception"),
            EdgeKind::JsrCall => write!(f, "jsr"),
            EdgeKind::SubroutineReturn => write!(f, "ret"),
        }
    }
}
