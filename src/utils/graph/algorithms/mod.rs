//! Graph algorithms for control flow analysis.
//!
//! # Available Algorithms
//!
//! ## Traversal
//!
//! - [`preorder`] - Depth-first pre-order
//! - [`postorder`] - Depth-first post-order
//! - [`reverse_postorder`] - Reverse post-order (forward data flow order)
//! - [`reachable`] - Reachability flags from a start node
//!
//! ## Dominator Analysis
//!
//! - [`compute_dominators`] - Immediate dominators (Cooper-Harvey-Kennedy)
//! - [`compute_dominance_frontiers`] - Dominance frontiers for phi placement
//! - [`DominatorTree`] - Result of dominator computation
//!
//! | Algorithm | Time Complexity | Use Case |
//! |-----------|-----------------|----------|
//! | Orderings | O(V + E) | Block numbering, data flow |
//! | Dominators | O(V + E) per pass, few passes | SSA renaming walk |
//! | Frontiers | O(V + E + sum of frontier sizes) | Phi placement |

mod dominators;
mod traversal;

pub use dominators::{compute_dominance_frontiers, compute_dominators, DominatorTree};
pub use traversal::{postorder, preorder, reachable, reverse_postorder};
