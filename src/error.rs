use thiserror::Error;

use crate::{tree::NodeId, utils::graph::BlockId};

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! invariant_error {
    ($msg:expr) => {
        crate::Error::InvariantViolation {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::InvariantViolation {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// This enum covers the failure modes of class file table decoding, expression tree editing,
/// control flow graph construction and SSA conversion. Each variant provides specific context
/// about the failure mode to enable appropriate error handling.
///
/// # Error Categories
///
/// ## Decoding Errors
/// - [`Error::Malformed`] - Corrupted or invalid class file structure
/// - [`Error::OutOfBounds`] - Attempted to read beyond the end of the input
/// - [`Error::Empty`] - Empty input provided
///
/// ## Structural Errors
/// - [`Error::InvariantViolation`] - A tree, graph or SSA invariant was broken
/// - [`Error::InvalidNode`] - A tree handle refers to a cleaned up or unknown node
/// - [`Error::ForeignBlock`] - A block handle does not belong to the graph
/// - [`Error::StaleGraph`] - The graph changed shape after an index was computed
/// - [`Error::SubroutineConflict`] - Inconsistent subroutine call/return paths
/// - [`Error::GraphError`] - General graph construction error
///
/// # Examples
///
/// ```rust
/// use classscope::{Error, classfile::Type};
///
/// match Type::parse("(IJ)") {
///     Ok(ty) => println!("parsed {}", ty),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed descriptor: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The input is damaged and could not be parsed.
    ///
    /// This error indicates that a descriptor or attribute table does not conform to the
    /// class file format. The error includes the source location where the malformation
    /// was detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the input.
    ///
    /// This error occurs when trying to read data beyond the end of the buffer.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// A structural invariant of the tree, the graph or the SSA engine was violated.
    ///
    /// Raised for attaching a node that already has a parent, adding a duplicate
    /// catch-phi operand, renaming a variable that was never registered and similar
    /// programmer errors. Conversion aborts; the caller decides whether to give up on the
    /// method or the whole run.
    ///
    /// # Fields
    ///
    /// * `message` - Description of the violated invariant
    /// * `file` - Source file where the violation was detected
    /// * `line` - Source line where the violation was detected
    #[error("Invariant violated - {file}:{line}: {message}")]
    InvariantViolation {
        /// Description of the violated invariant
        message: String,
        /// The source file in which the violation was detected
        file: &'static str,
        /// The source line in which the violation was detected
        line: u32,
    },

    /// The node handle refers to a node that was cleaned up or never existed.
    #[error("Node {0} is not a live tree node")]
    InvalidNode(NodeId),

    /// The block handle is not part of the control flow graph it was used with.
    #[error("Block {0} does not belong to this graph")]
    ForeignBlock(BlockId),

    /// The control flow graph changed shape after per-block data was laid out.
    ///
    /// SSA construction state is indexed by pre-order position. Adding blocks or edges
    /// while a conversion is in flight invalidates that layout.
    #[error("The control flow graph was modified during SSA construction")]
    StaleGraph,

    /// Two subroutine paths claim the same return block with different call blocks,
    /// or a subroutine calls itself.
    ///
    /// The associated value names the offending return (or call) block.
    #[error("Conflicting subroutine path through block {0}")]
    SubroutineConflict(BlockId),

    /// Graph construction error.
    ///
    /// Errors related to building the control flow graph from raw tables, such as a
    /// handler offset that does not start a block.
    #[error("{0}")]
    GraphError(String),
}
