//! Logic construction and evaluation errors

use crate::node::NodeId;
use thiserror::Error;

/// Errors raised while building or evaluating a netlist
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LogicError {
    /// Width outside 1..=64
    #[error("invalid width {0}: must be between 1 and 64 bits")]
    InvalidWidth(u32),

    /// Operands of incompatible widths
    #[error("width mismatch in {op}: {left} vs {right} bits")]
    WidthMismatch {
        /// Operation name
        op: &'static str,
        /// Width of the first operand
        left: u8,
        /// Width of the second operand
        right: u8,
    },

    /// Node id not present in the netlist
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// `drive` applied to something other than a wire
    #[error("node {0} is not a wire")]
    NotAWire(NodeId),

    /// Input value assigned to a non-input node
    #[error("node {0} is not an input")]
    NotAnInput(NodeId),

    /// Wire driven twice
    #[error("wire '{0}' already driven")]
    AlreadyDriven(String),

    /// Wire never driven
    #[error("wire '{0}' has no driver")]
    UndrivenWire(String),

    /// Cycle through combinational nodes
    #[error("combinational loop through '{0}'")]
    CombinationalLoop(String),

    /// Input or field name used twice
    #[error("duplicate name '{0}'")]
    DuplicateName(String),

    /// Operand lists of different lengths
    #[error("arity mismatch: expected {expected} operands, found {found}")]
    ArityMismatch {
        /// Expected count
        expected: usize,
        /// Found count
        found: usize,
    },

    /// Operation requires at least one operand
    #[error("{0} requires at least one operand")]
    EmptyOperands(&'static str),

    /// Structured values with different layouts
    #[error("layout mismatch: expected {expected}, found {found}")]
    LayoutMismatch {
        /// Expected layout
        expected: String,
        /// Found layout
        found: String,
    },

    /// Field name not present in a layout
    #[error("unknown field '{0}'")]
    UnknownField(String),
}

/// Result type for logic operations
pub type LogicResult<T> = Result<T, LogicError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LogicError::WidthMismatch {
            op: "and",
            left: 1,
            right: 8,
        };
        assert!(err.to_string().contains("and"));
        assert!(err.to_string().contains("8"));

        let err = LogicError::CombinationalLoop("ready".to_string());
        assert!(err.to_string().contains("loop"));

        let err = LogicError::InvalidWidth(65);
        assert!(err.to_string().contains("65"));
    }
}
