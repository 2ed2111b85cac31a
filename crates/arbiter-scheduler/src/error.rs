//! Error types for elaboration

use arbiter_logic::LogicError;
use arbiter_types::{CallId, ComponentId, UnitId};
use thiserror::Error;

/// Elaboration errors
///
/// Every failure of the scheduling core happens while a design is being
/// declared or finalized. The generated logic itself has no error path.
#[derive(Debug, Error)]
pub enum ElaborationError {
    /// A unit with the same qualified name already exists
    #[error("duplicate unit '{0}'")]
    DuplicateUnit(String),

    /// A component with the same name already exists under the same parent
    #[error("duplicate component '{0}'")]
    DuplicateComponent(String),

    /// Unit id was never registered
    #[error("unknown unit {0}")]
    UnknownUnit(UnitId),

    /// Component id was never registered
    #[error("unknown component {0}")]
    UnknownComponent(ComponentId),

    /// Call id was never registered
    #[error("unknown call site {0}")]
    UnknownCall(CallId),

    /// Both ends of a pair were declared preferred
    #[error("contradictory priority between '{first}' and '{second}'")]
    ContradictoryPriority {
        /// First unit
        first: String,
        /// Second unit
        second: String,
    },

    /// Priorities form a cycle
    #[error("priority cycle: {}", .0.join(" -> "))]
    PriorityCycle(Vec<String>),

    /// A schedulable set would have to exclude itself
    #[error("'{unit}' conflicts with itself: {}", .chain.join("; "))]
    SelfConflict {
        /// Offending unit or simultaneity group
        unit: String,
        /// Relations and call paths producing the conflict
        chain: Vec<String>,
    },

    /// Two units are both simultaneous and independent
    #[error("unsatisfiable simultaneity between '{first}' and '{second}': they are independent")]
    UnsatisfiableSimultaneity {
        /// First unit
        first: String,
        /// Second unit
        second: String,
    },

    /// Nonexclusive method with input data but no combiner
    #[error("method '{0}' is nonexclusive with a non-empty input layout and needs a combiner")]
    AmbiguousCombining(String),

    /// Single-caller method called from several sites
    #[error("single-caller method '{method}' has {count} call sites")]
    SingleCallerViolation {
        /// Method name
        method: String,
        /// Number of call sites
        count: usize,
    },

    /// Methods calling each other in a cycle
    #[error("call cycle: {}", .0.join(" -> "))]
    CallCycle(Vec<String>),

    /// Malformed call site
    #[error("invalid call of '{callee}' from '{caller}': {reason}")]
    InvalidCall {
        /// Calling unit
        caller: String,
        /// Called unit
        callee: String,
        /// What is wrong
        reason: String,
    },

    /// Exhaustive check over too many inputs
    #[error("exhaustive check over {count} inputs exceeds the limit of {max}")]
    TooManyInputs {
        /// Requested input count
        count: usize,
        /// Supported maximum
        max: usize,
    },

    /// Netlist construction or evaluation failure
    #[error("logic error: {0}")]
    Logic(#[from] LogicError),
}

/// Result type for elaboration operations
pub type ElaborationResult<T> = Result<T, ElaborationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ElaborationError::DuplicateUnit("fifo.write".to_string());
        assert!(err.to_string().contains("duplicate unit"));
        assert!(err.to_string().contains("fifo.write"));

        let err = ElaborationError::PriorityCycle(vec![
            "A".to_string(),
            "B".to_string(),
            "A".to_string(),
        ]);
        assert_eq!(err.to_string(), "priority cycle: A -> B -> A");

        let err = ElaborationError::SelfConflict {
            unit: "A+B".to_string(),
            chain: vec!["A conflicts with B".to_string()],
        };
        assert!(err.to_string().contains("conflicts with itself"));
    }

    #[test]
    fn test_logic_error_wraps() {
        let err: ElaborationError = LogicError::InvalidWidth(0).into();
        assert!(matches!(err, ElaborationError::Logic(_)));
        assert!(err.to_string().contains("logic error"));
    }
}
