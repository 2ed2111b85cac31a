//! Scheduling relations between units

use crate::id::UnitId;
use std::fmt;

/// Kind of a schedulable unit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum UnitKind {
    /// Self-contained unit, never called by name
    Transaction,
    /// Callable unit with input and output data
    Method,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Transaction => write!(f, "transaction"),
            UnitKind::Method => write!(f, "method"),
        }
    }
}

/// Tie-break hint between the two ends of a relation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Priority {
    /// No ordering guidance; declaration order decides
    #[default]
    Undefined,
    /// The start of the relation is preferred
    Left,
    /// The end of the relation is preferred
    Right,
}

impl Priority {
    /// Priority as seen from the other end of the relation
    pub fn reversed(self) -> Self {
        match self {
            Priority::Undefined => Priority::Undefined,
            Priority::Left => Priority::Right,
            Priority::Right => Priority::Left,
        }
    }

    /// Check if the priority carries an ordering
    pub fn is_defined(self) -> bool {
        self != Priority::Undefined
    }
}

/// Kind of an explicit relation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RelationKind {
    /// The two units never run in the same cycle
    Conflict,
    /// Ordering preference without mutual exclusion
    ScheduleBefore,
}

/// Directed relation `(start, end, kind, priority)`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Relation {
    /// First unit
    pub start: UnitId,
    /// Second unit
    pub end: UnitId,
    /// Relation kind
    pub kind: RelationKind,
    /// Ordering hint
    pub priority: Priority,
}

impl Relation {
    /// Create a conflict relation
    pub fn conflict(start: UnitId, end: UnitId, priority: Priority) -> Self {
        Self {
            start,
            end,
            kind: RelationKind::Conflict,
            priority,
        }
    }

    /// Create a priority relation without conflict; `start` is preferred
    pub fn schedule_before(start: UnitId, end: UnitId) -> Self {
        Self {
            start,
            end,
            kind: RelationKind::ScheduleBefore,
            priority: Priority::Left,
        }
    }

    /// Check if this relation forbids co-execution
    pub fn is_conflict(&self) -> bool {
        self.kind == RelationKind::Conflict
    }

    /// Preferred and yielding unit, if the relation carries a priority
    pub fn preference(&self) -> Option<(UnitId, UnitId)> {
        match self.priority {
            Priority::Undefined => None,
            Priority::Left => Some((self.start, self.end)),
            Priority::Right => Some((self.end, self.start)),
        }
    }

    /// Unordered pair key, smaller id first
    pub fn pair(&self) -> (UnitId, UnitId) {
        if self.start <= self.end {
            (self.start, self.end)
        } else {
            (self.end, self.start)
        }
    }
}
