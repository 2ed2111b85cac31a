//! Non-fatal findings reported during conflict graph construction

use serde::Serialize;
use std::fmt;

/// Warning raised while building the conflict graph
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Relation between units of different top-level components
    CrossComponentRelation {
        /// First unit
        start: String,
        /// Second unit
        end: String,
        /// Top-level component of the first unit
        start_component: String,
        /// Top-level component of the second unit
        end_component: String,
    },
    /// Relation that can never influence scheduling
    IneffectiveRelation {
        /// First unit
        start: String,
        /// Second unit
        end: String,
        /// Why the relation has no effect
        reason: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::CrossComponentRelation {
                start,
                end,
                start_component,
                end_component,
            } => write!(
                f,
                "relation between '{}' ({}) and '{}' ({}) crosses top-level components",
                start, start_component, end, end_component
            ),
            Diagnostic::IneffectiveRelation { start, end, reason } => {
                write!(f, "relation between '{}' and '{}' has no effect: {}", start, end, reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let diag = Diagnostic::CrossComponentRelation {
            start: "a.t".to_string(),
            end: "b.t".to_string(),
            start_component: "a".to_string(),
            end_component: "b".to_string(),
        };
        assert!(diag.to_string().contains("crosses top-level components"));

        let diag = Diagnostic::IneffectiveRelation {
            start: "T".to_string(),
            end: "M".to_string(),
            reason: "'M' is never called".to_string(),
        };
        assert!(diag.to_string().contains("no effect"));
    }

    #[test]
    fn test_serialize_tagged() {
        let diag = Diagnostic::IneffectiveRelation {
            start: "T".to_string(),
            end: "M".to_string(),
            reason: "never called".to_string(),
        };
        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("\"kind\":\"ineffective_relation\""));
    }
}
