//! Exhaustive property checking
//!
//! Enumerates every assignment of a set of 1-bit inputs, evaluates the design
//! for each and checks the scheduling guarantees. Assignments are evaluated
//! in parallel; results are sorted so reports are deterministic.

use crate::design::Design;
use crate::error::{ElaborationError, ElaborationResult};
use arbiter_logic::{Evaluation, Inputs, NodeId};
use arbiter_types::UnitKind;
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;

/// Most free inputs an exhaustive check accepts
pub const MAX_EXHAUSTIVE_INPUTS: usize = 16;

/// A broken scheduling guarantee
///
/// `assignment` is a bit mask over the checked inputs: bit `i` is the value
/// given to the `i`-th input of the report.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// A unit runs although it is not ready
    RunWithoutReady {
        /// Input assignment
        assignment: u64,
        /// Offending unit
        unit: String,
    },
    /// Two mutually exclusive units or candidates run together
    ConflictingRuns {
        /// Input assignment
        assignment: u64,
        /// First side
        first: String,
        /// Second side
        second: String,
    },
    /// A runnable candidate is idle although nothing blocks it
    NotMaximal {
        /// Input assignment
        assignment: u64,
        /// Idle candidate
        candidate: String,
    },
    /// Part of a candidate runs without the rest
    BrokenSimultaneity {
        /// Input assignment
        assignment: u64,
        /// Candidate or transaction
        candidate: String,
    },
    /// Two independent transactions run together
    IndependenceViolated {
        /// Input assignment
        assignment: u64,
        /// First transaction
        first: String,
        /// Second transaction
        second: String,
    },
    /// A method's `data_in` does not show its running caller's arguments
    CombinerMismatch {
        /// Input assignment
        assignment: u64,
        /// Method
        method: String,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::RunWithoutReady { assignment, unit } => {
                write!(f, "[{:#x}] '{}' runs without being ready", assignment, unit)
            }
            Violation::ConflictingRuns {
                assignment,
                first,
                second,
            } => write!(f, "[{:#x}] '{}' and '{}' run together", assignment, first, second),
            Violation::NotMaximal {
                assignment,
                candidate,
            } => write!(f, "[{:#x}] '{}' is runnable but idle and unblocked", assignment, candidate),
            Violation::BrokenSimultaneity {
                assignment,
                candidate,
            } => write!(f, "[{:#x}] '{}' runs partially", assignment, candidate),
            Violation::IndependenceViolated {
                assignment,
                first,
                second,
            } => write!(f, "[{:#x}] alternatives '{}' and '{}' run together", assignment, first, second),
            Violation::CombinerMismatch { assignment, method } => {
                write!(f, "[{:#x}] data_in of '{}' does not match its caller", assignment, method)
            }
        }
    }
}

/// Outcome of an exhaustive check
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    /// Names of the enumerated inputs, bit 0 first
    pub inputs: Vec<String>,
    /// Number of evaluated assignments
    pub assignments: u64,
    /// Every violation found, sorted
    pub violations: Vec<Violation>,
}

impl VerificationReport {
    /// Check if no violation was found
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Exhaustive checker over a design's 1-bit inputs
pub struct Verifier<'a> {
    design: &'a Design,
    inputs: Vec<NodeId>,
    base: Inputs,
}

impl<'a> Verifier<'a> {
    /// Enumerate every 1-bit primary input; wider inputs stay zero
    pub fn new(design: &'a Design) -> ElaborationResult<Self> {
        let inputs = design
            .netlist()
            .inputs()
            .into_iter()
            .filter(|(_, _, width)| *width == 1)
            .map(|(id, _, _)| id)
            .collect();
        Self::with_inputs(design, inputs, Inputs::new())
    }

    /// Enumerate the given 1-bit inputs on top of a fixed base assignment
    pub fn with_inputs(design: &'a Design, inputs: Vec<NodeId>, base: Inputs) -> ElaborationResult<Self> {
        if inputs.len() > MAX_EXHAUSTIVE_INPUTS {
            return Err(ElaborationError::TooManyInputs {
                count: inputs.len(),
                max: MAX_EXHAUSTIVE_INPUTS,
            });
        }
        Ok(Self { design, inputs, base })
    }

    /// Evaluate every assignment and collect violations
    pub fn run(&self) -> ElaborationResult<VerificationReport> {
        let assignments = 1u64 << self.inputs.len();
        tracing::debug!(
            "checking {} assignments over {} inputs",
            assignments,
            self.inputs.len()
        );

        let found: Vec<Vec<Violation>> = (0..assignments)
            .into_par_iter()
            .map(|mask| self.check(mask))
            .collect::<ElaborationResult<_>>()?;
        let mut violations: Vec<Violation> = found.into_iter().flatten().collect();
        violations.sort();

        if !violations.is_empty() {
            tracing::warn!("{} violations in {} assignments", violations.len(), assignments);
        }

        Ok(VerificationReport {
            inputs: self
                .inputs
                .iter()
                .map(|id| self.design.netlist().label(*id))
                .collect(),
            assignments,
            violations,
        })
    }

    fn check(&self, mask: u64) -> ElaborationResult<Vec<Violation>> {
        let mut inputs = self.base.clone();
        for (bit, input) in self.inputs.iter().enumerate() {
            inputs.set(*input, (mask >> bit) & 1);
        }
        let eval = self.design.evaluate(&inputs)?;
        let mut out = Vec::new();
        self.check_units(mask, &eval, &mut out);
        self.check_candidates(mask, &eval, &mut out);
        self.check_combiners(mask, &eval, &mut out);
        Ok(out)
    }

    fn check_units(&self, mask: u64, eval: &Evaluation, out: &mut Vec<Violation>) {
        let design = self.design;
        for unit in design.units() {
            if eval.bit(unit.run) && !eval.bit(unit.ready) {
                out.push(Violation::RunWithoutReady {
                    assignment: mask,
                    unit: unit.qualified_name.clone(),
                });
            }
        }

        for relation in design.relations().relations() {
            let (Ok(start), Ok(end)) = (design.unit(relation.start), design.unit(relation.end)) else {
                continue;
            };
            if relation.is_conflict() && eval.bit(start.run) && eval.bit(end.run) {
                out.push(Violation::ConflictingRuns {
                    assignment: mask,
                    first: start.qualified_name.clone(),
                    second: end.qualified_name.clone(),
                });
            }
        }

        for method in design.units().iter().filter(|u| u.kind == UnitKind::Method && !u.nonexclusive) {
            let running: Vec<_> = design
                .calls()
                .iter()
                .filter(|c| c.callee == method.id && eval.bit(c.run))
                .collect();
            if let [first, second, ..] = running.as_slice() {
                out.push(Violation::ConflictingRuns {
                    assignment: mask,
                    first: format!("{} via {}", method.qualified_name, first.id),
                    second: format!("{} via {}", method.qualified_name, second.id),
                });
            }
        }

        for (x, y) in design.graph().independent_transactions() {
            let (Ok(first), Ok(second)) = (design.unit(x), design.unit(y)) else {
                continue;
            };
            if eval.bit(first.run) && eval.bit(second.run) {
                out.push(Violation::IndependenceViolated {
                    assignment: mask,
                    first: first.qualified_name.clone(),
                    second: second.qualified_name.clone(),
                });
            }
        }
    }

    fn check_candidates(&self, mask: u64, eval: &Evaluation, out: &mut Vec<Violation>) {
        let design = self.design;
        let graph = design.graph();
        let granted: Vec<bool> = (0..graph.len())
            .map(|c| design.candidate_grant(c).is_some_and(|g| eval.bit(g)))
            .collect();

        for (c, candidate) in graph.candidates().iter().enumerate() {
            if granted[c] {
                let partial = candidate
                    .members
                    .iter()
                    .any(|m| design.unit(*m).map(|u| !eval.bit(u.run)).unwrap_or(true));
                if partial {
                    out.push(Violation::BrokenSimultaneity {
                        assignment: mask,
                        candidate: candidate.name.clone(),
                    });
                }
                for d in graph.conflicts_of(c).filter(|&d| d > c && granted[d]) {
                    out.push(Violation::ConflictingRuns {
                        assignment: mask,
                        first: candidate.name.clone(),
                        second: graph.candidates()[d].name.clone(),
                    });
                }
            } else {
                let runnable = design.candidate_runnable(c).is_some_and(|r| eval.bit(r));
                let blocked = graph.conflicts_of(c).any(|d| granted[d]);
                if runnable && !blocked {
                    out.push(Violation::NotMaximal {
                        assignment: mask,
                        candidate: candidate.name.clone(),
                    });
                }
            }
        }

        for unit in design.units().iter().filter(|u| u.kind == UnitKind::Transaction) {
            let covered = graph.candidates_of(unit.id).iter().any(|&c| granted[c]);
            if eval.bit(unit.run) && !covered {
                out.push(Violation::BrokenSimultaneity {
                    assignment: mask,
                    candidate: unit.qualified_name.clone(),
                });
            }
        }
    }

    fn check_combiners(&self, mask: u64, eval: &Evaluation, out: &mut Vec<Violation>) {
        let design = self.design;
        for method in design.units().iter().filter(|u| u.kind == UnitKind::Method) {
            if method.custom_combiner || method.data_in.is_empty() {
                continue;
            }
            let sites: Vec<_> = design.calls().iter().filter(|c| c.callee == method.id).collect();
            let seen = eval.fields(&method.data_in);
            let expected = match sites.as_slice() {
                [] => continue,
                [only] => eval.fields(&only.args),
                _ => {
                    let running: Vec<_> = sites.iter().filter(|s| eval.bit(s.run)).collect();
                    match running.as_slice() {
                        [] => vec![0; seen.len()],
                        [only] => eval.fields(&only.args),
                        // Reported as conflicting runs
                        _ => continue,
                    }
                }
            };
            if seen != expected {
                out.push(Violation::CombinerMismatch {
                    assignment: mask,
                    method: method.qualified_name.clone(),
                });
            }
        }
    }
}
