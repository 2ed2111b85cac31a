//! # arbiter-scheduler
//!
//! Conflict-based scheduling engine for arbiter.
//!
//! A design is declared once through an [`Elaboration`] context: components,
//! transactions, methods, call sites and relations. [`Elaboration::finalize`]
//! turns the frozen declarations into a [`Design`] whose netlist decides, for
//! every combination of readiness signals, which units run.
//!
//! Features:
//! - Unit registry in declaration order
//! - Conflict, priority, simultaneity and independence relations
//! - Conflict graph construction with implicit call-site conflicts
//! - Eager priority-ordered arbitration logic
//! - Argument combiners for shared methods
//! - Exhaustive property checking of the generated logic

#![warn(missing_docs)]
#![warn(clippy::all)]

mod call;
mod combiner;
mod component;
mod design;
mod diagnostic;
mod elaboration;
mod error;
mod graph;
mod registry;
mod relation;
mod report;
mod scheduler;
mod unit;
mod verify;

pub use call::{CallSite, CallTable, CallTree, MethodUse};
pub use combiner::{or_combiner, sum_combiner};
pub use component::{Component, ComponentTree};
pub use design::{CallInfo, Design, RunVector, UnitInfo};
pub use diagnostic::Diagnostic;
pub use elaboration::Elaboration;
pub use error::{ElaborationError, ElaborationResult};
pub use graph::{Candidate, ConflictGraph, ConflictReason};
pub use registry::UnitRegistry;
pub use relation::RelationModel;
pub use report::{CandidateReport, ConflictReport, ElaborationReport, ElaborationStats, UnitReport};
pub use scheduler::{EagerScheduler, Scheduler};
pub use unit::{CallHandle, Combiner, MethodDef, MethodHandle, UnitDef, Validator};
pub use verify::{VerificationReport, Verifier, Violation, MAX_EXHAUSTIVE_INPUTS};

pub use arbiter_logic as logic;
pub use arbiter_types::{CallId, ComponentId, Priority, Relation, RelationKind, UnitId, UnitKind};
