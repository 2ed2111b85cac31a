//! Arbitration logic
//!
//! A [`Scheduler`] turns the conflict graph into grant logic: one 1-bit node
//! per candidate, high in exactly the cycles the candidate runs. It is called
//! once, at finalization; the emitted logic then decides every cycle.

use crate::error::{ElaborationError, ElaborationResult};
use crate::graph::ConflictGraph;
use arbiter_logic::{LogicError, Netlist, NodeId};

/// Grant logic generator
pub trait Scheduler {
    /// Short name used in logs and reports
    fn name(&self) -> &'static str;

    /// Emit one grant node per candidate, indexed like the graph's candidates
    ///
    /// `runnable[c]` is high when every member of candidate `c` requests to run
    /// and every method it calls is ready to accept the call.
    fn grants(
        &self,
        graph: &ConflictGraph,
        netlist: &mut Netlist,
        runnable: &[NodeId],
    ) -> ElaborationResult<Vec<NodeId>>;
}

/// Priority-ordered greedy arbitration
///
/// Visits candidates in the graph's order and grants each runnable candidate
/// that no earlier granted candidate conflicts with:
///
/// `grant[c] = runnable[c] & !(grant[p] | ... )` over earlier conflicting `p`.
///
/// The granted set is conflict-free and maximal among runnable candidates.
#[derive(Clone, Copy, Debug, Default)]
pub struct EagerScheduler;

impl EagerScheduler {
    /// Create the scheduler
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for EagerScheduler {
    fn name(&self) -> &'static str {
        "eager"
    }

    fn grants(
        &self,
        graph: &ConflictGraph,
        netlist: &mut Netlist,
        runnable: &[NodeId],
    ) -> ElaborationResult<Vec<NodeId>> {
        if runnable.len() != graph.len() {
            return Err(ElaborationError::Logic(LogicError::ArityMismatch {
                expected: graph.len(),
                found: runnable.len(),
            }));
        }

        let mut decided: Vec<Option<NodeId>> = vec![None; graph.len()];
        for &current in graph.order() {
            let blockers: Vec<NodeId> = graph
                .conflicts_of(current)
                .filter_map(|other| decided[other])
                .collect();
            let grant = if blockers.is_empty() {
                runnable[current]
            } else {
                let blocked = netlist.or_all(&blockers)?;
                let free = netlist.not(blocked)?;
                netlist.and(runnable[current], free)?
            };
            decided[current] = Some(grant);
        }

        let grants = decided
            .into_iter()
            .enumerate()
            .map(|(index, grant)| {
                grant.ok_or_else(|| {
                    ElaborationError::Logic(LogicError::UndrivenWire(format!("grant of candidate {}", index)))
                })
            })
            .collect::<ElaborationResult<Vec<_>>>()?;

        tracing::debug!("{} scheduler: {} grants", self.name(), grants.len());
        Ok(grants)
    }
}
