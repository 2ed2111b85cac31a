//! Elaborated design
//!
//! The frozen result of an elaboration. Declarations no longer change; only
//! input values do, and [`Design::evaluate`] recomputes every signal for one
//! cycle. A `Design` holds no closures and is `Sync`, so evaluations may run
//! on several threads at once.

use crate::component::ComponentTree;
use crate::diagnostic::Diagnostic;
use crate::error::{ElaborationError, ElaborationResult};
use crate::graph::ConflictGraph;
use crate::relation::RelationModel;
use crate::unit::UnitDef;
use arbiter_logic::{Evaluation, Inputs, Netlist, NodeId, Simulator, StructValue};
use arbiter_types::{CallId, ComponentId, UnitId, UnitKind};
use serde::Serialize;
use std::collections::HashMap;

/// Frozen description of a unit
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitInfo {
    /// Unit id
    pub id: UnitId,
    /// Local name
    pub name: String,
    /// Name prefixed with the owner's component path
    pub qualified_name: String,
    /// Owning component
    pub owner: Option<ComponentId>,
    /// Transaction or method
    pub kind: UnitKind,
    /// Readiness node
    pub ready: NodeId,
    /// Run node
    pub run: NodeId,
    /// Combined input data
    pub data_in: StructValue,
    /// Output data
    pub data_out: StructValue,
    /// Callers may run together
    pub nonexclusive: bool,
    /// At most one call site
    pub single_caller: bool,
    /// Arguments are validated
    pub validated: bool,
    /// Arguments use a custom combiner
    pub custom_combiner: bool,
}

impl From<UnitDef> for UnitInfo {
    fn from(unit: UnitDef) -> Self {
        Self {
            validated: unit.validator.is_some(),
            custom_combiner: unit.combiner.is_some(),
            id: unit.id,
            name: unit.name,
            qualified_name: unit.qualified_name,
            owner: unit.owner,
            kind: unit.kind,
            ready: unit.ready,
            run: unit.run,
            data_in: unit.data_in,
            data_out: unit.data_out,
            nonexclusive: unit.nonexclusive,
            single_caller: unit.single_caller,
        }
    }
}

/// Frozen call site
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallInfo {
    /// Call site id
    pub id: CallId,
    /// Calling unit
    pub caller: UnitId,
    /// Called method
    pub callee: UnitId,
    /// Enable condition
    pub enable: NodeId,
    /// Arguments
    pub args: StructValue,
    /// High when the call actually happens: `run[caller] & enable`
    pub run: NodeId,
}

/// Run bit of every unit for one cycle
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunVector {
    /// Indexed by unit id
    pub runs: Vec<bool>,
}

impl RunVector {
    /// Check if a unit runs
    pub fn is_running(&self, unit: UnitId) -> bool {
        self.runs.get(unit.index()).copied().unwrap_or(false)
    }

    /// Running units in declaration order
    pub fn running(&self) -> Vec<UnitId> {
        self.runs
            .iter()
            .enumerate()
            .filter(|(_, run)| **run)
            .map(|(i, _)| UnitId::from(i))
            .collect()
    }
}

/// An elaborated design
#[derive(Debug)]
pub struct Design {
    pub(crate) simulator: Simulator,
    pub(crate) components: ComponentTree,
    pub(crate) units: Vec<UnitInfo>,
    pub(crate) by_name: HashMap<String, UnitId>,
    pub(crate) calls: Vec<CallInfo>,
    pub(crate) relations: RelationModel,
    pub(crate) graph: ConflictGraph,
    pub(crate) runnable: Vec<NodeId>,
    pub(crate) grants: Vec<NodeId>,
    pub(crate) scheduler: &'static str,
}

impl Design {
    /// The complete netlist
    pub fn netlist(&self) -> &Netlist {
        self.simulator.netlist()
    }

    /// All units in declaration order
    pub fn units(&self) -> &[UnitInfo] {
        &self.units
    }

    /// Look up a unit
    pub fn unit(&self, id: UnitId) -> ElaborationResult<&UnitInfo> {
        self.units
            .get(id.index())
            .ok_or(ElaborationError::UnknownUnit(id))
    }

    /// Find a unit by qualified name
    pub fn find(&self, qualified_name: &str) -> Option<UnitId> {
        self.by_name.get(qualified_name).copied()
    }

    /// Readiness node of a unit
    pub fn ready(&self, id: UnitId) -> ElaborationResult<NodeId> {
        Ok(self.unit(id)?.ready)
    }

    /// Run node of a unit
    pub fn run(&self, id: UnitId) -> ElaborationResult<NodeId> {
        Ok(self.unit(id)?.run)
    }

    /// Combined input data of a method
    pub fn data_in(&self, id: UnitId) -> ElaborationResult<&StructValue> {
        Ok(&self.unit(id)?.data_in)
    }

    /// Component tree
    pub fn components(&self) -> &ComponentTree {
        &self.components
    }

    /// Call sites in declaration order
    pub fn calls(&self) -> &[CallInfo] {
        &self.calls
    }

    /// Declared relations
    pub fn relations(&self) -> &RelationModel {
        &self.relations
    }

    /// Conflict graph the scheduler worked from
    pub fn graph(&self) -> &ConflictGraph {
        &self.graph
    }

    /// Warnings collected while building the conflict graph
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.graph.diagnostics()
    }

    /// Name of the scheduler that produced the grant logic
    pub fn scheduler_name(&self) -> &'static str {
        self.scheduler
    }

    /// Runnable node of a candidate
    pub fn candidate_runnable(&self, index: usize) -> Option<NodeId> {
        self.runnable.get(index).copied()
    }

    /// Grant node of a candidate
    pub fn candidate_grant(&self, index: usize) -> Option<NodeId> {
        self.grants.get(index).copied()
    }

    /// Evaluate every signal for one cycle
    pub fn evaluate(&self, inputs: &Inputs) -> ElaborationResult<Evaluation> {
        Ok(self.simulator.evaluate(inputs)?)
    }

    /// Evaluate and collect the run bit of every unit
    pub fn run_vector(&self, inputs: &Inputs) -> ElaborationResult<RunVector> {
        let eval = self.evaluate(inputs)?;
        Ok(self.runs_of(&eval))
    }

    pub(crate) fn runs_of(&self, eval: &Evaluation) -> RunVector {
        RunVector {
            runs: self.units.iter().map(|u| eval.bit(u.run)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::elaboration::Elaboration;
    use crate::unit::MethodDef;
    use arbiter_logic::{Inputs, StructValue};
    use arbiter_types::UnitKind;

    fn assert_sync<T: Sync + Send>() {}

    #[test]
    fn test_design_is_sync() {
        assert_sync::<super::Design>();
    }

    #[test]
    fn test_queries() {
        let mut elab = Elaboration::new();
        let req = elab.netlist_mut().bit_input("req").unwrap();
        let t = elab.transaction("t", None, req).unwrap();
        let m = elab.method(MethodDef::new("m")).unwrap();
        elab.call(t, m.id, req, StructValue::empty()).unwrap();
        let design = elab.finalize().unwrap();

        assert_eq!(design.find("m"), Some(m.id));
        assert_eq!(design.unit(t).unwrap().kind, UnitKind::Transaction);
        assert_eq!(design.ready(t).unwrap(), req);
        assert_eq!(design.calls().len(), 1);
        assert_eq!(design.scheduler_name(), "eager");

        let idle = design.run_vector(&Inputs::new()).unwrap();
        assert!(idle.running().is_empty());

        let busy = design.run_vector(&Inputs::new().with(req, 1)).unwrap();
        assert_eq!(busy.running(), vec![t, m.id]);
        assert!(busy.is_running(m.id));
    }
}
