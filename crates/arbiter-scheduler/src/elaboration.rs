//! Elaboration context
//!
//! Everything about a design is declared here, once: components, units,
//! call sites and relations. [`Elaboration::finalize`] freezes the
//! declarations, builds the conflict graph and emits the arbitration and
//! combining logic into the netlist.

use crate::call::{CallTable, CallTree};
use crate::combiner;
use crate::component::ComponentTree;
use crate::design::{CallInfo, Design, UnitInfo};
use crate::error::{ElaborationError, ElaborationResult};
use crate::graph::ConflictGraph;
use crate::registry::UnitRegistry;
use crate::relation::RelationModel;
use crate::scheduler::{EagerScheduler, Scheduler};
use crate::unit::{CallHandle, MethodDef, MethodHandle, UnitDef};
use arbiter_logic::{LogicError, Netlist, NodeId, Simulator, StructValue};
use arbiter_types::{ComponentId, Priority, UnitId, UnitKind};

/// Mutable declaration context for one design
#[derive(Debug, Default)]
pub struct Elaboration {
    netlist: Netlist,
    components: ComponentTree,
    registry: UnitRegistry,
    relations: RelationModel,
    calls: CallTable,
}

impl Elaboration {
    /// Start an empty design
    pub fn new() -> Self {
        Self::default()
    }

    /// Netlist holding the design's logic so far
    pub fn netlist(&self) -> &Netlist {
        &self.netlist
    }

    /// Netlist for building readiness, argument and output logic
    pub fn netlist_mut(&mut self) -> &mut Netlist {
        &mut self.netlist
    }

    /// Declared units
    pub fn registry(&self) -> &UnitRegistry {
        &self.registry
    }

    /// Declared components
    pub fn components(&self) -> &ComponentTree {
        &self.components
    }

    /// Declare a component
    pub fn component(&mut self, name: &str, parent: Option<ComponentId>) -> ElaborationResult<ComponentId> {
        self.components.add(name, parent)
    }

    fn qualify(&self, name: &str, owner: Option<ComponentId>) -> ElaborationResult<String> {
        let qualified = match owner {
            Some(owner) => format!("{}.{}", self.components.path(owner)?, name),
            None => name.to_string(),
        };
        if self.registry.contains_name(&qualified) {
            return Err(ElaborationError::DuplicateUnit(qualified));
        }
        Ok(qualified)
    }

    fn expect_bit(&self, node: NodeId, op: &'static str) -> ElaborationResult<()> {
        let width = self.netlist.width(node)?;
        if width != 1 {
            return Err(LogicError::WidthMismatch {
                op,
                left: 1,
                right: width,
            }
            .into());
        }
        Ok(())
    }

    // ==================== Units ====================

    /// Declare a transaction that requests to run whenever `request` is high
    pub fn transaction(
        &mut self,
        name: &str,
        owner: Option<ComponentId>,
        request: NodeId,
    ) -> ElaborationResult<UnitId> {
        self.expect_bit(request, "transaction request")?;
        let qualified_name = self.qualify(name, owner)?;
        let run = self.netlist.wire(&format!("{}.run", qualified_name), 1)?;

        self.registry.register(UnitDef {
            id: self.registry.next_id(),
            name: name.to_string(),
            qualified_name,
            owner,
            kind: UnitKind::Transaction,
            ready: request,
            run,
            data_in: StructValue::empty(),
            data_out: StructValue::empty(),
            nonexclusive: false,
            single_caller: false,
            validator: None,
            combiner: None,
        })
    }

    /// Declare a method
    ///
    /// A nonexclusive method with input data must bring its own combiner.
    pub fn method(&mut self, def: MethodDef) -> ElaborationResult<MethodHandle> {
        let qualified_name = self.qualify(&def.name, def.owner)?;
        if def.nonexclusive && !def.input.is_empty() && def.combiner.is_none() {
            return Err(ElaborationError::AmbiguousCombining(qualified_name));
        }
        let ready = match def.ready {
            Some(ready) => {
                self.expect_bit(ready, "method ready")?;
                ready
            }
            None => self.netlist.high(),
        };

        let run = self.netlist.wire(&format!("{}.run", qualified_name), 1)?;
        let data_in = self
            .netlist
            .struct_wire(&format!("{}.data_in", qualified_name), &def.input)?;
        let data_out = self
            .netlist
            .struct_wire(&format!("{}.data_out", qualified_name), &def.output)?;

        let id = self.registry.register(UnitDef {
            id: self.registry.next_id(),
            name: def.name,
            qualified_name,
            owner: def.owner,
            kind: UnitKind::Method,
            ready,
            run,
            data_in: data_in.clone(),
            data_out: data_out.clone(),
            nonexclusive: def.nonexclusive,
            single_caller: def.single_caller,
            validator: def.validator,
            combiner: def.combiner,
        })?;

        Ok(MethodHandle {
            id,
            data_in,
            data_out,
            run,
        })
    }

    /// Drive a method's output wires
    ///
    /// Outputs left undriven read zero after finalization.
    pub fn define_output(&mut self, method: UnitId, value: &StructValue) -> ElaborationResult<()> {
        let unit = self.registry.get(method)?;
        if unit.kind != UnitKind::Method {
            return Err(ElaborationError::InvalidCall {
                caller: unit.qualified_name.clone(),
                callee: unit.qualified_name.clone(),
                reason: "only methods have outputs".to_string(),
            });
        }
        let target = unit.data_out.clone();
        self.netlist.drive_struct(&target, value)?;
        Ok(())
    }

    // ==================== Calls ====================

    /// Declare that `caller` invokes `callee` whenever `enable` is high
    pub fn call(
        &mut self,
        caller: UnitId,
        callee: UnitId,
        enable: NodeId,
        args: StructValue,
    ) -> ElaborationResult<CallHandle> {
        let caller_name = self.registry.get(caller)?.qualified_name.clone();
        let target = self.registry.get(callee)?;
        let invalid = |reason: String| ElaborationError::InvalidCall {
            caller: caller_name.clone(),
            callee: target.qualified_name.clone(),
            reason,
        };

        if target.kind != UnitKind::Method {
            return Err(invalid("transactions cannot be called".to_string()));
        }
        if caller == callee {
            return Err(invalid("a method cannot call itself".to_string()));
        }
        if let Err(e) = self.expect_bit(enable, "call enable") {
            return Err(invalid(e.to_string()));
        }
        if let Err(e) = self
            .netlist
            .struct_from(target.data_in.layout(), args.nodes().to_vec())
            .and_then(|bound| bound.expect_layout(args.layout()))
        {
            return Err(invalid(e.to_string()));
        }

        let existing = self.calls.by_callee(callee).count();
        if target.single_caller && existing > 0 {
            return Err(ElaborationError::SingleCallerViolation {
                method: target.qualified_name.clone(),
                count: existing + 1,
            });
        }

        let data_out = target.data_out.clone();
        let id = self.calls.push(caller, callee, enable, args);
        tracing::trace!("{}: {} calls {}", id, caller_name, self.registry.name(callee));
        Ok(CallHandle { id, data_out })
    }

    // ==================== Relations ====================

    /// `a` and `b` never run in the same cycle
    pub fn add_conflict(&mut self, a: UnitId, b: UnitId, priority: Priority) -> ElaborationResult<()> {
        self.relations.add_conflict(&self.registry, a, b, priority)
    }

    /// When both could run, prefer `a`; they may still run together
    pub fn schedule_before(&mut self, a: UnitId, b: UnitId) -> ElaborationResult<()> {
        self.relations.schedule_before(&self.registry, a, b)
    }

    /// Every unit in `others` runs exactly when `a` runs
    pub fn simultaneous(&mut self, a: UnitId, others: &[UnitId]) -> ElaborationResult<()> {
        self.relations.simultaneous(&self.registry, a, others)
    }

    /// `a` runs together with exactly one of `others`
    pub fn simultaneous_alternatives(&mut self, a: UnitId, others: &[UnitId]) -> ElaborationResult<()> {
        self.relations.simultaneous_alternatives(&self.registry, a, others)
    }

    /// Silence the cross-component warning for a reviewed pair
    pub fn acknowledge_coupling(&mut self, a: UnitId, b: UnitId) -> ElaborationResult<()> {
        self.relations.acknowledge_coupling(&self.registry, a, b)
    }

    // ==================== Finalization ====================

    /// Freeze the design using the eager scheduler
    pub fn finalize(self) -> ElaborationResult<Design> {
        self.finalize_with(&EagerScheduler)
    }

    /// Freeze the design using the given scheduler
    pub fn finalize_with(self, scheduler: &dyn Scheduler) -> ElaborationResult<Design> {
        let Elaboration {
            mut netlist,
            components,
            registry,
            relations,
            calls,
        } = self;

        for method in registry.methods() {
            for &wire in method.data_out.nodes() {
                if !netlist.is_driven(wire)? {
                    let zero = netlist.constant(0, netlist.width(wire)?)?;
                    netlist.drive(wire, zero)?;
                }
            }
        }

        let tree = CallTree::analyze(&registry, &calls)?;
        let graph = ConflictGraph::build(&registry, &components, &relations, &tree, &calls)?;

        let mut body = vec![None; registry.len()];
        for unit in registry.all_units() {
            body_ok(unit.id, &registry, &calls, &mut netlist, &mut body)?;
        }

        let mut runnable = Vec::with_capacity(graph.len());
        for candidate in graph.candidates() {
            let mut terms = Vec::with_capacity(candidate.members.len() * 2);
            for &member in &candidate.members {
                terms.push(registry.get(member)?.ready);
                terms.push(body[member.index()].ok_or(ElaborationError::UnknownUnit(member))?);
            }
            runnable.push(netlist.and_all(&terms)?);
        }

        let grants = scheduler.grants(&graph, &mut netlist, &runnable)?;

        for tx in registry.transactions() {
            let granted: Vec<NodeId> = graph.candidates_of(tx.id).iter().map(|&c| grants[c]).collect();
            let run = netlist.or_all(&granted)?;
            netlist.drive(tx.run, run)?;
        }

        let mut call_runs = Vec::with_capacity(calls.len());
        for site in calls.all() {
            let caller_run = registry.get(site.caller)?.run;
            call_runs.push(netlist.and(caller_run, site.enable)?);
        }

        for method in registry.methods() {
            let sites: Vec<usize> = calls
                .by_callee(method.id)
                .map(|s| s.id.index())
                .collect();
            let runs: Vec<NodeId> = sites.iter().map(|&i| call_runs[i]).collect();
            let args: Vec<StructValue> = sites.iter().map(|&i| calls.all()[i].args.clone()).collect();

            let run = netlist.or_all(&runs)?;
            netlist.drive(method.run, run)?;

            let layout = method.data_in.layout();
            let value = match (&method.combiner, args.len()) {
                (_, 0) => netlist.struct_zero(layout)?,
                (Some(custom), _) => {
                    let value = custom(&mut netlist, &args, &runs)?;
                    value.expect_layout(layout)?;
                    value
                }
                (None, 1) => args[0].clone(),
                (None, _) => combiner::one_hot(&mut netlist, layout, &args, &runs)?,
            };
            netlist.drive_struct(&method.data_in, &value)?;
        }

        let call_info: Vec<CallInfo> = calls
            .all()
            .iter()
            .zip(&call_runs)
            .map(|(site, &run)| CallInfo {
                id: site.id,
                caller: site.caller,
                callee: site.callee,
                enable: site.enable,
                args: site.args.clone(),
                run,
            })
            .collect();

        tracing::info!(
            "elaborated {} units, {} call sites, {} candidates, {} conflicts ({} scheduler)",
            registry.len(),
            calls.len(),
            graph.len(),
            graph.conflict_count(),
            scheduler.name()
        );

        let simulator = Simulator::new(netlist)?;
        let units: Vec<UnitInfo> = registry.into_units().into_iter().map(UnitInfo::from).collect();
        let by_name = units
            .iter()
            .map(|u| (u.qualified_name.clone(), u.id))
            .collect();
        Ok(Design {
            simulator,
            components,
            units,
            by_name,
            calls: call_info,
            relations,
            graph,
            runnable,
            grants,
            scheduler: scheduler.name(),
        })
    }
}

/// AND of `enable -> callee accepts` over every call site of `unit`
///
/// A callee accepts when it is ready, its validator passes on the site's
/// arguments, and its own calls are acceptable.
fn body_ok(
    unit: UnitId,
    registry: &UnitRegistry,
    calls: &CallTable,
    netlist: &mut Netlist,
    memo: &mut [Option<NodeId>],
) -> ElaborationResult<NodeId> {
    if let Some(done) = memo[unit.index()] {
        return Ok(done);
    }

    let mut oks = Vec::new();
    for site in calls.by_caller(unit) {
        let callee = registry.get(site.callee)?;
        let mut accept = vec![callee.ready];
        if let Some(validate) = &callee.validator {
            let valid = validate(netlist, &site.args)?;
            let width = netlist.width(valid)?;
            if width != 1 {
                return Err(LogicError::WidthMismatch {
                    op: "argument validator",
                    left: 1,
                    right: width,
                }
                .into());
            }
            accept.push(valid);
        }
        accept.push(body_ok(site.callee, registry, calls, netlist, memo)?);

        let accepted = netlist.and_all(&accept)?;
        oks.push(netlist.implies(site.enable, accepted)?);
    }

    let ok = netlist.and_all(&oks)?;
    memo[unit.index()] = Some(ok);
    Ok(ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_logic::{Inputs, Layout};

    #[test]
    fn test_qualified_names_follow_components() {
        let mut elab = Elaboration::new();
        let core = elab.component("core", None).unwrap();
        let fifo = elab.component("fifo", Some(core)).unwrap();
        let m = elab.method(MethodDef::new("write").owner(fifo)).unwrap();

        let unit = elab.registry().get(m.id).unwrap();
        assert_eq!(unit.qualified_name(), "core.fifo.write");
        assert_eq!(elab.netlist().label(m.run), "core.fifo.write.run");
    }

    #[test]
    fn test_duplicate_unit_leaves_no_wires() {
        let mut elab = Elaboration::new();
        let req = elab.netlist_mut().bit_input("req").unwrap();
        elab.transaction("t", None, req).unwrap();
        let before = elab.netlist().len();

        let err = elab.transaction("t", None, req).unwrap_err();
        assert!(matches!(err, ElaborationError::DuplicateUnit(_)));
        assert_eq!(elab.netlist().len(), before);
        assert!(elab.finalize().is_ok());
    }

    #[test]
    fn test_request_must_be_one_bit() {
        let mut elab = Elaboration::new();
        let wide = elab.netlist_mut().input("wide", 4).unwrap();
        assert!(matches!(
            elab.transaction("t", None, wide),
            Err(ElaborationError::Logic(LogicError::WidthMismatch { .. }))
        ));
    }

    #[test]
    fn test_ambiguous_combining() {
        let mut elab = Elaboration::new();
        let layout = Layout::new([("v", 4)]).unwrap();
        let err = elab
            .method(MethodDef::new("m").input(layout.clone()).nonexclusive())
            .unwrap_err();
        assert!(matches!(err, ElaborationError::AmbiguousCombining(ref n) if n == "m"));

        // Without input data there is nothing to combine
        assert!(elab.method(MethodDef::new("n").nonexclusive()).is_ok());
        assert!(elab
            .method(
                MethodDef::new("o")
                    .input(layout.clone())
                    .nonexclusive()
                    .combiner(crate::or_combiner(layout))
            )
            .is_ok());
    }

    #[test]
    fn test_invalid_calls() {
        let mut elab = Elaboration::new();
        let high = elab.netlist_mut().high();
        let t = elab.transaction("t", None, high).unwrap();
        let u = elab.transaction("u", None, high).unwrap();
        let m = elab
            .method(MethodDef::new("m").input(Layout::new([("v", 4)]).unwrap()))
            .unwrap();

        let err = elab.call(t, u, high, StructValue::empty()).unwrap_err();
        assert!(matches!(err, ElaborationError::InvalidCall { ref reason, .. } if reason.contains("transactions")));

        let err = elab.call(t, m.id, high, StructValue::empty()).unwrap_err();
        assert!(matches!(err, ElaborationError::InvalidCall { .. }));

        let eight = elab.netlist_mut().input("eight", 8).unwrap();
        let bad = StructValue::from_parts(Layout::new([("v", 4)]).unwrap(), vec![eight]).unwrap();
        assert!(elab.call(t, m.id, high, bad).is_err());

        let err = elab.call(m.id, m.id, high, StructValue::empty()).unwrap_err();
        assert!(matches!(err, ElaborationError::InvalidCall { .. }));
    }

    #[test]
    fn test_single_caller_violation() {
        let mut elab = Elaboration::new();
        let high = elab.netlist_mut().high();
        let a = elab.transaction("a", None, high).unwrap();
        let b = elab.transaction("b", None, high).unwrap();
        let m = elab.method(MethodDef::new("m").single_caller()).unwrap();

        elab.call(a, m.id, high, StructValue::empty()).unwrap();
        let err = elab.call(b, m.id, high, StructValue::empty()).unwrap_err();
        assert!(matches!(
            err,
            ElaborationError::SingleCallerViolation { count: 2, .. }
        ));
    }

    #[test]
    fn test_define_output_reaches_caller() {
        let mut elab = Elaboration::new();
        let layout = Layout::new([("q", 8)]).unwrap();
        let high = elab.netlist_mut().high();
        let t = elab.transaction("t", None, high).unwrap();
        let m = elab.method(MethodDef::new("read").output(layout.clone())).unwrap();
        let value = elab.netlist_mut().constant(42, 8).unwrap();
        let out = elab.netlist().struct_from(&layout, vec![value]).unwrap();
        elab.define_output(m.id, &out).unwrap();
        let handle = elab.call(t, m.id, high, StructValue::empty()).unwrap();

        let design = elab.finalize().unwrap();
        let eval = design.evaluate(&Inputs::new()).unwrap();
        assert_eq!(eval.fields(&handle.data_out), vec![42]);
    }

    #[test]
    fn test_undriven_output_reads_zero() {
        let mut elab = Elaboration::new();
        let m = elab
            .method(MethodDef::new("m").output(Layout::new([("q", 8)]).unwrap()))
            .unwrap();
        let design = elab.finalize().unwrap();
        let eval = design.evaluate(&Inputs::new()).unwrap();
        assert_eq!(eval.fields(&m.data_out), vec![0]);
        assert!(!eval.bit(m.run));
    }
}
