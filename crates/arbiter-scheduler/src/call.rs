//! Call sites and the call tree
//!
//! A call site lets a transaction or method invoke a method. Methods may call
//! other methods, so the methods a transaction depends on are found by walking
//! call sites transitively. The walk also fixes which transactions a method
//! stands for when it appears in a relation.

use crate::error::{ElaborationError, ElaborationResult};
use crate::registry::UnitRegistry;
use arbiter_logic::{NodeId, StructValue};
use arbiter_types::{CallId, UnitId};
use std::collections::BTreeSet;

/// One invocation of a method
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallSite {
    /// Call site id
    pub id: CallId,
    /// Calling unit
    pub caller: UnitId,
    /// Called method
    pub callee: UnitId,
    /// 1-bit condition under which the caller invokes the callee
    pub enable: NodeId,
    /// Arguments, in the callee's input layout
    pub args: StructValue,
}

/// Arena of call sites in declaration order
#[derive(Clone, Debug, Default)]
pub struct CallTable {
    sites: Vec<CallSite>,
}

impl CallTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a call site
    pub fn push(&mut self, caller: UnitId, callee: UnitId, enable: NodeId, args: StructValue) -> CallId {
        let id = CallId::from(self.sites.len());
        self.sites.push(CallSite {
            id,
            caller,
            callee,
            enable,
            args,
        });
        id
    }

    /// Look up a call site
    pub fn get(&self, id: CallId) -> ElaborationResult<&CallSite> {
        self.sites
            .get(id.index())
            .ok_or(ElaborationError::UnknownCall(id))
    }

    /// All call sites in declaration order
    pub fn all(&self) -> &[CallSite] {
        &self.sites
    }

    /// Call sites made by a unit
    pub fn by_caller(&self, caller: UnitId) -> impl Iterator<Item = &CallSite> {
        self.sites.iter().filter(move |s| s.caller == caller)
    }

    /// Call sites invoking a method
    pub fn by_callee(&self, callee: UnitId) -> impl Iterator<Item = &CallSite> {
        self.sites.iter().filter(move |s| s.callee == callee)
    }

    /// Number of call sites
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// Check if there are no call sites
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

/// A method reached from some unit, with the call sites leading to it
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct MethodUse {
    /// Reached method
    pub method: UnitId,
    /// Call sites from the using unit down to the method, outermost first
    pub path: Vec<CallId>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Fresh,
    Active,
    Done,
}

/// Transitive call structure of a design
#[derive(Clone, Debug, Default)]
pub struct CallTree {
    /// Indexed by unit
    uses: Vec<Vec<MethodUse>>,
    /// Indexed by unit
    transactions: Vec<BTreeSet<UnitId>>,
}

impl CallTree {
    /// Walk every call site, rejecting call cycles
    pub fn analyze(registry: &UnitRegistry, calls: &CallTable) -> ElaborationResult<Self> {
        let n = registry.len();
        let mut callees: Vec<Vec<&CallSite>> = vec![Vec::new(); n];
        for site in calls.all() {
            registry.check(site.caller)?;
            registry.check(site.callee)?;
            callees[site.caller.index()].push(site);
        }

        let mut state = vec![Visit::Fresh; n];
        let mut uses: Vec<Vec<MethodUse>> = vec![Vec::new(); n];
        let mut stack = Vec::new();
        for unit in 0..n {
            visit(UnitId::from(unit), registry, &callees, &mut state, &mut uses, &mut stack)?;
        }

        let mut transactions = vec![BTreeSet::new(); n];
        for tx in registry.transactions() {
            transactions[tx.id.index()].insert(tx.id);
            for used in &uses[tx.id.index()] {
                transactions[used.method.index()].insert(tx.id);
            }
        }

        tracing::debug!(
            "call tree: {} call sites, {} method uses",
            calls.len(),
            uses.iter().map(Vec::len).sum::<usize>()
        );
        Ok(Self { uses, transactions })
    }

    /// Methods a unit uses, transitively
    pub fn uses(&self, unit: UnitId) -> &[MethodUse] {
        self.uses.get(unit.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Transactions a unit stands for
    ///
    /// A transaction stands for itself; a method for every transaction that
    /// reaches it through call sites. Uncalled methods stand for nothing.
    pub fn transactions_for(&self, unit: UnitId) -> Vec<UnitId> {
        self.transactions
            .get(unit.index())
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }
}

fn visit<'a>(
    unit: UnitId,
    registry: &UnitRegistry,
    callees: &[Vec<&'a CallSite>],
    state: &mut [Visit],
    uses: &mut [Vec<MethodUse>],
    stack: &mut Vec<UnitId>,
) -> ElaborationResult<()> {
    match state[unit.index()] {
        Visit::Done => return Ok(()),
        Visit::Active => {
            let start = stack.iter().position(|u| *u == unit).unwrap_or(0);
            let mut cycle: Vec<String> = stack[start..].iter().map(|u| registry.name(*u)).collect();
            cycle.push(registry.name(unit));
            return Err(ElaborationError::CallCycle(cycle));
        }
        Visit::Fresh => {}
    }

    state[unit.index()] = Visit::Active;
    stack.push(unit);

    let mut found = Vec::new();
    for site in &callees[unit.index()] {
        visit(site.callee, registry, callees, state, uses, stack)?;
        found.push(MethodUse {
            method: site.callee,
            path: vec![site.id],
        });
        for inner in &uses[site.callee.index()] {
            let mut path = Vec::with_capacity(inner.path.len() + 1);
            path.push(site.id);
            path.extend_from_slice(&inner.path);
            found.push(MethodUse {
                method: inner.method,
                path,
            });
        }
    }

    stack.pop();
    state[unit.index()] = Visit::Done;
    uses[unit.index()] = found;
    Ok(())
}
