//! Conflict graph construction
//!
//! Relations are declared between arbitrary units, but scheduling decisions
//! are made for *candidates*: sets of transactions that must run together.
//! Building the graph:
//!
//! 1. Project simultaneity and independence onto transactions.
//! 2. Merge simultaneous transactions into maximal groups, never merging an
//!    independent pair. Each group, and each transaction in no group, is a
//!    candidate.
//! 3. Add conflict edges between candidates: shared members, independent
//!    members, a shared exclusive method, and explicit conflicts reached
//!    through call sites.
//! 4. Add priority edges and order the candidates.

use crate::call::{CallTable, CallTree, MethodUse};
use crate::component::ComponentTree;
use crate::diagnostic::Diagnostic;
use crate::error::{ElaborationError, ElaborationResult};
use crate::registry::UnitRegistry;
use crate::relation::RelationModel;
use arbiter_types::{UnitId, UnitKind};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap, VecDeque};

fn ordered<T: Ord>(a: T, b: T) -> (T, T) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// An atomic schedulable set of transactions
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    /// Member transactions, ascending
    pub members: Vec<UnitId>,
    /// Member names joined with `+`
    pub name: String,
    /// Earliest declared member; the default tie-break key
    pub decl_key: UnitId,
    /// Methods used by the members, member by member
    pub uses: Vec<MethodUse>,
}

/// Why two candidates conflict
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConflictReason {
    /// Declared conflict between two units used by the candidates
    Explicit {
        /// Declared start
        start: UnitId,
        /// Declared end
        end: UnitId,
    },
    /// Both candidates call the same exclusive method
    SharedMethod(UnitId),
    /// Both candidates contain the same transaction
    SharedMember(UnitId),
    /// The candidates contain two independent transactions
    Independent {
        /// Transaction of the first candidate
        first: UnitId,
        /// Transaction of the second candidate
        second: UnitId,
    },
}

/// Candidates with their conflict and priority relations
#[derive(Clone, Debug, Default)]
pub struct ConflictGraph {
    candidates: Vec<Candidate>,
    /// Undirected, indexed by candidate
    conflicts: Vec<BTreeSet<usize>>,
    reasons: BTreeMap<(usize, usize), BTreeSet<ConflictReason>>,
    /// `(preferred, other)`
    priorities: BTreeSet<(usize, usize)>,
    order: Vec<usize>,
    /// Candidates containing a transaction, indexed by unit
    membership: Vec<Vec<usize>>,
    /// Candidates containing or calling a unit, indexed by unit
    users: Vec<Vec<usize>>,
    /// Projected onto transactions
    independent: BTreeSet<(UnitId, UnitId)>,
    diagnostics: Vec<Diagnostic>,
}

impl ConflictGraph {
    /// Build the graph from frozen declarations
    pub fn build(
        registry: &UnitRegistry,
        components: &ComponentTree,
        relations: &RelationModel,
        tree: &CallTree,
        calls: &CallTable,
    ) -> ElaborationResult<Self> {
        let mut builder = Builder {
            registry,
            components,
            relations,
            tree,
            calls,
            graph: ConflictGraph::default(),
        };
        builder.candidates()?;
        builder.conflicts()?;
        builder.priorities();
        builder.cross_component()?;
        builder.graph.order = builder.graph.priority_order(registry)?;

        let mut graph = builder.graph;
        graph.diagnostics.sort();
        graph.diagnostics.dedup();
        for diagnostic in &graph.diagnostics {
            tracing::warn!("{}", diagnostic);
        }
        tracing::debug!(
            "conflict graph: {} candidates, {} conflicts, {} priorities",
            graph.candidates.len(),
            graph.conflict_count(),
            graph.priorities.len()
        );
        Ok(graph)
    }

    // ==================== Queries ====================

    /// All candidates, ordered by declaration key
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Look up a candidate
    pub fn candidate(&self, index: usize) -> Option<&Candidate> {
        self.candidates.get(index)
    }

    /// Number of candidates
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Check if there are no candidates
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Candidates conflicting with `index`
    pub fn conflicts_of(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.conflicts
            .get(index)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Check if two candidates conflict
    pub fn in_conflict(&self, a: usize, b: usize) -> bool {
        self.conflicts.get(a).is_some_and(|set| set.contains(&b))
    }

    /// Conflict edges, smaller index first
    pub fn conflict_edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.reasons.keys().copied()
    }

    /// Number of conflict edges
    pub fn conflict_count(&self) -> usize {
        self.reasons.len()
    }

    /// Reasons recorded for a conflict edge
    pub fn reasons(&self, a: usize, b: usize) -> impl Iterator<Item = ConflictReason> + '_ {
        self.reasons
            .get(&ordered(a, b))
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Priority edges as `(preferred, other)`
    pub fn priority_edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.priorities.iter().copied()
    }

    /// Candidate indices in scheduling order
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Candidates containing a transaction
    pub fn candidates_of(&self, unit: UnitId) -> &[usize] {
        self.membership.get(unit.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Candidates containing a transaction or using a method
    pub fn users_of(&self, unit: UnitId) -> &[usize] {
        self.users.get(unit.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Independent transaction pairs, smaller id first
    pub fn independent_transactions(&self) -> impl Iterator<Item = (UnitId, UnitId)> + '_ {
        self.independent.iter().copied()
    }

    /// Warnings found while building
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    // ==================== Ordering ====================

    /// Kahn's algorithm over priority edges, lowest declaration key first
    fn priority_order(&self, registry: &UnitRegistry) -> ElaborationResult<Vec<usize>> {
        let n = self.candidates.len();
        let mut in_degree = vec![0usize; n];
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
        for &(from, to) in &self.priorities {
            in_degree[to] += 1;
            successors[from].push(to);
        }

        // Candidate indices already follow declaration keys
        let mut heap: BinaryHeap<Reverse<usize>> =
            (0..n).filter(|&i| in_degree[i] == 0).map(Reverse).collect();
        let mut order = Vec::with_capacity(n);

        while let Some(Reverse(current)) = heap.pop() {
            order.push(current);
            for &next in &successors[current] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    heap.push(Reverse(next));
                }
            }
        }

        if order.len() != n {
            let remaining: BTreeSet<usize> = (0..n).filter(|&i| in_degree[i] > 0).collect();
            return Err(ElaborationError::PriorityCycle(
                self.find_cycle(&remaining, registry),
            ));
        }
        Ok(order)
    }

    /// Walk predecessors inside the unsorted remainder until one repeats
    fn find_cycle(&self, remaining: &BTreeSet<usize>, registry: &UnitRegistry) -> Vec<String> {
        let name = |i: usize| {
            self.candidates
                .get(i)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| registry.name(UnitId::from(i)))
        };

        let mut walk: Vec<usize> = Vec::new();
        let mut seen: HashMap<usize, usize> = HashMap::new();
        let mut current = remaining.iter().next().copied();

        while let Some(node) = current {
            if let Some(&start) = seen.get(&node) {
                let mut cycle: Vec<usize> = walk[start..].to_vec();
                cycle.reverse();
                cycle.push(cycle[0]);
                return cycle.into_iter().map(name).collect();
            }
            seen.insert(node, walk.len());
            walk.push(node);
            current = self
                .priorities
                .iter()
                .find(|(from, to)| *to == node && remaining.contains(from))
                .map(|(from, _)| *from);
        }
        remaining.iter().map(|&i| name(i)).collect()
    }

    /// Bare graph of singleton candidates, one per transaction id
    #[cfg(test)]
    pub(crate) fn with_edges(n: usize, conflicts: &[(usize, usize)], order: Vec<usize>) -> Self {
        let mut graph = ConflictGraph {
            candidates: (0..n)
                .map(|i| Candidate {
                    members: vec![UnitId::from(i)],
                    name: format!("t{}", i),
                    decl_key: UnitId::from(i),
                    uses: Vec::new(),
                })
                .collect(),
            conflicts: vec![BTreeSet::new(); n],
            order,
            ..ConflictGraph::default()
        };
        for &(a, b) in conflicts {
            graph.add_conflict(a, b, ConflictReason::SharedMember(UnitId::from(a)));
        }
        graph
    }

    fn add_conflict(&mut self, a: usize, b: usize, reason: ConflictReason) {
        if a == b {
            return;
        }
        self.conflicts[a].insert(b);
        self.conflicts[b].insert(a);
        self.reasons.entry(ordered(a, b)).or_default().insert(reason);
    }
}

struct Builder<'a> {
    registry: &'a UnitRegistry,
    components: &'a ComponentTree,
    relations: &'a RelationModel,
    tree: &'a CallTree,
    calls: &'a CallTable,
    graph: ConflictGraph,
}

impl Builder<'_> {
    fn name(&self, unit: UnitId) -> String {
        self.registry.name(unit)
    }

    /// `T -> M1 -> M2` for a method reached through call sites
    fn describe_use(&self, root: UnitId, used: &MethodUse) -> String {
        let mut names = vec![self.name(root)];
        for call in &used.path {
            if let Ok(site) = self.calls.get(*call) {
                names.push(self.name(site.callee));
            }
        }
        names.join(" -> ")
    }

    /// How a unit takes part in a candidate
    fn involvement(&self, index: usize, unit: UnitId) -> Vec<String> {
        let candidate = &self.graph.candidates[index];
        if candidate.members.contains(&unit) {
            return vec![format!("'{}' is a member of {}", self.name(unit), candidate.name)];
        }
        candidate
            .members
            .iter()
            .flat_map(|&member| {
                self.tree
                    .uses(member)
                    .iter()
                    .filter(|u| u.method == unit)
                    .map(move |u| (member, u))
            })
            .map(|(member, u)| format!("called via {}", self.describe_use(member, u)))
            .collect()
    }

    fn ineffective(&mut self, start: UnitId, end: UnitId) {
        if self.relations.is_independent(start, end) {
            return;
        }
        let silent = if self.graph.users_of(start).is_empty() { start } else { end };
        let reason = match self.registry.get(silent).map(|u| u.kind) {
            Ok(UnitKind::Method) => format!("'{}' is never called", self.name(silent)),
            _ => format!("'{}' never runs", self.name(silent)),
        };
        self.graph.diagnostics.push(Diagnostic::IneffectiveRelation {
            start: self.name(start),
            end: self.name(end),
            reason,
        });
    }

    // ==================== Candidates ====================

    fn candidates(&mut self) -> ElaborationResult<()> {
        let n = self.registry.len();

        for (a, b) in self.relations.independent_pairs() {
            for x in self.tree.transactions_for(a) {
                for y in self.tree.transactions_for(b) {
                    if x != y {
                        self.graph.independent.insert(ordered(x, y));
                    }
                }
            }
        }

        let mut neighbours: BTreeMap<UnitId, BTreeSet<UnitId>> = BTreeMap::new();
        let mut seeds: BTreeSet<BTreeSet<UnitId>> = BTreeSet::new();
        for &(a, b) in self.relations.simultaneous_pairs() {
            let xs = self.tree.transactions_for(a);
            let ys = self.tree.transactions_for(b);
            if xs.is_empty() || ys.is_empty() {
                let silent = if xs.is_empty() { a } else { b };
                if !self.relations.is_independent(a, b) {
                    self.graph.diagnostics.push(Diagnostic::IneffectiveRelation {
                        start: self.name(a),
                        end: self.name(b),
                        reason: format!("'{}' is never called", self.name(silent)),
                    });
                }
                continue;
            }
            for &x in &xs {
                for &y in &ys {
                    if x == y {
                        continue;
                    }
                    if self.graph.independent.contains(&ordered(x, y)) {
                        return Err(ElaborationError::UnsatisfiableSimultaneity {
                            first: self.name(a),
                            second: self.name(b),
                        });
                    }
                    neighbours.entry(x).or_default().insert(y);
                    neighbours.entry(y).or_default().insert(x);
                    seeds.insert([x, y].into_iter().collect());
                }
            }
        }

        // Grow groups one neighbour at a time
        let mut closure: BTreeSet<BTreeSet<UnitId>> = BTreeSet::new();
        let mut queue: VecDeque<BTreeSet<UnitId>> = seeds.into_iter().collect();
        while let Some(group) = queue.pop_front() {
            if closure.contains(&group) {
                continue;
            }
            let frontier: BTreeSet<UnitId> = group
                .iter()
                .filter_map(|m| neighbours.get(m))
                .flatten()
                .filter(|u| !group.contains(*u))
                .copied()
                .collect();
            for next in frontier {
                let blocked = group
                    .iter()
                    .any(|m| self.graph.independent.contains(&ordered(*m, next)));
                if blocked {
                    continue;
                }
                let mut grown = group.clone();
                grown.insert(next);
                if !closure.contains(&grown) {
                    queue.push_back(grown);
                }
            }
            closure.insert(group);
        }

        let mut groups: Vec<Vec<UnitId>> = closure
            .iter()
            .filter(|g| !closure.iter().any(|h| h.len() > g.len() && g.is_subset(h)))
            .map(|g| g.iter().copied().collect())
            .collect();

        let grouped: BTreeSet<UnitId> = groups.iter().flatten().copied().collect();
        groups.extend(
            self.registry
                .transactions()
                .filter(|t| !grouped.contains(&t.id))
                .map(|t| vec![t.id]),
        );
        groups.sort();

        self.graph.membership = vec![Vec::new(); n];
        self.graph.users = vec![Vec::new(); n];
        for (index, members) in groups.into_iter().enumerate() {
            let uses: Vec<MethodUse> = members
                .iter()
                .flat_map(|m| self.tree.uses(*m).iter().cloned())
                .collect();
            for &member in &members {
                self.graph.membership[member.index()].push(index);
                self.graph.users[member.index()].push(index);
            }
            for used in &uses {
                let users = &mut self.graph.users[used.method.index()];
                if users.last() != Some(&index) {
                    users.push(index);
                }
            }
            let name = members
                .iter()
                .map(|m| self.name(*m))
                .collect::<Vec<_>>()
                .join("+");
            self.graph.candidates.push(Candidate {
                decl_key: members[0],
                members,
                name,
                uses,
            });
        }
        self.graph.conflicts = vec![BTreeSet::new(); self.graph.candidates.len()];

        tracing::debug!(
            "{} simultaneity groups, {} candidates",
            closure.len(),
            self.graph.candidates.len()
        );
        Ok(())
    }

    // ==================== Conflicts ====================

    fn conflicts(&mut self) -> ElaborationResult<()> {
        let registry = self.registry;
        let relations = self.relations;
        for tx in registry.transactions() {
            let holders = self.graph.membership[tx.id.index()].clone();
            for (i, &c) in holders.iter().enumerate() {
                for &d in &holders[i + 1..] {
                    self.graph.add_conflict(c, d, ConflictReason::SharedMember(tx.id));
                }
            }
        }

        let independent: Vec<(UnitId, UnitId)> = self.graph.independent.iter().copied().collect();
        for (x, y) in independent {
            let xs = self.graph.membership[x.index()].clone();
            let ys = self.graph.membership[y.index()].clone();
            for &c in &xs {
                for &d in &ys {
                    self.graph.add_conflict(c, d, ConflictReason::Independent { first: x, second: y });
                }
            }
        }

        for method in registry.methods() {
            if method.nonexclusive {
                continue;
            }
            let users = self.graph.users[method.id.index()].clone();
            for &c in &users {
                let candidate = &self.graph.candidates[c];
                let paths: Vec<String> = candidate
                    .members
                    .iter()
                    .flat_map(|&member| {
                        self.tree
                            .uses(member)
                            .iter()
                            .filter(|u| u.method == method.id)
                            .map(move |u| (member, u))
                    })
                    .map(|(member, u)| self.describe_use(member, u))
                    .collect();
                if paths.len() > 1 {
                    return Err(ElaborationError::SelfConflict {
                        unit: candidate.name.clone(),
                        chain: paths
                            .into_iter()
                            .map(|p| format!("calls exclusive '{}' via {}", method.qualified_name, p))
                            .collect(),
                    });
                }
            }
            for (i, &c) in users.iter().enumerate() {
                for &d in &users[i + 1..] {
                    self.graph.add_conflict(c, d, ConflictReason::SharedMethod(method.id));
                }
            }
        }

        for relation in relations.relations() {
            if !relation.is_conflict() {
                continue;
            }
            let (start, end) = (relation.start, relation.end);
            let starts = self.graph.users_of(start).to_vec();
            let ends = self.graph.users_of(end).to_vec();
            if starts.is_empty() || ends.is_empty() {
                self.ineffective(start, end);
                continue;
            }
            for &c in &starts {
                for &d in &ends {
                    if c == d {
                        let mut chain = vec![format!(
                            "'{}' conflicts with '{}'",
                            self.name(start),
                            self.name(end)
                        )];
                        chain.extend(self.involvement(c, start));
                        chain.extend(self.involvement(c, end));
                        return Err(ElaborationError::SelfConflict {
                            unit: self.graph.candidates[c].name.clone(),
                            chain,
                        });
                    }
                    self.graph.add_conflict(c, d, ConflictReason::Explicit { start, end });
                }
            }
        }
        Ok(())
    }

    // ==================== Priorities ====================

    fn priorities(&mut self) {
        let relations = self.relations;
        for relation in relations.relations() {
            let Some((preferred, other)) = relation.preference() else {
                continue;
            };
            let winners = self.graph.users_of(preferred).to_vec();
            let losers = self.graph.users_of(other).to_vec();
            if winners.is_empty() || losers.is_empty() {
                // Conflicts already reported their own ineffective relations
                if !relation.is_conflict() {
                    self.ineffective(relation.start, relation.end);
                }
                continue;
            }
            for &c in &winners {
                for &d in &losers {
                    if c != d {
                        self.graph.priorities.insert((c, d));
                    }
                }
            }
        }
    }

    // ==================== Diagnostics ====================

    fn cross_component(&mut self) -> ElaborationResult<()> {
        let pairs: Vec<(UnitId, UnitId)> = self
            .relations
            .relations()
            .iter()
            .map(|r| (r.start, r.end))
            .chain(self.relations.simultaneous_pairs().iter().copied())
            .collect();

        for (start, end) in pairs {
            if self.relations.is_acknowledged(start, end) {
                continue;
            }
            let (Some(a), Some(b)) = (self.registry.get(start)?.owner, self.registry.get(end)?.owner) else {
                continue;
            };
            let top_a = self.components.top_level(a)?;
            let top_b = self.components.top_level(b)?;
            if top_a != top_b {
                self.graph.diagnostics.push(Diagnostic::CrossComponentRelation {
                    start: self.name(start),
                    end: self.name(end),
                    start_component: self.components.path(top_a)?,
                    end_component: self.components.path(top_b)?,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::UnitDef;
    use arbiter_logic::{NodeId, StructValue};
    use arbiter_types::{ComponentId, Priority};

    struct Fixture {
        registry: UnitRegistry,
        components: ComponentTree,
        relations: RelationModel,
        calls: CallTable,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                registry: UnitRegistry::new(),
                components: ComponentTree::new(),
                relations: RelationModel::new(),
                calls: CallTable::new(),
            }
        }

        fn unit(&mut self, name: &str, kind: UnitKind, owner: Option<ComponentId>) -> UnitId {
            let id = self.registry.next_id();
            self.registry
                .register(UnitDef {
                    id,
                    name: name.to_string(),
                    qualified_name: name.to_string(),
                    owner,
                    kind,
                    ready: NodeId(0),
                    run: NodeId(0),
                    data_in: StructValue::empty(),
                    data_out: StructValue::empty(),
                    nonexclusive: false,
                    single_caller: false,
                    validator: None,
                    combiner: None,
                })
                .unwrap()
        }

        fn tx(&mut self, name: &str) -> UnitId {
            self.unit(name, UnitKind::Transaction, None)
        }

        fn method(&mut self, name: &str) -> UnitId {
            self.unit(name, UnitKind::Method, None)
        }

        fn call(&mut self, caller: UnitId, callee: UnitId) {
            self.calls.push(caller, callee, NodeId(0), StructValue::empty());
        }

        fn build(&self) -> ElaborationResult<ConflictGraph> {
            let tree = CallTree::analyze(&self.registry, &self.calls)?;
            ConflictGraph::build(&self.registry, &self.components, &self.relations, &tree, &self.calls)
        }
    }

    fn names(graph: &ConflictGraph) -> Vec<&str> {
        graph.candidates().iter().map(|c| c.name.as_str()).collect()
    }

    // ==================== Candidates ====================

    #[test]
    fn test_singleton_candidates() {
        let mut f = Fixture::new();
        f.tx("A");
        f.tx("B");
        let m = f.method("M");
        let graph = f.build().unwrap();

        assert_eq!(names(&graph), vec!["A", "B"]);
        assert!(graph.users_of(m).is_empty());
        assert_eq!(graph.conflict_count(), 0);
        assert_eq!(graph.order(), &[0, 1]);
    }

    #[test]
    fn test_simultaneous_groups_merge_transitively() {
        let mut f = Fixture::new();
        let a = f.tx("A");
        let b = f.tx("B");
        let c = f.tx("C");
        f.tx("D");
        f.relations.simultaneous(&f.registry, a, &[b]).unwrap();
        f.relations.simultaneous(&f.registry, b, &[c]).unwrap();
        let graph = f.build().unwrap();

        assert_eq!(names(&graph), vec!["A+B+C", "D"]);
        assert_eq!(graph.candidates_of(b), &[0]);
    }

    #[test]
    fn test_alternatives_share_the_common_member() {
        let mut f = Fixture::new();
        let a = f.tx("A");
        let b = f.tx("B");
        let c = f.tx("C");
        f.relations
            .simultaneous_alternatives(&f.registry, a, &[b, c])
            .unwrap();
        let graph = f.build().unwrap();

        assert_eq!(names(&graph), vec!["A+B", "A+C"]);
        assert!(graph.in_conflict(0, 1));
        let reasons: Vec<ConflictReason> = graph.reasons(0, 1).collect();
        assert!(reasons.contains(&ConflictReason::SharedMember(a)));
        assert!(reasons.contains(&ConflictReason::Independent { first: b, second: c }));
    }

    #[test]
    fn test_simultaneous_method_projects_to_callers() {
        let mut f = Fixture::new();
        let a = f.tx("A");
        let t = f.tx("T");
        let m = f.method("M");
        f.call(t, m);
        f.relations.simultaneous(&f.registry, a, &[m]).unwrap();
        let graph = f.build().unwrap();

        assert_eq!(names(&graph), vec!["A+T"]);
    }

    #[test]
    fn test_unsatisfiable_simultaneity() {
        let mut f = Fixture::new();
        let a = f.tx("A");
        let b = f.tx("B");
        f.relations.independent(&f.registry, a, &[b]).unwrap();
        f.relations.simultaneous(&f.registry, a, &[b]).unwrap();

        let err = f.build().unwrap_err();
        assert!(matches!(err, ElaborationError::UnsatisfiableSimultaneity { .. }));
    }

    // ==================== Conflicts ====================

    #[test]
    fn test_shared_exclusive_method() {
        let mut f = Fixture::new();
        let x = f.tx("X");
        let y = f.tx("Y");
        let m = f.method("M");
        f.call(x, m);
        f.call(y, m);
        let graph = f.build().unwrap();

        assert!(graph.in_conflict(0, 1));
        assert_eq!(graph.reasons(0, 1).collect::<Vec<_>>(), vec![ConflictReason::SharedMethod(m)]);
        assert_eq!(graph.users_of(m), &[0, 1]);
    }

    #[test]
    fn test_nonexclusive_method_adds_no_conflict() {
        let mut f = Fixture::new();
        let x = f.tx("X");
        let y = f.tx("Y");
        let m = f.method("M");
        f.registry.get_mut(m).unwrap().nonexclusive = true;
        f.call(x, m);
        f.call(y, m);
        let graph = f.build().unwrap();

        assert!(!graph.in_conflict(0, 1));
    }

    #[test]
    fn test_explicit_conflict_through_method() {
        let mut f = Fixture::new();
        let a = f.tx("A");
        let b = f.tx("B");
        let c = f.tx("C");
        let m = f.method("M");
        f.call(b, m);
        f.relations
            .add_conflict(&f.registry, m, c, Priority::Undefined)
            .unwrap();
        f.relations.simultaneous(&f.registry, a, &[b]).unwrap();
        let graph = f.build().unwrap();

        // A+B uses M, which conflicts with C
        assert_eq!(names(&graph), vec!["A+B", "C"]);
        assert!(graph.in_conflict(0, 1));
    }

    #[test]
    fn test_self_conflict_via_simultaneity() {
        let mut f = Fixture::new();
        let a = f.tx("A");
        let b = f.tx("B");
        f.relations
            .add_conflict(&f.registry, a, b, Priority::Undefined)
            .unwrap();
        f.relations.simultaneous(&f.registry, a, &[b]).unwrap();

        match f.build().unwrap_err() {
            ElaborationError::SelfConflict { unit, chain } => {
                assert_eq!(unit, "A+B");
                assert!(chain[0].contains("conflicts with"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_self_conflict_two_paths_to_exclusive_method() {
        let mut f = Fixture::new();
        let t = f.tx("T");
        let m = f.method("M");
        let n = f.method("N");
        f.call(t, m);
        f.call(t, n);
        f.call(n, m);

        match f.build().unwrap_err() {
            ElaborationError::SelfConflict { unit, chain } => {
                assert_eq!(unit, "T");
                assert_eq!(chain.len(), 2);
                assert!(chain[1].contains("T -> N -> M"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    // ==================== Priorities ====================

    #[test]
    fn test_priority_overrides_declaration_order() {
        let mut f = Fixture::new();
        let a = f.tx("A");
        let b = f.tx("B");
        f.relations.add_conflict(&f.registry, a, b, Priority::Right).unwrap();
        let graph = f.build().unwrap();

        assert_eq!(graph.priority_edges().collect::<Vec<_>>(), vec![(1, 0)]);
        assert_eq!(graph.order(), &[1, 0]);
    }

    #[test]
    fn test_priority_cycle() {
        let mut f = Fixture::new();
        let a = f.tx("A");
        let b = f.tx("B");
        let c = f.tx("C");
        f.relations.schedule_before(&f.registry, a, b).unwrap();
        f.relations.schedule_before(&f.registry, b, c).unwrap();
        f.relations.schedule_before(&f.registry, c, a).unwrap();

        match f.build().unwrap_err() {
            ElaborationError::PriorityCycle(cycle) => {
                assert_eq!(cycle.len(), 4);
                assert_eq!(cycle.first(), cycle.last());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    // ==================== Diagnostics ====================

    #[test]
    fn test_uncalled_method_relation_is_ineffective() {
        let mut f = Fixture::new();
        let t = f.tx("T");
        let m = f.method("M");
        f.relations.add_conflict(&f.registry, t, m, Priority::Undefined).unwrap();
        let graph = f.build().unwrap();

        assert_eq!(graph.diagnostics().len(), 1);
        assert!(matches!(
            &graph.diagnostics()[0],
            Diagnostic::IneffectiveRelation { reason, .. } if reason.contains("never called")
        ));
    }

    #[test]
    fn test_cross_component_relation() {
        let mut f = Fixture::new();
        let left = f.components.add("left", None).unwrap();
        let right = f.components.add("right", None).unwrap();
        let inner = f.components.add("inner", Some(left)).unwrap();
        let a = f.unit("a", UnitKind::Transaction, Some(inner));
        let b = f.unit("b", UnitKind::Transaction, Some(right));
        let c = f.unit("c", UnitKind::Transaction, Some(left));
        f.relations.add_conflict(&f.registry, a, b, Priority::Undefined).unwrap();
        f.relations.add_conflict(&f.registry, a, c, Priority::Undefined).unwrap();
        let graph = f.build().unwrap();

        assert_eq!(
            graph.diagnostics(),
            &[Diagnostic::CrossComponentRelation {
                start: "a".to_string(),
                end: "b".to_string(),
                start_component: "left".to_string(),
                end_component: "right".to_string(),
            }]
        );

        f.relations.acknowledge_coupling(&f.registry, b, a).unwrap();
        assert!(f.build().unwrap().diagnostics().is_empty());
    }
}
