//! Relation and constraint bookkeeping

use crate::error::{ElaborationError, ElaborationResult};
use crate::registry::UnitRegistry;
use arbiter_types::{Priority, Relation, UnitId};
use std::collections::{BTreeSet, HashMap};

fn ordered(a: UnitId, b: UnitId) -> (UnitId, UnitId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Explicit relations declared during elaboration
#[derive(Debug, Default)]
pub struct RelationModel {
    relations: Vec<Relation>,
    /// Unordered pair -> preferred unit
    preferences: HashMap<(UnitId, UnitId), UnitId>,
    simultaneous: Vec<(UnitId, UnitId)>,
    independent: BTreeSet<(UnitId, UnitId)>,
    acknowledged: BTreeSet<(UnitId, UnitId)>,
}

impl RelationModel {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, registry: &UnitRegistry, relation: Relation) -> ElaborationResult<()> {
        registry.check(relation.start)?;
        registry.check(relation.end)?;

        if let Some((preferred, _)) = relation.preference() {
            let pair = relation.pair();
            match self.preferences.get(&pair) {
                Some(existing) if *existing != preferred => {
                    return Err(ElaborationError::ContradictoryPriority {
                        first: registry.name(relation.start),
                        second: registry.name(relation.end),
                    });
                }
                _ => {
                    self.preferences.insert(pair, preferred);
                }
            }
        }

        tracing::trace!(
            "relation {:?} {} -> {} ({:?})",
            relation.kind,
            registry.name(relation.start),
            registry.name(relation.end),
            relation.priority
        );
        self.relations.push(relation);
        Ok(())
    }

    /// `a` and `b` never run in the same cycle
    pub fn add_conflict(
        &mut self,
        registry: &UnitRegistry,
        a: UnitId,
        b: UnitId,
        priority: Priority,
    ) -> ElaborationResult<()> {
        self.push(registry, Relation::conflict(a, b, priority))
    }

    /// Prefer `a` over `b` without making them exclusive
    pub fn schedule_before(&mut self, registry: &UnitRegistry, a: UnitId, b: UnitId) -> ElaborationResult<()> {
        self.push(registry, Relation::schedule_before(a, b))
    }

    /// Every unit in `others` runs exactly when `a` runs
    pub fn simultaneous(&mut self, registry: &UnitRegistry, a: UnitId, others: &[UnitId]) -> ElaborationResult<()> {
        registry.check(a)?;
        for &other in others {
            registry.check(other)?;
        }
        self.simultaneous.extend(others.iter().map(|&other| (a, other)));
        Ok(())
    }

    /// Each unit in `others` may run with `a`, but at most one of them per cycle
    pub fn simultaneous_alternatives(
        &mut self,
        registry: &UnitRegistry,
        a: UnitId,
        others: &[UnitId],
    ) -> ElaborationResult<()> {
        self.simultaneous(registry, a, others)?;
        if let Some((first, rest)) = others.split_first() {
            self.independent(registry, *first, rest)?;
        }
        Ok(())
    }

    /// `a` and all of `others` are pairwise never considered together
    pub(crate) fn independent(&mut self, registry: &UnitRegistry, a: UnitId, others: &[UnitId]) -> ElaborationResult<()> {
        let mut group = Vec::with_capacity(others.len() + 1);
        group.push(a);
        group.extend_from_slice(others);
        for &unit in &group {
            registry.check(unit)?;
        }
        for (i, &x) in group.iter().enumerate() {
            for &y in &group[i + 1..] {
                if x != y {
                    self.independent.insert(ordered(x, y));
                }
            }
        }
        Ok(())
    }

    /// Mark a cross-component pair as reviewed
    pub fn acknowledge_coupling(&mut self, registry: &UnitRegistry, a: UnitId, b: UnitId) -> ElaborationResult<()> {
        registry.check(a)?;
        registry.check(b)?;
        self.acknowledged.insert(ordered(a, b));
        Ok(())
    }

    /// Explicit conflict and priority relations, in declaration order
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Declared simultaneity pairs
    pub fn simultaneous_pairs(&self) -> &[(UnitId, UnitId)] {
        &self.simultaneous
    }

    /// Declared independence pairs, smaller id first
    pub fn independent_pairs(&self) -> impl Iterator<Item = (UnitId, UnitId)> + '_ {
        self.independent.iter().copied()
    }

    /// Check if two units were declared independent
    pub fn is_independent(&self, a: UnitId, b: UnitId) -> bool {
        self.independent.contains(&ordered(a, b))
    }

    /// Check if a pair was acknowledged as a deliberate coupling
    pub fn is_acknowledged(&self, a: UnitId, b: UnitId) -> bool {
        self.acknowledged.contains(&ordered(a, b))
    }

    /// Preferred unit of a pair, if any priority was declared
    pub fn preferred(&self, a: UnitId, b: UnitId) -> Option<UnitId> {
        self.preferences.get(&ordered(a, b)).copied()
    }
}
