//! Unit registry
//!
//! Arena of every transaction and method, in declaration order. A unit's
//! [`UnitId`] is its index here, so declaration order and id order agree and
//! can serve directly as the deterministic tie-break.

use crate::error::{ElaborationError, ElaborationResult};
use crate::unit::UnitDef;
use arbiter_types::{UnitId, UnitKind};
use std::collections::HashMap;

/// Registered units
#[derive(Debug, Default)]
pub struct UnitRegistry {
    units: Vec<UnitDef>,
    by_name: HashMap<String, UnitId>,
}

impl UnitRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next registered unit will receive
    pub fn next_id(&self) -> UnitId {
        UnitId::from(self.units.len())
    }

    /// Check if a qualified name is taken
    pub fn contains_name(&self, qualified_name: &str) -> bool {
        self.by_name.contains_key(qualified_name)
    }

    /// Add a unit exactly once
    ///
    /// The unit must carry the id returned by [`UnitRegistry::next_id`].
    pub fn register(&mut self, unit: UnitDef) -> ElaborationResult<UnitId> {
        if self.by_name.contains_key(&unit.qualified_name) {
            return Err(ElaborationError::DuplicateUnit(unit.qualified_name));
        }
        let id = self.next_id();
        if unit.id != id {
            return Err(ElaborationError::UnknownUnit(unit.id));
        }
        tracing::debug!("registered {} '{}' as {}", unit.kind, unit.qualified_name, id);
        self.by_name.insert(unit.qualified_name.clone(), id);
        self.units.push(unit);
        Ok(id)
    }

    /// Look up a unit
    pub fn get(&self, id: UnitId) -> ElaborationResult<&UnitDef> {
        self.units
            .get(id.index())
            .ok_or(ElaborationError::UnknownUnit(id))
    }

    /// Look up a unit mutably
    pub fn get_mut(&mut self, id: UnitId) -> ElaborationResult<&mut UnitDef> {
        self.units
            .get_mut(id.index())
            .ok_or(ElaborationError::UnknownUnit(id))
    }

    /// Fail unless the unit is registered
    pub fn check(&self, id: UnitId) -> ElaborationResult<()> {
        self.get(id).map(|_| ())
    }

    /// Find a unit by qualified name
    pub fn find(&self, qualified_name: &str) -> Option<UnitId> {
        self.by_name.get(qualified_name).copied()
    }

    /// Qualified name, or the raw id for unknown units
    pub fn name(&self, id: UnitId) -> String {
        self.units
            .get(id.index())
            .map(|u| u.qualified_name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// All units in declaration order
    pub fn all_units(&self) -> &[UnitDef] {
        &self.units
    }

    /// Transactions in declaration order
    pub fn transactions(&self) -> impl Iterator<Item = &UnitDef> {
        self.units.iter().filter(|u| u.kind == UnitKind::Transaction)
    }

    /// Methods in declaration order
    pub fn methods(&self) -> impl Iterator<Item = &UnitDef> {
        self.units.iter().filter(|u| u.kind == UnitKind::Method)
    }

    /// Number of registered units
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if no unit is registered
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub(crate) fn into_units(self) -> Vec<UnitDef> {
        self.units
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_logic::{NodeId, StructValue};

    fn make_unit(id: u32, name: &str, kind: UnitKind) -> UnitDef {
        UnitDef {
            id: UnitId::new(id),
            name: name.to_string(),
            qualified_name: name.to_string(),
            owner: None,
            kind,
            ready: NodeId(0),
            run: NodeId(1),
            data_in: StructValue::empty(),
            data_out: StructValue::empty(),
            nonexclusive: false,
            single_caller: false,
            validator: None,
            combiner: None,
        }
    }

    #[test]
    fn test_empty_registry() {
        let registry = UnitRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.next_id(), UnitId::new(0));
    }

    #[test]
    fn test_register_in_declaration_order() {
        let mut registry = UnitRegistry::new();
        registry.register(make_unit(0, "b", UnitKind::Transaction)).unwrap();
        registry.register(make_unit(1, "a", UnitKind::Method)).unwrap();
        registry.register(make_unit(2, "c", UnitKind::Transaction)).unwrap();

        let names: Vec<&str> = registry.all_units().iter().map(|u| u.name()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert_eq!(registry.transactions().count(), 2);
        assert_eq!(registry.methods().count(), 1);
        assert_eq!(registry.find("a"), Some(UnitId::new(1)));
    }

    #[test]
    fn test_duplicate_unit() {
        let mut registry = UnitRegistry::new();
        registry.register(make_unit(0, "a", UnitKind::Transaction)).unwrap();

        let err = registry
            .register(make_unit(1, "a", UnitKind::Transaction))
            .unwrap_err();
        assert!(matches!(err, ElaborationError::DuplicateUnit(ref n) if n == "a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_unit() {
        let registry = UnitRegistry::new();
        assert!(matches!(
            registry.get(UnitId::new(3)),
            Err(ElaborationError::UnknownUnit(_))
        ));
        assert_eq!(registry.name(UnitId::new(3)), "u3");
    }
}
