//! Component ownership tree
//!
//! Components only name things and group them. A unit refers to its owner
//! by [`ComponentId`]; components never refer back to their units.

use crate::error::{ElaborationError, ElaborationResult};
use arbiter_types::ComponentId;
use std::collections::HashMap;

/// A named component instance
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Component {
    /// Component id
    pub id: ComponentId,
    /// Local name
    pub name: String,
    /// Enclosing component
    pub parent: Option<ComponentId>,
}

/// All components of a design
#[derive(Debug, Default)]
pub struct ComponentTree {
    components: Vec<Component>,
    by_name: HashMap<(Option<ComponentId>, String), ComponentId>,
}

impl ComponentTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component under an optional parent
    pub fn add(&mut self, name: &str, parent: Option<ComponentId>) -> ElaborationResult<ComponentId> {
        if let Some(parent) = parent {
            self.get(parent)?;
        }
        let key = (parent, name.to_string());
        if self.by_name.contains_key(&key) {
            let path = match parent {
                Some(p) => format!("{}.{}", self.path(p)?, name),
                None => name.to_string(),
            };
            return Err(ElaborationError::DuplicateComponent(path));
        }
        let id = ComponentId::from(self.components.len());
        self.components.push(Component {
            id,
            name: name.to_string(),
            parent,
        });
        self.by_name.insert(key, id);
        Ok(id)
    }

    /// Look up a component
    pub fn get(&self, id: ComponentId) -> ElaborationResult<&Component> {
        self.components
            .get(id.index())
            .ok_or(ElaborationError::UnknownComponent(id))
    }

    /// Root ancestor of a component
    pub fn top_level(&self, id: ComponentId) -> ElaborationResult<ComponentId> {
        let mut current = self.get(id)?;
        while let Some(parent) = current.parent {
            current = self.get(parent)?;
        }
        Ok(current.id)
    }

    /// Dotted path from the root, e.g. `core.fifo`
    pub fn path(&self, id: ComponentId) -> ElaborationResult<String> {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(cid) = current {
            let component = self.get(cid)?;
            segments.push(component.name.as_str());
            current = component.parent;
        }
        segments.reverse();
        Ok(segments.join("."))
    }

    /// Number of components
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Check if there are no components
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
