//! Structured data layouts
//!
//! Method arguments and results are records of named fields. Each field is
//! one netlist node, so a [`StructValue`] is just a layout plus one node per
//! field.

use crate::error::{LogicError, LogicResult};
use crate::node::{NodeId, MAX_WIDTH};
use std::collections::HashSet;
use std::fmt;

/// Named field of a layout
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Field {
    /// Field name
    pub name: String,
    /// Field width in bits
    pub width: u8,
}

/// Ordered list of named fields
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Layout {
    fields: Vec<Field>,
}

impl Layout {
    /// Layout without fields
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a layout from `(name, width)` pairs
    pub fn new<'a>(fields: impl IntoIterator<Item = (&'a str, u8)>) -> LogicResult<Self> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for (name, width) in fields {
            if width == 0 || width > MAX_WIDTH {
                return Err(LogicError::InvalidWidth(width as u32));
            }
            if !seen.insert(name.to_string()) {
                return Err(LogicError::DuplicateName(name.to_string()));
            }
            out.push(Field {
                name: name.to_string(),
                width,
            });
        }
        Ok(Self { fields: out })
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Position of a field
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Total width in bits
    pub fn width(&self) -> u32 {
        self.fields.iter().map(|f| f.width as u32).sum()
    }

    /// Check if the layout has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", field.name, field.width)?;
        }
        write!(f, "}}")
    }
}

/// A layout bound to one node per field
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StructValue {
    layout: Layout,
    nodes: Vec<NodeId>,
}

impl StructValue {
    /// Bind nodes to a layout. Widths are checked by the netlist.
    pub fn from_parts(layout: Layout, nodes: Vec<NodeId>) -> LogicResult<Self> {
        if layout.len() != nodes.len() {
            return Err(LogicError::ArityMismatch {
                expected: layout.len(),
                found: nodes.len(),
            });
        }
        Ok(Self { layout, nodes })
    }

    /// Value with an empty layout
    pub fn empty() -> Self {
        Self::default()
    }

    /// The layout
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// One node per field, in layout order
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Node of a named field
    pub fn field(&self, name: &str) -> LogicResult<NodeId> {
        self.layout
            .position(name)
            .map(|i| self.nodes[i])
            .ok_or_else(|| LogicError::UnknownField(name.to_string()))
    }

    /// Check if the value has no fields
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Fail unless this value has the given layout
    pub fn expect_layout(&self, layout: &Layout) -> LogicResult<()> {
        if &self.layout != layout {
            return Err(LogicError::LayoutMismatch {
                expected: layout.to_string(),
                found: self.layout.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_new() {
        let layout = Layout::new([("addr", 8), ("data", 32)]).unwrap();
        assert_eq!(layout.len(), 2);
        assert_eq!(layout.width(), 40);
        assert_eq!(layout.position("data"), Some(1));
        assert_eq!(layout.to_string(), "{addr: 8, data: 32}");
    }

    #[test]
    fn test_layout_rejects_duplicates_and_bad_widths() {
        assert_eq!(
            Layout::new([("a", 1), ("a", 2)]),
            Err(LogicError::DuplicateName("a".to_string()))
        );
        assert_eq!(Layout::new([("a", 0)]), Err(LogicError::InvalidWidth(0)));
        assert_eq!(Layout::new([("a", 65)]), Err(LogicError::InvalidWidth(65)));
    }

    #[test]
    fn test_struct_value_fields() {
        let layout = Layout::new([("x", 4), ("y", 4)]).unwrap();
        let value = StructValue::from_parts(layout.clone(), vec![NodeId(3), NodeId(5)]).unwrap();

        assert_eq!(value.field("y").unwrap(), NodeId(5));
        assert!(matches!(value.field("z"), Err(LogicError::UnknownField(_))));
        assert!(value.expect_layout(&layout).is_ok());
        assert!(value.expect_layout(&Layout::empty()).is_err());
    }

    #[test]
    fn test_struct_value_arity() {
        let layout = Layout::new([("x", 4)]).unwrap();
        let err = StructValue::from_parts(layout, vec![]).unwrap_err();
        assert_eq!(
            err,
            LogicError::ArityMismatch {
                expected: 1,
                found: 0
            }
        );
    }
}
