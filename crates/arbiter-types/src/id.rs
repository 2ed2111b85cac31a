//! Arena identifiers
//!
//! Units, components and call sites live in vectors owned by the
//! elaboration context. These newtypes are the indices into them.

use std::fmt;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(pub u32);

        impl $name {
            /// Create a new identifier
            pub fn new(id: u32) -> Self {
                Self(id)
            }

            /// Get the raw ID value
            pub fn as_u32(&self) -> u32 {
                self.0
            }

            /// Get the ID as an arena index
            pub fn index(&self) -> usize {
                self.0 as usize
            }
        }

        impl From<u32> for $name {
            fn from(id: u32) -> Self {
                Self(id)
            }
        }

        impl From<usize> for $name {
            fn from(id: usize) -> Self {
                Self(id as u32)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

arena_id!(
    /// Unit identifier. Also the unit's position in declaration order.
    UnitId,
    "u"
);

arena_id!(
    /// Component (ownership tree node) identifier
    ComponentId,
    "c"
);

arena_id!(
    /// Call site identifier
    CallId,
    "call"
);
